//! code-explainer binary entry point.

mod cli;

use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = cli::Cli::parse();
    cli::init_logging(cli.json_logs);
    cli::run(cli).await
}
