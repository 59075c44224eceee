//! Command-line interface.

pub mod retrieve;
pub mod serve;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use code_explainer::config::Config;

/// Caching LLM gateway that explains, tests, and refactors source code.
#[derive(Parser, Debug)]
#[command(name = "code-explainer")]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the JSON config file (default: ~/.code-explainer/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API server
    Serve,
    /// Query the knowledge base and print the matching passages
    Retrieve {
        /// Search text
        query: String,
        /// Number of passages to return
        #[arg(short, default_value_t = code_explainer::gateway::DEFAULT_K)]
        k: usize,
    },
}

/// Install the global tracing subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    match cli.command {
        Command::Serve => serve::cmd_serve(config).await,
        Command::Retrieve { query, k } => retrieve::cmd_retrieve(config, &query, k).await,
    }
}
