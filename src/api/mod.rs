// HTTP surface of the gateway. Every analysis endpoint answers 200 with a JSON
// body; failures are reported in the body's `error` field.

pub mod middleware;
pub mod routes;
pub mod server;

pub use middleware::{RequestId, REQUEST_ID_HEADER};
pub use server::{build_router, start_server, AppState};

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::AppState;
    use crate::cache::CacheSet;
    use crate::config::{CacheConfig, Config};
    use crate::error::Result;
    use crate::gateway::{Gateway, GatewaySettings};
    use crate::providers::{GenerationRequest, LLMProvider};
    use crate::rag::{Document, KeywordRetriever, Retriever};

    /// One reply that satisfies all three response shapes.
    pub const UNIVERSAL_REPLY: &str = r#"{
        "overview": "Adds two numbers.",
        "step_by_step": ["Take a and b", "Return their sum"],
        "test_file_name": "test_add.py",
        "test_code": "def test_add():\n    assert add(1, 2) == 3",
        "test_cases_covered": ["positive numbers"],
        "how_to_run": "pytest test_add.py",
        "refactored_code": "def add(a: int, b: int) -> int:\n    return a + b",
        "explanation_of_changes": ["Added type hints"]
    }"#;

    pub struct StubProvider {
        reply: String,
        pub calls: AtomicUsize,
    }

    impl StubProvider {
        pub fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LLMProvider for StubProvider {
        async fn generate(&self, _request: &GenerationRequest) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }

        fn name(&self) -> &'static str {
            "stub"
        }
    }

    /// State backed by `provider` and a small in-memory knowledge base.
    pub fn state_with(provider: Arc<StubProvider>, with_retriever: bool) -> AppState {
        let config = Config::default();
        let retriever: Option<Arc<dyn Retriever>> = with_retriever.then(|| {
            Arc::new(KeywordRetriever::new(vec![
                Document::new("style.md", "Prefer type hints on public functions."),
                Document::new("errors.md", "Raise ValueError for invalid arguments."),
            ])) as Arc<dyn Retriever>
        });
        let gateway = Gateway::new(
            CacheSet::from_config(&CacheConfig::default()).unwrap(),
            provider,
            retriever,
            GatewaySettings::from_config(&config),
        );
        AppState::new(Arc::new(gateway), true, config.limits)
    }
}
