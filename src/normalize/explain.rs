use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{
    error_message, object_field, string_field, string_list_field, NormalizedResponse,
    REJECTION_MESSAGE, REMEDIATION_HINT,
};
use crate::error::ExplainerError;

/// Overview shown when the backend itself failed.
const BACKEND_FAILURE_OVERVIEW: &str = "Backend error occurred while generating explanation.";

/// A knowledge-base passage the explanation drew on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub source: String,
    pub snippet: String,
}

impl Citation {
    /// Object elements only; `source` defaults to "unknown", `snippet` to "".
    fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        Some(Self {
            source: string_field(obj, "source").unwrap_or_else(|| "unknown".to_string()),
            snippet: string_field(obj, "snippet").unwrap_or_default(),
        })
    }
}

/// Result of `/explain`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExplainResponse {
    pub overview: String,
    pub step_by_step: Vec<String>,
    pub potential_bugs: Vec<String>,
    pub improvements: Vec<String>,
    pub complexity: Map<String, Value>,
    pub citations: Vec<Citation>,
    pub error: Option<String>,
}

impl ExplainResponse {
    /// Use retrieval citations when the model supplied none.
    pub fn with_fallback_citations(mut self, citations: Vec<Citation>) -> Self {
        if self.citations.is_empty() {
            self.citations = citations;
        }
        self
    }
}

impl NormalizedResponse for ExplainResponse {
    const NAMESPACE: &'static str = "explain";

    fn validate_and_fix(parsed: &Map<String, Value>) -> Self {
        let citations = parsed
            .get("citations")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Citation::from_value).collect())
            .unwrap_or_default();

        Self {
            overview: string_field(parsed, "overview").unwrap_or_default(),
            step_by_step: string_list_field(parsed, "step_by_step").unwrap_or_default(),
            potential_bugs: string_list_field(parsed, "potential_bugs").unwrap_or_default(),
            improvements: string_list_field(parsed, "improvements").unwrap_or_default(),
            complexity: object_field(parsed, "complexity").unwrap_or_default(),
            citations,
            error: None,
        }
    }

    fn from_error(err: &ExplainerError) -> Self {
        match err {
            ExplainerError::SafetyRejection { reason } => Self {
                overview: REJECTION_MESSAGE.to_string(),
                potential_bugs: vec![reason.clone()],
                improvements: vec![REMEDIATION_HINT.to_string()],
                error: Some(err.to_string()),
                ..Default::default()
            },
            ExplainerError::InputValidation(_)
            | ExplainerError::MalformedModelOutput { .. }
            | ExplainerError::EmptyGeneration(_) => {
                let message = error_message(err);
                Self {
                    overview: message.clone(),
                    error: Some(message),
                    ..Default::default()
                }
            }
            _ => Self {
                overview: BACKEND_FAILURE_OVERVIEW.to_string(),
                error: Some(error_message(err)),
                ..Default::default()
            },
        }
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
