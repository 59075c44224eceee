use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{
    error_message, object_field, string_field, string_list_field, NormalizedResponse,
    REJECTION_MESSAGE, REMEDIATION_HINT,
};
use crate::error::{ExplainerError, Result};

const NO_REFACTORED_CODE: &str = "The AI model did not generate any refactored code.";

/// Result of `/refactor`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefactorResponse {
    pub refactored_code: String,
    pub explanation_of_changes: Vec<String>,
    pub improvements: Vec<String>,
    pub complexity: Map<String, Value>,
    pub error: Option<String>,
}

impl NormalizedResponse for RefactorResponse {
    const NAMESPACE: &'static str = "refactor";

    fn validate_and_fix(parsed: &Map<String, Value>) -> Self {
        Self {
            refactored_code: string_field(parsed, "refactored_code").unwrap_or_default(),
            explanation_of_changes: string_list_field(parsed, "explanation_of_changes")
                .unwrap_or_default(),
            improvements: string_list_field(parsed, "improvements").unwrap_or_default(),
            complexity: object_field(parsed, "complexity").unwrap_or_default(),
            error: None,
        }
    }

    fn check(self) -> Result<Self> {
        if self.refactored_code.trim().is_empty() {
            return Err(ExplainerError::EmptyGeneration(NO_REFACTORED_CODE.into()));
        }
        Ok(self)
    }

    fn from_error(err: &ExplainerError) -> Self {
        match err {
            ExplainerError::SafetyRejection { reason } => Self {
                improvements: vec![REMEDIATION_HINT.to_string()],
                error: Some(format!(
                    "{}: {reason}",
                    REJECTION_MESSAGE.trim_end_matches('.')
                )),
                ..Default::default()
            },
            _ => Self {
                error: Some(error_message(err)),
                ..Default::default()
            },
        }
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
