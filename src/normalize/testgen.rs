use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{error_message, string_field, string_list_field, NormalizedResponse, REJECTION_MESSAGE};
use crate::error::{ExplainerError, Result};

const NO_TEST_CODE: &str = "The AI model did not generate any test code.";
const CASES_PLACEHOLDER: &str = "Test cases not explicitly listed by AI";

/// Result of `/generate-tests`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestResponse {
    pub test_file_name: String,
    pub test_code: String,
    pub test_cases_covered: Vec<String>,
    pub how_to_run: String,
    pub error: Option<String>,
}

impl NormalizedResponse for TestResponse {
    const NAMESPACE: &'static str = "tests";

    fn validate_and_fix(parsed: &Map<String, Value>) -> Self {
        Self {
            test_file_name: string_field(parsed, "test_file_name").unwrap_or_default(),
            test_code: string_field(parsed, "test_code").unwrap_or_default(),
            test_cases_covered: string_list_field(parsed, "test_cases_covered").unwrap_or_default(),
            how_to_run: string_field(parsed, "how_to_run").unwrap_or_default(),
            error: None,
        }
    }

    fn check(mut self) -> Result<Self> {
        if self.test_code.trim().is_empty() {
            return Err(ExplainerError::EmptyGeneration(NO_TEST_CODE.into()));
        }
        if self.test_cases_covered.is_empty() {
            self.test_cases_covered = vec![CASES_PLACEHOLDER.to_string()];
        }
        Ok(self)
    }

    fn from_error(err: &ExplainerError) -> Self {
        let message = error_message(err);
        let how_to_run = match err {
            ExplainerError::SafetyRejection { .. } => REJECTION_MESSAGE.to_string(),
            ExplainerError::InputValidation(_)
            | ExplainerError::MalformedModelOutput { .. }
            | ExplainerError::EmptyGeneration(_) => message.clone(),
            _ => String::new(),
        };
        Self {
            how_to_run,
            error: Some(message),
            ..Default::default()
        }
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
