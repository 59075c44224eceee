//! Model output normalization.
//!
//! Whatever the model returns (fenced JSON, chatter around an object, missing
//! fields, wrong types) is turned into one fixed-shape record per operation.
//! Every record carries an `error` field: `null` for a successful generation,
//! a message for every degraded response. Only records with `error == null`
//! are eligible for caching.

mod explain;
mod refactor;
mod testgen;

pub use explain::{Citation, ExplainResponse};
pub use refactor::RefactorResponse;
pub use testgen::TestResponse;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ExplainerError, Result};
use crate::utils::sanitize::{extract_json_object, strip_code_fences, take_chars};

/// Characters of offending model output kept in a parse error.
pub const PREVIEW_CHARS: usize = 200;

/// Shown to callers whose code was flagged by the injection detector.
pub const REJECTION_MESSAGE: &str = "Input rejected due to unsafe or prompt-injection content.";

/// Remediation hint attached to rejections.
pub const REMEDIATION_HINT: &str = "Remove instruction-like text and provide only source code.";

/// A typed, fixed-shape response for one operation.
pub trait NormalizedResponse: Clone + Serialize + Send + Sync + 'static {
    /// Cache namespace and log label of the operation.
    const NAMESPACE: &'static str;

    /// Coerce a parsed JSON object into the fixed shape.
    ///
    /// Fields are copied only when their JSON type matches; everything else
    /// keeps its default. Never fails.
    fn validate_and_fix(parsed: &Map<String, Value>) -> Self;

    /// Business rules applied after shape validation.
    fn check(self) -> Result<Self> {
        Ok(self)
    }

    /// The stable error shape for a failed or rejected request.
    fn from_error(err: &ExplainerError) -> Self;

    /// The degraded tag; `None` on success.
    fn error(&self) -> Option<&str>;

    /// Parse raw model text and coerce it into the fixed shape.
    fn normalize(raw: &str) -> Result<Self> {
        let parsed = parse_model_json(raw)?;
        Self::validate_and_fix(&parsed).check()
    }
}

/// Parse model output into a JSON object, tolerating fences and chatter.
pub fn parse_model_json(raw: &str) -> Result<Map<String, Value>> {
    let clean = strip_code_fences(raw);
    let candidate = extract_json_object(&clean);

    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ExplainerError::MalformedModelOutput {
            message: "model output is not a JSON object".into(),
            preview: take_chars(candidate, PREVIEW_CHARS).to_string(),
        }),
        Err(e) => Err(ExplainerError::MalformedModelOutput {
            message: e.to_string(),
            preview: take_chars(candidate, PREVIEW_CHARS).to_string(),
        }),
    }
}

/// Caller-facing text for an error.
pub fn error_message(err: &ExplainerError) -> String {
    match err {
        ExplainerError::MalformedModelOutput { message, .. } => {
            format!("The AI model returned invalid JSON format. Error: {message}")
        }
        ExplainerError::InputValidation(msg) | ExplainerError::EmptyGeneration(msg) => {
            msg.clone()
        }
        other => other.to_string(),
    }
}

// -- field extraction ------------------------------------------------------

fn string_field(parsed: &Map<String, Value>, key: &str) -> Option<String> {
    parsed.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Array fields only; strings are kept verbatim, other elements become their JSON text.
fn string_list_field(parsed: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    parsed.get(key).and_then(Value::as_array).map(|items| {
        items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect()
    })
}

fn object_field(parsed: &Map<String, Value>, key: &str) -> Option<Map<String, Value>> {
    parsed.get(key).and_then(Value::as_object).cloned()
}
