//! Error types for the code-explainer gateway.
//!
//! Every failure of the explain / generate-tests / refactor pipeline is one
//! variant of [`ExplainerError`]. The orchestrator in [`crate::gateway`]
//! converts each of them into the operation's stable response shape, so none
//! of these ever reach an HTTP client as a fault.

/// Errors produced by the gateway and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum ExplainerError {
    /// Empty or oversized code, rejected before any cache or network work.
    #[error("invalid input: {0}")]
    InputValidation(String),

    /// The injection detector flagged the submitted code.
    #[error("input rejected: {reason}")]
    SafetyRejection { reason: String },

    /// The completion provider failed even after the plain-text retry.
    #[error("generation failed: {0}")]
    GenerationFailed(String),

    /// The model answered with text that is not a JSON object.
    #[error("invalid JSON from model: {message}")]
    MalformedModelOutput {
        message: String,
        /// Leading slice of the offending text, never the whole response.
        preview: String,
    },

    /// Well-formed JSON whose required payload field is blank.
    #[error("{0}")]
    EmptyGeneration(String),

    #[error("could not build cache key: {0}")]
    KeyConstruction(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// HTTP or status error from the completion provider.
    #[error("provider error: {0}")]
    Provider(String),

    #[error("retrieval error: {0}")]
    Retrieval(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExplainerError {
    /// Short, stable name of the variant, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InputValidation(_) => "input_validation",
            Self::SafetyRejection { .. } => "safety_rejection",
            Self::GenerationFailed(_) => "generation_failed",
            Self::MalformedModelOutput { .. } => "malformed_model_output",
            Self::EmptyGeneration(_) => "empty_generation",
            Self::KeyConstruction(_) => "key_construction",
            Self::InvalidConfiguration(_) => "invalid_configuration",
            Self::Provider(_) => "provider",
            Self::Retrieval(_) => "retrieval",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ExplainerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_detail() {
        let err = ExplainerError::SafetyRejection {
            reason: "special token".into(),
        };
        assert_eq!(err.to_string(), "input rejected: special token");

        let err = ExplainerError::MalformedModelOutput {
            message: "expected value at line 1 column 1".into(),
            preview: "oops".into(),
        };
        assert!(err.to_string().contains("expected value"));
        assert!(!err.to_string().contains("oops"));
    }

    #[test]
    fn test_empty_generation_displays_message_verbatim() {
        let err = ExplainerError::EmptyGeneration("nothing generated".into());
        assert_eq!(err.to_string(), "nothing generated");
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(
            ExplainerError::InputValidation("x".into()).kind(),
            "input_validation"
        );
        assert_eq!(
            ExplainerError::GenerationFailed("x".into()).kind(),
            "generation_failed"
        );
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(ExplainerError::from(io).kind(), "io");
    }
}
