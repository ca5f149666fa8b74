use rust_decimal::Decimal;
use thiserror::Error;

/// Request rejected before any pipeline stage starts.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("`{0}` is required")]
    MissingField(&'static str),
    #[error("`text_input` is {length} characters, maximum is {maximum}")]
    InputTooLong { length: usize, maximum: usize },
    #[error("unknown operation `{0}`")]
    UnknownOperation(String),
    #[error("limit must be greater than zero")]
    ZeroLimit,
    #[error("limit {requested} exceeds the maximum of {maximum}")]
    LimitExceedsMaximum { requested: u32, maximum: u32 },
    #[error("`{field}` must not be negative (got {value})")]
    NegativeAmount { field: &'static str, value: Decimal },
    #[error("investment range is inverted: min {min} is greater than max {max}")]
    InvertedRange { min: Decimal, max: Decimal },
    #[error("invalid arguments: {0}")]
    MalformedArguments(String),
}

/// Failure inside a single pipeline stage.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StageError {
    #[error("prompt `{key}` unavailable: {message}")]
    Prompt { key: String, message: String },
    #[error("language model call failed: {0}")]
    Model(String),
    #[error("data store error: {0}")]
    Store(String),
    #[error("{stage} stage timed out after {millis}ms")]
    Timeout { stage: &'static str, millis: u64 },
    #[error("could not serialize {0}")]
    Serialization(String),
}

impl StageError {
    pub fn class(&self) -> &'static str {
        match self {
            Self::Prompt { .. } => "prompt",
            Self::Model(_) => "model",
            Self::Store(_) => "store",
            Self::Timeout { .. } => "timeout",
            Self::Serialization(_) => "serialization",
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{StageError, ValidationError};

    #[test]
    fn validation_messages_name_the_offending_value() {
        let error = ValidationError::LimitExceedsMaximum { requested: 500, maximum: 100 };
        assert_eq!(error.to_string(), "limit 500 exceeds the maximum of 100");

        let error =
            ValidationError::InvertedRange { min: Decimal::new(10, 0), max: Decimal::new(5, 0) };
        assert!(error.to_string().contains("min 10 is greater than max 5"));
    }

    #[test]
    fn stage_errors_expose_a_stable_class() {
        assert_eq!(StageError::Store("locked".to_owned()).class(), "store");
        assert_eq!(StageError::Timeout { stage: "format", millis: 30_000 }.class(), "timeout");
        assert_eq!(
            StageError::Timeout { stage: "format", millis: 30_000 }.to_string(),
            "format stage timed out after 30000ms"
        );
    }
}
