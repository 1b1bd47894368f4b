use thiserror::Error;

/// Common result type used across the crate.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Unified error enum surfaced by all public APIs.
///
/// `Validation` is raised at the schema boundary before any storage call;
/// `Conflict`, `NotFound` and `FilterSyntax` come from the storage engine and
/// are passed through unmodified.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("filter syntax error: {0}")]
    FilterSyntax(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A rejected inbound payload: which field, and why.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid `{field}`: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: ValidationReason,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: ValidationReason) -> Self {
        Self {
            field: field.into(),
            reason,
        }
    }

    pub fn missing(field: impl Into<String>) -> Self {
        Self::new(field, ValidationReason::Missing)
    }

    pub fn wrong_type(field: impl Into<String>, expected: &'static str, found: &'static str) -> Self {
        Self::new(field, ValidationReason::WrongType { expected, found })
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationReason {
    #[error("field is required")]
    Missing,
    #[error("expected {expected}, found {found}")]
    WrongType {
        expected: &'static str,
        found: &'static str,
    },
    #[error("must not be empty")]
    Empty,
    #[error("length {actual} does not match ids length {expected}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("must be at least {min}, got {actual}")]
    OutOfRange { min: i64, actual: i64 },
    #[error("unknown value `{0}`")]
    UnknownValue(String),
    #[error("batch size {actual} exceeds maximum {max}")]
    BatchTooLarge { max: usize, actual: usize },
    #[error("{0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_display_names_field() {
        let err = ValidationError::new(
            "metadatas",
            ValidationReason::LengthMismatch {
                expected: 2,
                actual: 1,
            },
        );
        assert_eq!(
            err.to_string(),
            "invalid `metadatas`: length 1 does not match ids length 2"
        );
    }

    #[test]
    fn validation_converts_into_api_error() {
        let err: ApiError = ValidationError::missing("ids").into();
        match err {
            ApiError::Validation(v) => assert_eq!(v.reason, ValidationReason::Missing),
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
