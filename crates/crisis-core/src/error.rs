//! Error types for the pure pipeline stages
//!
//! Covers:
//! - Malformed or missing incident input
//! - Unsupported content-type selectors
//! - Approval and export state errors

/// Malformed or missing required input
///
/// Never retried: the same input fails the same way on every attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Required field absent from the payload
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Field present but empty
    #[error("field must not be empty: {0}")]
    EmptyField(&'static str),

    /// Field present but of the wrong shape
    #[error("malformed field {field}: {reason}")]
    Malformed {
        /// Offending field
        field: &'static str,
        /// Human-readable cause
        reason: String,
    },
}

impl ValidationError {
    /// Shorthand for a malformed field
    #[inline]
    pub fn malformed(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            field,
            reason: reason.into(),
        }
    }
}

/// Failure of a single stage invocation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StageError {
    /// Input rejected
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Content-type selector not recognised
    #[error("unknown content type: {0}")]
    UnknownContentType(String),
}

impl StageError {
    /// Stage errors are deterministic in their input
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        false
    }
}

/// Approval workflow errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApprovalError {
    /// Approval already decided
    #[error("approval not pending (status: {0})")]
    NotPending(String),

    /// Unrecognised approval action
    #[error("unknown approval action: {0}")]
    UnknownAction(String),
}

/// Export packaging errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExportError {
    /// Input rejected
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Unsupported export format
    #[error("unsupported export type: {0}")]
    UnsupportedType(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_display() {
        let err = ValidationError::MissingField("title");
        assert_eq!(err.to_string(), "missing required field: title");

        let err = ValidationError::malformed("affected_users", "expected integer");
        assert!(err.to_string().contains("affected_users"));
        assert!(err.to_string().contains("expected integer"));
    }

    #[test]
    fn stage_error_wraps_validation() {
        let err: StageError = ValidationError::EmptyField("incident_id").into();
        assert!(matches!(err, StageError::Validation(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn unknown_content_type_not_retryable() {
        let err = StageError::UnknownContentType("tweetstorm".to_string());
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("tweetstorm"));
    }
}
