//! Error types for dispatch
//!
//! Two layers:
//! - [`TransientExecutionError`]: one attempt of a unit failed for reasons
//!   unrelated to its input; retried within the queue's budget
//! - [`PipelineError`]: what a caller finally sees for a unit or workflow

use crate::config::QueueClass;
use crate::unit::Stage;
use crisis_core::{ExportError, StageError, ValidationError};
use std::path::PathBuf;

/// Worker-level failure of one attempt
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransientExecutionError {
    /// Stage task panicked or was torn down
    #[error("worker crashed: {0}")]
    WorkerCrashed(String),

    /// Forced termination at the hard limit
    #[error("hard time limit exceeded ({limit_ms}ms)")]
    HardTimeLimitExceeded {
        /// Limit that was hit
        limit_ms: u64,
    },

    /// Stage wound down after the soft limit signal
    #[error("soft time limit exceeded ({limit_ms}ms)")]
    SoftTimeLimitExceeded {
        /// Limit that was hit
        limit_ms: u64,
    },
}

/// Configuration loading and validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read {path}: {message}")]
    Io {
        /// Config path
        path: PathBuf,
        /// OS error text
        message: String,
    },

    /// TOML did not parse
    #[error("failed to parse config: {0}")]
    Parse(String),

    /// Config could not be rendered
    #[error("failed to encode config: {0}")]
    Encode(String),

    /// Values parsed but are inconsistent
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Final outcome error for a unit or workflow
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    /// Input rejected, never retried
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Unsupported content-type selector, never retried
    #[error("unknown content type: {0}")]
    UnknownContentType(String),

    /// A single attempt failed
    #[error("transient failure: {0}")]
    Transient(#[from] TransientExecutionError),

    /// Retry budget exhausted
    #[error("stage {stage} failed after {attempts} attempts: {last_error}")]
    StageFailed {
        /// Stage that failed
        stage: Stage,
        /// Attempts made, including the first
        attempts: u32,
        /// Last attempt's failure
        last_error: TransientExecutionError,
    },

    /// Queue no longer accepts work
    #[error("queue {0} is closed")]
    QueueClosed(QueueClass),

    /// Bad configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Stage produced an output of the wrong kind
    #[error("stage {0} returned an unexpected output")]
    UnexpectedOutput(Stage),

    /// Unit dropped before completing
    #[error("unit cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Check if a retry could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<StageError> for PipelineError {
    fn from(err: StageError) -> Self {
        match err {
            StageError::Validation(v) => Self::Validation(v),
            StageError::UnknownContentType(t) => Self::UnknownContentType(t),
        }
    }
}

impl From<ExportError> for PipelineError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::Validation(v) => Self::Validation(v),
            ExportError::UnsupportedType(t) => {
                Self::Validation(ValidationError::malformed("export_type", t))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_is_retryable() {
        assert!(PipelineError::Transient(TransientExecutionError::WorkerCrashed("boom".into()))
            .is_retryable());
        assert!(!PipelineError::Validation(ValidationError::MissingField("title")).is_retryable());
        assert!(!PipelineError::UnknownContentType("blog".into()).is_retryable());
        assert!(!PipelineError::Cancelled.is_retryable());
        assert!(!PipelineError::StageFailed {
            stage: Stage::Synthesize,
            attempts: 4,
            last_error: TransientExecutionError::HardTimeLimitExceeded { limit_ms: 10 },
        }
        .is_retryable());
    }

    #[test]
    fn stage_errors_map_without_wrapping() {
        let err: PipelineError = StageError::UnknownContentType("blog".into()).into();
        assert_eq!(err, PipelineError::UnknownContentType("blog".into()));

        let err: PipelineError = StageError::Validation(ValidationError::EmptyField("title")).into();
        assert_eq!(err, PipelineError::Validation(ValidationError::EmptyField("title")));
    }

    #[test]
    fn stage_failed_display() {
        let err = PipelineError::StageFailed {
            stage: Stage::Lint,
            attempts: 3,
            last_error: TransientExecutionError::HardTimeLimitExceeded { limit_ms: 50 },
        };
        let msg = err.to_string();
        assert!(msg.contains("lint"));
        assert!(msg.contains("3 attempts"));
        assert!(msg.contains("50ms"));
    }
}
