//! Error types for pipeline validation and execution.
//!
//! Two layers are involved:
//!
//! - [`OperationError`] is what a single operation reports from `validate()` or `apply()`.
//!   It is either a configuration problem (caught before any record is touched) or an
//!   execution problem (missing column, type mismatch, cancellation, failing callback).
//! - [`PipelineError`] is what the orchestrator hands back to the caller. It wraps the
//!   operation's cause with the failing stage, the operation name, a diagnostic context
//!   map and the statistics gathered before the failure.
//!
//! ```
//! use rowpipe::{Operation, Record, Schema, run_pipeline, ExecutionContext};
//!
//! let ops = vec![Operation::limit(-1)];
//! let err = run_pipeline(&ops, &[Record::new()], &Schema::default(), &ExecutionContext::new())
//!     .unwrap_err();
//! assert!(err.is_configuration());
//! assert_eq!(err.stage, 0);
//! ```

use crate::pipeline::stats::ExecutionStats;
use crate::record::{SortKind, ValueKind};
use std::collections::BTreeMap;
use std::fmt;

/// Failure reported by a single operation.
#[derive(Debug)]
pub enum OperationError {
    /// Invalid operation configuration, raised by `validate()`.
    Configuration(String),

    /// A record lacks a column the operation needs.
    MissingColumn {
        column: String,
        record_index: Option<usize>,
    },

    /// A sort key value does not match the key's expected kind.
    TypeMismatch {
        column: String,
        record_index: usize,
        expected: SortKind,
        found: ValueKind,
    },

    /// A sort key value has no ordering (null, list or map).
    Unsortable {
        column: String,
        record_index: usize,
        found: ValueKind,
    },

    /// An arithmetic aggregate saw a non-numeric value.
    NonNumeric {
        column: String,
        aggregate: String,
        found: ValueKind,
    },

    /// Integer arithmetic overflowed.
    Overflow { column: String, aggregate: String },

    /// The cancellation token was signalled.
    Cancelled,

    /// The execution deadline passed.
    DeadlineExceeded,

    /// A user callback returned an error.
    CallbackFailed {
        record_index: Option<usize>,
        source: anyhow::Error,
    },

    /// A user callback panicked; the panic was caught at the call boundary.
    CallbackPanicked {
        record_index: Option<usize>,
        message: String,
    },
}

impl OperationError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Configuration errors come from `validate()`; everything else is an execution error.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    pub fn is_execution(&self) -> bool {
        !self.is_configuration()
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }

    /// Diagnostic key/value pairs describing where the error happened.
    pub fn context(&self) -> BTreeMap<String, String> {
        let mut context = BTreeMap::new();
        let mut put = |key: &str, value: String| {
            context.insert(key.to_owned(), value);
        };

        match self {
            Self::Configuration(_) | Self::Cancelled | Self::DeadlineExceeded => {}
            Self::MissingColumn {
                column,
                record_index,
            } => {
                put("column", column.clone());
                if let Some(idx) = record_index {
                    put("record_index", idx.to_string());
                }
            }
            Self::TypeMismatch {
                column,
                record_index,
                expected,
                found,
            } => {
                put("column", column.clone());
                put("record_index", record_index.to_string());
                put("expected", expected.to_string());
                put("found", found.to_string());
            }
            Self::Unsortable {
                column,
                record_index,
                found,
            } => {
                put("column", column.clone());
                put("record_index", record_index.to_string());
                put("found", found.to_string());
            }
            Self::NonNumeric {
                column,
                aggregate,
                found,
            } => {
                put("column", column.clone());
                put("aggregate", aggregate.clone());
                put("found", found.to_string());
            }
            Self::Overflow { column, aggregate } => {
                put("column", column.clone());
                put("aggregate", aggregate.clone());
            }
            Self::CallbackFailed { record_index, .. }
            | Self::CallbackPanicked { record_index, .. } => {
                if let Some(idx) = record_index {
                    put("record_index", idx.to_string());
                }
            }
        }

        context
    }
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            Self::MissingColumn {
                column,
                record_index: Some(idx),
            } => write!(f, "Record {idx} has no column '{column}'"),
            Self::MissingColumn {
                column,
                record_index: None,
            } => write!(f, "Missing column '{column}'"),
            Self::TypeMismatch {
                column,
                record_index,
                expected,
                found,
            } => write!(
                f,
                "Column '{column}' in record {record_index}: expected {expected} value, found {found}"
            ),
            Self::Unsortable {
                column,
                record_index,
                found,
            } => write!(
                f,
                "Column '{column}' in record {record_index}: {found} values cannot be ordered"
            ),
            Self::NonNumeric {
                column,
                aggregate,
                found,
            } => write!(
                f,
                "{aggregate} over '{column}' requires numeric values, found {found}"
            ),
            Self::Overflow { column, aggregate } => {
                write!(f, "{aggregate} over '{column}' overflowed")
            }
            Self::Cancelled => write!(f, "Pipeline cancelled"),
            Self::DeadlineExceeded => write!(f, "Pipeline deadline exceeded"),
            Self::CallbackFailed {
                record_index: Some(idx),
                source,
            } => write!(f, "Callback failed on record {idx}: {source}"),
            Self::CallbackFailed {
                record_index: None,
                source,
            } => write!(f, "Callback failed: {source}"),
            Self::CallbackPanicked {
                record_index: Some(idx),
                message,
            } => write!(f, "Callback panicked on record {idx}: {message}"),
            Self::CallbackPanicked {
                record_index: None,
                message,
            } => write!(f, "Callback panicked: {message}"),
        }
    }
}

impl std::error::Error for OperationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::CallbackFailed { source, .. } => Some(&**source),
            _ => None,
        }
    }
}

/// Stage-aware failure of a pipeline run.
#[derive(Debug)]
pub struct PipelineError {
    /// Name of the failing operation.
    pub operation: String,

    /// 0-based index of the failing operation in its chain.
    pub stage: usize,

    /// Underlying cause.
    pub cause: OperationError,

    /// Diagnostic context, e.g. `{"column": "grade"}` for a missing sort column.
    pub context: BTreeMap<String, String>,

    /// Statistics accumulated by the stages that completed before the failure.
    pub stats: ExecutionStats,
}

impl PipelineError {
    pub fn new(
        operation: impl Into<String>,
        stage: usize,
        cause: OperationError,
        stats: ExecutionStats,
    ) -> Self {
        let context = cause.context();
        Self {
            operation: operation.into(),
            stage,
            cause,
            context,
            stats,
        }
    }

    pub fn is_configuration(&self) -> bool {
        self.cause.is_configuration()
    }

    pub fn is_cancellation(&self) -> bool {
        self.cause.is_cancellation()
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stage {} ({}) failed: {}",
            self.stage, self.operation, self.cause
        )
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

/// Result type alias for pipeline runs.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OperationError::MissingColumn {
            column: "grade".to_owned(),
            record_index: Some(2),
        };
        assert_eq!(err.to_string(), "Record 2 has no column 'grade'");
    }

    #[test]
    fn test_missing_column_context() {
        let err = OperationError::MissingColumn {
            column: "grade".to_owned(),
            record_index: Some(2),
        };
        let context = err.context();
        assert_eq!(context.get("column").map(String::as_str), Some("grade"));
        assert_eq!(context.get("record_index").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_classification() {
        assert!(OperationError::configuration("bad").is_configuration());
        assert!(OperationError::Cancelled.is_cancellation());
        assert!(OperationError::DeadlineExceeded.is_execution());
        assert!(!OperationError::Cancelled.is_configuration());
    }

    #[test]
    fn test_pipeline_error_wraps_cause() {
        let err = PipelineError::new(
            "sort",
            1,
            OperationError::MissingColumn {
                column: "grade".to_owned(),
                record_index: None,
            },
            ExecutionStats::default(),
        );
        assert_eq!(err.to_string(), "Stage 1 (sort) failed: Missing column 'grade'");
        assert_eq!(err.context.get("column").map(String::as_str), Some("grade"));

        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("Missing column 'grade'"));
    }

    #[test]
    fn test_callback_failure_exposes_source() {
        let err = OperationError::CallbackFailed {
            record_index: Some(0),
            source: anyhow::anyhow!("boom"),
        };
        assert_eq!(err.to_string(), "Callback failed on record 0: boom");
        assert!(std::error::Error::source(&err).is_some());
    }
}
