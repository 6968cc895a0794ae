//! Whole-chain validation.
//!
//! The orchestrator stops at the first configuration error. This module collects every
//! problem in a chain at once so a caller can report them together.

use super::operation::Operation;
use std::fmt;

/// One configuration problem found in a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// 0-based stage, or `None` for problems with the chain as a whole
    pub step_index: Option<usize>,
    pub message: String,
}

impl ValidationIssue {
    pub(crate) fn new(step_index: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            step_index,
            message: message.into(),
        }
    }

    pub(crate) fn step(step_index: usize, message: impl Into<String>) -> Self {
        Self::new(Some(step_index), message)
    }

    pub(crate) fn chain(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(idx) = self.step_index {
            write!(f, "Step {}: {}", idx + 1, self.message)
        } else {
            write!(f, "Pipeline: {}", self.message)
        }
    }
}

/// Validate every operation and return all problems, in chain order.
pub fn validate_chain(operations: &[Operation]) -> Vec<ValidationIssue> {
    operations
        .iter()
        .enumerate()
        .filter_map(|(idx, op)| {
            op.validate()
                .err()
                .map(|err| ValidationIssue::step(idx, format!("{}: {err}", op.name())))
        })
        .collect()
}

/// Render issues one per line, the way the CLI prints them.
pub fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
