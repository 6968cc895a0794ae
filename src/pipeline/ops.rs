//! Operation variants and the trait they share.

mod add_column;
mod filter;
mod group_by;
mod limit;
mod sort;

pub use add_column::AddColumnOp;
pub use filter::FilterOp;
pub use group_by::GroupByOp;
pub use limit::LimitOp;
pub use sort::{SortDirection, SortKey, SortOp};

use super::context::ExecutionContext;
use crate::error::OperationError;
use crate::record::{Record, Schema};
use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Trait for all record transformations
/// Each transform must be:
/// - Validatable before any record is touched
/// - Non-mutating (reads `&[Record]`, returns a fresh sequence)
/// - Deterministic (same input + callbacks = same output)
/// - Shareable across threads once built
pub trait Transform: Send + Sync + fmt::Debug {
    /// Get the name of this transform
    fn name(&self) -> &'static str;

    /// Create a summary of what this transform does
    fn description(&self) -> String;

    /// Check the configuration. Only configuration errors are returned here.
    fn validate(&self) -> Result<(), OperationError>;

    /// Apply this transform to a record sequence
    fn apply(
        &self,
        ctx: &ExecutionContext,
        records: &[Record],
    ) -> Result<Vec<Record>, OperationError>;

    /// Schema of the output given the schema of the input
    fn output_schema(&self, input: &Schema) -> Schema {
        input.clone()
    }
}

/// Run a user callback, turning a panic into [`OperationError::CallbackPanicked`].
pub(crate) fn guarded<T>(
    record_index: Option<usize>,
    f: impl FnOnce() -> T,
) -> Result<T, OperationError> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| OperationError::CallbackPanicked {
        record_index,
        message: panic_message(&*payload),
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}
