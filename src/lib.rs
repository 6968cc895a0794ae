//! # rowpipe - Per-content record transformation pipelines
//!
//! rowpipe filters, sorts, limits, groups and derives columns on ordered record sets
//! before they reach a renderer. Chains are built once, are immutable afterwards, and
//! can run against the same source from any number of threads.
//!
//! ## Quick Start
//!
//! ```
//! use rowpipe::{ExecutionContext, Operation, Record, Schema, SortKey, Value, run_pipeline};
//!
//! let records: Vec<Record> = [("Alice", 30), ("Bob", 17), ("Charlie", 25)]
//!     .into_iter()
//!     .map(|(name, age)| Record::from([("name", Value::from(name)), ("age", Value::from(age))]))
//!     .collect();
//!
//! let ops = vec![
//!     Operation::filter(|r| r.get("age").and_then(Value::as_i64).is_some_and(|a| a >= 18)),
//!     Operation::sort([SortKey::asc("age")]),
//! ];
//!
//! let output = run_pipeline(&ops, &records, &Schema::new(["name", "age"]), &ExecutionContext::new())?;
//! assert_eq!(output.records.len(), 2);
//! assert_eq!(output.stats.filtered_count, 1);
//! # Ok::<(), rowpipe::PipelineError>(())
//! ```
//!
//! ## Core Modules
//!
//! - [`record`]: values, records and schemas
//! - [`pipeline`]: operations, orchestration, cancellation and statistics
//!   - [`pipeline::spec`]: JSON pipeline specs
//! - [`content`]: tables and documents that carry pipelines
//! - [`error`]: configuration and execution errors
//! - [`config`]: execution tunables
//! - [`logging`]: subscriber setup for binaries

#![warn(clippy::all, rust_2018_idioms)]

pub mod config;
pub mod content;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod record;

pub use content::{Content, Document, RenderedContent, Table, TransformedTable};
pub use error::{OperationError, PipelineError};
pub use pipeline::{
    Aggregate, CancellationToken, ExecutionContext, ExecutionStats, Operation, OperationStats,
    Pipeline, PipelineOutput, SortDirection, SortKey, run_pipeline,
};
pub use record::{Record, Schema, SortKind, Value, ValueKind};
