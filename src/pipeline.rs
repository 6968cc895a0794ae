//! Record transformation pipelines.
//!
//! A pipeline is an ordered chain of [`Operation`]s applied to a sequence of records.
//! Each stage reads the previous stage's output and produces a fresh sequence, so the
//! caller's records are never modified and one chain can serve any number of runs.
//!
//! # Overview
//!
//! Five operations are available:
//! - **Filter**: keep records matching a predicate
//! - **Sort**: stable, type-directed multi-key sort
//! - **Limit**: keep the first `n` records
//! - **GroupBy**: partition by key columns and reduce each group with [`Aggregate`]s
//! - **AddColumn**: derive a column from each record
//!
//! Runs validate the whole chain first, then execute stage by stage. The first failure
//! aborts the run with a [`PipelineError`](crate::error::PipelineError) naming the stage.
//!
//! # Example: Programmatic Pipeline Creation
//!
//! ```
//! use rowpipe::pipeline::{Aggregate, ExecutionContext, Operation, SortKey, run_pipeline};
//! use rowpipe::{Record, Schema, Value};
//!
//! let records: Vec<Record> = [("North", 10), ("South", 30), ("North", 20)]
//!     .into_iter()
//!     .map(|(region, amount)| {
//!         Record::from([("region", Value::from(region)), ("amount", Value::from(amount))])
//!     })
//!     .collect();
//!
//! let ops = vec![
//!     Operation::group_by(["region"], [("total", Aggregate::sum("amount"))]),
//!     Operation::sort([SortKey::desc("total")]),
//! ];
//!
//! let output = run_pipeline(
//!     &ops,
//!     &records,
//!     &Schema::new(["region", "amount"]),
//!     &ExecutionContext::new(),
//! )?;
//! assert_eq!(output.records[0].get("total"), Some(&Value::Int(30)));
//! println!("{}", output.stats.summary());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Declarative pipelines
//!
//! Chains built from the fixed step vocabulary can be stored as JSON; see
//! [`PipelineSpec`].

pub mod aggregate;
pub mod context;
pub mod executor;
pub mod operation;
pub mod ops;
pub mod spec;
pub mod stats;
pub mod validation;

pub use aggregate::Aggregate;
pub use context::{CancellationToken, ExecutionContext};
pub use executor::{Pipeline, PipelineOutput, run_pipeline};
pub use operation::Operation;
pub use ops::{
    AddColumnOp, FilterOp, GroupByOp, LimitOp, SortDirection, SortKey, SortOp, Transform,
};
pub use spec::{PipelineSpec, SPEC_VERSION, Step};
pub use stats::{ExecutionStats, OperationStats};
pub use validation::{ValidationIssue, validate_chain};
