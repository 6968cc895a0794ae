//! Pipeline execution engine.
//!
//! Applies an operation chain to a record sequence stage by stage, failing fast and
//! collecting per-stage statistics.

use super::context::ExecutionContext;
use super::operation::Operation;
use super::stats::{ExecutionStats, OperationStats};
use super::validation::{ValidationIssue, validate_chain};
use crate::error::{PipelineError, Result};
use crate::record::{Record, Schema};
use std::sync::Arc;
use std::time::Instant;

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub records: Vec<Record>,

    /// Effective schema after the last stage
    pub schema: Schema,

    pub stats: ExecutionStats,
}

/// Execute an operation chain on input records.
///
/// Every operation is validated before any record is touched. Cancellation is polled
/// before each stage; a signalled token fails the run at the stage that has not started
/// yet. The input slice is never modified.
pub fn run_pipeline(
    operations: &[Operation],
    records: &[Record],
    schema: &Schema,
    ctx: &ExecutionContext,
) -> Result<PipelineOutput> {
    let start = Instant::now();
    let mut stats = ExecutionStats::starting_with(records.len());

    for (idx, op) in operations.iter().enumerate() {
        if let Err(cause) = op.validate() {
            stats.duration = start.elapsed();
            tracing::warn!(stage = idx, operation = op.name(), "Invalid operation: {}", cause);
            return Err(PipelineError::new(op.name(), idx, cause, stats));
        }
    }

    let mut schema = schema.clone();
    let mut current: Option<Vec<Record>> = None;

    for (idx, op) in operations.iter().enumerate() {
        let input = current.as_deref().unwrap_or(records);

        let applied = ctx.check().and_then(|()| {
            let stage_start = Instant::now();
            op.apply(ctx, input).map(|output| (output, stage_start.elapsed()))
        });

        let (output, duration) = match applied {
            Ok(done) => done,
            Err(cause) => {
                stats.duration = start.elapsed();
                tracing::warn!(
                    stage = idx,
                    operation = op.name(),
                    "Pipeline aborted: {}",
                    cause
                );
                return Err(PipelineError::new(op.name(), idx, cause, stats));
            }
        };

        if ctx.config().log_stage_timings {
            tracing::debug!(
                stage = idx,
                operation = op.name(),
                records_in = input.len(),
                records_out = output.len(),
                "Stage completed in {:?}",
                duration
            );
        }

        if op.is_filter() {
            stats.filtered_count += input.len().saturating_sub(output.len());
        }
        stats.operations.push(OperationStats {
            name: op.name().to_owned(),
            duration,
            records_processed: input.len(),
        });
        stats.output_records = output.len();
        schema = op.output_schema(&schema);
        current = Some(output);
    }

    stats.duration = start.elapsed();
    tracing::info!("{}", stats.summary());

    Ok(PipelineOutput {
        records: current.unwrap_or_else(|| records.to_vec()),
        schema,
        stats,
    })
}

/// A finalized, immutable operation chain.
///
/// Cloning is cheap and clones share the same operations, so one pipeline can drive
/// runs on several threads at once.
#[derive(Debug, Clone)]
pub struct Pipeline {
    operations: Arc<[Operation]>,
}

impl Pipeline {
    pub fn new(operations: impl IntoIterator<Item = Operation>) -> Self {
        Self {
            operations: operations.into_iter().collect(),
        }
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Every configuration problem in the chain.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        validate_chain(&self.operations)
    }

    pub fn run(
        &self,
        records: &[Record],
        schema: &Schema,
        ctx: &ExecutionContext,
    ) -> Result<PipelineOutput> {
        run_pipeline(&self.operations, records, schema, ctx)
    }
}

impl From<Vec<Operation>> for Pipeline {
    fn from(operations: Vec<Operation>) -> Self {
        Self {
            operations: operations.into(),
        }
    }
}
