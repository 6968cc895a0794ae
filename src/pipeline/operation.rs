//! The closed set of operations a pipeline can chain.

use super::aggregate::Aggregate;
use super::context::ExecutionContext;
use super::ops::{AddColumnOp, FilterOp, GroupByOp, LimitOp, SortKey, SortOp, Transform};
use crate::error::OperationError;
use crate::record::{Record, Schema, Value};

/// One stage of a pipeline.
///
/// Every variant is immutable once built and can be shared between threads; applying it
/// never touches the input sequence.
#[derive(Debug, Clone)]
pub enum Operation {
    Filter(FilterOp),
    Sort(SortOp),
    Limit(LimitOp),
    GroupBy(GroupByOp),
    AddColumn(AddColumnOp),
}

impl Operation {
    pub fn filter<F>(predicate: F) -> Self
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        Self::Filter(FilterOp::new(predicate))
    }

    pub fn sort(keys: impl IntoIterator<Item = SortKey>) -> Self {
        Self::Sort(SortOp::new(keys))
    }

    pub fn limit(n: i64) -> Self {
        Self::Limit(LimitOp::new(n))
    }

    pub fn group_by<K, S, A, N>(keys: K, aggregates: A) -> Self
    where
        K: IntoIterator<Item = S>,
        S: Into<String>,
        A: IntoIterator<Item = (N, Aggregate)>,
        N: Into<String>,
    {
        Self::GroupBy(GroupByOp::new(keys, aggregates))
    }

    pub fn add_column<F>(name: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&Record) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self::AddColumn(AddColumnOp::new(name, compute))
    }

    fn as_transform(&self) -> &dyn Transform {
        match self {
            Self::Filter(op) => op,
            Self::Sort(op) => op,
            Self::Limit(op) => op,
            Self::GroupBy(op) => op,
            Self::AddColumn(op) => op,
        }
    }

    pub fn name(&self) -> &'static str {
        self.as_transform().name()
    }

    pub fn description(&self) -> String {
        self.as_transform().description()
    }

    pub fn validate(&self) -> Result<(), OperationError> {
        self.as_transform().validate()
    }

    pub fn apply(
        &self,
        ctx: &ExecutionContext,
        records: &[Record],
    ) -> Result<Vec<Record>, OperationError> {
        self.as_transform().apply(ctx, records)
    }

    pub fn output_schema(&self, input: &Schema) -> Schema {
        self.as_transform().output_schema(input)
    }

    /// Filter stages are the only ones counted toward `filtered_count`.
    pub fn is_filter(&self) -> bool {
        matches!(self, Self::Filter(_))
    }
}

impl From<FilterOp> for Operation {
    fn from(op: FilterOp) -> Self {
        Self::Filter(op)
    }
}

impl From<SortOp> for Operation {
    fn from(op: SortOp) -> Self {
        Self::Sort(op)
    }
}

impl From<LimitOp> for Operation {
    fn from(op: LimitOp) -> Self {
        Self::Limit(op)
    }
}

impl From<GroupByOp> for Operation {
    fn from(op: GroupByOp) -> Self {
        Self::GroupBy(op)
    }
}

impl From<AddColumnOp> for Operation {
    fn from(op: AddColumnOp) -> Self {
        Self::AddColumn(op)
    }
}
