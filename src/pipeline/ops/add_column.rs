use super::{Transform, guarded};
use crate::error::OperationError;
use crate::pipeline::context::ExecutionContext;
use crate::record::{Record, Schema, Value};
use std::fmt;
use std::sync::Arc;

type ComputeFn = dyn Fn(&Record) -> anyhow::Result<Value> + Send + Sync;

/// Attach a derived column to every record.
///
/// An existing column of the same name is overwritten in place. A failing or panicking
/// compute function aborts the stage and names the offending record.
#[derive(Clone)]
pub struct AddColumnOp {
    name: String,
    compute: Arc<ComputeFn>,
}

impl AddColumnOp {
    pub fn new<F>(name: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&Record) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            compute: Arc::new(compute),
        }
    }

    pub fn column(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for AddColumnOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddColumnOp")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Transform for AddColumnOp {
    fn name(&self) -> &'static str {
        "add_column"
    }

    fn description(&self) -> String {
        format!("Add computed column '{}'", self.name)
    }

    fn validate(&self) -> Result<(), OperationError> {
        if self.name.is_empty() {
            return Err(OperationError::configuration(
                "add_column requires a non-empty column name",
            ));
        }
        Ok(())
    }

    fn apply(
        &self,
        ctx: &ExecutionContext,
        records: &[Record],
    ) -> Result<Vec<Record>, OperationError> {
        let mut output = Vec::with_capacity(records.len());
        for (idx, record) in records.iter().enumerate() {
            ctx.check_every(idx)?;
            let value = guarded(Some(idx), || (self.compute)(record))?.map_err(|source| {
                OperationError::CallbackFailed {
                    record_index: Some(idx),
                    source,
                }
            })?;

            let mut derived = record.clone();
            derived.insert(self.name.clone(), value);
            output.push(derived);
        }
        Ok(output)
    }

    fn output_schema(&self, input: &Schema) -> Schema {
        input.clone().with_column(self.name.clone())
    }
}
