use super::Transform;
use crate::error::OperationError;
use crate::pipeline::context::ExecutionContext;
use crate::record::Record;

/// Keep the first `n` records of the upstream sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitOp {
    n: i64,
}

impl LimitOp {
    /// Negative limits are accepted here and rejected by `validate()`.
    pub fn new(n: i64) -> Self {
        Self { n }
    }

    pub fn n(&self) -> i64 {
        self.n
    }
}

impl Transform for LimitOp {
    fn name(&self) -> &'static str {
        "limit"
    }

    fn description(&self) -> String {
        format!("Limit to the first {} records", self.n)
    }

    fn validate(&self) -> Result<(), OperationError> {
        if self.n < 0 {
            return Err(OperationError::configuration(format!(
                "limit must be non-negative, got {}",
                self.n
            )));
        }
        Ok(())
    }

    fn apply(
        &self,
        _ctx: &ExecutionContext,
        records: &[Record],
    ) -> Result<Vec<Record>, OperationError> {
        let n = usize::try_from(self.n).map_err(|_| {
            OperationError::configuration(format!("limit must be non-negative, got {}", self.n))
        })?;
        Ok(records.iter().take(n).cloned().collect())
    }
}
