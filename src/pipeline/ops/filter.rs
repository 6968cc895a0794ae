use super::{Transform, guarded};
use crate::error::OperationError;
use crate::pipeline::context::ExecutionContext;
use crate::record::Record;
use std::fmt;
use std::sync::Arc;

type Predicate = dyn Fn(&Record) -> bool + Send + Sync;

/// Keep records for which a predicate holds, preserving their order.
#[derive(Clone)]
pub struct FilterOp {
    predicate: Arc<Predicate>,
    description: Option<String>,
}

impl FilterOp {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
            description: None,
        }
    }

    /// Attach a human-readable form of the predicate, used in logs and reports.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl fmt::Debug for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterOp")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl Transform for FilterOp {
    fn name(&self) -> &'static str {
        "filter"
    }

    fn description(&self) -> String {
        match &self.description {
            Some(desc) => format!("Filter records where {desc}"),
            None => "Filter records with a custom predicate".to_owned(),
        }
    }

    // The predicate is opaque, so there is nothing to check.
    fn validate(&self) -> Result<(), OperationError> {
        Ok(())
    }

    fn apply(
        &self,
        ctx: &ExecutionContext,
        records: &[Record],
    ) -> Result<Vec<Record>, OperationError> {
        let mut kept = Vec::new();
        for (idx, record) in records.iter().enumerate() {
            ctx.check_every(idx)?;
            if guarded(Some(idx), || (self.predicate)(record))? {
                kept.push(record.clone());
            }
        }
        Ok(kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Value;

    fn people() -> Vec<Record> {
        [("Alice", 30), ("Bob", 17), ("Charlie", 25)]
            .into_iter()
            .map(|(name, age)| Record::from([("name", Value::from(name)), ("age", Value::from(age))]))
            .collect()
    }

    fn adults() -> FilterOp {
        FilterOp::new(|r| r.get("age").and_then(Value::as_i64).is_some_and(|age| age >= 18))
    }

    #[test]
    fn test_keeps_matching_records_in_order() {
        let input = people();
        let output = adults().apply(&ExecutionContext::new(), &input).unwrap();
        let names: Vec<_> = output
            .iter()
            .filter_map(|r| r.get("name").and_then(Value::as_str))
            .collect();
        assert_eq!(names, ["Alice", "Charlie"]);
        assert_eq!(input.len(), 3, "input must be left untouched");
    }

    #[test]
    fn test_panicking_predicate_names_record() {
        let op = FilterOp::new(|r| {
            assert!(r.get("name") != Some(&Value::from("Bob")), "bad row");
            true
        });
        let err = op.apply(&ExecutionContext::new(), &people()).unwrap_err();
        assert!(matches!(
            err,
            OperationError::CallbackPanicked {
                record_index: Some(1),
                ..
            }
        ));
    }

    #[test]
    fn test_description() {
        assert_eq!(
            adults().with_description("age >= 18").description(),
            "Filter records where age >= 18"
        );
        assert!(adults().validate().is_ok());
    }
}
