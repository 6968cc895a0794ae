//! Aggregate reducers used by [`GroupByOp`](super::ops::GroupByOp).
//!
//! An aggregate collapses the records of one group into a single value. Built-ins cover
//! sum, average, max, min and count; anything else can be supplied with
//! [`Aggregate::custom`].

use super::ops::guarded;
use crate::error::OperationError;
use crate::record::{Record, Value};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

type AggregateFn = dyn Fn(&[&Record], Option<&str>) -> Result<Value, OperationError> + Send + Sync;

/// A named reducer bound to an optional source field.
#[derive(Clone)]
pub struct Aggregate {
    label: String,
    field: Option<String>,
    func: Arc<AggregateFn>,
}

impl fmt::Debug for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aggregate")
            .field("label", &self.label)
            .field("field", &self.field)
            .finish_non_exhaustive()
    }
}

impl Aggregate {
    /// Sum of a numeric field. All-integer input sums to an integer.
    pub fn sum(field: impl Into<String>) -> Self {
        Self::builtin("sum", field.into(), sum)
    }

    /// Arithmetic mean of a numeric field, always a float.
    pub fn average(field: impl Into<String>) -> Self {
        Self::builtin("average", field.into(), average)
    }

    pub fn max(field: impl Into<String>) -> Self {
        Self::builtin("max", field.into(), |records, field| {
            extreme(records, field, "max", Ordering::Greater)
        })
    }

    pub fn min(field: impl Into<String>) -> Self {
        Self::builtin("min", field.into(), |records, field| {
            extreme(records, field, "min", Ordering::Less)
        })
    }

    /// Number of records in the group. Never fails.
    pub fn count() -> Self {
        Self {
            label: "count".to_owned(),
            field: None,
            func: Arc::new(|records: &[&Record], _: Option<&str>| {
                Ok(Value::Int(count(records)))
            }),
        }
    }

    /// A caller-supplied reducer. Errors and panics raised by `f` surface as
    /// callback execution errors.
    pub fn custom<F>(label: impl Into<String>, field: Option<String>, f: F) -> Self
    where
        F: Fn(&[&Record], Option<&str>) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            field,
            func: Arc::new(move |records: &[&Record], field: Option<&str>| {
                f(records, field).map_err(|source| OperationError::CallbackFailed {
                    record_index: None,
                    source,
                })
            }),
        }
    }

    fn builtin(
        label: &str,
        field: String,
        f: fn(&[&Record], &str) -> Result<Value, OperationError>,
    ) -> Self {
        Self {
            label: label.to_owned(),
            field: Some(field),
            func: Arc::new(move |records: &[&Record], field: Option<&str>| match field {
                Some(field) => f(records, field),
                None => Err(OperationError::configuration(
                    "numeric aggregate requires a source field",
                )),
            }),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Reduce one group. A panicking reducer is reported, never propagated.
    pub fn evaluate(&self, records: &[&Record]) -> Result<Value, OperationError> {
        guarded(None, || (self.func)(records, self.field.as_deref()))?
    }
}

fn count(records: &[&Record]) -> i64 {
    i64::try_from(records.len()).unwrap_or(i64::MAX)
}

/// Fetch `field` from every record, rejecting anything that is not a number.
fn numeric_values<'a>(
    records: &[&'a Record],
    field: &str,
    aggregate: &str,
) -> Result<Vec<&'a Value>, OperationError> {
    records
        .iter()
        .map(|record| match record.get(field) {
            Some(value) if value.is_numeric() => Ok(value),
            Some(value) => Err(OperationError::NonNumeric {
                column: field.to_owned(),
                aggregate: aggregate.to_owned(),
                found: value.kind(),
            }),
            None => Err(OperationError::MissingColumn {
                column: field.to_owned(),
                record_index: None,
            }),
        })
        .collect()
}

fn sum(records: &[&Record], field: &str) -> Result<Value, OperationError> {
    let values = numeric_values(records, field, "sum")?;

    if values.iter().all(|v| matches!(v, Value::Int(_))) {
        let mut total: i64 = 0;
        for value in values.iter().filter_map(|v| v.as_i64()) {
            total = total
                .checked_add(value)
                .ok_or_else(|| OperationError::Overflow {
                    column: field.to_owned(),
                    aggregate: "sum".to_owned(),
                })?;
        }
        return Ok(Value::Int(total));
    }

    Ok(Value::Float(values.iter().filter_map(|v| v.as_f64()).sum()))
}

fn average(records: &[&Record], field: &str) -> Result<Value, OperationError> {
    let values = numeric_values(records, field, "average")?;
    if values.is_empty() {
        return Ok(Value::Null);
    }
    let total: f64 = values.iter().filter_map(|v| v.as_f64()).sum();
    Ok(Value::Float(total / values.len() as f64))
}

/// First value that is strictly more `wanted` than every value before it.
fn extreme(
    records: &[&Record],
    field: &str,
    aggregate: &str,
    wanted: Ordering,
) -> Result<Value, OperationError> {
    let values = numeric_values(records, field, aggregate)?;
    let best = values
        .into_iter()
        .reduce(|best, v| if v.compare(best) == wanted { v } else { best });
    Ok(best.cloned().unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(values: Vec<Value>) -> Vec<Record> {
        values
            .into_iter()
            .map(|v| Record::from([("amount", v)]))
            .collect()
    }

    fn eval(aggregate: &Aggregate, records: &[Record]) -> Result<Value, OperationError> {
        let refs: Vec<&Record> = records.iter().collect();
        aggregate.evaluate(&refs)
    }

    #[test]
    fn test_integer_sum_stays_integer() {
        let records = rows(vec![10.into(), 20.into()]);
        assert_eq!(eval(&Aggregate::sum("amount"), &records).unwrap(), Value::Int(30));
    }

    #[test]
    fn test_mixed_sum_is_float() {
        let records = rows(vec![10.into(), 2.5.into()]);
        assert_eq!(
            eval(&Aggregate::sum("amount"), &records).unwrap(),
            Value::Float(12.5)
        );
    }

    #[test]
    fn test_sum_overflow() {
        let records = rows(vec![i64::MAX.into(), 1.into()]);
        let err = eval(&Aggregate::sum("amount"), &records).unwrap_err();
        assert!(matches!(err, OperationError::Overflow { .. }));
    }

    #[test]
    fn test_average() {
        let records = rows(vec![1.into(), 2.into()]);
        assert_eq!(
            eval(&Aggregate::average("amount"), &records).unwrap(),
            Value::Float(1.5)
        );
    }

    #[test]
    fn test_max_min_keep_original_type() {
        let records = rows(vec![3.into(), 7.5.into(), (-2).into()]);
        assert_eq!(eval(&Aggregate::max("amount"), &records).unwrap(), Value::Float(7.5));
        assert_eq!(eval(&Aggregate::min("amount"), &records).unwrap(), Value::Int(-2));
    }

    #[test]
    fn test_non_numeric_input_fails() {
        let records = rows(vec![1.into(), "two".into()]);
        for aggregate in [
            Aggregate::sum("amount"),
            Aggregate::average("amount"),
            Aggregate::max("amount"),
            Aggregate::min("amount"),
        ] {
            let err = eval(&aggregate, &records).unwrap_err();
            assert!(
                matches!(err, OperationError::NonNumeric { .. }),
                "{} should reject strings",
                aggregate.label()
            );
        }
    }

    #[test]
    fn test_count_ignores_values() {
        let records = rows(vec!["x".into(), Value::Null, 3.into()]);
        assert_eq!(eval(&Aggregate::count(), &records).unwrap(), Value::Int(3));
    }

    #[test]
    fn test_custom_aggregate_error_is_callback_failure() {
        let aggregate = Aggregate::custom("always_fails", None, |_, _| {
            Err(anyhow::anyhow!("not today"))
        });
        let err = eval(&aggregate, &rows(vec![1.into()])).unwrap_err();
        assert!(matches!(err, OperationError::CallbackFailed { .. }));
    }

    #[test]
    fn test_custom_aggregate_panic_is_caught() {
        let aggregate = Aggregate::custom("explodes", Some("amount".to_owned()), |_, _| {
            panic!("reducer bug")
        });
        let err = eval(&aggregate, &rows(vec![1.into()])).unwrap_err();
        match err {
            OperationError::CallbackPanicked { message, .. } => {
                assert!(message.contains("reducer bug"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_custom_aggregate_sees_field() {
        let aggregate = Aggregate::custom("distinct", Some("amount".to_owned()), |records, field| {
            let field = field.unwrap_or_default();
            let mut seen: Vec<&Value> = Vec::new();
            for record in records {
                if let Some(v) = record.get(field)
                    && !seen.contains(&v)
                {
                    seen.push(v);
                }
            }
            Ok(Value::Int(i64::try_from(seen.len())?))
        });
        let records = rows(vec![1.into(), 1.into(), 2.into()]);
        assert_eq!(eval(&aggregate, &records).unwrap(), Value::Int(2));
    }
}
