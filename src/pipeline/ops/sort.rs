use super::Transform;
use crate::error::OperationError;
use crate::pipeline::context::ExecutionContext;
use crate::record::{Record, SortKind, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// One level of a multi-key sort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub direction: SortDirection,

    /// Expected value class. When unset it is taken from the first record.
    pub kind: Option<SortKind>,
}

impl SortKey {
    pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            column: column.into(),
            direction,
            kind: None,
        }
    }

    pub fn asc(column: impl Into<String>) -> Self {
        Self::new(column, SortDirection::Ascending)
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self::new(column, SortDirection::Descending)
    }

    /// Declare the expected value class instead of inferring it.
    pub fn with_kind(mut self, kind: SortKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// Stable multi-key sort.
///
/// Every record must carry every key column, and all values of a key must share one
/// [`SortKind`]; anything else fails the stage instead of being coerced.
#[derive(Debug, Clone)]
pub struct SortOp {
    keys: Vec<SortKey>,
}

impl SortOp {
    pub fn new(keys: impl IntoIterator<Item = SortKey>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    /// Resolve the expected kind of every key, falling back to the first record.
    fn expected_kinds(&self, first: &Record) -> Result<Vec<SortKind>, OperationError> {
        self.keys
            .iter()
            .map(|key| match key.kind {
                Some(kind) => Ok(kind),
                None => {
                    let value = key_value(first, 0, &key.column)?;
                    value.sort_kind().ok_or_else(|| OperationError::Unsortable {
                        column: key.column.clone(),
                        record_index: 0,
                        found: value.kind(),
                    })
                }
            })
            .collect()
    }

    fn compare(&self, a: &Record, b: &Record) -> Ordering {
        for key in &self.keys {
            let (Some(x), Some(y)) = (a.get(&key.column), b.get(&key.column)) else {
                continue;
            };
            let ordering = match key.direction {
                SortDirection::Ascending => x.compare(y),
                SortDirection::Descending => y.compare(x),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

fn key_value<'a>(
    record: &'a Record,
    idx: usize,
    column: &str,
) -> Result<&'a Value, OperationError> {
    record
        .get(column)
        .ok_or_else(|| OperationError::MissingColumn {
            column: column.to_owned(),
            record_index: Some(idx),
        })
}

impl Transform for SortOp {
    fn name(&self) -> &'static str {
        "sort"
    }

    fn description(&self) -> String {
        let keys: Vec<String> = self
            .keys
            .iter()
            .map(|key| {
                let dir = match key.direction {
                    SortDirection::Ascending => "asc",
                    SortDirection::Descending => "desc",
                };
                format!("{} {dir}", key.column)
            })
            .collect();
        format!("Sort by {}", keys.join(", "))
    }

    fn validate(&self) -> Result<(), OperationError> {
        if self.keys.is_empty() {
            return Err(OperationError::configuration(
                "sort requires at least one key",
            ));
        }

        let mut seen = HashSet::new();
        for key in &self.keys {
            if key.column.is_empty() {
                return Err(OperationError::configuration(
                    "sort key column name is empty",
                ));
            }
            if !seen.insert(key.column.as_str()) {
                return Err(OperationError::configuration(format!(
                    "sort key '{}' is listed more than once",
                    key.column
                )));
            }
        }
        Ok(())
    }

    fn apply(
        &self,
        ctx: &ExecutionContext,
        records: &[Record],
    ) -> Result<Vec<Record>, OperationError> {
        let Some(first) = records.first() else {
            return Ok(Vec::new());
        };
        let expected = self.expected_kinds(first)?;

        // Check every key value up front so the comparator itself cannot fail.
        for (idx, record) in records.iter().enumerate() {
            ctx.check_every(idx)?;
            for (key, &kind) in self.keys.iter().zip(&expected) {
                let value = key_value(record, idx, &key.column)?;
                match value.sort_kind() {
                    None => {
                        return Err(OperationError::Unsortable {
                            column: key.column.clone(),
                            record_index: idx,
                            found: value.kind(),
                        });
                    }
                    Some(found) if found != kind => {
                        return Err(OperationError::TypeMismatch {
                            column: key.column.clone(),
                            record_index: idx,
                            expected: kind,
                            found: value.kind(),
                        });
                    }
                    Some(_) => {}
                }
            }
        }

        let mut order: Vec<usize> = (0..records.len()).collect();
        order.sort_by(|&a, &b| self.compare(&records[a], &records[b]));
        ctx.check()?;

        Ok(order.into_iter().map(|idx| records[idx].clone()).collect())
    }
}
