use super::Transform;
use crate::error::OperationError;
use crate::pipeline::aggregate::Aggregate;
use crate::pipeline::context::ExecutionContext;
use crate::record::{Record, Schema, Value};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::collections::HashSet;
use std::collections::hash_map::Entry;

/// Partition records by a tuple of key columns and reduce each group.
///
/// Groups are emitted in the order their first record was seen. Each output record holds
/// the key columns followed by one column per aggregate.
#[derive(Debug, Clone)]
pub struct GroupByOp {
    keys: Vec<String>,
    aggregates: Vec<(String, Aggregate)>,
}

impl GroupByOp {
    pub fn new<K, S, A, N>(keys: K, aggregates: A) -> Self
    where
        K: IntoIterator<Item = S>,
        S: Into<String>,
        A: IntoIterator<Item = (N, Aggregate)>,
        N: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            aggregates: aggregates
                .into_iter()
                .map(|(name, aggregate)| (name.into(), aggregate))
                .collect(),
        }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn aggregates(&self) -> &[(String, Aggregate)] {
        &self.aggregates
    }
}

/// Hashable image of a key value. Floats hash by bit pattern with `-0.0` folded into
/// `0.0` and every NaN folded into one.
#[derive(Debug, PartialEq, Eq, Hash)]
enum KeyPart {
    Null,
    Bool(bool),
    Int(i64),
    Float(u64),
    String(String),
    Time(DateTime<Utc>),
    List(Vec<KeyPart>),
    Map(Vec<(String, KeyPart)>),
}

impl From<&Value> for KeyPart {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Int(i) => Self::Int(*i),
            Value::Float(f) => {
                let canonical = if *f == 0.0 {
                    0.0
                } else if f.is_nan() {
                    f64::NAN
                } else {
                    *f
                };
                Self::Float(canonical.to_bits())
            }
            Value::String(s) => Self::String(s.clone()),
            Value::Time(t) => Self::Time(*t),
            Value::List(items) => Self::List(items.iter().map(Self::from).collect()),
            Value::Map(entries) => Self::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::from(v)))
                    .collect(),
            ),
        }
    }
}

struct Group<'a> {
    key: Vec<Value>,
    members: Vec<&'a Record>,
}

impl Transform for GroupByOp {
    fn name(&self) -> &'static str {
        "group_by"
    }

    fn description(&self) -> String {
        let outputs: Vec<String> = self
            .aggregates
            .iter()
            .map(|(name, aggregate)| match aggregate.field() {
                Some(field) => format!("{name}={}({field})", aggregate.label()),
                None => format!("{name}={}()", aggregate.label()),
            })
            .collect();
        format!(
            "Group by {} computing {}",
            self.keys.join(", "),
            outputs.join(", ")
        )
    }

    fn validate(&self) -> Result<(), OperationError> {
        if self.keys.is_empty() {
            return Err(OperationError::configuration(
                "group_by requires at least one group key",
            ));
        }
        if self.aggregates.is_empty() {
            return Err(OperationError::configuration(
                "group_by requires at least one aggregate",
            ));
        }

        let mut columns = HashSet::new();
        for key in &self.keys {
            if key.is_empty() {
                return Err(OperationError::configuration("group key name is empty"));
            }
            if !columns.insert(key.as_str()) {
                return Err(OperationError::configuration(format!(
                    "group key '{key}' is listed more than once"
                )));
            }
        }
        for (name, _) in &self.aggregates {
            if name.is_empty() {
                return Err(OperationError::configuration(
                    "aggregate output name is empty",
                ));
            }
            if !columns.insert(name.as_str()) {
                return Err(OperationError::configuration(format!(
                    "aggregate output '{name}' collides with another output column"
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
        let mut slots: HashMap<Vec<KeyPart>, usize> = HashMap::new();
        let mut groups: Vec<Group<'_>> = Vec::new();

        for (idx, record) in records.iter().enumerate() {
            ctx.check_every(idx)?;

            let values = self
                .keys
                .iter()
                .map(|column| {
                    record
                        .get(column)
                        .ok_or_else(|| OperationError::MissingColumn {
                            column: column.clone(),
                            record_index: Some(idx),
                        })
                })
                .collect::<Result<Vec<&Value>, _>>()?;

            let parts: Vec<KeyPart> = values.iter().map(|v| KeyPart::from(*v)).collect();
            match slots.entry(parts) {
                Entry::Occupied(slot) => groups[*slot.get()].members.push(record),
                Entry::Vacant(slot) => {
                    slot.insert(groups.len());
                    groups.push(Group {
                        key: values.into_iter().cloned().collect(),
                        members: vec![record],
                    });
                }
            }
        }

        debug_assert_eq!(
            groups.iter().map(|g| g.members.len()).sum::<usize>(),
            records.len(),
            "grouping must neither drop nor duplicate records"
        );

        let mut output = Vec::with_capacity(groups.len());
        for (idx, group) in groups.into_iter().enumerate() {
            ctx.check_every(idx)?;

            let mut record: Record = self.keys.iter().cloned().zip(group.key).collect();
            for (name, aggregate) in &self.aggregates {
                record.insert(name.clone(), aggregate.evaluate(&group.members)?);
            }
            output.push(record);
        }

        tracing::trace!(groups = output.len(), records = records.len(), "grouped records");
        Ok(output)
    }

    fn output_schema(&self, _input: &Schema) -> Schema {
        Schema::new(
            self.keys
                .iter()
                .chain(self.aggregates.iter().map(|(name, _)| name)),
        )
    }
}
