//! Pipeline specification data structures.
//!
//! A [`PipelineSpec`] is the JSON form of an operation chain. Callbacks cannot be
//! serialized, so the spec covers a fixed vocabulary of predicates and column
//! expressions which [`PipelineSpec::build`] turns into [`Operation`]s.

use super::aggregate::Aggregate;
use super::executor::Pipeline;
use super::operation::Operation;
use super::ops::{FilterOp, SortDirection, SortKey};
use super::validation::{ValidationIssue, validate_chain};
use crate::record::{Record, Value};
use anyhow::{Context as _, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::Path;

/// Current pipeline spec version
pub const SPEC_VERSION: &str = "0.1";

/// Root pipeline specification structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSpec {
    /// Specification version for future migrations
    pub version: String,

    /// Human-readable pipeline name
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Ordered sequence of transformation steps
    pub steps: Vec<Step>,
}

impl PipelineSpec {
    /// Create an empty spec at the current version
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: SPEC_VERSION.to_owned(),
            name: name.into(),
            description: None,
            steps: Vec::new(),
        }
    }

    /// Load a pipeline spec from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read pipeline spec file")?;
        Self::from_json(&content)
    }

    /// Parse a pipeline spec from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse pipeline spec JSON")
    }

    /// Save pipeline spec to a JSON file
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path.as_ref(), json).context("Failed to write pipeline spec file")
    }

    /// Serialize pipeline spec to JSON string
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize pipeline spec")
    }

    /// Turn the steps into operations.
    ///
    /// Operations are not validated here; that happens when they run, or through
    /// [`validate`](Self::validate).
    pub fn build(&self) -> Result<Vec<Operation>> {
        self.check_version()?;
        self.steps
            .iter()
            .enumerate()
            .map(|(idx, step)| step.build().with_context(|| format!("Step {}", idx + 1)))
            .collect()
    }

    pub fn build_pipeline(&self) -> Result<Pipeline> {
        self.build().map(Pipeline::from)
    }

    /// Every problem with this spec: version, unbuildable steps and invalid operations.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        if let Err(e) = self.check_version() {
            issues.push(ValidationIssue::chain(e.to_string()));
        }

        let mut operations = Vec::new();
        let mut built_at = Vec::new();
        for (idx, step) in self.steps.iter().enumerate() {
            match step.build() {
                Ok(op) => {
                    operations.push(op);
                    built_at.push(idx);
                }
                Err(e) => issues.push(ValidationIssue::step(idx, format!("{e:#}"))),
            }
        }

        // Re-map chain positions back to step positions when some steps failed to build.
        for mut issue in validate_chain(&operations) {
            issue.step_index = issue.step_index.and_then(|i| built_at.get(i).copied());
            issues.push(issue);
        }
        issues.sort_by_key(|issue| issue.step_index.map_or(0, |i| i + 1));
        issues
    }

    fn check_version(&self) -> Result<()> {
        if self.version != SPEC_VERSION {
            bail!(
                "Unsupported spec version '{}', expected '{}'",
                self.version,
                SPEC_VERSION
            );
        }
        Ok(())
    }
}

/// Transformation step (tagged enum)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Keep records whose column compares true against a constant.
    /// Records lacking the column are dropped.
    Filter {
        column: String,
        cmp: Comparison,
        value: Value,
    },

    Sort { keys: Vec<SortKeySpec> },

    Limit { n: i64 },

    GroupBy {
        keys: Vec<String>,
        aggregates: Vec<AggregateSpec>,
    },

    /// Add or overwrite a column computed from each record
    AddColumn { name: String, expr: ColumnExpr },
}

impl Step {
    pub fn build(&self) -> Result<Operation> {
        let op: Operation = match self {
            Self::Filter { column, cmp, value } => {
                let (column, cmp, value) = (column.clone(), *cmp, value.clone());
                let description = format!("{column} {cmp} {value}");
                FilterOp::new(move |record| {
                    record
                        .get(&column)
                        .is_some_and(|found| cmp.holds(found, &value))
                })
                .with_description(description)
                .into()
            }
            Self::Sort { keys } => Operation::sort(keys.iter().map(SortKeySpec::to_key)),
            Self::Limit { n } => Operation::limit(*n),
            Self::GroupBy { keys, aggregates } => Operation::group_by(
                keys.iter().cloned(),
                aggregates
                    .iter()
                    .map(|spec| Ok((spec.output.clone(), spec.to_aggregate()?)))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Self::AddColumn { name, expr } => {
                let expr = expr.clone();
                Operation::add_column(name.clone(), move |record| expr.evaluate(record))
            }
        };
        Ok(op)
    }
}

/// Comparison operator for filter steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    /// Values of different sort classes are never ordered against each other, so only
    /// `ne` holds between them.
    pub fn holds(self, left: &Value, right: &Value) -> bool {
        let ordering = match (left.sort_kind(), right.sort_kind()) {
            (Some(a), Some(b)) if a == b => Some(left.compare(right)),
            _ if left == right => Some(Ordering::Equal),
            _ => None,
        };
        match (self, ordering) {
            (Self::Ne, None) => true,
            (_, None) => false,
            (Self::Eq, Some(o)) => o.is_eq(),
            (Self::Ne, Some(o)) => o.is_ne(),
            (Self::Lt, Some(o)) => o.is_lt(),
            (Self::Le, Some(o)) => o.is_le(),
            (Self::Gt, Some(o)) => o.is_gt(),
            (Self::Ge, Some(o)) => o.is_ge(),
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        };
        f.write_str(symbol)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKeySpec {
    pub column: String,

    #[serde(default)]
    pub descending: bool,
}

impl SortKeySpec {
    fn to_key(&self) -> SortKey {
        let direction = if self.descending {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        SortKey::new(self.column.clone(), direction)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateSpec {
    /// Output column name
    pub output: String,

    pub func: AggregateFunc,

    /// Source column; required by every function except `count`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AggregateSpec {
    fn to_aggregate(&self) -> Result<Aggregate> {
        if self.func == AggregateFunc::Count {
            return Ok(Aggregate::count());
        }
        let field = self
            .field
            .clone()
            .ok_or_else(|| anyhow!("Aggregate '{}' needs a field", self.output))?;
        Ok(match self.func {
            AggregateFunc::Sum => Aggregate::sum(field),
            AggregateFunc::Average => Aggregate::average(field),
            AggregateFunc::Max => Aggregate::max(field),
            AggregateFunc::Min => Aggregate::min(field),
            AggregateFunc::Count => Aggregate::count(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFunc {
    Sum,
    Average,
    Max,
    Min,
    Count,
}

/// Expression computing a new column value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnExpr {
    Literal { value: Value },
    Copy { column: String },
    Arithmetic {
        left: Operand,
        op: ArithOp,
        right: Operand,
    },
}

impl ColumnExpr {
    pub fn evaluate(&self, record: &Record) -> Result<Value> {
        match self {
            Self::Literal { value } => Ok(value.clone()),
            Self::Copy { column } => column_value(record, column).cloned(),
            Self::Arithmetic { left, op, right } => {
                op.apply(left.resolve(record)?, right.resolve(record)?)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    Column(String),
    Literal(Value),
}

impl Operand {
    fn resolve<'a>(&'a self, record: &'a Record) -> Result<&'a Value> {
        match self {
            Self::Column(column) => column_value(record, column),
            Self::Literal(value) => Ok(value),
        }
    }
}

fn column_value<'a>(record: &'a Record, column: &str) -> Result<&'a Value> {
    record
        .get(column)
        .ok_or_else(|| anyhow!("Record has no column '{column}'"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArithOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl ArithOp {
    /// Integer operands stay integers (overflow is an error); anything else is computed
    /// in floating point. Division always yields a float.
    fn apply(self, left: &Value, right: &Value) -> Result<Value> {
        if let (Value::Int(a), Value::Int(b), false) = (left, right, self == Self::Divide) {
            let result = match self {
                Self::Add => a.checked_add(*b),
                Self::Subtract => a.checked_sub(*b),
                Self::Multiply => a.checked_mul(*b),
                Self::Divide => None,
            };
            return result
                .map(Value::Int)
                .ok_or_else(|| anyhow!("Integer overflow in {a} {self} {b}"));
        }

        let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
            bail!(
                "Arithmetic needs numeric operands, found {} and {}",
                left.kind(),
                right.kind()
            );
        };
        match self {
            Self::Add => Ok(Value::Float(a + b)),
            Self::Subtract => Ok(Value::Float(a - b)),
            Self::Multiply => Ok(Value::Float(a * b)),
            Self::Divide if b == 0.0 => bail!("Division by zero"),
            Self::Divide => Ok(Value::Float(a / b)),
        }
    }
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
        };
        f.write_str(symbol)
    }
}
