//! Record model shared by every pipeline operation.
//!
//! A [`Record`] maps column names to dynamically-typed [`Value`]s. Column order is not a
//! property of a record; the owning table carries it separately as a [`Schema`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// A single dynamically-typed cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Serialized as an RFC 3339 string.
    Time(DateTime<Utc>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

/// Discriminant of a [`Value`], used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Float,
    String,
    Time,
    List,
    Map,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::Time => "time",
            Self::List => "list",
            Self::Map => "map",
        };
        f.write_str(name)
    }
}

/// Comparison class of a sortable value.
///
/// `Int` and `Float` share the [`SortKind::Numeric`] class and compare with each other.
/// `Null`, lists and maps have no sort kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKind {
    Numeric,
    Text,
    Bool,
    Time,
}

impl fmt::Display for SortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Numeric => "numeric",
            Self::Text => "text",
            Self::Bool => "bool",
            Self::Time => "time",
        };
        f.write_str(name)
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Float(_) => ValueKind::Float,
            Self::String(_) => ValueKind::String,
            Self::Time(_) => ValueKind::Time,
            Self::List(_) => ValueKind::List,
            Self::Map(_) => ValueKind::Map,
        }
    }

    /// Returns the comparison class of this value, or `None` if it cannot be ordered.
    pub fn sort_kind(&self) -> Option<SortKind> {
        match self {
            Self::Int(_) | Self::Float(_) => Some(SortKind::Numeric),
            Self::String(_) => Some(SortKind::Text),
            Self::Bool(_) => Some(SortKind::Bool),
            Self::Time(_) => Some(SortKind::Time),
            Self::Null | Self::List(_) | Self::Map(_) => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    /// Numeric view of the value. Integers are widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Time(t) => Some(*t),
            _ => None,
        }
    }

    /// Orders two values that share a [`SortKind`].
    ///
    /// Values of different classes compare as equal; callers are expected to check kinds
    /// up front. Floats use a total order, so `NaN` sorts after every number.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Int(a), Self::Float(b)) => compare_int_float(*a, *b),
            (Self::Float(a), Self::Int(b)) => compare_int_float(*b, *a).reverse(),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Time(a), Self::Time(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

/// Exact ordering of an integer against a float, consistent with `f64::total_cmp`.
///
/// `-0.0` sits just below `Int(0)` and `0.0` equals it. NaNs sort by sign past the
/// infinities.
fn compare_int_float(int: i64, float: f64) -> Ordering {
    // 2^63, the first float above i64::MAX
    const UPPER: f64 = 9_223_372_036_854_775_808.0;

    if float.is_nan() {
        return if float.is_sign_negative() {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if float >= UPPER {
        return Ordering::Less;
    }
    if float < -UPPER {
        return Ordering::Greater;
    }

    let whole = float.trunc();
    let truncated = whole as i64;
    match int.cmp(&truncated) {
        Ordering::Equal if float > whole => Ordering::Less,
        Ordering::Equal if float < whole => Ordering::Greater,
        Ordering::Equal if float == 0.0 && float.is_sign_negative() => Ordering::Greater,
        ordering => ordering,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => f.write_str(s),
            Self::Time(t) => f.write_str(&t.to_rfc3339()),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Map(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

// Strings are never promoted to timestamps on input; `Time` only comes from Rust callers.
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(entries) => Self::Map(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect(),
            ),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        serde_json::Value::deserialize(deserializer).map(Self::from)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Self::Time(t)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// One row: a mapping from column name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }

    /// Sets a column, returning the previous value if the column already existed.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(column.into(), value.into())
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.fields.remove(column)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Record
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

/// Ordered list of unique column names owned by a table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Schema {
    columns: Vec<String>,
}

impl From<Vec<String>> for Schema {
    fn from(columns: Vec<String>) -> Self {
        Self::new(columns)
    }
}

impl From<Schema> for Vec<String> {
    fn from(schema: Schema) -> Self {
        schema.columns
    }
}

impl Schema {
    /// Builds a schema, dropping repeated names after their first occurrence.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut schema = Self::default();
        for column in columns {
            schema.push(column);
        }
        schema
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Appends a column after the existing ones unless it is already declared.
    pub fn push(&mut self, column: impl Into<String>) {
        let column = column.into();
        if !self.contains(&column) {
            self.columns.push(column);
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.push(column);
        self
    }
}
