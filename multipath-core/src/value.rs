//! Scalar values, value ranges and expanded value sequences

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::DataType;

/// A single cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Missing value
    Null,

    /// Boolean value
    Bool(bool),

    /// 64-bit signed integer
    Int(i64),

    /// 64-bit floating point
    Float(f64),

    /// UTF-8 string
    Str(String),
}

impl Value {
    /// Convert a JSON scalar into a value. Arrays and objects are not scalars.
    pub fn from_json(json: &serde_json::Value) -> Option<Self> {
        match json {
            serde_json::Value::Null => Some(Value::Null),
            serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Value::Int(i)),
                None => n.as_f64().map(Value::Float),
            },
            serde_json::Value::String(s) => Some(Value::Str(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }

    /// Whether this value counts as missing (null or NaN)
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Numeric view of this value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// The narrowest data type describing this value
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Null => DataType::Null,
            Value::Bool(_) => DataType::Boolean,
            Value::Int(_) => DataType::Int64,
            Value::Float(_) => DataType::Float64,
            Value::Str(_) => DataType::String,
        }
    }

    /// Compare two non-missing values.
    ///
    /// Integers and floats compare numerically with each other. Strings and
    /// booleans only compare with their own kind.
    pub fn try_cmp(&self, other: &Value) -> Result<Ordering> {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Ok(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y).ok_or_else(|| {
                    Error::TypeMismatch(format!("cannot order {a} and {b}"))
                }),
                _ => Err(Error::TypeMismatch(format!(
                    "cannot order {} value against {} value",
                    a.data_type(),
                    b.data_type()
                ))),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "'{s}'"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

/// Inclusive lower and upper bound of a dimension's values
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Range {
    /// Smallest value, `None` when unknown
    pub min: Option<Value>,

    /// Largest value, `None` when unknown
    pub max: Option<Value>,
}

impl Range {
    /// Create a range from two bounds
    pub fn new(min: impl Into<Value>, max: impl Into<Value>) -> Self {
        Self {
            min: Some(min.into()),
            max: Some(max.into()),
        }
    }

    /// The `(None, None)` range
    pub fn empty() -> Self {
        Self::default()
    }

    /// A range collapsed onto one value
    pub fn point(value: Value) -> Self {
        Self {
            min: Some(value.clone()),
            max: Some(value),
        }
    }

    /// Whether both bounds are unknown
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// Compute the range spanned by a sequence of values, skipping missing ones
    pub fn of_values<'a, I>(values: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let mut range = Range::empty();
        for value in values.into_iter().filter(|v| !v.is_missing()) {
            range.min = Some(pick(range.min.take(), value, Ordering::Less)?);
            range.max = Some(pick(range.max.take(), value, Ordering::Greater)?);
        }
        Ok(range)
    }
}

fn pick(current: Option<Value>, candidate: &Value, wanted: Ordering) -> Result<Value> {
    match current {
        None => Ok(candidate.clone()),
        Some(current) => {
            if candidate.try_cmp(&current)? == wanted {
                Ok(candidate.clone())
            } else {
                Ok(current)
            }
        }
    }
}

/// Merge ranges into the maximum spanning range.
///
/// The lower bound is the minimum of all lower bounds and the upper bound the
/// maximum of all upper bounds. Unknown and NaN bounds are skipped; a bound of
/// the result is `None` only when every input bound on that side is unknown.
pub fn max_range<I>(ranges: I) -> Result<Range>
where
    I: IntoIterator<Item = Range>,
{
    let mut merged = Range::empty();
    for range in ranges {
        if let Some(min) = range.min.filter(|v| !v.is_missing()) {
            merged.min = Some(pick(merged.min.take(), &min, Ordering::Less)?);
        }
        if let Some(max) = range.max.filter(|v| !v.is_missing()) {
            merged.max = Some(pick(merged.max.take(), &max, Ordering::Greater)?);
        }
    }
    Ok(merged)
}

/// One element of an expanded value sequence
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// A value from a path
    Value(Value),

    /// Boundary between two consecutive paths
    Break,
}

impl Entry {
    /// Whether this entry separates two paths
    pub fn is_break(&self) -> bool {
        matches!(self, Entry::Break)
    }
}

/// Values of one dimension across all paths of a composite
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    /// All paths joined into one sequence with a break between paths
    Expanded(Vec<Entry>),

    /// One value array per path, in path order
    PerPath(Vec<Vec<Value>>),
}

impl Values {
    /// Join per-path value arrays with one break between consecutive paths
    pub fn join<I>(paths: I) -> Self
    where
        I: IntoIterator<Item = Vec<Value>>,
    {
        let mut entries = Vec::new();
        for (i, values) in paths.into_iter().enumerate() {
            if i > 0 {
                entries.push(Entry::Break);
            }
            entries.extend(values.into_iter().map(Entry::Value));
        }
        Values::Expanded(entries)
    }

    /// Total number of entries, breaks included
    pub fn len(&self) -> usize {
        match self {
            Values::Expanded(entries) => entries.len(),
            Values::PerPath(paths) => paths.iter().map(Vec::len).sum(),
        }
    }

    /// Whether no values are present
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of breaks in an expanded sequence
    pub fn break_count(&self) -> usize {
        match self {
            Values::Expanded(entries) => entries.iter().filter(|e| e.is_break()).count(),
            Values::PerPath(_) => 0,
        }
    }

    /// Numeric rendering where breaks and non-numeric values become NaN
    pub fn to_f64_nan(&self) -> Vec<f64> {
        let numeric = |v: &Value| v.as_f64().unwrap_or(f64::NAN);
        match self {
            Values::Expanded(entries) => entries
                .iter()
                .map(|e| match e {
                    Entry::Value(v) => numeric(v),
                    Entry::Break => f64::NAN,
                })
                .collect(),
            Values::PerPath(paths) => paths.iter().flatten().map(numeric).collect(),
        }
    }
}
