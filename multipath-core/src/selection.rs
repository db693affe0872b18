//! Per-dimension selection constraints

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::value::Value;

/// Predicate over a single cell value
pub type ValuePredicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Constraint applied to the values of one dimension
#[derive(Clone)]
pub enum Constraint {
    /// Value equals the given value
    Equals(Value),

    /// Value lies in `[start, end)`; a missing bound is unbounded
    Range {
        /// Inclusive lower bound
        start: Option<Value>,
        /// Exclusive upper bound
        end: Option<Value>,
    },

    /// Value is one of the given values
    OneOf(Vec<Value>),

    /// Arbitrary predicate
    Predicate(ValuePredicate),
}

impl Constraint {
    /// Half-open range constraint
    pub fn between(start: impl Into<Value>, end: impl Into<Value>) -> Self {
        Constraint::Range {
            start: Some(start.into()),
            end: Some(end.into()),
        }
    }

    /// Predicate constraint
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Constraint::Predicate(Arc::new(f))
    }

    /// Check a value against this constraint.
    ///
    /// Missing values never match an equality or range constraint.
    pub fn matches(&self, value: &Value) -> Result<bool> {
        match self {
            Constraint::Equals(expected) => {
                if value.is_missing() || expected.is_missing() {
                    return Ok(false);
                }
                Ok(value.try_cmp(expected)? == Ordering::Equal)
            }
            Constraint::Range { start, end } => {
                if value.is_missing() {
                    return Ok(false);
                }
                if let Some(start) = start {
                    if value.try_cmp(start)? == Ordering::Less {
                        return Ok(false);
                    }
                }
                if let Some(end) = end {
                    if value.try_cmp(end)? != Ordering::Less {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Constraint::OneOf(candidates) => {
                for candidate in candidates {
                    if Constraint::Equals(candidate.clone()).matches(value)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Constraint::Predicate(f) => Ok(f(value)),
        }
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Equals(v) => f.debug_tuple("Equals").field(v).finish(),
            Constraint::Range { start, end } => f
                .debug_struct("Range")
                .field("start", start)
                .field("end", end)
                .finish(),
            Constraint::OneOf(vs) => f.debug_tuple("OneOf").field(vs).finish(),
            Constraint::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// A conjunction of per-dimension constraints
#[derive(Debug, Clone, Default)]
pub struct Selection {
    constraints: Vec<(String, Constraint)>,
}

impl Selection {
    /// Create an empty selection, which keeps every row
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constraint on the named dimension
    #[must_use]
    pub fn with(mut self, dim: &str, constraint: Constraint) -> Self {
        self.constraints.push((dim.to_string(), constraint));
        self
    }

    /// The constraints, in insertion order
    pub fn constraints(&self) -> &[(String, Constraint)] {
        &self.constraints
    }

    /// Check if no constraint is set
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Names of the dimensions this selection constrains
    pub fn dimensions(&self) -> impl Iterator<Item = &str> {
        self.constraints.iter().map(|(name, _)| name.as_str())
    }
}
