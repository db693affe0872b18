//! Dimension descriptors shared by every path of a dataset

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Data type of a dimension's values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Boolean values
    Boolean,

    /// 64-bit signed integers
    Int64,

    /// 64-bit floating point
    Float64,

    /// UTF-8 encoded strings
    String,

    /// Only missing values
    Null,
}

impl DataType {
    /// Check if this type is a numeric type
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Int64 | DataType::Float64)
    }

    /// The common type of two value types, used when inferring column types
    pub fn unify(self, other: DataType) -> Option<DataType> {
        match (self, other) {
            (a, b) if a == b => Some(a),
            (DataType::Null, t) | (t, DataType::Null) => Some(t),
            (a, b) if a.is_numeric() && b.is_numeric() => Some(DataType::Float64),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Boolean => write!(f, "Boolean"),
            DataType::Int64 => write!(f, "Int64"),
            DataType::Float64 => write!(f, "Float64"),
            DataType::String => write!(f, "String"),
            DataType::Null => write!(f, "Null"),
        }
    }
}

/// A named dimension with optional type and display metadata
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimension {
    /// Name of the dimension, also the column name in every path
    pub name: String,

    /// Declared data type; inferred from the data when absent
    pub data_type: Option<DataType>,

    /// Unit of the values
    pub unit: Option<String>,
}

impl Dimension {
    /// Create a new dimension
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: None,
            unit: None,
        }
    }

    /// Set the declared data type
    pub fn with_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    /// Set the unit
    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    /// Get the name of this dimension
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl From<&str> for Dimension {
    fn from(name: &str) -> Self {
        Dimension::new(name)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.data_type, &self.unit) {
            (Some(t), Some(u)) => write!(f, "{}: {} ({})", self.name, t, u),
            (Some(t), None) => write!(f, "{}: {}", self.name, t),
            (None, Some(u)) => write!(f, "{} ({})", self.name, u),
            (None, None) => write!(f, "{}", self.name),
        }
    }
}

/// Reference to a dimension by name or by position in `kdims ++ vdims`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DimRef {
    /// Dimension name
    Name(String),

    /// Position across key then value dimensions
    Index(usize),
}

impl From<&str> for DimRef {
    fn from(name: &str) -> Self {
        DimRef::Name(name.to_string())
    }
}

impl From<String> for DimRef {
    fn from(name: String) -> Self {
        DimRef::Name(name)
    }
}

impl From<usize> for DimRef {
    fn from(index: usize) -> Self {
        DimRef::Index(index)
    }
}

impl From<&Dimension> for DimRef {
    fn from(dim: &Dimension) -> Self {
        DimRef::Name(dim.name.clone())
    }
}

impl fmt::Display for DimRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DimRef::Name(name) => write!(f, "{name}"),
            DimRef::Index(index) => write!(f, "#{index}"),
        }
    }
}

/// Rename and retype instructions, keyed by the current dimension name
pub type DimMapping = HashMap<String, Dimension>;

/// Key and value dimensions of a dataset
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    /// Key (independent) dimensions
    pub kdims: Vec<Dimension>,

    /// Value (dependent) dimensions
    pub vdims: Vec<Dimension>,
}

impl Dimensions {
    /// Create a new dimension set
    pub fn new(kdims: Vec<Dimension>, vdims: Vec<Dimension>) -> Self {
        Self { kdims, vdims }
    }

    /// All dimensions, key dimensions first
    pub fn all(&self) -> impl Iterator<Item = &Dimension> {
        self.kdims.iter().chain(self.vdims.iter())
    }

    /// Names of all dimensions, key dimensions first
    pub fn names(&self) -> Vec<&str> {
        self.all().map(Dimension::name).collect()
    }

    /// Number of dimensions
    pub fn len(&self) -> usize {
        self.kdims.len() + self.vdims.len()
    }

    /// Check if there are no dimensions
    pub fn is_empty(&self) -> bool {
        self.kdims.is_empty() && self.vdims.is_empty()
    }

    /// Look up a dimension by name or position
    pub fn get(&self, dim: &DimRef) -> Result<&Dimension> {
        match dim {
            DimRef::Name(name) => self
                .all()
                .find(|d| d.name == *name)
                .ok_or_else(|| Error::DimensionNotFound(name.clone())),
            DimRef::Index(index) => self.all().nth(*index).ok_or(Error::IndexOutOfBounds {
                index: *index,
                len: self.len(),
            }),
        }
    }

    /// Check whether a dimension is the first value dimension
    pub fn is_first_vdim(&self, dim: &Dimension) -> bool {
        self.vdims.first().is_some_and(|v| v.name == dim.name)
    }

    /// Same key dimensions with the value dimensions dropped
    pub fn without_vdims(&self) -> Self {
        Self {
            kdims: self.kdims.clone(),
            vdims: Vec::new(),
        }
    }

    /// Apply a rename/retype mapping. Unmapped dimensions are kept as they are.
    ///
    /// A mapping that leaves two dimensions with the same name is rejected.
    pub fn redim(&self, mapping: &DimMapping) -> Result<Self> {
        let apply = |dims: &[Dimension]| -> Vec<Dimension> {
            dims.iter()
                .map(|d| mapping.get(&d.name).cloned().unwrap_or_else(|| d.clone()))
                .collect()
        };
        let redimmed = Self {
            kdims: apply(&self.kdims),
            vdims: apply(&self.vdims),
        };
        let names = redimmed.names();
        if let Some((_, name)) = names.iter().enumerate().find(|&(i, n)| names[..i].contains(n)) {
            return Err(Error::InvalidArgument(format!(
                "redim maps two dimensions onto '{name}'"
            )));
        }
        Ok(redimmed)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |dims: &[Dimension]| {
            dims.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
        };
        write!(f, "[{}] -> [{}]", join(&self.kdims), join(&self.vdims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims() -> Dimensions {
        Dimensions::new(
            vec!["x".into(), "y".into()],
            vec![Dimension::new("z").with_type(DataType::Float64)],
        )
    }

    #[test]
    fn test_lookup_by_name_and_index() {
        let dims = dims();
        assert_eq!(dims.get(&"y".into()).unwrap().name(), "y");
        assert_eq!(dims.get(&2usize.into()).unwrap().name(), "z");
        assert!(matches!(dims.get(&"w".into()), Err(Error::DimensionNotFound(_))));
        assert!(matches!(
            dims.get(&3usize.into()),
            Err(Error::IndexOutOfBounds { index: 3, len: 3 })
        ));
    }

    #[test]
    fn test_redim_keeps_order() {
        let mut mapping = DimMapping::new();
        mapping.insert("x".to_string(), Dimension::new("lon"));
        mapping.insert("z".to_string(), Dimension::new("depth").with_unit("m"));

        let renamed = dims().redim(&mapping).unwrap();
        assert_eq!(renamed.names(), vec!["lon", "y", "depth"]);
        assert_eq!(renamed.vdims[0].unit.as_deref(), Some("m"));
    }

    #[test]
    fn test_redim_rejects_name_collisions() {
        let mut mapping = DimMapping::new();
        mapping.insert("x".to_string(), Dimension::new("y"));
        let err = dims().redim(&mapping).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(message) if message.contains("'y'")));
    }

    #[test]
    fn test_redim_allows_swaps() {
        let mut mapping = DimMapping::new();
        mapping.insert("x".to_string(), Dimension::new("y"));
        mapping.insert("y".to_string(), Dimension::new("x"));
        assert_eq!(dims().redim(&mapping).unwrap().names(), vec!["y", "x", "z"]);
    }

    #[test]
    fn test_first_vdim_and_without_vdims() {
        let dims = dims();
        assert!(dims.is_first_vdim(&Dimension::new("z")));
        assert!(!dims.is_first_vdim(&Dimension::new("x")));
        assert_eq!(dims.without_vdims().len(), 2);
    }

    #[test]
    fn test_unify() {
        assert_eq!(DataType::Int64.unify(DataType::Float64), Some(DataType::Float64));
        assert_eq!(DataType::Null.unify(DataType::String), Some(DataType::String));
        assert_eq!(DataType::String.unify(DataType::Int64), None);
    }
}
