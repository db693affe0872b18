//! Type-erased tables tagged with the backend that owns them

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};

/// Tag naming a backend's canonical table representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Datatype(&'static str);

impl Datatype {
    /// Create a datatype tag
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Name of the datatype
    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Payload of a [`Table`]. Implemented for every debuggable, thread-safe type.
pub trait TableData: Any + fmt::Debug + Send + Sync {
    /// Upcast for downcasting to the concrete representation
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + fmt::Debug + Send + Sync> TableData for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// One path's data in the representation of the backend that accepted it.
///
/// The datatype tag selects the backend; the payload is only ever read by
/// that backend. Cloning is cheap.
#[derive(Clone)]
pub struct Table {
    datatype: Datatype,
    data: Arc<dyn TableData>,
}

impl Table {
    /// Wrap a backend representation
    pub fn new<T: TableData>(datatype: Datatype, data: T) -> Self {
        Self {
            datatype,
            data: Arc::new(data),
        }
    }

    /// Datatype tag of the backend owning this table
    pub fn datatype(&self) -> Datatype {
        self.datatype
    }

    /// Borrow the payload as its concrete type
    pub fn downcast_ref<T: TableData>(&self) -> Option<&T> {
        // Deref first: `Arc<dyn TableData>` is itself a `TableData`.
        (*self.data).as_any().downcast_ref::<T>()
    }

    /// Borrow the payload of a table that must belong to the `expected` backend
    pub fn payload<T: TableData>(&self, expected: Datatype) -> Result<&T> {
        if self.datatype != expected {
            return Err(Error::BackendMismatch {
                expected: expected.to_string(),
                found: self.datatype.to_string(),
            });
        }
        self.downcast_ref::<T>().ok_or_else(|| Error::BackendMismatch {
            expected: expected.to_string(),
            found: format!("{} with a foreign payload", self.datatype),
        })
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("datatype", &self.datatype)
            .field("data", &self.data)
            .finish()
    }
}

/// Raw input for one path, before a backend has accepted it
#[derive(Debug, Clone)]
pub enum RawData {
    /// JSON tabular data (array of records, object of arrays, 2D array, ...)
    Json(serde_json::Value),

    /// A table that is already in some backend's representation
    Table(Table),
}

impl From<serde_json::Value> for RawData {
    fn from(json: serde_json::Value) -> Self {
        RawData::Json(json)
    }
}

impl From<Table> for RawData {
    fn from(table: Table) -> Self {
        RawData::Table(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Rows(Vec<i64>);

    const ROWS: Datatype = Datatype::new("rows");

    #[test]
    fn test_downcast() {
        let table = Table::new(ROWS, Rows(vec![1, 2]));
        assert_eq!(table.datatype(), ROWS);
        assert_eq!(table.downcast_ref::<Rows>(), Some(&Rows(vec![1, 2])));
        assert!(table.downcast_ref::<String>().is_none());
    }

    #[test]
    fn test_payload_checks_tag() {
        let table = Table::new(ROWS, Rows(vec![1]));
        assert!(table.payload::<Rows>(ROWS).is_ok());
        assert!(matches!(
            table.payload::<Rows>(Datatype::new("columns")),
            Err(Error::BackendMismatch { .. })
        ));
        assert!(table.payload::<String>(ROWS).is_err());
    }
}
