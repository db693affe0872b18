//! Backend capability trait and the single-table view used to reach it

use serde_json::Map;

use crate::error::Result;
use crate::registry::Registry;
use crate::schema::{DataType, DimMapping, DimRef, Dimension, Dimensions};
use crate::selection::Selection;
use crate::table::{Datatype, RawData, Table};
use crate::value::{Range, Value};

/// Extra constructor arguments reported by a backend during resolution
pub type Extras = Map<String, serde_json::Value>;

/// Dimensions requested for a path while resolving its backend
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DimRequest {
    /// Key dimensions given by the caller
    pub kdims: Option<Vec<Dimension>>,

    /// Value dimensions given by the caller
    pub vdims: Option<Vec<Dimension>>,

    /// Key dimensions declared by the element
    pub default_kdims: Vec<Dimension>,

    /// Value dimensions declared by the element
    pub default_vdims: Vec<Dimension>,
}

impl DimRequest {
    /// Key dimensions in effect: the caller's, else the element's
    pub fn key_dims(&self) -> &[Dimension] {
        self.kdims.as_deref().unwrap_or(&self.default_kdims)
    }

    /// Dimensions in effect when no column names are known
    pub fn declared(&self) -> Dimensions {
        Dimensions::new(
            self.key_dims().to_vec(),
            self.vdims.clone().unwrap_or_else(|| self.default_vdims.clone()),
        )
    }

    /// Dimensions for data with the given column names.
    ///
    /// Without caller value dimensions, every column that is not a key
    /// dimension becomes a value dimension, in column order.
    pub fn for_columns(&self, columns: &[String]) -> Dimensions {
        let kdims = self.key_dims().to_vec();
        let vdims = match &self.vdims {
            Some(vdims) => vdims.clone(),
            None => columns
                .iter()
                .filter(|c| !kdims.iter().any(|k| &k.name == *c))
                .map(|c| {
                    self.default_vdims
                        .iter()
                        .find(|v| &v.name == c)
                        .cloned()
                        .unwrap_or_else(|| Dimension::new(c))
                })
                .collect(),
        };
        Dimensions::new(kdims, vdims)
    }
}

/// A table accepted by a backend together with its resolved metadata
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The data in the backend's representation
    pub table: Table,

    /// Dimensions the data was interpreted against
    pub dims: Dimensions,

    /// Extra arguments reported by the backend
    pub extras: Extras,
}

/// Outcome of offering raw data to a backend
#[derive(Debug, Clone)]
pub enum Resolve {
    /// The backend accepted the data
    Accepted(Resolution),

    /// The backend does not handle this data, with the reason
    Rejected(String),
}

/// A tabular backend answering queries about single tables it owns.
///
/// Every method except [`Interface::resolve`] receives tables carrying this
/// backend's [`Interface::datatype`] tag.
#[cfg_attr(test, mockall::automock)]
pub trait Interface: Send + Sync {
    /// Tag of the tables produced by this backend
    fn datatype(&self) -> Datatype;

    /// Try to coerce raw data into this backend's representation
    fn resolve(&self, raw: &RawData, request: &DimRequest) -> Resolve;

    /// Minimum and maximum of a dimension, ignoring missing values
    fn range(&self, table: &Table, dim: &Dimension) -> Result<crate::value::Range>;

    /// Number of rows
    fn length(&self, table: &Table) -> Result<usize>;

    /// Number of rows and columns
    fn shape(&self, table: &Table) -> Result<(usize, usize)>;

    /// Keep the rows matching every constraint of the selection
    fn select(&self, table: &Table, selection: &Selection) -> Result<Table>;

    /// Values of a dimension; unique values in first-seen order unless expanded
    fn values(&self, table: &Table, dim: &Dimension, expanded: bool, flat: bool)
        -> Result<Vec<Value>>;

    /// Rename or retype dimensions
    fn redim(&self, table: &Table, mapping: &DimMapping) -> Result<Table>;

    /// Data type of a dimension's values
    fn dimension_type(&self, table: &Table, dim: &Dimension) -> Result<DataType>;
}

/// A single table bound to its dimensions and the backend that owns it
#[derive(Clone, Copy)]
pub struct TableView<'a> {
    dims: &'a Dimensions,
    table: &'a Table,
    interface: &'a dyn Interface,
}

/// Bind one table to a set of dimensions, looking up its backend by tag
pub fn bind<'a>(registry: &'a Registry, dims: &'a Dimensions, table: &'a Table) -> Result<TableView<'a>> {
    let interface = registry.interface(table.datatype())?;
    Ok(TableView {
        dims,
        table,
        interface,
    })
}

impl<'a> TableView<'a> {
    /// Dimensions of the view
    pub fn dims(&self) -> &'a Dimensions {
        self.dims
    }

    /// The bound table
    pub fn table(&self) -> &'a Table {
        self.table
    }

    /// Backend owning the table
    pub fn interface(&self) -> &'a dyn Interface {
        self.interface
    }

    /// Resolve a dimension reference against the view's dimensions
    pub fn dimension(&self, dim: &DimRef) -> Result<&'a Dimension> {
        self.dims.get(dim)
    }

    /// Range of a dimension
    pub fn range(&self, dim: &Dimension) -> Result<Range> {
        self.interface.range(self.table, dim)
    }

    /// Number of rows
    pub fn length(&self) -> Result<usize> {
        self.interface.length(self.table)
    }

    /// Number of rows and columns
    pub fn shape(&self) -> Result<(usize, usize)> {
        self.interface.shape(self.table)
    }

    /// Filter rows
    pub fn select(&self, selection: &Selection) -> Result<Table> {
        self.interface.select(self.table, selection)
    }

    /// Values of a dimension
    pub fn values(&self, dim: &Dimension, expanded: bool, flat: bool) -> Result<Vec<Value>> {
        self.interface.values(self.table, dim, expanded, flat)
    }

    /// Rename or retype dimensions
    pub fn redim(&self, mapping: &DimMapping) -> Result<Table> {
        self.interface.redim(self.table, mapping)
    }

    /// Data type of a dimension
    pub fn dimension_type(&self, dim: &Dimension) -> Result<DataType> {
        self.interface.dimension_type(self.table, dim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> DimRequest {
        DimRequest {
            kdims: None,
            vdims: None,
            default_kdims: vec!["x".into(), "y".into()],
            default_vdims: vec![Dimension::new("z").with_unit("m")],
        }
    }

    #[test]
    fn test_for_columns_infers_vdims() {
        let columns = vec!["x".to_string(), "z".to_string(), "y".to_string(), "w".to_string()];
        let dims = request().for_columns(&columns);
        assert_eq!(dims.names(), vec!["x", "y", "z", "w"]);
        // Element metadata is kept for inferred dimensions it declares
        assert_eq!(dims.vdims[0].unit.as_deref(), Some("m"));
    }

    #[test]
    fn test_caller_dims_win() {
        let mut request = request();
        request.kdims = Some(vec!["a".into()]);
        request.vdims = Some(vec![]);
        let dims = request.for_columns(&["a".to_string(), "b".to_string()]);
        assert_eq!(dims.names(), vec!["a"]);
        assert_eq!(request.declared().names(), vec!["a"]);
    }
}
