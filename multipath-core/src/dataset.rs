//! Single-table dataset

use std::sync::Arc;

use crate::error::Result;
use crate::interface::{bind, DimRequest, Extras, Resolution, TableView};
use crate::registry::Registry;
use crate::schema::{DataType, DimMapping, DimRef, Dimensions};
use crate::selection::Selection;
use crate::table::{Datatype, RawData, Table};
use crate::value::{Range, Value};

/// A dataset holding exactly one table and the backend registry it came from
#[derive(Debug, Clone)]
pub struct Dataset {
    /// The data in its backend's representation
    table: Table,

    /// Dimensions the table is interpreted against
    dims: Dimensions,

    /// Extra arguments reported during resolution
    extras: Extras,

    /// Registry used to find the table's backend
    registry: Arc<Registry>,
}

impl Dataset {
    /// Resolve raw data through the registry into a new dataset
    pub fn new(raw: &RawData, request: &DimRequest, registry: Arc<Registry>) -> Result<Self> {
        let resolution = registry.resolve(0, raw, request)?;
        Ok(Self::from_resolution(resolution, registry))
    }

    /// Wrap a resolution produced by the registry
    pub fn from_resolution(resolution: Resolution, registry: Arc<Registry>) -> Self {
        Self {
            table: resolution.table,
            dims: resolution.dims,
            extras: resolution.extras,
            registry,
        }
    }

    /// Get the table
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Get the dimensions
    pub fn dims(&self) -> &Dimensions {
        &self.dims
    }

    /// Get the extras reported by the backend
    pub fn extras(&self) -> &Extras {
        &self.extras
    }

    /// Tag of the backend owning the table
    pub fn datatype(&self) -> Datatype {
        self.table.datatype()
    }

    /// Bind the table to its backend
    pub fn view(&self) -> Result<TableView<'_>> {
        bind(&self.registry, &self.dims, &self.table)
    }

    /// Range of a dimension
    pub fn range(&self, dim: impl Into<DimRef>) -> Result<Range> {
        let view = self.view()?;
        view.range(view.dimension(&dim.into())?)
    }

    /// Number of rows
    pub fn length(&self) -> Result<usize> {
        self.view()?.length()
    }

    /// Number of rows and columns
    pub fn shape(&self) -> Result<(usize, usize)> {
        self.view()?.shape()
    }

    /// Values of a dimension
    pub fn values(&self, dim: impl Into<DimRef>, expanded: bool, flat: bool) -> Result<Vec<Value>> {
        let view = self.view()?;
        view.values(view.dimension(&dim.into())?, expanded, flat)
    }

    /// Data type of a dimension
    pub fn dimension_type(&self, dim: impl Into<DimRef>) -> Result<DataType> {
        let view = self.view()?;
        view.dimension_type(view.dimension(&dim.into())?)
    }

    /// New dataset with the rows matching the selection
    pub fn select(&self, selection: &Selection) -> Result<Self> {
        let table = self.view()?.select(selection)?;
        Ok(Self {
            table,
            ..self.clone()
        })
    }

    /// New dataset with renamed or retyped dimensions
    pub fn redim(&self, mapping: &DimMapping) -> Result<Self> {
        let dims = self.dims.redim(mapping)?;
        let table = self.view()?.redim(mapping)?;
        Ok(Self {
            table,
            dims,
            extras: self.extras.clone(),
            registry: Arc::clone(&self.registry),
        })
    }
}
