//! Lazily evaluated backend over partitioned column tables.
//!
//! Selections and renames are recorded on the frame and only applied when a
//! query needs the data. Row counts are taken from partition metadata while no
//! filter is pending.

use tracing::{debug, trace};

use multipath_core::{
    max_range, DataType, DimMapping, DimRequest, Datatype, Dimension, Error, Extras, Interface,
    Range, RawData, Resolve, Result, Selection, Table, Value,
};

use crate::columns::ColumnTable;
use crate::common::{accept, column_range, column_type, column_values, renamed, row_mask};

/// Tag of tables owned by [`LazyFrameInterface`]
pub const LAZY: Datatype = Datatype::new("lazy");

/// A deferred operation on a lazy frame
#[derive(Debug, Clone)]
pub enum LazyOp {
    /// Keep matching rows
    Filter(Selection),

    /// Rename and retype columns
    Rename(DimMapping),
}

/// Partitioned columns with a queue of pending operations
#[derive(Debug, Clone, Default)]
pub struct LazyFrame {
    /// Column names after every pending rename
    names: Vec<String>,

    /// Source partitions, all with the same columns
    partitions: Vec<ColumnTable>,

    /// Pending operations in application order
    ops: Vec<LazyOp>,
}

impl LazyFrame {
    /// Create a frame from partitions sharing one set of columns
    pub fn new(partitions: Vec<ColumnTable>) -> Result<Self> {
        let names = partitions
            .first()
            .map(|p| p.names().to_vec())
            .unwrap_or_default();
        if let Some((index, _)) = partitions
            .iter()
            .enumerate()
            .find(|(_, p)| p.names() != names.as_slice())
        {
            return Err(Error::SchemaMismatch(format!(
                "partition {index} columns differ from partition 0"
            )));
        }
        Ok(Self {
            names,
            partitions,
            ops: Vec::new(),
        })
    }

    /// A frame with the given columns and no partitions
    pub fn with_columns(names: &[String]) -> Self {
        Self {
            names: names.to_vec(),
            ..Self::default()
        }
    }

    /// Parse `{"partitions": [...]}`, each partition in a form accepted by
    /// [`ColumnTable::from_json`]
    pub fn from_json(json: &serde_json::Value, request: &DimRequest) -> std::result::Result<Self, String> {
        let partitions = json
            .as_object()
            .and_then(|map| map.get("partitions"))
            .and_then(serde_json::Value::as_array)
            .ok_or("expected an object with a \"partitions\" array")?;
        if partitions.is_empty() {
            let names: Vec<String> = request.declared().all().map(|d| d.name.clone()).collect();
            return Ok(Self::with_columns(&names));
        }
        let partitions = partitions
            .iter()
            .enumerate()
            .map(|(index, p)| {
                ColumnTable::from_json(p, request).map_err(|reason| format!("partition {index}: {reason}"))
            })
            .collect::<std::result::Result<Vec<_>, String>>()?;
        Self::new(partitions).map_err(|e| e.to_string())
    }

    /// Column names as they read after the pending operations
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of source partitions
    pub fn npartitions(&self) -> usize {
        self.partitions.len()
    }

    /// Pending operations
    pub fn ops(&self) -> &[LazyOp] {
        &self.ops
    }

    /// Defer a row filter
    #[must_use]
    pub fn filter(&self, selection: &Selection) -> Self {
        let mut frame = self.clone();
        frame.ops.push(LazyOp::Filter(selection.clone()));
        frame
    }

    /// Defer a rename; the column names update immediately
    pub fn rename(&self, mapping: &DimMapping) -> Result<Self> {
        let mut frame = self.clone();
        frame.names = renamed(&self.names, mapping)?;
        frame.ops.push(LazyOp::Rename(mapping.clone()));
        Ok(frame)
    }

    fn has_filter(&self) -> bool {
        self.ops.iter().any(|op| matches!(op, LazyOp::Filter(_)))
    }

    fn evaluate(&self, partition: &ColumnTable) -> Result<ColumnTable> {
        let mut table = partition.clone();
        for op in &self.ops {
            table = match op {
                LazyOp::Filter(selection) => table.filter(&row_mask(&table, selection)?),
                LazyOp::Rename(mapping) => table.rename(mapping)?,
            };
        }
        Ok(table)
    }

    /// Evaluate every partition in order
    pub fn partitions(&self) -> impl Iterator<Item = Result<ColumnTable>> + '_ {
        self.partitions.iter().map(|p| self.evaluate(p))
    }

    /// Apply the pending operations and stack the partitions
    pub fn collect(&self) -> Result<ColumnTable> {
        if self.partitions.is_empty() {
            return Ok(ColumnTable::empty(&self.names));
        }
        trace!(
            partitions = self.partitions.len(),
            ops = self.ops.len(),
            "Collecting lazy frame"
        );
        let evaluated = self.partitions().collect::<Result<Vec<_>>>()?;
        ColumnTable::concat(&evaluated)
    }

    /// Number of rows after the pending operations
    pub fn length(&self) -> Result<usize> {
        if !self.has_filter() {
            return Ok(self.partitions.iter().map(ColumnTable::len).sum());
        }
        self.partitions().map(|p| p.map(|t| t.len())).sum()
    }
}

/// Backend for lazily evaluated, partitioned data
#[derive(Debug, Clone, Copy, Default)]
pub struct LazyFrameInterface;

impl LazyFrameInterface {
    fn frame<'t>(&self, table: &'t Table) -> Result<&'t LazyFrame> {
        table.payload::<LazyFrame>(LAZY)
    }

    fn accept_frame(table: Table, frame: &LazyFrame, request: &DimRequest) -> Resolve {
        let mut extras = Extras::new();
        extras.insert("npartitions".to_string(), frame.npartitions().into());
        accept(table, frame.names(), request, extras)
    }
}

impl Interface for LazyFrameInterface {
    fn datatype(&self) -> Datatype {
        LAZY
    }

    fn resolve(&self, raw: &RawData, request: &DimRequest) -> Resolve {
        match raw {
            RawData::Table(table) => match self.frame(table) {
                Ok(frame) => Self::accept_frame(table.clone(), frame, request),
                Err(e) => Resolve::Rejected(e.to_string()),
            },
            RawData::Json(json) => match LazyFrame::from_json(json, request) {
                Ok(frame) => {
                    debug!(partitions = frame.npartitions(), "Parsed lazy frame");
                    Self::accept_frame(Table::new(LAZY, frame.clone()), &frame, request)
                }
                Err(reason) => Resolve::Rejected(reason),
            },
        }
    }

    fn range(&self, table: &Table, dim: &Dimension) -> Result<Range> {
        let frame = self.frame(table)?;
        if !frame.names().contains(&dim.name) {
            return Err(Error::DimensionNotFound(dim.name.clone()));
        }
        let ranges = frame
            .partitions()
            .map(|p| column_range(&p?, dim))
            .collect::<Result<Vec<_>>>()?;
        max_range(ranges)
    }

    fn length(&self, table: &Table) -> Result<usize> {
        self.frame(table)?.length()
    }

    fn shape(&self, table: &Table) -> Result<(usize, usize)> {
        let frame = self.frame(table)?;
        Ok((frame.length()?, frame.names().len()))
    }

    fn select(&self, table: &Table, selection: &Selection) -> Result<Table> {
        let frame = self.frame(table)?;
        if let Some(missing) = selection.dimensions().find(|d| !frame.names().iter().any(|n| n == d)) {
            return Err(Error::DimensionNotFound(missing.to_string()));
        }
        Ok(Table::new(LAZY, frame.filter(selection)))
    }

    fn values(&self, table: &Table, dim: &Dimension, expanded: bool, _flat: bool) -> Result<Vec<Value>> {
        column_values(&self.frame(table)?.collect()?, dim, expanded)
    }

    fn redim(&self, table: &Table, mapping: &DimMapping) -> Result<Table> {
        Ok(Table::new(LAZY, self.frame(table)?.rename(mapping)?))
    }

    fn dimension_type(&self, table: &Table, dim: &Dimension) -> Result<DataType> {
        let frame = self.frame(table)?;
        match dim.data_type {
            Some(declared) if frame.names().contains(&dim.name) => Ok(declared),
            _ => column_type(&frame.collect()?, dim),
        }
    }
}
