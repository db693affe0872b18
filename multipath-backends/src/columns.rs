//! Column-oriented backend: one named vector of values per dimension

use tracing::trace;

use multipath_core::{
    DataType, DimMapping, DimRequest, Datatype, Dimension, Error, Extras, Interface, Range,
    RawData, Resolve, Result, Selection, Table, Value,
};

use crate::common::{
    accept, column_range, column_type, column_values, json_column, renamed, retype, row_mask,
    CellAccess,
};

/// Tag of tables owned by [`ColumnarInterface`]
pub const COLUMNS: Datatype = Datatype::new("columns");

/// Equal-length named columns
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnTable {
    names: Vec<String>,
    columns: Vec<Vec<Value>>,
    rows: usize,
}

impl ColumnTable {
    /// Create a table from named columns of equal length
    pub fn new(columns: Vec<(String, Vec<Value>)>) -> Result<Self> {
        let rows = columns.first().map_or(0, |(_, values)| values.len());
        let mut names: Vec<String> = Vec::with_capacity(columns.len());
        let mut data = Vec::with_capacity(columns.len());

        for (name, values) in columns {
            if values.len() != rows {
                return Err(Error::SchemaMismatch(format!(
                    "column '{name}' has {} rows, expected {rows}",
                    values.len()
                )));
            }
            if names.contains(&name) {
                return Err(Error::InvalidArgument(format!("duplicate column '{name}'")));
            }
            names.push(name);
            data.push(values);
        }

        Ok(Self {
            names,
            columns: data,
            rows,
        })
    }

    /// A table with the given columns and no rows
    pub fn empty(names: &[String]) -> Self {
        Self {
            names: names.to_vec(),
            columns: vec![Vec::new(); names.len()],
            rows: 0,
        }
    }

    /// Create a table from row-major data, one value per name in each row
    pub fn from_rows(names: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut columns = vec![Vec::with_capacity(rows.len()); names.len()];
        for (index, row) in rows.into_iter().enumerate() {
            if row.len() != names.len() {
                return Err(Error::SchemaMismatch(format!(
                    "row {index} has {} values, expected {}",
                    row.len(),
                    names.len()
                )));
            }
            for (column, value) in columns.iter_mut().zip(row) {
                column.push(value);
            }
        }
        Self::new(names.into_iter().zip(columns).collect())
    }

    /// Parse JSON: an object of scalar arrays, or an array of rows matched to
    /// the requested dimensions by position
    pub fn from_json(json: &serde_json::Value, request: &DimRequest) -> std::result::Result<Self, String> {
        match json {
            serde_json::Value::Object(map) if map.is_empty() => Ok(Self::empty(&declared_names(request))),
            serde_json::Value::Object(map) => {
                let columns = map
                    .iter()
                    .map(|(name, values)| Ok((name.clone(), json_column(name, values)?)))
                    .collect::<std::result::Result<Vec<_>, String>>()?;
                Self::new(columns).map_err(|e| e.to_string())
            }
            serde_json::Value::Array(rows) => {
                let names = declared_names(request);
                let rows = rows
                    .iter()
                    .enumerate()
                    .map(|(index, row)| {
                        if !row.is_array() {
                            return Err(format!("row {index} is not an array"));
                        }
                        json_column(&format!("row {index}"), row)
                    })
                    .collect::<std::result::Result<Vec<_>, String>>()?;
                Self::from_rows(names, rows).map_err(|e| e.to_string())
            }
            _ => Err("expected an object of columns or an array of rows".to_string()),
        }
    }

    /// Column names in order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Values of a named column
    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.column_index(name).map(|i| self.columns[i].as_slice())
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Number of columns
    pub fn width(&self) -> usize {
        self.names.len()
    }

    /// Keep the rows whose mask entry is set
    pub fn filter(&self, mask: &[bool]) -> Self {
        let columns: Vec<Vec<Value>> = self
            .columns
            .iter()
            .map(|column| {
                column
                    .iter()
                    .zip(mask)
                    .filter(|(_, keep)| **keep)
                    .map(|(value, _)| value.clone())
                    .collect()
            })
            .collect();
        let rows = mask.iter().take(self.rows).filter(|keep| **keep).count();
        Self {
            names: self.names.clone(),
            columns,
            rows,
        }
    }

    /// Rename columns and cast them to the mapped dimensions' types
    pub fn rename(&self, mapping: &DimMapping) -> Result<Self> {
        let mut columns = self.columns.clone();
        for (name, column) in self.names.iter().zip(columns.iter_mut()) {
            if let Some(dim) = mapping.get(name.as_str()) {
                *column = retype(column, dim)?;
            }
        }
        Ok(Self {
            names: renamed(&self.names, mapping)?,
            columns,
            rows: self.rows,
        })
    }

    /// Stack tables with identical columns
    pub fn concat(tables: &[ColumnTable]) -> Result<Self> {
        let Some(first) = tables.first() else {
            return Ok(Self::default());
        };
        let mut stacked = first.clone();
        for table in &tables[1..] {
            if table.names != stacked.names {
                return Err(Error::SchemaMismatch(format!(
                    "cannot stack columns [{}] onto [{}]",
                    table.names.join(", "),
                    stacked.names.join(", ")
                )));
            }
            for (column, values) in stacked.columns.iter_mut().zip(&table.columns) {
                column.extend_from_slice(values);
            }
            stacked.rows += table.rows;
        }
        Ok(stacked)
    }
}

impl CellAccess for ColumnTable {
    fn row_count(&self) -> usize {
        self.rows
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    fn cell(&self, column: usize, row: usize) -> &Value {
        &self.columns[column][row]
    }
}

fn declared_names(request: &DimRequest) -> Vec<String> {
    request.declared().all().map(|d| d.name.clone()).collect()
}

/// Backend for column-oriented data
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnarInterface;

impl ColumnarInterface {
    fn table<'t>(&self, table: &'t Table) -> Result<&'t ColumnTable> {
        table.payload::<ColumnTable>(COLUMNS)
    }
}

impl Interface for ColumnarInterface {
    fn datatype(&self) -> Datatype {
        COLUMNS
    }

    fn resolve(&self, raw: &RawData, request: &DimRequest) -> Resolve {
        match raw {
            RawData::Table(table) => match self.table(table) {
                Ok(columns) => accept(table.clone(), columns.names(), request, Extras::new()),
                Err(e) => Resolve::Rejected(e.to_string()),
            },
            RawData::Json(json) => match ColumnTable::from_json(json, request) {
                Ok(columns) => {
                    trace!(rows = columns.len(), width = columns.width(), "Parsed column table");
                    let names = columns.names().to_vec();
                    accept(Table::new(COLUMNS, columns), &names, request, Extras::new())
                }
                Err(reason) => Resolve::Rejected(reason),
            },
        }
    }

    fn range(&self, table: &Table, dim: &Dimension) -> Result<Range> {
        column_range(self.table(table)?, dim)
    }

    fn length(&self, table: &Table) -> Result<usize> {
        Ok(self.table(table)?.len())
    }

    fn shape(&self, table: &Table) -> Result<(usize, usize)> {
        let table = self.table(table)?;
        Ok((table.len(), table.width()))
    }

    fn select(&self, table: &Table, selection: &Selection) -> Result<Table> {
        let table = self.table(table)?;
        let mask = row_mask(table, selection)?;
        Ok(Table::new(COLUMNS, table.filter(&mask)))
    }

    fn values(&self, table: &Table, dim: &Dimension, expanded: bool, _flat: bool) -> Result<Vec<Value>> {
        column_values(self.table(table)?, dim, expanded)
    }

    fn redim(&self, table: &Table, mapping: &DimMapping) -> Result<Table> {
        Ok(Table::new(COLUMNS, self.table(table)?.rename(mapping)?))
    }

    fn dimension_type(&self, table: &Table, dim: &Dimension) -> Result<DataType> {
        column_type(self.table(table)?, dim)
    }
}
