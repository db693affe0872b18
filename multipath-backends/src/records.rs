//! Row-oriented backend: a sequence of records keyed by dimension name

use tracing::trace;

use multipath_core::{
    DataType, DimMapping, DimRequest, Datatype, Dimension, Error, Extras, Interface, Range,
    RawData, Resolve, Result, Selection, Table, Value,
};

use crate::common::{
    accept, column_range, column_type, column_values, renamed, retype, row_mask, CellAccess,
};

/// Tag of tables owned by [`RecordsInterface`]
pub const RECORDS: Datatype = Datatype::new("records");

/// Rows of values sharing one set of column names
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl RecordTable {
    /// Create a table; every row must hold one value per column
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        if let Some((index, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            return Err(Error::SchemaMismatch(format!(
                "record {index} has {} values, expected {}",
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    /// Parse a JSON array of objects. Columns appear in first-seen order and
    /// keys absent from a record read as null.
    pub fn from_json(json: &serde_json::Value, request: &DimRequest) -> std::result::Result<Self, String> {
        let records = json.as_array().ok_or("expected an array of records")?;
        if records.is_empty() {
            let columns = request.declared().all().map(|d| d.name.clone()).collect();
            return Ok(Self {
                columns,
                rows: Vec::new(),
            });
        }

        let mut columns: Vec<String> = Vec::new();
        for (index, record) in records.iter().enumerate() {
            let record = record
                .as_object()
                .ok_or_else(|| format!("record {index} is not an object"))?;
            for key in record.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = records
            .iter()
            .filter_map(serde_json::Value::as_object)
            .map(|record| {
                columns
                    .iter()
                    .map(|name| match record.get(name) {
                        Some(value) => Value::from_json(value)
                            .ok_or_else(|| format!("field '{name}' is not a scalar")),
                        None => Ok(Value::Null),
                    })
                    .collect::<std::result::Result<Vec<_>, String>>()
            })
            .collect::<std::result::Result<Vec<_>, String>>()?;

        Ok(Self { columns, rows })
    }

    /// Column names in order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Records in order
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no records
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Keep the records whose mask entry is set
    pub fn filter(&self, mask: &[bool]) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .zip(mask)
                .filter(|(_, keep)| **keep)
                .map(|(row, _)| row.clone())
                .collect(),
        }
    }

    /// Rename fields and cast them to the mapped dimensions' types
    pub fn rename(&self, mapping: &DimMapping) -> Result<Self> {
        let mut renamed = Self {
            columns: renamed(&self.columns, mapping)?,
            rows: self.rows.clone(),
        };
        for (index, name) in self.columns.iter().enumerate() {
            let Some(dim) = mapping.get(name.as_str()) else {
                continue;
            };
            if dim.data_type.is_some() {
                let column: Vec<Value> = renamed.rows.iter().map(|row| row[index].clone()).collect();
                for (row, value) in renamed.rows.iter_mut().zip(retype(&column, dim)?) {
                    row[index] = value;
                }
            }
        }
        Ok(renamed)
    }
}

impl CellAccess for RecordTable {
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    fn cell(&self, column: usize, row: usize) -> &Value {
        &self.rows[row][column]
    }
}

/// Backend for row-oriented data
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordsInterface;

impl RecordsInterface {
    fn table<'t>(&self, table: &'t Table) -> Result<&'t RecordTable> {
        table.payload::<RecordTable>(RECORDS)
    }
}

impl Interface for RecordsInterface {
    fn datatype(&self) -> Datatype {
        RECORDS
    }

    fn resolve(&self, raw: &RawData, request: &DimRequest) -> Resolve {
        match raw {
            RawData::Table(table) => match self.table(table) {
                Ok(records) => accept(table.clone(), records.columns(), request, Extras::new()),
                Err(e) => Resolve::Rejected(e.to_string()),
            },
            RawData::Json(json) => match RecordTable::from_json(json, request) {
                Ok(records) => {
                    trace!(records = records.len(), "Parsed record table");
                    let columns = records.columns().to_vec();
                    accept(Table::new(RECORDS, records), &columns, request, Extras::new())
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
        Ok((table.len(), table.columns().len()))
    }

    fn select(&self, table: &Table, selection: &Selection) -> Result<Table> {
        let table = self.table(table)?;
        let mask = row_mask(table, selection)?;
        Ok(Table::new(RECORDS, table.filter(&mask)))
    }

    fn values(&self, table: &Table, dim: &Dimension, expanded: bool, _flat: bool) -> Result<Vec<Value>> {
        column_values(self.table(table)?, dim, expanded)
    }

    fn redim(&self, table: &Table, mapping: &DimMapping) -> Result<Table> {
        Ok(Table::new(RECORDS, self.table(table)?.rename(mapping)?))
    }

    fn dimension_type(&self, table: &Table, dim: &Dimension) -> Result<DataType> {
        column_type(self.table(table)?, dim)
    }
}
