//! Helpers shared by the tabular backends

use std::collections::HashSet;

use multipath_core::{
    DataType, DimMapping, DimRequest, Dimension, Error, Extras, Range, Resolution, Resolve, Result, Selection,
    Table, Value,
};

/// Cell-level access to a table with named columns
pub(crate) trait CellAccess {
    /// Number of rows
    fn row_count(&self) -> usize;

    /// Position of a column
    fn column_index(&self, name: &str) -> Option<usize>;

    /// Value at a column and row; both must be in bounds
    fn cell(&self, column: usize, row: usize) -> &Value;
}

/// Iterate the values of a named column
pub(crate) fn column<'t, T: CellAccess>(
    table: &'t T,
    name: &str,
) -> Result<impl Iterator<Item = &'t Value> + 't> {
    let index = table
        .column_index(name)
        .ok_or_else(|| Error::DimensionNotFound(name.to_string()))?;
    Ok((0..table.row_count()).map(move |row| table.cell(index, row)))
}

/// Rows matching every constraint of a selection
pub(crate) fn row_mask<T: CellAccess>(table: &T, selection: &Selection) -> Result<Vec<bool>> {
    let mut mask = vec![true; table.row_count()];
    for (name, constraint) in selection.constraints() {
        let index = table
            .column_index(name)
            .ok_or_else(|| Error::DimensionNotFound(name.clone()))?;
        for (row, keep) in mask.iter_mut().enumerate() {
            if *keep {
                *keep = constraint.matches(table.cell(index, row))?;
            }
        }
    }
    Ok(mask)
}

/// Range of a named column
pub(crate) fn column_range<T: CellAccess>(table: &T, dim: &Dimension) -> Result<Range> {
    Range::of_values(column(table, &dim.name)?)
}

/// Values of a named column; unique values in first-seen order unless expanded
pub(crate) fn column_values<T: CellAccess>(table: &T, dim: &Dimension, expanded: bool) -> Result<Vec<Value>> {
    let values = column(table, &dim.name)?;
    if expanded {
        Ok(values.cloned().collect())
    } else {
        Ok(unique(values))
    }
}

/// Declared type of a dimension, or the type inferred from its column
pub(crate) fn column_type<T: CellAccess>(table: &T, dim: &Dimension) -> Result<DataType> {
    let values = column(table, &dim.name)?;
    match dim.data_type {
        Some(declared) => Ok(declared),
        None => infer_type(values),
    }
}

#[derive(Hash, PartialEq, Eq)]
enum Key<'a> {
    Null,
    NaN,
    Bool(bool),
    Int(i64),
    Float(u64),
    Str(&'a str),
}

fn key(value: &Value) -> Key<'_> {
    match value {
        Value::Null => Key::Null,
        Value::Float(f) if f.is_nan() => Key::NaN,
        Value::Float(f) => Key::Float(f.to_bits()),
        Value::Bool(b) => Key::Bool(*b),
        Value::Int(i) => Key::Int(*i),
        Value::Str(s) => Key::Str(s),
    }
}

/// Unique values in first-seen order
pub(crate) fn unique<'a, I>(values: I) -> Vec<Value>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(key(v)))
        .cloned()
        .collect()
}

/// Narrowest type that holds every value; `Null` for only missing values
pub(crate) fn infer_type<'a, I>(values: I) -> Result<DataType>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut inferred = DataType::Null;
    for value in values {
        if matches!(value, Value::Null) {
            continue;
        }
        inferred = inferred.unify(value.data_type()).ok_or_else(|| {
            Error::TypeMismatch(format!("column mixes {inferred} and {} values", value.data_type()))
        })?;
    }
    Ok(inferred)
}

/// 2^63; integral floats in `[-2^63, 2^63)` convert to `i64` exactly
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Convert a value to another data type
pub(crate) fn cast(value: &Value, to: DataType) -> Result<Value> {
    let mismatch = || Error::TypeMismatch(format!("cannot cast {value} to {to}"));
    if matches!(value, Value::Null) {
        return Ok(Value::Null);
    }
    let cast = match (to, value) {
        (DataType::Null, _) => Value::Null,
        (DataType::Float64, v) => match v {
            Value::Str(s) => Value::Float(s.trim().parse().map_err(|_| mismatch())?),
            Value::Bool(b) => Value::Float(if *b { 1.0 } else { 0.0 }),
            other => Value::Float(other.as_f64().ok_or_else(mismatch)?),
        },
        (DataType::Int64, v) => match v {
            Value::Int(i) => Value::Int(*i),
            #[allow(clippy::cast_possible_truncation)]
            Value::Float(f) if f.fract() == 0.0 && (-I64_BOUND..I64_BOUND).contains(f) => {
                Value::Int(*f as i64)
            }
            Value::Str(s) => Value::Int(s.trim().parse().map_err(|_| mismatch())?),
            Value::Bool(b) => Value::Int(i64::from(*b)),
            _ => return Err(mismatch()),
        },
        (DataType::String, v) => match v {
            Value::Str(s) => Value::Str(s.clone()),
            other => Value::Str(other.to_string()),
        },
        (DataType::Boolean, v) => match v {
            Value::Bool(b) => Value::Bool(*b),
            Value::Int(0) => Value::Bool(false),
            Value::Int(1) => Value::Bool(true),
            Value::Str(s) if s == "true" => Value::Bool(true),
            Value::Str(s) if s == "false" => Value::Bool(false),
            _ => return Err(mismatch()),
        },
    };
    Ok(cast)
}

/// Column names after a rename; two columns may not end up sharing a name
pub(crate) fn renamed(names: &[String], mapping: &DimMapping) -> Result<Vec<String>> {
    let mut renamed: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let target = mapping.get(name.as_str()).map_or(name, |dim| &dim.name);
        if renamed.contains(target) {
            return Err(Error::InvalidArgument(format!(
                "rename maps two columns onto '{target}'"
            )));
        }
        renamed.push(target.clone());
    }
    Ok(renamed)
}

/// Apply a mapped dimension's declared type to a column's values
pub(crate) fn retype(values: &[Value], dim: &Dimension) -> Result<Vec<Value>> {
    match dim.data_type {
        Some(to) => values.iter().map(|v| cast(v, to)).collect(),
        None => Ok(values.to_vec()),
    }
}

/// Reject data lacking one of the requested key dimensions
pub(crate) fn check_key_dims(columns: &[String], request: &DimRequest) -> std::result::Result<(), String> {
    match request
        .key_dims()
        .iter()
        .find(|k| !columns.iter().any(|c| *c == k.name))
    {
        Some(missing) => Err(format!("missing key dimension '{}'", missing.name)),
        None => Ok(()),
    }
}

/// Accept a table whose columns cover the requested key dimensions
pub(crate) fn accept(
    table: Table,
    columns: &[String],
    request: &DimRequest,
    extras: Extras,
) -> Resolve {
    if let Err(reason) = check_key_dims(columns, request) {
        return Resolve::Rejected(reason);
    }
    Resolve::Accepted(Resolution {
        table,
        dims: request.for_columns(columns),
        extras,
    })
}

/// Convert a JSON array of scalars into values
pub(crate) fn json_column(name: &str, json: &serde_json::Value) -> std::result::Result<Vec<Value>, String> {
    let items = json
        .as_array()
        .ok_or_else(|| format!("column '{name}' is not an array"))?;
    items
        .iter()
        .map(|item| Value::from_json(item).ok_or_else(|| format!("column '{name}' holds non-scalar values")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_unique_keeps_first_seen_order() {
        let values = vec![
            Value::Int(3),
            Value::Int(1),
            Value::Int(3),
            Value::Float(f64::NAN),
            Value::Float(f64::NAN),
            Value::from("a"),
            Value::Int(1),
        ];
        let unique = unique(&values);
        assert_eq!(unique.len(), 4);
        assert_eq!(unique[0], Value::Int(3));
        assert_eq!(unique[1], Value::Int(1));
        assert_eq!(unique[3], Value::from("a"));
    }

    #[test_case(vec![Value::Int(1), Value::Null], DataType::Int64 ; "nulls ignored")]
    #[test_case(vec![Value::Int(1), Value::Float(0.5)], DataType::Float64 ; "widened")]
    #[test_case(vec![Value::Null], DataType::Null ; "only nulls")]
    #[test_case(vec![Value::from("a")], DataType::String ; "strings")]
    fn test_infer_type(values: Vec<Value>, expected: DataType) {
        assert_eq!(infer_type(&values).unwrap(), expected);
    }

    #[test]
    fn test_infer_type_mixed() {
        assert!(infer_type(&[Value::Int(1), Value::from("a")]).is_err());
    }

    #[test_case(Value::Int(2), DataType::Float64, Value::Float(2.0) ; "int to float")]
    #[test_case(Value::Float(3.0), DataType::Int64, Value::Int(3) ; "integral float to int")]
    #[test_case(Value::from(" 4 "), DataType::Int64, Value::Int(4) ; "parse int")]
    #[test_case(Value::Int(7), DataType::String, Value::from("7") ; "int to string")]
    #[test_case(Value::Null, DataType::Int64, Value::Null ; "null stays null")]
    #[test_case(Value::Int(1), DataType::Boolean, Value::Bool(true) ; "int to bool")]
    fn test_cast(value: Value, to: DataType, expected: Value) {
        assert_eq!(cast(&value, to).unwrap(), expected);
    }

    #[test]
    fn test_cast_rejects_lossy() {
        assert!(cast(&Value::Float(2.5), DataType::Int64).is_err());
        assert!(cast(&Value::from("abc"), DataType::Float64).is_err());
        assert!(cast(&Value::Float(1e300), DataType::Int64).is_err());
        assert!(cast(&Value::Float(-1e300), DataType::Int64).is_err());
        assert!(cast(&Value::Float(f64::INFINITY), DataType::Int64).is_err());
    }

    #[test]
    fn test_cast_keeps_i64_edges() {
        assert_eq!(cast(&Value::Float(-I64_BOUND), DataType::Int64).unwrap(), Value::Int(i64::MIN));
        assert!(cast(&Value::Float(I64_BOUND), DataType::Int64).is_err());
    }

    #[test]
    fn test_renamed_rejects_collisions() {
        let names = vec!["x".to_string(), "y".to_string()];
        let mut mapping = DimMapping::new();
        mapping.insert("x".to_string(), Dimension::new("y"));
        assert!(matches!(renamed(&names, &mapping), Err(Error::InvalidArgument(_))));

        mapping.insert("y".to_string(), Dimension::new("x"));
        assert_eq!(renamed(&names, &mapping).unwrap(), vec!["y", "x"]);
    }

    #[test]
    fn test_check_key_dims() {
        let request = DimRequest {
            default_kdims: vec!["x".into(), "y".into()],
            ..DimRequest::default()
        };
        let columns = vec!["x".to_string(), "y".to_string(), "z".to_string()];
        assert!(check_key_dims(&columns, &request).is_ok());
        let err = check_key_dims(&columns[..1], &request).unwrap_err();
        assert!(err.contains("'y'"));
    }
}
