//! Multi-path datasets over the real backends

use std::sync::Arc;

use multipath_backends::{default_registry, ColumnTable, LazyFrame, COLUMNS, LAZY, RECORDS};
use multipath_core::{
    max_range, Constraint, DataType, DimMapping, DimRef, Dimension, Element, Entry, Error, MultiConfig,
    MultiDataset, Range, RawData, Selection, SplitPart, Table, Value, Values,
};
use proptest::prelude::*;
use serde_json::json;
use test_case::test_case;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

fn multi(element: Element, data: Vec<serde_json::Value>) -> MultiDataset {
    init_tracing();
    let data: Vec<RawData> = data.into_iter().map(RawData::Json).collect();
    MultiDataset::new(element, &data, default_registry().unwrap()).unwrap()
}

/// One path per backend: records, columns, then a two-partition lazy frame
fn mixed() -> MultiDataset {
    multi(
        Element::path(),
        vec![
            json!([{"x": 0, "y": 0}, {"x": 1, "y": 1}]),
            json!({"x": [2, 3, 4], "y": [4, 9, 16]}),
            json!({"partitions": [{"x": [5], "y": [25]}, {"x": [6], "y": [36]}]}),
        ],
    )
}

#[test]
fn test_paths_route_to_their_backends() {
    let multi = mixed();
    let datatypes: Vec<_> = multi.paths().iter().map(Table::datatype).collect();
    assert_eq!(datatypes, vec![RECORDS, COLUMNS, LAZY]);
    assert_eq!(multi.extras().get("npartitions"), Some(&json!(2)));
}

#[test]
fn test_length_counts_separators() {
    let multi = mixed();
    assert_eq!(multi.length().unwrap(), 2 + 3 + 2 + 2);
    assert_eq!(multi.shape().unwrap(), (9, 2));
    assert!(multi.nonzero().unwrap());
}

#[test]
fn test_expanded_values_break_between_paths() {
    let values = mixed().values("x", true, true).unwrap();
    assert_eq!(values.break_count(), 2);
    assert_eq!(values.len(), mixed().length().unwrap());

    let Values::Expanded(entries) = values else {
        panic!("expected an expanded sequence");
    };
    assert_eq!(entries[2], Entry::Break);
    assert_eq!(entries[6], Entry::Break);
    assert_eq!(entries[7], Entry::Value(Value::Int(5)));

    let numeric = Values::Expanded(entries).to_f64_nan();
    assert!(numeric[2].is_nan());
    assert_eq!(numeric[8], 6.0);
}

#[test]
fn test_unique_values_per_path() {
    let multi = multi(
        Element::path(),
        vec![
            json!({"x": [0, 0, 1], "y": [1, 1, 1]}),
            json!([{"x": 7, "y": 2}, {"x": 7, "y": 2}]),
        ],
    );
    let values = multi.values("x", false, true).unwrap();
    assert_eq!(
        values,
        Values::PerPath(vec![vec![Value::Int(0), Value::Int(1)], vec![Value::Int(7)]])
    );
}

#[test]
fn test_range_spans_all_paths() {
    let multi = mixed();
    assert_eq!(multi.range("y").unwrap(), Range::new(0, 36));
    assert_eq!(multi.range(0).unwrap(), Range::new(0, 6));
}

#[test]
fn test_level_overrides_first_vdim_range() {
    init_tracing();
    let data = vec![
        RawData::Json(json!({"x": [0, 1], "y": [0, 1], "z": [3, 4]})),
        RawData::Json(json!({"x": [2], "y": [2], "z": [9]})),
    ];
    let multi = MultiDataset::builder(Element::contours())
        .level(0.5)
        .registry(default_registry().unwrap())
        .build(&data)
        .unwrap();

    assert_eq!(multi.vdims()[0].name, "z");
    assert_eq!(multi.range("z").unwrap(), Range::point(Value::Float(0.5)));
    assert_eq!(multi.range("x").unwrap(), Range::new(0, 2));
}

#[test]
fn test_select_keeps_path_order() {
    let multi = mixed();
    let selection = Selection::new().with("x", Constraint::between(1, 6));
    let selected = multi.select_into(&selection).unwrap();

    assert_eq!(selected.path_count(), 3);
    let datatypes: Vec<_> = selected.paths().iter().map(Table::datatype).collect();
    assert_eq!(datatypes, vec![RECORDS, COLUMNS, LAZY]);
    // 1 | 2 3 4 | 5 with two separators
    assert_eq!(selected.length().unwrap(), 1 + 3 + 1 + 2);
}

#[test]
fn test_redim_renames_every_backend() {
    let multi = mixed();
    let mut mapping = DimMapping::new();
    mapping.insert("y".to_string(), Dimension::new("depth").with_type(DataType::Float64));
    let renamed = multi.redim_into(&mapping).unwrap();

    assert_eq!(renamed.dims().names(), vec!["x", "depth"]);
    assert_eq!(renamed.dimension_type("depth").unwrap(), DataType::Float64);
    let values = renamed.values("depth", true, true).unwrap().to_f64_nan();
    assert_eq!(values[values.len() - 1], 36.0);
}

#[test]
fn test_split_round_trip() {
    let multi = mixed();
    let parts = multi.split(None, None).unwrap();
    assert_eq!(parts.len(), 3);

    let rejoined = Values::join(parts.iter().map(|part| match part {
        SplitPart::Path(dataset) => dataset.values("y", true, true).unwrap(),
        SplitPart::Whole(_) => panic!("open paths split into single datasets"),
    }));
    assert_eq!(rejoined, multi.values("y", true, true).unwrap());
}

#[test_case(Some(1), None, 2 ; "open end")]
#[test_case(None, Some(1), 1 ; "open start")]
#[test_case(Some(2), Some(99), 1 ; "end clamped")]
#[test_case(Some(5), None, 0 ; "start past end")]
fn test_split_bounds(start: Option<usize>, end: Option<usize>, expected: usize) {
    assert_eq!(mixed().split(start, end).unwrap().len(), expected);
}

#[test]
fn test_closed_shape_does_not_split() {
    let multi = multi(
        Element::shape(),
        vec![
            json!({"x": [0, 1, 1, 0], "y": [0, 0, 1, 1]}),
            json!({"x": [2, 3, 3, 2], "y": [2, 2, 3, 3]}),
        ],
    );
    let parts = multi.split(Some(0), Some(1)).unwrap();
    assert_eq!(parts.len(), 1);
    let SplitPart::Whole(whole) = &parts[0] else {
        panic!("closed shapes come back whole");
    };
    assert_eq!(whole.path_count(), 2);
    assert_eq!(parts[0].values("x", true).unwrap().break_count(), 1);
}

#[test]
fn test_row_reductions_are_unsupported() {
    let multi = mixed();
    let aggregate = multi.aggregate(&[DimRef::from("x")], |values: &[Value]| values[0].clone());
    assert!(matches!(aggregate, Err(Error::UnsupportedOperation(_))));
    assert!(matches!(multi.groupby(&[DimRef::from("x")]), Err(Error::UnsupportedOperation(_))));
    assert!(matches!(multi.sample(&[vec![Value::Int(0)]]), Err(Error::UnsupportedOperation(_))));
}

#[test]
fn test_empty_composite() {
    let multi = multi(Element::path(), Vec::new());
    assert_eq!(multi.length().unwrap(), 0);
    assert_eq!(multi.shape().unwrap(), (0, 2));
    assert!(multi.range("x").unwrap().is_empty());
    assert_eq!(multi.dimension_type("x").unwrap(), DataType::Float64);
    assert!(multi.values("x", true, true).unwrap().is_empty());
    assert!(multi.split(None, None).unwrap().is_empty());
}

#[test]
fn test_unresolvable_path_reports_every_backend() {
    init_tracing();
    let data = vec![RawData::Json(json!({"x": [0], "y": [0]})), RawData::Json(json!("nope"))];
    let err = MultiDataset::new(Element::path(), &data, default_registry().unwrap()).unwrap_err();
    let Error::UnresolvableBackend { index, reasons } = err else {
        panic!("expected an unresolvable path");
    };
    assert_eq!(index, 1);
    assert_eq!(reasons.len(), 3);
}

#[test]
fn test_prebuilt_tables_resolve_to_their_backend() {
    init_tracing();
    let columns = ColumnTable::new(vec![
        ("x".to_string(), vec![Value::Int(0), Value::Int(1)]),
        ("y".to_string(), vec![Value::Int(2), Value::Int(3)]),
    ])
    .unwrap();
    let frame = LazyFrame::new(vec![columns.clone(), columns.clone()]).unwrap();
    let data = vec![
        RawData::Table(Table::new(COLUMNS, columns)),
        RawData::Table(Table::new(LAZY, frame)),
    ];
    let multi = MultiDataset::new(Element::path(), &data, default_registry().unwrap()).unwrap();
    assert_eq!(multi.length().unwrap(), 2 + 4 + 1);
}

#[test]
fn test_schema_validation_is_opt_in() {
    init_tracing();
    let data = vec![
        RawData::Json(json!({"x": [0], "y": [0], "z": [1]})),
        RawData::Json(json!({"x": [1], "y": [1], "z": [2]})),
        RawData::Json(json!({"x": [2], "y": [2], "w": [3]})),
    ];
    let registry = default_registry().unwrap();

    // Dimensions come from the last path
    let lenient = MultiDataset::new(Element::path(), &data, Arc::clone(&registry)).unwrap();
    assert_eq!(lenient.dims().names(), vec!["x", "y", "w"]);

    let config = MultiConfig {
        validate_schemas: true,
        ..MultiConfig::default()
    };
    let err = MultiDataset::builder(Element::path())
        .registry(registry)
        .config(config)
        .build(&data)
        .unwrap_err();
    assert!(matches!(err, Error::SchemaMismatch(message) if message.contains("path 0")));
}

fn path_strategy() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(-1000i64..1000, 0..8)
}

fn as_json(xs: &[i64], backend: usize) -> serde_json::Value {
    let ys: Vec<i64> = xs.iter().map(|x| x * 2).collect();
    match backend % 3 {
        0 => json!(xs.iter().zip(&ys).map(|(x, y)| json!({"x": x, "y": y})).collect::<Vec<_>>()),
        1 => json!({"x": xs, "y": ys}),
        _ => json!({"partitions": [{"x": xs, "y": ys}]}),
    }
}

proptest! {
    #[test]
    fn prop_composite_folds_paths(paths in prop::collection::vec(path_strategy(), 1..6)) {
        let data = paths
            .iter()
            .enumerate()
            .map(|(i, xs)| as_json(xs, i))
            .collect();
        let multi = multi(Element::path(), data);

        let rows: usize = paths.iter().map(Vec::len).sum();
        prop_assert_eq!(multi.length().unwrap(), rows + paths.len() - 1);

        let values = multi.values("x", true, true).unwrap();
        prop_assert_eq!(values.break_count(), paths.len() - 1);
        prop_assert_eq!(values.len(), multi.length().unwrap());

        let per_path = paths.iter().map(|xs| Range::of_values(&xs.iter().map(|x| Value::Int(*x)).collect::<Vec<_>>()).unwrap());
        prop_assert_eq!(multi.range("x").unwrap(), max_range(per_path).unwrap());

        let parts = multi.split(None, None).unwrap();
        prop_assert_eq!(parts.len(), paths.len());
    }
}

#[test]
fn test_redim_onto_existing_name_fails() {
    let multi = mixed();
    let mut mapping = DimMapping::new();
    mapping.insert("x".to_string(), Dimension::new("y"));
    let err = multi.redim_into(&mapping).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(message) if message.contains("'y'")));
    assert_eq!(multi.dims().names(), vec!["x", "y"]);
}

#[test]
fn test_polygons_keep_value_metadata() {
    let element = Element::polygons().with_vdims(vec![Dimension::new("value").with_unit("K")]);
    let multi = multi(
        element,
        vec![
            json!({"x": [0, 1, 1], "y": [0, 0, 1], "value": [270.5, 270.5, 270.5]}),
            json!([{"x": 2, "y": 2, "value": 300.5}, {"x": 3, "y": 2, "value": 300.5}]),
        ],
    );
    assert_eq!(multi.element().name, "Polygons");
    assert_eq!(multi.vdims()[0].name, "value");
    assert_eq!(multi.vdims()[0].unit.as_deref(), Some("K"));
    assert_eq!(multi.range("value").unwrap(), Range::new(270.5, 300.5));
}

#[cfg(feature = "parallel")]
fn expanded(paths: &[Vec<i64>]) -> Values {
    Values::join(paths.iter().map(|xs| xs.iter().map(|x| Value::Int(*x)).collect()))
}

#[cfg(feature = "parallel")]
#[test]
fn test_parallel_dispatch_keeps_path_order() {
    init_tracing();
    let paths: Vec<Vec<i64>> = (0..12i64).map(|i| (0..=i % 3).map(|j| i * 10 + j).collect()).collect();
    let data: Vec<RawData> = paths
        .iter()
        .enumerate()
        .map(|(i, xs)| RawData::Json(as_json(xs, i)))
        .collect();
    let config = MultiConfig {
        parallel_threshold: 1,
        ..MultiConfig::default()
    };
    let multi = MultiDataset::builder(Element::path())
        .registry(default_registry().unwrap())
        .config(config)
        .build(&data)
        .unwrap();

    let rows: usize = paths.iter().map(Vec::len).sum();
    assert_eq!(multi.length().unwrap(), rows + paths.len() - 1);

    let values = multi.values("x", true, true).unwrap();
    assert_eq!(values, expanded(&paths));
    let Values::Expanded(entries) = &values else {
        panic!("expected an expanded sequence");
    };
    assert_eq!(entries[1], Entry::Break);
    assert_eq!(entries[2], Entry::Value(Value::Int(10)));

    let selection = Selection::new().with("x", Constraint::between(0, 59));
    let selected = multi.select_into(&selection).unwrap();
    assert_eq!(selected.path_count(), paths.len());
    let kept: Vec<Vec<i64>> = paths
        .iter()
        .map(|xs| xs.iter().copied().filter(|x| *x <= 59).collect())
        .collect();
    assert_eq!(selected.values("x", true, true).unwrap(), expanded(&kept));

    let mut mapping = DimMapping::new();
    mapping.insert("x".to_string(), Dimension::new("lon"));
    let renamed = multi.redim_into(&mapping).unwrap();
    assert_eq!(renamed.values("lon", true, true).unwrap(), multi.values("x", true, true).unwrap());
}
