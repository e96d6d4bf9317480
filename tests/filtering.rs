//! Filter reducer behaviour over a two-row patient table.

use std::collections::BTreeSet;

use cohort_explorer::data::filter::{reduce, reduce_all, Filter, FilterValue, TimeRange};
use cohort_explorer::data::model::{Column, ColumnType, Entity, EntityId};
use cohort_explorer::error::FilterError;

fn rows() -> Vec<Entity> {
    let row = |uid: &str, values: [&str; 7]| {
        Entity::new(uid, values.iter().map(|v| v.to_string()).collect())
    };
    vec![
        row("1", ["Jessica", "25", "false", "31.12.2019", "1648555453169", "A", "100"]),
        row("2", ["Peter", "31", "true", "31.12.2018", "1648552453169", "B", "101"]),
    ]
}

fn column(index: usize) -> Column {
    let (name, column_type) = [
        ("Name", ColumnType::String),
        ("Age", ColumnType::Number),
        ("Is alive", ColumnType::Boolean),
        ("Birthday", ColumnType::Date),
        ("Timestamp", ColumnType::Timestamp),
        ("Blood Type", ColumnType::Category),
        ("Patient ID", ColumnType::Pid),
    ][index];
    Column::new(name, column_type, index)
}

/// Uids of the rows passing a filter on column `index`.
fn passing(index: usize, value: FilterValue) -> Vec<String> {
    let data = rows();
    let filter = Filter::new(column(index), value).unwrap();
    reduce(&data, &filter)
        .into_iter()
        .map(|e| e.uid.to_string())
        .collect()
}

fn text(t: &str) -> FilterValue {
    FilterValue::String { text: t.into() }
}

fn number(from: f64, to: f64, to_inclusive: bool) -> FilterValue {
    FilterValue::Number { from, to, to_inclusive }
}

fn range(from: Option<i64>, to: Option<i64>, to_inclusive: bool) -> TimeRange {
    TimeRange { millis_from: from, millis_to: to, to_inclusive }
}

fn categories(values: &[&str]) -> FilterValue {
    FilterValue::Category {
        categories: values.iter().map(|v| v.to_string()).collect(),
    }
}

// -- string ----------------------------------------------------------------

#[test]
fn string_filter_matches_substring() {
    assert_eq!(passing(0, text("p")), ["2"]);
}

#[test]
fn string_filter_ignores_case() {
    assert_eq!(passing(0, text("P")), ["2"]);
}

#[test]
fn empty_string_filter_keeps_everything() {
    assert_eq!(passing(0, text("")), ["1", "2"]);
}

// -- pid -------------------------------------------------------------------

#[test]
fn pid_filter_matches_pid_column_value() {
    let uids = BTreeSet::from([EntityId::from("100")]);
    assert_eq!(passing(6, FilterValue::Pid { uids }), ["1"]);
}

// -- number ----------------------------------------------------------------

#[test]
fn number_filter_keeps_values_in_range() {
    assert_eq!(passing(1, number(23.0, 30.0, true)), ["1"]);
}

#[test]
fn number_filter_lower_bound_is_inclusive() {
    assert_eq!(passing(1, number(25.0, 30.0, true)), ["1"]);
}

#[test]
fn number_filter_upper_bound_inclusive_when_asked() {
    assert_eq!(passing(1, number(23.0, 25.0, true)), ["1"]);
}

#[test]
fn number_filter_upper_bound_exclusive_by_flag() {
    assert!(passing(1, number(23.0, 25.0, false)).is_empty());
}

#[test]
fn nan_number_bound_is_disabled() {
    assert_eq!(passing(1, number(f64::NAN, 30.0, true)), ["1"]);
    assert_eq!(passing(1, number(30.0, f64::NAN, false)), ["2"]);
}

// -- boolean ---------------------------------------------------------------

#[test]
fn boolean_filter_true() {
    assert_eq!(passing(2, FilterValue::Boolean { is_true: true }), ["2"]);
}

#[test]
fn boolean_filter_false() {
    assert_eq!(passing(2, FilterValue::Boolean { is_true: false }), ["1"]);
}

// -- date ------------------------------------------------------------------

#[test]
fn date_filter_keeps_dates_in_range() {
    let r = range(Some(1577660400000), Some(1580511600000), true);
    assert_eq!(passing(3, FilterValue::Date(r)), ["1"]);
}

#[test]
fn date_filter_without_upper_bound() {
    let r = range(Some(1577660400000), None, true);
    assert_eq!(passing(3, FilterValue::Date(r)), ["1"]);
}

#[test]
fn date_filter_without_lower_bound() {
    let r = range(None, Some(1577660400000), true);
    assert_eq!(passing(3, FilterValue::Date(r)), ["2"]);
}

#[test]
fn date_filter_lower_bound_is_inclusive() {
    let r = range(Some(1577746800000), Some(1580511600000), true);
    assert_eq!(passing(3, FilterValue::Date(r)), ["1"]);
}

#[test]
fn date_filter_upper_bound_inclusive_when_asked() {
    let r = range(Some(1577660400000), Some(1577750400000), true);
    assert_eq!(passing(3, FilterValue::Date(r)), ["1"]);
}

#[test]
fn date_filter_with_exclusive_upper_bound() {
    let r = range(Some(1546041600000), Some(1546124399999), false);
    assert!(passing(3, FilterValue::Date(r)).is_empty());
}

// -- timestamp -------------------------------------------------------------

#[test]
fn timestamp_filter_keeps_values_in_range() {
    let r = range(Some(1648555453168), Some(1648555453170), true);
    assert_eq!(passing(4, FilterValue::Timestamp(r)), ["1"]);
}

#[test]
fn timestamp_filter_without_upper_bound() {
    let r = range(Some(1648555453168), None, true);
    assert_eq!(passing(4, FilterValue::Timestamp(r)), ["1"]);
}

#[test]
fn timestamp_filter_without_lower_bound() {
    let r = range(None, Some(1648555453168), true);
    assert_eq!(passing(4, FilterValue::Timestamp(r)), ["2"]);
}

#[test]
fn timestamp_filter_lower_bound_is_inclusive() {
    let r = range(Some(1648555453169), Some(1648555453172), true);
    assert_eq!(passing(4, FilterValue::Timestamp(r)), ["1"]);
}

#[test]
fn timestamp_filter_upper_bound_inclusive_when_asked() {
    let r = range(Some(1648555453168), Some(1648555453169), true);
    assert_eq!(passing(4, FilterValue::Timestamp(r)), ["1"]);
}

#[test]
fn timestamp_filter_upper_bound_exclusive_by_flag() {
    let r = range(Some(1648555453168), Some(1648555453169), false);
    assert!(passing(4, FilterValue::Timestamp(r)).is_empty());
}

// -- category --------------------------------------------------------------

#[test]
fn category_filter_single_value() {
    assert_eq!(passing(5, categories(&["A"])), ["1"]);
}

#[test]
fn unknown_category_gives_empty_result() {
    assert!(passing(5, categories(&["O−"])).is_empty());
}

#[test]
fn category_filter_multiple_values() {
    assert_eq!(passing(5, categories(&["A", "B"])), ["1", "2"]);
}

// -- composition and construction ------------------------------------------

#[test]
fn filters_combine_with_and() {
    let data = rows();
    let filters = [
        Filter::new(column(5), categories(&["A", "B"])).unwrap(),
        Filter::new(column(2), FilterValue::Boolean { is_true: true }).unwrap(),
    ];
    let kept: Vec<&str> = reduce_all(&data, &filters)
        .into_iter()
        .map(|e| e.uid.as_str())
        .collect();
    assert_eq!(kept, ["2"]);
}

#[test]
fn mismatched_value_type_is_rejected() {
    let err = Filter::new(column(1), text("25")).unwrap_err();
    assert_eq!(
        err,
        FilterError::TypeMismatch {
            column: "Age".into(),
            expected: ColumnType::Number,
            found: ColumnType::String,
        }
    );
}

#[test]
fn unparsable_cells_never_match() {
    let cells = ["", "n/a", "maybe", "soon", "later", "", ""];
    let data = vec![Entity::new("x", cells.iter().map(|c| c.to_string()).collect())];
    for (index, value) in [
        (1, number(f64::NAN, f64::NAN, true)),
        (2, FilterValue::Boolean { is_true: false }),
        (3, FilterValue::Date(range(None, None, true))),
        (4, FilterValue::Timestamp(range(None, None, true))),
    ] {
        let filter = Filter::new(column(index), value).unwrap();
        assert!(reduce(&data, &filter).is_empty(), "column {index} matched");
    }
}
