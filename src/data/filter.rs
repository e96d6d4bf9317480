use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::columns::{parse_bool, parse_millis, parse_number};
use super::model::{Column, ColumnType, Entity, EntityId, EntityTable};
use crate::error::FilterError;

// ---------------------------------------------------------------------------
// Filter values: one criterion shape per column type
// ---------------------------------------------------------------------------

/// Interval over epoch milliseconds. `None` leaves that side unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    pub millis_from: Option<i64>,
    pub millis_to: Option<i64>,
    pub to_inclusive: bool,
}

impl TimeRange {
    pub fn contains(&self, millis: i64) -> bool {
        let above = self.millis_from.map_or(true, |from| from <= millis);
        let below = match self.millis_to {
            None => true,
            Some(to) if self.to_inclusive => millis <= to,
            Some(to) => millis < to,
        };
        above && below
    }
}

/// Type-specific criterion of a [`Filter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "lowercase",
    rename_all_fields = "camelCase"
)]
pub enum FilterValue {
    /// Case-insensitive substring.
    String { text: String },
    /// `from` is inclusive; a NaN bound is disabled.
    Number {
        #[serde(with = "nan_as_null", default = "disabled_bound")]
        from: f64,
        #[serde(with = "nan_as_null", default = "disabled_bound")]
        to: f64,
        to_inclusive: bool,
    },
    Boolean { is_true: bool },
    Date(TimeRange),
    Timestamp(TimeRange),
    Category { categories: BTreeSet<String> },
    Pid { uids: BTreeSet<EntityId> },
}

impl FilterValue {
    pub fn column_type(&self) -> ColumnType {
        match self {
            FilterValue::String { .. } => ColumnType::String,
            FilterValue::Number { .. } => ColumnType::Number,
            FilterValue::Boolean { .. } => ColumnType::Boolean,
            FilterValue::Date(_) => ColumnType::Date,
            FilterValue::Timestamp(_) => ColumnType::Timestamp,
            FilterValue::Category { .. } => ColumnType::Category,
            FilterValue::Pid { .. } => ColumnType::Pid,
        }
    }

    /// Inclusion test over one raw cell. Missing or unparsable cells never
    /// match, except for the empty text search which matches everything.
    pub fn accepts(&self, cell: Option<&str>) -> bool {
        match self {
            FilterValue::String { text } => {
                if text.is_empty() {
                    return true;
                }
                cell.is_some_and(|raw| raw.to_lowercase().contains(&text.to_lowercase()))
            }
            FilterValue::Number {
                from,
                to,
                to_inclusive,
            } => {
                let Some(v) = cell.and_then(parse_number) else {
                    return false;
                };
                let above = from.is_nan() || *from <= v;
                let below = to.is_nan() || if *to_inclusive { v <= *to } else { v < *to };
                above && below
            }
            FilterValue::Boolean { is_true } => {
                cell.and_then(parse_bool).is_some_and(|b| b == *is_true)
            }
            FilterValue::Date(range) => cell
                .and_then(|raw| parse_millis(ColumnType::Date, raw))
                .is_some_and(|m| range.contains(m)),
            FilterValue::Timestamp(range) => cell
                .and_then(|raw| parse_millis(ColumnType::Timestamp, raw))
                .is_some_and(|m| range.contains(m)),
            FilterValue::Category { categories } => {
                cell.is_some_and(|raw| categories.contains(raw))
            }
            FilterValue::Pid { uids } => cell.is_some_and(|raw| uids.contains(raw)),
        }
    }
}

fn disabled_bound() -> f64 {
    f64::NAN
}

/// JSON has no NaN; a disabled number bound travels as `null`.
mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_none()
        } else {
            serializer.serialize_some(value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}

// ---------------------------------------------------------------------------
// Filter – a criterion bound to its column
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub column: Column,
    pub value: FilterValue,
}

impl Filter {
    /// Bind `value` to `column`, rejecting a criterion of another type.
    pub fn new(column: Column, value: FilterValue) -> Result<Self, FilterError> {
        let found = value.column_type();
        if found != column.column_type {
            return Err(FilterError::TypeMismatch {
                column: column.name,
                expected: column.column_type,
                found,
            });
        }
        Ok(Self { column, value })
    }

    /// Re-check a filter that arrived through deserialization.
    pub fn validate(self) -> Result<Self, FilterError> {
        Self::new(self.column, self.value)
    }

    pub fn column_type(&self) -> ColumnType {
        self.column.column_type
    }

    pub fn matches(&self, entity: &Entity) -> bool {
        self.value.accepts(entity.cell(&self.column))
    }
}

// ---------------------------------------------------------------------------
// Filter reducer
// ---------------------------------------------------------------------------

/// Rows passing a single filter, in their original order.
pub fn reduce<'a, I>(rows: I, filter: &Filter) -> Vec<&'a Entity>
where
    I: IntoIterator<Item = &'a Entity>,
{
    rows.into_iter().filter(|row| filter.matches(row)).collect()
}

/// Rows passing every filter (logical AND), in their original order.
/// A row stops being tested at the first filter it fails.
pub fn reduce_all<'a, I>(rows: I, filters: &[Filter]) -> Vec<&'a Entity>
where
    I: IntoIterator<Item = &'a Entity>,
{
    rows.into_iter()
        .filter(|row| filters.iter().all(|f| f.matches(row)))
        .collect()
}

/// Return indices of rows that pass all active filters.
pub fn filtered_indices(table: &EntityTable, filters: &[Filter]) -> Vec<usize> {
    table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| filters.iter().all(|f| f.matches(row)))
        .map(|(i, _)| i)
        .collect()
}

// ---------------------------------------------------------------------------
// ActiveFilters – ordered, at most one filter per column name
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActiveFilters {
    filters: Vec<Filter>,
}

impl ActiveFilters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `filter`, replacing in place any filter on the same column.
    pub fn upsert(&mut self, filter: Filter) {
        match self
            .filters
            .iter()
            .position(|f| f.column.name == filter.column.name)
        {
            Some(i) => self.filters[i] = filter,
            None => self.filters.push(filter),
        }
    }

    /// Remove the filter on `column_name`; returns whether one was present.
    pub fn remove(&mut self, column_name: &str) -> bool {
        let before = self.filters.len();
        self.filters.retain(|f| f.column.name != column_name);
        self.filters.len() != before
    }

    pub fn clear(&mut self) {
        self.filters.clear();
    }

    pub fn get(&self, column_name: &str) -> Option<&Filter> {
        self.filters.iter().find(|f| f.column.name == column_name)
    }

    pub fn as_slice(&self) -> &[Filter] {
        &self.filters
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Filter> {
        self.filters.iter()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl<'a> IntoIterator for &'a ActiveFilters {
    type Item = &'a Filter;
    type IntoIter = std::slice::Iter<'a, Filter>;

    fn into_iter(self) -> Self::IntoIter {
        self.filters.iter()
    }
}
