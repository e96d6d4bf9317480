use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;

use crate::data::columns::{millis_value, text_value};
use crate::data::cross::rows_at;
use crate::data::filter::{Filter, FilterValue, TimeRange};
use crate::data::model::{Column, ColumnType, Entity, EntityTable};
use crate::error::FilterError;

// ---------------------------------------------------------------------------
// Category counts
// ---------------------------------------------------------------------------

/// One bar of a category chart: filtered-in stacked on filtered-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBin {
    pub bin_index: usize,
    pub category: String,
    pub filtered_in: usize,
    pub filtered_out: usize,
}

impl CategoryBin {
    /// Filter selecting just this bar's category.
    pub fn to_filter(&self, column: &Column) -> Result<Filter, FilterError> {
        Filter::new(
            column.clone(),
            FilterValue::Category {
                categories: BTreeSet::from([self.category.clone()]),
            },
        )
    }
}

/// Bars for every category seen in `all_rows`, sorted by category.
/// Empty cells are not counted.
pub fn category_bins(column: &Column, all_rows: &[&Entity], filtered_rows: &[&Entity]) -> Vec<CategoryBin> {
    let all = count_values(column, all_rows);
    let filtered = count_values(column, filtered_rows);

    all.into_iter()
        .enumerate()
        .map(|(bin_index, (category, total))| {
            let filtered_in = filtered.get(category).copied().unwrap_or(0).min(total);
            CategoryBin {
                bin_index,
                category: category.to_string(),
                filtered_in,
                filtered_out: total - filtered_in,
            }
        })
        .collect()
}

fn count_values<'a>(column: &Column, rows: &[&'a Entity]) -> BTreeMap<&'a str, usize> {
    let mut counts = BTreeMap::new();
    for row in rows {
        if let Some(value) = text_value(column, row) {
            *counts.entry(value).or_insert(0) += 1;
        }
    }
    counts
}

// ---------------------------------------------------------------------------
// Interval binning
// ---------------------------------------------------------------------------

/// Equal-width bin layout derived from the full value range only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinEdges {
    pub min: i64,
    pub max: i64,
    /// Unsigned so that the span of the whole `i64` range still fits.
    pub width: u64,
    pub count: usize,
}

impl BinEdges {
    /// Layout for `values` with at most `target` bins; `None` when empty.
    pub fn from_values(values: &[i64], target: usize) -> Option<Self> {
        let min = *values.iter().min()?;
        let max = *values.iter().max()?;
        let range = max.abs_diff(min);
        let target = target.max(1) as u64;

        let width = range.div_ceil(target).max(1);
        let count = if range == 0 {
            1
        } else {
            range.div_ceil(width) as usize
        };
        Some(Self {
            min,
            max,
            width,
            count,
        })
    }

    /// Bin of a value; values at or past the top edge land in the last bin.
    pub fn index_of(&self, millis: i64) -> usize {
        if millis <= self.min {
            return 0;
        }
        let i = millis.abs_diff(self.min) / self.width;
        usize::try_from(i).unwrap_or(usize::MAX).min(self.count - 1)
    }

    /// `[x0, x1)` of bin `i`; the last bin ends at `max` and is closed.
    pub fn bounds(&self, i: usize) -> (i64, i64) {
        let x0 = self.offset(i);
        let x1 = if i + 1 >= self.count {
            self.max
        } else {
            self.offset(i + 1)
        };
        (x0, x1)
    }

    /// Lower edge of bin `i`, never past `max`.
    fn offset(&self, i: usize) -> i64 {
        let edge = self.min as i128 + self.width as i128 * i as i128;
        edge.min(self.max as i128) as i64
    }
}

/// One bar of a date/timestamp histogram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntervalBin {
    pub bin_index: usize,
    pub x0: i64,
    pub x1: i64,
    pub filtered_in: usize,
    pub filtered_out: usize,
    /// Last bin of the layout; its upper edge is inclusive.
    pub is_last: bool,
}

impl IntervalBin {
    /// Filter selecting this bin's interval.
    pub fn to_filter(&self, column: &Column) -> Result<Filter, FilterError> {
        let range = TimeRange {
            millis_from: Some(self.x0),
            millis_to: Some(self.x1),
            to_inclusive: self.is_last,
        };
        let value = match column.column_type {
            ColumnType::Timestamp => FilterValue::Timestamp(range),
            _ => FilterValue::Date(range),
        };
        Filter::new(column.clone(), value)
    }
}

/// Histogram of a temporal column. Bin edges come from `all_rows` alone, so
/// changing the filtered subset never moves them. The closed last bin always
/// holds the maximum, so no trailing bin is ever empty.
pub fn interval_bins(
    column: &Column,
    all_rows: &[&Entity],
    filtered_rows: &[&Entity],
    target: usize,
) -> Vec<IntervalBin> {
    let all: Vec<i64> = all_rows.iter().filter_map(|r| millis_value(column, r)).collect();
    let Some(edges) = BinEdges::from_values(&all, target) else {
        return Vec::new();
    };

    let mut totals = vec![0usize; edges.count];
    for &m in &all {
        totals[edges.index_of(m)] += 1;
    }
    let mut kept = vec![0usize; edges.count];
    for m in filtered_rows.iter().filter_map(|r| millis_value(column, r)) {
        if (edges.min..=edges.max).contains(&m) {
            kept[edges.index_of(m)] += 1;
        }
    }

    (0..edges.count)
        .map(|i| {
            let (x0, x1) = edges.bounds(i);
            let filtered_in = kept[i].min(totals[i]);
            IntervalBin {
                bin_index: i,
                x0,
                x1,
                filtered_in,
                filtered_out: totals[i] - filtered_in,
                is_last: i + 1 == edges.count,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Histogram – what the background worker produces per column
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "bins", rename_all = "lowercase")]
pub enum Histogram {
    /// Nothing computed yet, or the column has no chart.
    #[default]
    Empty,
    Categories(Vec<CategoryBin>),
    Intervals(Vec<IntervalBin>),
}

impl Histogram {
    pub fn len(&self) -> usize {
        match self {
            Histogram::Empty => 0,
            Histogram::Categories(bins) => bins.len(),
            Histogram::Intervals(bins) => bins.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Filter for a clicked bar.
    pub fn bin_filter(&self, column: &Column, bin_index: usize) -> Option<Result<Filter, FilterError>> {
        match self {
            Histogram::Empty => None,
            Histogram::Categories(bins) => bins.get(bin_index).map(|b| b.to_filter(column)),
            Histogram::Intervals(bins) => bins.get(bin_index).map(|b| b.to_filter(column)),
        }
    }
}

/// Whether a column type gets a chart at all.
pub fn has_histogram(column_type: ColumnType) -> bool {
    matches!(
        column_type,
        ColumnType::Category | ColumnType::Date | ColumnType::Timestamp
    )
}

/// Input of one histogram computation. Holds shared snapshots so the
/// counting can run off the caller's thread.
#[derive(Debug, Clone)]
pub struct HistogramJob {
    pub table: Arc<EntityTable>,
    pub column: Column,
    pub filtered: Arc<Vec<usize>>,
    pub bin_count: usize,
}

pub fn build_histogram(job: &HistogramJob) -> Histogram {
    let all: Vec<&Entity> = job.table.rows.iter().collect();
    let filtered = rows_at(&job.table, &job.filtered);
    match job.column.column_type {
        ColumnType::Category => Histogram::Categories(category_bins(&job.column, &all, &filtered)),
        ColumnType::Date | ColumnType::Timestamp => {
            Histogram::Intervals(interval_bins(&job.column, &all, &filtered, job.bin_count))
        }
        _ => Histogram::Empty,
    }
}
