use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::columns::numeric_value;
use super::model::{Column, Entity};

/// Table sort order for one view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "column", rename_all = "lowercase")]
pub enum ColumnSorting {
    #[default]
    None,
    Asc(Column),
    Desc(Column),
}

/// Stable sort of `rows` by the sorting column.
///
/// Continuous columns compare numerically (dates by millis), everything else
/// compares the raw text. Cells that cannot be compared sink to the end in
/// both directions; equal keys keep their input order.
pub fn sort_rows(rows: &mut [&Entity], sorting: &ColumnSorting) {
    let (column, descending) = match sorting {
        ColumnSorting::None => return,
        ColumnSorting::Asc(c) => (c, false),
        ColumnSorting::Desc(c) => (c, true),
    };
    rows.sort_by(|a, b| compare(column, a, b, descending));
}

fn compare(column: &Column, a: &Entity, b: &Entity, descending: bool) -> Ordering {
    let ordered = |ord: Ordering| if descending { ord.reverse() } else { ord };

    if column.column_type.is_continuous() {
        match (numeric_value(column, a), numeric_value(column, b)) {
            (Some(x), Some(y)) => ordered(x.total_cmp(&y)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    } else {
        let x = a.cell(column).filter(|s| !s.is_empty());
        let y = b.cell(column).filter(|s| !s.is_empty());
        match (x, y) {
            (Some(x), Some(y)) => ordered(x.cmp(y)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}
