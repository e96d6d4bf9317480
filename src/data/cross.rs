use std::collections::HashSet;

use super::filter::{Filter, filtered_indices};
use super::model::{Entity, EntityKind, EntityTable};

// ---------------------------------------------------------------------------
// Cross-filtering across the patient ↔ event link
// ---------------------------------------------------------------------------

/// Indices of the rows of both tables that survive the active filters.
///
/// The active filters belong to the table of the active view. The other
/// table follows through the `pid` link:
/// * patients view: events are kept when their patient passed the filters;
/// * events view: patients are kept when at least one of their events passed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrossFiltered {
    pub patients: Vec<usize>,
    pub events: Vec<usize>,
}

pub fn cross_filter(
    patients: &EntityTable,
    events: &EntityTable,
    view: EntityKind,
    filters: &[Filter],
) -> CrossFiltered {
    if filters.is_empty() {
        return CrossFiltered {
            patients: (0..patients.len()).collect(),
            events: (0..events.len()).collect(),
        };
    }

    match view {
        EntityKind::Patients => {
            let kept = filtered_indices(patients, filters);
            let pids = pid_set(patients, &kept);
            CrossFiltered {
                events: linked_indices(events, &pids),
                patients: kept,
            }
        }
        EntityKind::Events => {
            let kept = filtered_indices(events, filters);
            let pids = pid_set(events, &kept);
            CrossFiltered {
                patients: linked_indices(patients, &pids),
                events: kept,
            }
        }
    }
}

/// Resolve row indices back to entities, keeping their order.
pub fn rows_at<'a>(table: &'a EntityTable, indices: &[usize]) -> Vec<&'a Entity> {
    indices.iter().filter_map(|&i| table.rows.get(i)).collect()
}

/// Patient ids referenced by the rows at `indices` through the `pid` column.
fn pid_set<'a>(table: &'a EntityTable, indices: &[usize]) -> HashSet<&'a str> {
    let Some(pid) = table.pid_column() else {
        log::warn!("{} table has no pid column; cross-filter link is empty", table.kind);
        return HashSet::new();
    };
    rows_at(table, indices)
        .into_iter()
        .filter_map(|row| row.cell(pid))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Rows of `table` whose `pid` cell is in `pids`, in table order.
fn linked_indices(table: &EntityTable, pids: &HashSet<&str>) -> Vec<usize> {
    let Some(pid) = table.pid_column() else {
        return Vec::new();
    };
    table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| row.cell(pid).is_some_and(|p| pids.contains(p)))
        .map(|(i, _)| i)
        .collect()
}
