use std::collections::BTreeMap;

use serde::Serialize;

use crate::color::{ColorMap, Rgb};
use crate::config::ExplorerConfig;
use crate::data::columns::millis_value;
use crate::data::model::{Column, ColumnType, EntityId, EntityTable};

/// One mark on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub entity_id: EntityId,
    pub millis: i64,
    pub color: Rgb,
    pub is_filtered_out: bool,
}

/// All events of one patient, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineLane {
    pub pid: EntityId,
    pub events: Vec<TimelineEvent>,
}

impl TimelineLane {
    pub fn first_millis(&self) -> Option<i64> {
        self.events.first().map(|e| e.millis)
    }
}

/// Time axis of the event table: the first timestamp column, else the
/// first date column.
pub fn time_column(events: &EntityTable) -> Option<&Column> {
    events
        .first_column_of(ColumnType::Timestamp)
        .or_else(|| events.first_column_of(ColumnType::Date))
}

pub struct TimelineContext<'a> {
    pub events: &'a EntityTable,
    /// Cross-filtered event indices.
    pub filtered: &'a [usize],
    pub colors: &'a ColorMap,
    pub config: &'a ExplorerConfig,
    pub show_filtered_out: bool,
}

/// Group events into one lane per patient.
///
/// Events without a pid or a parsable time are left out. Within a lane the
/// sort by time is stable, so simultaneous events keep table order. Lanes
/// are ordered by their first event, ties broken by pid.
pub fn timeline_lanes(ctx: &TimelineContext<'_>) -> Vec<TimelineLane> {
    let (Some(time), Some(pid)) = (time_column(ctx.events), ctx.events.pid_column()) else {
        log::debug!("event table lacks a time or pid column, timeline is empty");
        return Vec::new();
    };

    let mut kept = vec![false; ctx.events.len()];
    for &i in ctx.filtered {
        if let Some(slot) = kept.get_mut(i) {
            *slot = true;
        }
    }

    let mut lanes: BTreeMap<&str, Vec<TimelineEvent>> = BTreeMap::new();
    for (entity, &is_kept) in ctx.events.rows.iter().zip(&kept) {
        if !is_kept && !ctx.show_filtered_out {
            continue;
        }
        let Some(patient) = entity.cell(pid).filter(|p| !p.is_empty()) else {
            continue;
        };
        let Some(millis) = millis_value(time, entity) else {
            continue;
        };
        let color = if is_kept {
            ctx.colors.color_for(entity)
        } else {
            ctx.config.filtered_out_color
        };
        lanes.entry(patient).or_default().push(TimelineEvent {
            entity_id: entity.uid.clone(),
            millis,
            color,
            is_filtered_out: !is_kept,
        });
    }

    let mut lanes: Vec<TimelineLane> = lanes
        .into_iter()
        .map(|(pid, mut events)| {
            events.sort_by_key(|e| e.millis);
            TimelineLane {
                pid: EntityId::from(pid),
                events,
            }
        })
        .collect();
    // Lanes arrive sorted by pid; a stable sort keeps that as the tie-break.
    lanes.sort_by_key(|lane| lane.first_millis());
    lanes
}

/// The lane of one patient, for the patient journey view.
pub fn journey(ctx: &TimelineContext<'_>, pid: &str) -> Option<TimelineLane> {
    timeline_lanes(ctx).into_iter().find(|lane| lane.pid.as_str() == pid)
}
