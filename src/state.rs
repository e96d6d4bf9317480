use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::alert::{self, Alert};
use crate::color::{ColorBy, ColorMap};
use crate::config::ExplorerConfig;
use crate::data::cohort::Cohort;
use crate::data::cross::{cross_filter, rows_at};
use crate::data::filter::{ActiveFilters, Filter};
use crate::data::loader::{load_file, LoadedTable};
use crate::data::model::{Entity, EntityId, EntityKind, EntityTable};
use crate::data::sorting::{sort_rows, ColumnSorting};
use crate::error::{FilterError, WorkerError};
use crate::views::bins::{build_histogram, has_histogram, Histogram, HistogramJob};
use crate::views::scatter::{
    brushed_patients, scatter_info, scatter_plot_data, BrushMode, BrushRect, BrushSemantics,
    ScatterContext, ScatterInfo, ScatterPlotData, ScatterPlotState,
};
use crate::views::timeline::{self, TimelineContext, TimelineLane};
use crate::views::worker::Worker;

static NO_HISTOGRAM: Histogram = Histogram::Empty;

// ---------------------------------------------------------------------------
// Load status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadingStep {
    Patients,
    Events,
}

pub enum DataState {
    Pending,
    InProgress(LoadingStep),
    Failed { message: String },
    Complete(Box<Session>),
}

impl DataState {
    pub fn label(&self) -> &'static str {
        match self {
            DataState::Pending => "pending",
            DataState::InProgress(_) => "in-progress",
            DataState::Failed { .. } => "failed",
            DataState::Complete(_) => "complete",
        }
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Everything outside the renderer: load status, alerts and, once both
/// tables are in, the interactive session.
pub struct AppState {
    pub data: DataState,
    pub alerts: Vec<Alert>,
    pub config: ExplorerConfig,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ExplorerConfig::default())
    }
}

impl AppState {
    pub fn new(config: ExplorerConfig) -> Self {
        Self {
            data: DataState::Pending,
            alerts: Vec::new(),
            config,
        }
    }

    /// Load both tables from disk. On failure the state becomes `Failed` and
    /// an error alert is raised; returns whether a session is now available.
    pub fn load_files(&mut self, patients_path: &Path, events_path: &Path) -> bool {
        self.data = DataState::InProgress(LoadingStep::Patients);
        log::info!("Loading patients from {}", patients_path.display());
        let patients = match load_file(patients_path, EntityKind::Patients) {
            Ok(t) => t,
            Err(e) => {
                self.fail(format!("{e:#}"));
                return false;
            }
        };

        self.data = DataState::InProgress(LoadingStep::Events);
        log::info!("Loading events from {}", events_path.display());
        let events = match load_file(events_path, EntityKind::Events) {
            Ok(t) => t,
            Err(e) => {
                self.fail(format!("{e:#}"));
                return false;
            }
        };

        self.set_loaded(patients, events);
        true
    }

    /// Install freshly loaded tables, replacing any previous session.
    pub fn set_loaded(&mut self, patients: LoadedTable, events: LoadedTable) {
        for warning in patients.warnings.iter().chain(&events.warnings) {
            self.alerts
                .push(Alert::warning(alert::DATA_LOADING_WARNING, warning.clone()));
        }
        log::info!(
            "Loaded {} patients and {} events",
            patients.table.len(),
            events.table.len()
        );
        let session = Session::new(patients.table, events.table, self.config.clone());
        self.data = DataState::Complete(Box::new(session));
    }

    fn fail(&mut self, message: String) {
        log::error!("Data loading failed: {message}");
        self.alerts
            .push(Alert::error(alert::DATA_LOADING_ERROR, message.clone()));
        self.data = DataState::Failed { message };
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.data {
            DataState::Complete(session) => Some(&**session),
            _ => None,
        }
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        match &mut self.data {
            DataState::Complete(session) => Some(&mut **session),
            _ => None,
        }
    }

    /// Collect finished background results. Failed computations become
    /// warning alerts; returns whether any histogram changed.
    pub fn poll(&mut self) -> bool {
        let DataState::Complete(session) = &mut self.data else {
            return false;
        };
        let (changed, errors) = session.poll_histograms();
        self.push_worker_errors(errors);
        changed
    }

    /// Block until every requested histogram is computed.
    pub fn wait(&mut self) {
        let DataState::Complete(session) = &mut self.data else {
            return;
        };
        let errors = session.wait_histograms();
        self.push_worker_errors(errors);
    }

    fn push_worker_errors(&mut self, errors: Vec<WorkerError>) {
        self.alerts.extend(
            errors
                .into_iter()
                .map(|e| Alert::warning(alert::HISTOGRAM, e.to_string())),
        );
    }

    pub fn push_alert(&mut self, alert: Alert) {
        self.alerts.push(alert);
    }

    pub fn dismiss_alert(&mut self, index: usize) -> Option<Alert> {
        (index < self.alerts.len()).then(|| self.alerts.remove(index))
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Hovered or selected entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "uid", rename_all = "lowercase")]
pub enum FocusEntity {
    #[default]
    None,
    Patient(EntityId),
    Event(EntityId),
}

impl FocusEntity {
    pub fn patient(&self) -> Option<&EntityId> {
        match self {
            FocusEntity::Patient(uid) => Some(uid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSorting {
    pub patients: ColumnSorting,
    pub events: ColumnSorting,
}

impl TableSorting {
    pub fn get(&self, view: EntityKind) -> &ColumnSorting {
        match view {
            EntityKind::Patients => &self.patients,
            EntityKind::Events => &self.events,
        }
    }
}

/// Interaction state over one pair of loaded tables. Every change goes
/// through a named transition; derived views are recomputed from it.
pub struct Session {
    patients: Arc<EntityTable>,
    events: Arc<EntityTable>,
    config: ExplorerConfig,

    view: EntityKind,
    filters: ActiveFilters,
    hovered: FocusEntity,
    selected: FocusEntity,
    index_patient: Option<EntityId>,
    cohort: Cohort,
    sorting: TableSorting,
    scatter: ScatterPlotState,
    timeline_show_filtered_out: bool,
    color_by: ColorBy,
    patient_colors: ColorMap,
    event_colors: ColorMap,

    /// Cross-filtered row indices, shared with histogram jobs.
    filtered_patients: Arc<Vec<usize>>,
    filtered_events: Arc<Vec<usize>>,
    /// Bumped on every filter change; memo key of the histogram workers.
    revision: u64,
    histograms: BTreeMap<String, Worker<HistogramJob, Histogram>>,
}

impl Session {
    pub fn new(patients: EntityTable, events: EntityTable, config: ExplorerConfig) -> Self {
        let scatter = ScatterPlotState::for_table(&patients, &config);
        let filtered_patients = Arc::new((0..patients.len()).collect());
        let filtered_events = Arc::new((0..events.len()).collect());
        Self {
            patients: Arc::new(patients),
            events: Arc::new(events),
            view: EntityKind::Patients,
            filters: ActiveFilters::new(),
            hovered: FocusEntity::None,
            selected: FocusEntity::None,
            index_patient: None,
            cohort: Cohort::new(),
            sorting: TableSorting::default(),
            scatter,
            timeline_show_filtered_out: true,
            color_by: ColorBy::None,
            patient_colors: ColorMap::uniform(config.default_color),
            event_colors: ColorMap::uniform(config.default_color),
            filtered_patients,
            filtered_events,
            revision: 0,
            histograms: BTreeMap::new(),
            config,
        }
    }

    pub fn patients(&self) -> &EntityTable {
        &self.patients
    }

    pub fn events(&self) -> &EntityTable {
        &self.events
    }

    pub fn table(&self, kind: EntityKind) -> &EntityTable {
        match kind {
            EntityKind::Patients => &self.patients,
            EntityKind::Events => &self.events,
        }
    }

    pub fn view(&self) -> EntityKind {
        self.view
    }

    pub fn filters(&self) -> &ActiveFilters {
        &self.filters
    }

    pub fn hovered(&self) -> &FocusEntity {
        &self.hovered
    }

    pub fn selected(&self) -> &FocusEntity {
        &self.selected
    }

    pub fn index_patient(&self) -> Option<&EntityId> {
        self.index_patient.as_ref()
    }

    pub fn cohort(&self) -> &Cohort {
        &self.cohort
    }

    pub fn sorting(&self) -> &TableSorting {
        &self.sorting
    }

    pub fn scatter_state(&self) -> &ScatterPlotState {
        &self.scatter
    }

    pub fn color_by(&self) -> &ColorBy {
        &self.color_by
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    // -- focus --------------------------------------------------------------

    pub fn set_hovered(&mut self, focus: FocusEntity) {
        self.hovered = focus;
    }

    /// Select an entity; selecting the current selection again clears it.
    pub fn set_selected(&mut self, focus: FocusEntity) {
        if focus == self.selected {
            self.selected = FocusEntity::None;
        } else {
            self.selected = focus;
        }
    }

    // -- filters ------------------------------------------------------------

    /// Add or replace the filter of a column of the active view's table.
    pub fn add_filter(&mut self, filter: Filter) -> Result<(), FilterError> {
        let known = self
            .table(self.view)
            .column(&filter.column.name)
            .is_some_and(|c| *c == filter.column);
        if !known {
            return Err(FilterError::UnknownColumn {
                column: filter.column.name.clone(),
                table: self.view,
            });
        }
        let filter = filter.validate()?;
        log::debug!("Filter on '{}' set", filter.column.name);
        self.filters.upsert(filter);
        self.refilter();
        Ok(())
    }

    /// Drop the filter of `column_name`; absent columns are a no-op.
    pub fn remove_filter(&mut self, column_name: &str) {
        if self.filters.remove(column_name) {
            self.refilter();
        }
    }

    pub fn reset_filters(&mut self) {
        if !self.filters.is_empty() {
            self.filters.clear();
            self.refilter();
        }
    }

    /// Switch between patient and event view. Filters belong to one table,
    /// so they are cleared, and the charts of the old view are dropped.
    pub fn set_view(&mut self, view: EntityKind) {
        if view == self.view {
            return;
        }
        log::debug!("Switching view to {view}");
        self.view = view;
        self.filters.clear();
        self.histograms.clear();
        self.refilter();
    }

    fn refilter(&mut self) {
        let cross = cross_filter(
            &self.patients,
            &self.events,
            self.view,
            self.filters.as_slice(),
        );
        self.filtered_patients = Arc::new(cross.patients);
        self.filtered_events = Arc::new(cross.events);
        self.revision += 1;
        log::debug!(
            "Revision {}: {} patients, {} events pass",
            self.revision,
            self.filtered_patients.len(),
            self.filtered_events.len()
        );

        let (table, filtered) = match self.view {
            EntityKind::Patients => (&self.patients, &self.filtered_patients),
            EntityKind::Events => (&self.events, &self.filtered_events),
        };
        for (name, worker) in self.histograms.iter_mut() {
            let Some(column) = table.column(name) else {
                continue;
            };
            worker.request(
                self.revision,
                HistogramJob {
                    table: Arc::clone(table),
                    column: column.clone(),
                    filtered: Arc::clone(filtered),
                    bin_count: self.config.bin_count,
                },
            );
        }
    }

    // -- index patient and cohort --------------------------------------------

    pub fn set_index_patient(&mut self, pid: EntityId) {
        self.index_patient = Some(pid);
    }

    pub fn reset_index_patient(&mut self) {
        self.index_patient = None;
    }

    pub fn add_to_cohort(&mut self, ids: impl IntoIterator<Item = EntityId>) -> usize {
        self.cohort.add(ids)
    }

    pub fn remove_from_cohort<'a>(&mut self, ids: impl IntoIterator<Item = &'a EntityId>) -> usize {
        self.cohort.remove(ids)
    }

    pub fn clear_cohort(&mut self) {
        self.cohort.clear();
    }

    // -- tables ---------------------------------------------------------------

    pub fn set_sorting(&mut self, view: EntityKind, sorting: ColumnSorting) {
        match view {
            EntityKind::Patients => self.sorting.patients = sorting,
            EntityKind::Events => self.sorting.events = sorting,
        }
    }

    pub fn filtered_indices(&self, kind: EntityKind) -> &[usize] {
        match kind {
            EntityKind::Patients => &self.filtered_patients,
            EntityKind::Events => &self.filtered_events,
        }
    }

    /// Cross-filtered rows of `kind`, in table order.
    pub fn filtered_rows(&self, kind: EntityKind) -> Vec<&Entity> {
        rows_at(self.table(kind), self.filtered_indices(kind))
    }

    /// Cross-filtered rows of `kind` in that view's sort order.
    pub fn table_rows(&self, kind: EntityKind) -> Vec<&Entity> {
        let mut rows = self.filtered_rows(kind);
        sort_rows(&mut rows, self.sorting.get(kind));
        rows
    }

    /// Patients that do not pass the cross-filter, in table order.
    pub fn filtered_out_patient_ids(&self) -> Vec<EntityId> {
        let mut kept = vec![false; self.patients.len()];
        for &i in self.filtered_patients.iter() {
            kept[i] = true;
        }
        self.patients
            .rows
            .iter()
            .zip(kept)
            .filter(|(_, k)| !k)
            .map(|(row, _)| row.uid.clone())
            .collect()
    }

    // -- colour ---------------------------------------------------------------

    pub fn set_color_by(&mut self, color_by: ColorBy) {
        let default = self.config.default_color;
        let map_for = |table: &EntityTable| match color_by.column_of(table.kind) {
            Some(column) => {
                let rows: Vec<&Entity> = table.rows.iter().collect();
                ColorMap::new(column, &rows, default)
            }
            None => ColorMap::uniform(default),
        };
        self.patient_colors = map_for(&self.patients);
        self.event_colors = map_for(&self.events);
        self.color_by = color_by;
    }

    pub fn colors(&self, kind: EntityKind) -> &ColorMap {
        match kind {
            EntityKind::Patients => &self.patient_colors,
            EntityKind::Events => &self.event_colors,
        }
    }

    // -- scatter plot ---------------------------------------------------------

    /// Choose the scatter axes by patient column name. Unknown names clear
    /// that axis; returns whether both names resolved.
    pub fn set_scatter_axes(&mut self, x: Option<&str>, y: Option<&str>) -> bool {
        let x_axis = x.and_then(|name| self.patients.column(name).cloned());
        let y_axis = y.and_then(|name| self.patients.column(name).cloned());
        let resolved = x.is_none() == x_axis.is_none() && y.is_none() == y_axis.is_none();
        self.scatter.x_axis = x_axis;
        self.scatter.y_axis = y_axis;
        resolved
    }

    pub fn set_brush_mode(&mut self, mode: BrushMode) {
        self.scatter.brushing.brush_mode = mode;
    }

    pub fn set_brush_semantics(&mut self, semantics: BrushSemantics) {
        self.scatter.brushing.brush_semantics = semantics;
    }

    pub fn toggle_scatter_filtered_out(&mut self) {
        self.scatter.show_filtered_out = !self.scatter.show_filtered_out;
    }

    fn scatter_context(&self) -> ScatterContext<'_> {
        ScatterContext {
            patients: &self.patients,
            filtered: &self.filtered_patients,
            cohort: &self.cohort,
            colors: &self.patient_colors,
            config: &self.config,
        }
    }

    pub fn scatter_plot(&self) -> ScatterPlotData {
        scatter_plot_data(&self.scatter, &self.scatter_context())
    }

    /// Coordinates of the hovered patient, else of the selected one.
    pub fn scatter_info(&self) -> Option<ScatterInfo> {
        let uid = self.hovered.patient().or_else(|| self.selected.patient())?;
        scatter_info(&self.scatter, &self.patients, uid.as_str())
    }

    /// Apply a finished brush to the cohort. Does nothing unless brushing is
    /// on; returns how many cohort memberships changed.
    pub fn brush(&mut self, rect: &BrushRect) -> usize {
        if self.scatter.brushing.brush_mode == BrushMode::Off {
            return 0;
        }
        let ids = brushed_patients(&self.scatter, &self.scatter_context(), rect);
        match self.scatter.brushing.brush_semantics {
            BrushSemantics::Add => self.cohort.add(ids),
            BrushSemantics::Subtract => self.cohort.remove(&ids),
        }
    }

    // -- timeline -------------------------------------------------------------

    pub fn toggle_timeline_filtered_out(&mut self) {
        self.timeline_show_filtered_out = !self.timeline_show_filtered_out;
    }

    fn timeline_context(&self) -> TimelineContext<'_> {
        TimelineContext {
            events: &self.events,
            filtered: &self.filtered_events,
            colors: &self.event_colors,
            config: &self.config,
            show_filtered_out: self.timeline_show_filtered_out,
        }
    }

    pub fn timeline_lanes(&self) -> Vec<TimelineLane> {
        timeline::timeline_lanes(&self.timeline_context())
    }

    /// Timeline lane of the index patient.
    pub fn journey(&self) -> Option<TimelineLane> {
        let pid = self.index_patient.as_ref()?;
        timeline::journey(&self.timeline_context(), pid.as_str())
    }

    // -- histograms -----------------------------------------------------------

    /// Start (or keep) the chart of a column of the active view. Returns
    /// false when the column is unknown or has no chart.
    pub fn request_histogram(&mut self, column_name: &str) -> bool {
        let (table, filtered) = match self.view {
            EntityKind::Patients => (&self.patients, &self.filtered_patients),
            EntityKind::Events => (&self.events, &self.filtered_events),
        };
        let Some(column) = table.column(column_name) else {
            log::warn!("No column '{column_name}' in the {} table", self.view);
            return false;
        };
        if !has_histogram(column.column_type) {
            return false;
        }
        let job = HistogramJob {
            table: Arc::clone(table),
            column: column.clone(),
            filtered: Arc::clone(filtered),
            bin_count: self.config.bin_count,
        };
        self.histograms
            .entry(column_name.to_string())
            .or_insert_with(|| Worker::new(format!("histogram:{column_name}"), build_histogram))
            .request(self.revision, job);
        true
    }

    /// Latest computed chart of a column; empty while nothing has arrived.
    pub fn histogram(&self, column_name: &str) -> &Histogram {
        self.histograms
            .get(column_name)
            .map_or(&NO_HISTOGRAM, |w| w.value())
    }

    pub fn histogram_pending(&self, column_name: &str) -> bool {
        self.histograms
            .get(column_name)
            .is_some_and(|w| w.is_pending())
    }

    /// Turn a clicked bar into a filter on its column. Returns `Ok(false)`
    /// when the bar does not exist.
    pub fn click_bin(&mut self, column_name: &str, bin_index: usize) -> Result<bool, FilterError> {
        let Some(column) = self.table(self.view).column(column_name).cloned() else {
            return Ok(false);
        };
        let Some(filter) = self.histogram(column_name).bin_filter(&column, bin_index) else {
            return Ok(false);
        };
        self.add_filter(filter?)?;
        Ok(true)
    }

    fn poll_histograms(&mut self) -> (bool, Vec<WorkerError>) {
        let mut changed = false;
        let mut errors = Vec::new();
        for worker in self.histograms.values_mut() {
            match worker.poll() {
                Ok(c) => changed |= c,
                Err(e) => errors.push(e),
            }
        }
        (changed, errors)
    }

    fn wait_histograms(&mut self) -> Vec<WorkerError> {
        self.histograms
            .values_mut()
            .filter_map(|w| w.wait().err())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::FilterValue;
    use crate::data::model::{Column, ColumnType};
    use std::collections::BTreeSet;

    fn session() -> Session {
        let patients = EntityTable::new(
            EntityKind::Patients,
            vec![
                Column::new("PID", ColumnType::Pid, 0),
                Column::new("Blood Type", ColumnType::Category, 1),
                Column::new("2D X", ColumnType::Number, 2),
                Column::new("2D Y", ColumnType::Number, 3),
            ],
            vec![
                Entity::new("p1", vec!["p1".into(), "A".into(), "1".into(), "1".into()]),
                Entity::new("p2", vec!["p2".into(), "B".into(), "5".into(), "5".into()]),
            ],
        );
        let events = EntityTable::new(
            EntityKind::Events,
            vec![
                Column::new("EID", ColumnType::Eid, 0),
                Column::new("PID", ColumnType::Pid, 1),
                Column::new("Kind", ColumnType::Category, 2),
            ],
            vec![
                Entity::new("e1", vec!["e1".into(), "p1".into(), "visit".into()]),
                Entity::new("e2", vec!["e2".into(), "p2".into(), "lab".into()]),
            ],
        );
        Session::new(patients, events, ExplorerConfig::default())
    }

    fn category(session: &Session, kind: EntityKind, column: &str, value: &str) -> Filter {
        let column = session.table(kind).column(column).unwrap().clone();
        Filter::new(
            column,
            FilterValue::Category {
                categories: BTreeSet::from([value.to_string()]),
            },
        )
        .unwrap()
    }

    #[test]
    fn selecting_twice_clears_selection() {
        let mut s = session();
        let p1 = FocusEntity::Patient("p1".into());
        s.set_selected(p1.clone());
        assert_eq!(s.selected(), &p1);
        s.set_selected(p1);
        assert_eq!(s.selected(), &FocusEntity::None);
    }

    #[test]
    fn filter_changes_cross_filter_and_revision() {
        let mut s = session();
        let before = s.revision();
        s.add_filter(category(&s, EntityKind::Patients, "Blood Type", "A"))
            .unwrap();
        assert!(s.revision() > before);
        assert_eq!(s.filtered_indices(EntityKind::Patients), &[0]);
        assert_eq!(s.filtered_indices(EntityKind::Events), &[0]);
        assert_eq!(s.filtered_out_patient_ids(), vec![EntityId::from("p2")]);

        s.remove_filter("missing");
        assert_eq!(s.filters().len(), 1);
        s.reset_filters();
        assert_eq!(s.filtered_indices(EntityKind::Patients), &[0, 1]);
    }

    #[test]
    fn filters_must_target_active_view() {
        let mut s = session();
        let on_events = category(&s, EntityKind::Events, "Kind", "lab");
        assert!(matches!(
            s.add_filter(on_events.clone()),
            Err(FilterError::UnknownColumn { .. })
        ));

        s.set_view(EntityKind::Events);
        s.add_filter(on_events).unwrap();
        assert_eq!(s.filtered_indices(EntityKind::Patients), &[1]);

        s.set_view(EntityKind::Patients);
        assert!(s.filters().is_empty());
        assert_eq!(s.filtered_indices(EntityKind::Patients), &[0, 1]);
    }

    #[test]
    fn clicked_bar_becomes_filter() {
        let mut s = session();
        assert!(s.request_histogram("Blood Type"));
        assert!(!s.request_histogram("2D X"));
        let errors = s.wait_histograms();
        assert!(errors.is_empty());
        assert_eq!(s.histogram("Blood Type").len(), 2);

        assert!(s.click_bin("Blood Type", 1).unwrap());
        assert_eq!(s.filtered_indices(EntityKind::Patients), &[1]);
        assert!(!s.click_bin("Blood Type", 9).unwrap());

        // The open chart follows the new filter state.
        s.wait_histograms();
        let Histogram::Categories(bins) = s.histogram("Blood Type") else {
            panic!("expected category bins");
        };
        assert_eq!((bins[0].filtered_in, bins[0].filtered_out), (0, 1));
    }

    #[test]
    fn brushing_respects_mode_and_semantics() {
        let mut s = session();
        let rect = BrushRect { x0: 0.0, y0: 0.0, x1: 10.0, y1: 10.0 };
        assert_eq!(s.brush(&rect), 0);

        s.set_brush_mode(BrushMode::On);
        assert_eq!(s.brush(&rect), 2);
        s.set_brush_semantics(BrushSemantics::Subtract);
        let small = BrushRect { x0: 0.0, y0: 0.0, x1: 2.0, y1: 2.0 };
        assert_eq!(s.brush(&small), 1);
        assert_eq!(s.cohort().ids(), &[EntityId::from("p2")]);
    }

    #[test]
    fn scatter_info_prefers_hovered_patient() {
        let mut s = session();
        s.set_selected(FocusEntity::Patient("p1".into()));
        s.set_hovered(FocusEntity::Patient("p2".into()));
        assert_eq!(s.scatter_info().unwrap().x_value_formatted, "5");
        s.set_hovered(FocusEntity::None);
        assert_eq!(s.scatter_info().unwrap().x_value_formatted, "1");
    }

    #[test]
    fn sorting_is_kept_per_view() {
        let mut s = session();
        let by_x = ColumnSorting::Desc(s.patients().column("2D X").unwrap().clone());
        s.set_sorting(EntityKind::Patients, by_x.clone());
        assert_eq!(s.sorting().get(EntityKind::Patients), &by_x);
        assert_eq!(s.sorting().get(EntityKind::Events), &ColumnSorting::None);

        let uids: Vec<&str> = s
            .table_rows(EntityKind::Patients)
            .into_iter()
            .map(|e| e.uid.as_str())
            .collect();
        assert_eq!(uids, ["p2", "p1"]);
    }

    #[test]
    fn color_by_applies_to_owning_table_only() {
        let mut s = session();
        let column = s.patients().column("Blood Type").unwrap().clone();
        s.set_color_by(ColorBy::Column { table: EntityKind::Patients, column });
        assert_eq!(s.colors(EntityKind::Patients).legend_entries().len(), 2);
        assert!(s.colors(EntityKind::Events).column().is_none());

        let plot = s.scatter_plot();
        assert_ne!(plot.data[0].color, plot.data[1].color);
    }

    #[test]
    fn failed_load_records_alert() {
        let mut state = AppState::default();
        assert!(!state.load_files(Path::new("/nonexistent/p.csv"), Path::new("/nonexistent/e.csv")));
        assert_eq!(state.data.label(), "failed");
        assert_eq!(state.alerts.len(), 1);
        assert_eq!(state.alerts[0].topic, alert::DATA_LOADING_ERROR);
        assert!(state.session().is_none());
    }
}
