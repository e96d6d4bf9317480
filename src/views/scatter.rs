use serde::{Deserialize, Serialize};

use crate::color::{ColorMap, Rgb};
use crate::config::ExplorerConfig;
use crate::data::cohort::Cohort;
use crate::data::columns::{format_cell, numeric_value, text_value};
use crate::data::model::{Column, Entity, EntityId, EntityTable};

// ---------------------------------------------------------------------------
// Scatter plot state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrushMode {
    On,
    #[default]
    Off,
}

/// What a finished brush does to the cohort.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrushSemantics {
    #[default]
    Add,
    Subtract,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brushing {
    pub brush_mode: BrushMode,
    pub brush_semantics: BrushSemantics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScatterPlotState {
    pub x_axis: Option<Column>,
    pub y_axis: Option<Column>,
    pub brushing: Brushing,
    pub show_filtered_out: bool,
}

impl Default for ScatterPlotState {
    fn default() -> Self {
        Self {
            x_axis: None,
            y_axis: None,
            brushing: Brushing::default(),
            show_filtered_out: true,
        }
    }
}

impl ScatterPlotState {
    /// Preselect the configured axis columns when the table has them.
    pub fn for_table(patients: &EntityTable, config: &ExplorerConfig) -> Self {
        Self {
            x_axis: patients.column(&config.default_x_axis_column).cloned(),
            y_axis: patients.column(&config.default_y_axis_column).cloned(),
            ..Self::default()
        }
    }

    fn axes(&self) -> Option<(&Column, &Column)> {
        Some((self.x_axis.as_ref()?, self.y_axis.as_ref()?))
    }
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

/// A coordinate: continuous columns plot numerically (dates as millis),
/// the rest by label.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AxisValue {
    Number(f64),
    Text(String),
}

fn axis_value(column: &Column, entity: &Entity) -> Option<AxisValue> {
    if column.column_type.is_continuous() {
        numeric_value(column, entity).map(AxisValue::Number)
    } else {
        text_value(column, entity).map(|s| AxisValue::Text(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScatterDatum {
    pub entity_id: EntityId,
    pub x: AxisValue,
    pub y: AxisValue,
    pub color: Rgb,
    pub is_filtered_out: bool,
    pub in_cohort: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScatterPlotData {
    pub x_axis_label: String,
    pub y_axis_label: String,
    pub data: Vec<ScatterDatum>,
}

/// Everything the projection reads besides the plot state.
pub struct ScatterContext<'a> {
    pub patients: &'a EntityTable,
    /// Cross-filtered patient indices.
    pub filtered: &'a [usize],
    pub cohort: &'a Cohort,
    pub colors: &'a ColorMap,
    pub config: &'a ExplorerConfig,
}

impl ScatterContext<'_> {
    fn filtered_mask(&self) -> Vec<bool> {
        let mut mask = vec![false; self.patients.len()];
        for &i in self.filtered {
            if let Some(slot) = mask.get_mut(i) {
                *slot = true;
            }
        }
        mask
    }

    /// Rows on the plot with their filtered-in flag, in table order.
    fn visible_rows(&self, state: &ScatterPlotState) -> Vec<(&Entity, bool)> {
        let mask = self.filtered_mask();
        self.patients
            .rows
            .iter()
            .zip(mask)
            .filter(|(_, kept)| state.show_filtered_out || *kept)
            .collect()
    }
}

/// Project patients onto the chosen axes. Without both axes the plot is
/// empty; rows lacking either coordinate are skipped.
pub fn scatter_plot_data(state: &ScatterPlotState, ctx: &ScatterContext<'_>) -> ScatterPlotData {
    let Some((x_col, y_col)) = state.axes() else {
        return ScatterPlotData::default();
    };

    let data = ctx
        .visible_rows(state)
        .into_iter()
        .filter_map(|(entity, kept)| {
            let x = axis_value(x_col, entity)?;
            let y = axis_value(y_col, entity)?;
            let in_cohort = ctx.cohort.contains(entity.uid.as_str());
            let color = if !kept {
                ctx.config.filtered_out_color
            } else if in_cohort {
                ctx.config.cohort_color
            } else {
                ctx.colors.color_for(entity)
            };
            Some(ScatterDatum {
                entity_id: entity.uid.clone(),
                x,
                y,
                color,
                is_filtered_out: !kept,
                in_cohort,
            })
        })
        .collect();

    ScatterPlotData {
        x_axis_label: x_col.name.clone(),
        y_axis_label: y_col.name.clone(),
        data,
    }
}

// ---------------------------------------------------------------------------
// Focus info
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScatterInfo {
    pub x_axis_label: String,
    pub x_value_formatted: String,
    pub y_axis_label: String,
    pub y_value_formatted: String,
}

/// Formatted coordinates of the focused patient, if it is on the table.
pub fn scatter_info(state: &ScatterPlotState, patients: &EntityTable, uid: &str) -> Option<ScatterInfo> {
    let (x_col, y_col) = state.axes()?;
    let entity = patients.row(uid)?;
    Some(ScatterInfo {
        x_axis_label: x_col.name.clone(),
        x_value_formatted: format_cell(x_col.column_type, entity.cell(x_col).unwrap_or("")),
        y_axis_label: y_col.name.clone(),
        y_value_formatted: format_cell(y_col.column_type, entity.cell(y_col).unwrap_or("")),
    })
}

// ---------------------------------------------------------------------------
// Brushing
// ---------------------------------------------------------------------------

/// Axis-aligned selection rectangle in data coordinates; corners may come
/// in any order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrushRect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BrushRect {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let (xl, xh) = (self.x0.min(self.x1), self.x0.max(self.x1));
        let (yl, yh) = (self.y0.min(self.y1), self.y0.max(self.y1));
        (xl..=xh).contains(&x) && (yl..=yh).contains(&y)
    }
}

/// Patients shown on the plot whose numeric coordinates fall inside `rect`.
pub fn brushed_patients(state: &ScatterPlotState, ctx: &ScatterContext<'_>, rect: &BrushRect) -> Vec<EntityId> {
    let Some((x_col, y_col)) = state.axes() else {
        return Vec::new();
    };
    ctx.visible_rows(state)
        .into_iter()
        .filter_map(|(entity, _)| {
            let x = numeric_value(x_col, entity)?;
            let y = numeric_value(y_col, entity)?;
            rect.contains(x, y).then(|| entity.uid.clone())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{ColumnType, EntityKind};

    fn patients() -> EntityTable {
        EntityTable::new(
            EntityKind::Patients,
            vec![
                Column::new("PID", ColumnType::Pid, 0),
                Column::new("2D X", ColumnType::Number, 1),
                Column::new("2D Y", ColumnType::Number, 2),
            ],
            vec![
                Entity::new("p1", vec!["p1".into(), "1".into(), "1".into()]),
                Entity::new("p2", vec!["p2".into(), "5".into(), "5".into()]),
                Entity::new("p3", vec!["p3".into(), "".into(), "2".into()]),
            ],
        )
    }

    #[test]
    fn no_axes_means_empty_plot() {
        let table = patients();
        let config = ExplorerConfig::default();
        let colors = ColorMap::uniform(config.default_color);
        let cohort = Cohort::new();
        let ctx = ScatterContext { patients: &table, filtered: &[0, 1, 2], cohort: &cohort, colors: &colors, config: &config };
        assert_eq!(scatter_plot_data(&ScatterPlotState::default(), &ctx), ScatterPlotData::default());
    }

    #[test]
    fn projection_flags_filtered_out_and_cohort() {
        let table = patients();
        let config = ExplorerConfig::default();
        let colors = ColorMap::uniform(config.default_color);
        let cohort = Cohort::from(vec![EntityId::from("p1")]);
        let ctx = ScatterContext { patients: &table, filtered: &[0], cohort: &cohort, colors: &colors, config: &config };
        let mut state = ScatterPlotState::for_table(&table, &config);

        let plot = scatter_plot_data(&state, &ctx);
        assert_eq!(plot.x_axis_label, "2D X");
        // p3 has no x value.
        assert_eq!(plot.data.len(), 2);
        assert_eq!(plot.data[0].color, config.cohort_color);
        assert!(plot.data[0].in_cohort);
        assert!(plot.data[1].is_filtered_out);
        assert_eq!(plot.data[1].color, config.filtered_out_color);

        state.show_filtered_out = false;
        assert_eq!(scatter_plot_data(&state, &ctx).data.len(), 1);
    }

    #[test]
    fn brush_selects_points_inside_rect() {
        let table = patients();
        let config = ExplorerConfig::default();
        let colors = ColorMap::uniform(config.default_color);
        let cohort = Cohort::new();
        let ctx = ScatterContext { patients: &table, filtered: &[0, 1, 2], cohort: &cohort, colors: &colors, config: &config };
        let state = ScatterPlotState::for_table(&table, &config);

        let rect = BrushRect { x0: 6.0, y0: 6.0, x1: 0.0, y1: 4.0 };
        assert_eq!(brushed_patients(&state, &ctx, &rect), vec![EntityId::from("p2")]);
        let info = scatter_info(&state, &table, "p2").unwrap();
        assert_eq!(info.x_value_formatted, "5");
    }
}
