use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use palette::{Hsl, IntoColor, Srgb};
use serde::{Deserialize, Serialize};

use crate::data::columns::{numeric_value, text_value};
use crate::data::model::{Column, ColumnType, Entity, EntityKind};

// ---------------------------------------------------------------------------
// Rgb – a colour as it leaves the crate (`#rrggbb` in JSON)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub fn to_hex(self) -> String {
        let [r, g, b] = self.0;
        format!("#{r:02x}{g:02x}{b:02x}")
    }

    fn from_hsl(hue: f32, saturation: f32, lightness: f32) -> Self {
        let rgb: Srgb = Hsl::new(hue, saturation, lightness).into_color();
        Rgb([
            (rgb.red.clamp(0.0, 1.0) * 255.0).round() as u8,
            (rgb.green.clamp(0.0, 1.0) * 255.0).round() as u8,
            (rgb.blue.clamp(0.0, 1.0) * 255.0).round() as u8,
        ])
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<Rgb> for String {
    fn from(c: Rgb) -> Self {
        c.to_hex()
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let hex = s.strip_prefix('#').unwrap_or(&s);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(format!("expected #rrggbb colour, got '{s}'"));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| format!("invalid hex digits in colour '{s}'"))
        };
        Ok(Rgb([channel(0)?, channel(2)?, channel(4)?]))
    }
}

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Rgb> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| Rgb::from_hsl((i as f32 / n as f32) * 360.0, 0.75, 0.55))
        .collect()
}

/// Blue (t = 0) to red (t = 1) through the hue circle.
pub fn gradient(t: f64) -> Rgb {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    Rgb::from_hsl(240.0 * (1.0 - t as f32), 0.75, 0.5)
}

// ---------------------------------------------------------------------------
// Color mapping: entity → Rgb
// ---------------------------------------------------------------------------

/// Which column drives the colour of scatter points and timeline events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ColorBy {
    #[default]
    None,
    Column { table: EntityKind, column: Column },
}

impl ColorBy {
    /// The colour-by column if it belongs to `table`.
    pub fn column_of(&self, table: EntityKind) -> Option<&Column> {
        match self {
            ColorBy::Column { table: t, column } if *t == table => Some(column),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
enum Scale {
    Uniform,
    Categorical(BTreeMap<String, Rgb>),
    Continuous { min: f64, max: f64 },
}

/// Maps entities to colours for one colour-by column. Built once from all
/// rows, so colours do not shift when filters change.
#[derive(Debug, Clone)]
pub struct ColorMap {
    column: Option<Column>,
    scale: Scale,
    default_color: Rgb,
}

impl ColorMap {
    pub fn uniform(default_color: Rgb) -> Self {
        Self {
            column: None,
            scale: Scale::Uniform,
            default_color,
        }
    }

    /// Build the scale for `column` from every row of its table.
    pub fn new(column: &Column, all_rows: &[&Entity], default_color: Rgb) -> Self {
        let scale = match column.column_type {
            ColumnType::Number | ColumnType::Date | ColumnType::Timestamp => {
                let (min, max) = all_rows
                    .iter()
                    .filter_map(|row| numeric_value(column, row))
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                        (lo.min(v), hi.max(v))
                    });
                if min.is_finite() && max.is_finite() {
                    Scale::Continuous { min, max }
                } else {
                    Scale::Uniform
                }
            }
            ColumnType::Category
            | ColumnType::Boolean
            | ColumnType::String
            | ColumnType::Pid
            | ColumnType::Eid => {
                let unique: BTreeSet<&str> = all_rows
                    .iter()
                    .filter_map(|row| text_value(column, row))
                    .collect();
                let palette = generate_palette(unique.len());
                Scale::Categorical(
                    unique
                        .into_iter()
                        .zip(palette)
                        .map(|(v, c)| (v.to_string(), c))
                        .collect(),
                )
            }
        };

        Self {
            column: Some(column.clone()),
            scale,
            default_color,
        }
    }

    pub fn column(&self) -> Option<&Column> {
        self.column.as_ref()
    }

    /// Look up the colour for a given entity.
    pub fn color_for(&self, entity: &Entity) -> Rgb {
        let Some(column) = &self.column else {
            return self.default_color;
        };
        match &self.scale {
            Scale::Uniform => self.default_color,
            Scale::Categorical(mapping) => text_value(column, entity)
                .and_then(|v| mapping.get(v).copied())
                .unwrap_or(self.default_color),
            Scale::Continuous { min, max } => match numeric_value(column, entity) {
                Some(v) => self.color_for_number(v, *min, *max),
                None => self.default_color,
            },
        }
    }

    /// Colour of a category bar, for the chart of the colour-by column.
    pub fn color_for_category(&self, category: &str) -> Rgb {
        match &self.scale {
            Scale::Categorical(mapping) => {
                mapping.get(category).copied().unwrap_or(self.default_color)
            }
            _ => self.default_color,
        }
    }

    /// Colour of a value on a continuous colour-by column.
    pub fn color_for_value(&self, value: f64) -> Rgb {
        match &self.scale {
            Scale::Continuous { min, max } => self.color_for_number(value, *min, *max),
            _ => self.default_color,
        }
    }

    fn color_for_number(&self, value: f64, min: f64, max: f64) -> Rgb {
        let span = max - min;
        if span.abs() < f64::EPSILON {
            gradient(0.5)
        } else {
            gradient((value - min) / span)
        }
    }

    /// Return the legend entries (value label → colour) for categorical scales.
    pub fn legend_entries(&self) -> Vec<(String, Rgb)> {
        match &self.scale {
            Scale::Categorical(mapping) => {
                mapping.iter().map(|(v, c)| (v.clone(), *c)).collect()
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip_and_validation() {
        let c = Rgb::try_from("#1a2B3c".to_string()).unwrap();
        assert_eq!(c, Rgb([0x1a, 0x2b, 0x3c]));
        assert_eq!(c.to_hex(), "#1a2b3c");
        assert!(Rgb::try_from("#12345".to_string()).is_err());
        assert!(Rgb::try_from("#zzzzzz".to_string()).is_err());
    }

    #[test]
    fn categorical_colors_are_distinct() {
        let column = Column::new("Blood Type", ColumnType::Category, 0);
        let data = [
            Entity::new("1", vec!["A".into()]),
            Entity::new("2", vec!["B".into()]),
            Entity::new("3", vec!["".into()]),
        ];
        let rows: Vec<&Entity> = data.iter().collect();
        let grey = Rgb([128, 128, 128]);
        let map = ColorMap::new(&column, &rows, grey);

        assert_ne!(map.color_for(&data[0]), map.color_for(&data[1]));
        assert_eq!(map.color_for(&data[2]), grey);
        assert_eq!(map.legend_entries().len(), 2);
    }

    #[test]
    fn continuous_scale_spans_blue_to_red() {
        assert_eq!(gradient(0.0), Rgb::from_hsl(240.0, 0.75, 0.5));
        assert_eq!(gradient(1.0), Rgb::from_hsl(0.0, 0.75, 0.5));
        assert_eq!(gradient(f64::NAN), gradient(0.0));
    }
}
