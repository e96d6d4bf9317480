use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::color::Rgb;

/// Tunables for the derived views. Every field has a default, so a config
/// file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Target number of bins for date/timestamp histograms.
    pub bin_count: usize,
    /// Patient column preselected as the scatter plot x axis, if present.
    pub default_x_axis_column: String,
    /// Patient column preselected as the scatter plot y axis, if present.
    pub default_y_axis_column: String,
    pub default_color: Rgb,
    pub filtered_out_color: Rgb,
    pub cohort_color: Rgb,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            bin_count: 40,
            default_x_axis_column: "2D X".to_string(),
            default_y_axis_column: "2D Y".to_string(),
            default_color: Rgb([66, 165, 245]),
            filtered_out_color: Rgb([189, 189, 189]),
            cohort_color: Rgb([233, 30, 99]),
        }
    }
}

impl ExplorerConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text).context("parsing config JSON")?;
        Ok(config.sanitized())
    }

    fn sanitized(mut self) -> Self {
        if self.bin_count == 0 {
            log::warn!("bin_count must be positive, falling back to the default");
            self.bin_count = Self::default().bin_count;
        }
        self
    }
}
