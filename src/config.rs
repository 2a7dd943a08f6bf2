// src/config.rs
use std::fs;
use std::path::Path;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::processing::composite::DateWindow;
use crate::processing::mask::ThresholdConfig;
use crate::processing::zonal::DEFAULT_TILE_ROWS;

/// One batch run, fully described: region, sweep axes and resource
/// ceilings. Loaded from JSON; every knob the pipeline stages need is
/// threaded through from here, there are no hidden globals.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RunConfig {
    /// Administrative region name resolved through the region lookup
    pub region: String,
    /// Inclusive [start, end] years of the sweep
    pub year_range: [i32; 2],
    /// Inclusive [start, end] months of the seasonal window
    #[serde(default = "default_month_window")]
    pub month_window: [u32; 2],
    /// Scenes at or above this cloud percentage are dropped
    #[serde(default = "default_cloud_ceiling")]
    pub cloud_ceiling: f32,
    #[serde(default = "default_bands")]
    pub bands: Vec<String>,
    /// Threshold configurations swept side by side; the first one is the
    /// primary classification used for change detection
    #[serde(default = "ThresholdConfig::default_sweep")]
    pub threshold_configs: Vec<ThresholdConfig>,
    /// [earlier, later] year pairs classified for gain/loss/stable
    #[serde(default = "default_change_pairs")]
    pub change_pairs: Vec<[i32; 2]>,
    #[serde(default = "default_max_pixels")]
    pub max_pixels: u64,
    #[serde(default = "default_tile_rows")]
    pub tile_rows: usize,
}

fn default_month_window() -> [u32; 2] {
    [5, 10]
}

fn default_cloud_ceiling() -> f32 {
    8.0
}

fn default_bands() -> Vec<String> {
    ["B8", "B11", "B4", "B3", "B2", "B12"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_change_pairs() -> Vec<[i32; 2]> {
    vec![[2019, 2023]]
}

fn default_max_pixels() -> u64 {
    10_000_000_000_000
}

fn default_tile_rows() -> usize {
    DEFAULT_TILE_ROWS
}

impl RunConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: RunConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn years(&self) -> Vec<i32> {
        (self.year_range[0]..=self.year_range[1]).collect()
    }

    pub fn months(&self) -> (u32, u32) {
        (self.month_window[0], self.month_window[1])
    }

    /// Date window spanning the whole sweep, used for the single catalog
    /// query shared by all years.
    pub fn run_window(&self) -> Result<DateWindow> {
        DateWindow::spanning_years(self.year_range[0], self.year_range[1], self.months())
    }

    /// Validate everything that can fail before raster work begins.
    pub fn validate(&self) -> Result<()> {
        if self.year_range[0] > self.year_range[1] {
            return invalid(format!(
                "year range {}..{} is reversed",
                self.year_range[0], self.year_range[1]
            ));
        }
        let [m0, m1] = self.month_window;
        if !(1..=12).contains(&m0) || !(1..=12).contains(&m1) || m0 > m1 {
            return invalid(format!("month window [{m0}, {m1}] is not valid"));
        }
        if self.bands.is_empty() {
            return invalid("no bands configured");
        }
        if self.threshold_configs.is_empty() {
            return invalid("no threshold configurations");
        }
        if self.max_pixels == 0 {
            return invalid("max_pixels must be positive");
        }
        if self.tile_rows == 0 {
            return invalid("tile_rows must be positive");
        }

        if let Some(name) = self
            .threshold_configs
            .iter()
            .map(|c| c.name.as_str())
            .duplicates()
            .next()
        {
            return invalid(format!("duplicate threshold configuration {name:?}"));
        }

        for config in &self.threshold_configs {
            config.validate()?;
            for kind in config.indices() {
                let calculator = kind.calculator();
                for band in calculator.required_bands() {
                    if !self.bands.iter().any(|b| b == band) {
                        return Err(Error::InvalidThresholdConfig {
                            config: config.name.clone(),
                            reason: format!(
                                "{} needs band {band} which is not configured",
                                kind.name()
                            ),
                        });
                    }
                }
            }
        }

        for &[earlier, later] in &self.change_pairs {
            if earlier >= later {
                return invalid(format!("change pair [{earlier}, {later}] is not ordered"));
            }
            for year in [earlier, later] {
                if !(self.year_range[0]..=self.year_range[1]).contains(&year) {
                    return invalid(format!("change pair year {year} is outside the year range"));
                }
            }
        }
        Ok(())
    }
}

fn invalid<T>(reason: impl Into<String>) -> Result<T> {
    Err(Error::InvalidConfig(reason.into()))
}
