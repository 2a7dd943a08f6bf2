// src/processing/composite.rs
use chrono::{Datelike, NaiveDate};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::raster::Raster;

/// Inclusive acquisition-date window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Seasonal window for one year, e.g. months (5, 10) covers
    /// May 1st through October 31st.
    pub fn for_year(year: i32, months: (u32, u32)) -> Result<Self> {
        let start = NaiveDate::from_ymd_opt(year, months.0, 1)
            .ok_or_else(|| Error::InvalidConfig(format!("invalid start month {}", months.0)))?;
        let end = last_day_of_month(year, months.1)
            .ok_or_else(|| Error::InvalidConfig(format!("invalid end month {}", months.1)))?;
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Window spanning the same months across a range of years.
    pub fn spanning_years(start_year: i32, end_year: i32, months: (u32, u32)) -> Result<Self> {
        let first = Self::for_year(start_year, months)?;
        let last = Self::for_year(end_year, months)?;
        Ok(Self::new(first.start, last.end))
    }
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if first.month() == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    next.pred_opt()
}

/// Select the scenes that qualify for compositing: acquisition date inside
/// the window and cloud cover strictly below the ceiling. Scenes without a
/// timestamp or cloud metadata are excluded.
pub fn select_scenes<'a>(
    scenes: &'a [Raster],
    window: DateWindow,
    cloud_ceiling: f32,
) -> Vec<&'a Raster> {
    scenes
        .iter()
        .filter(|s| s.timestamp().is_some_and(|d| window.contains(d)))
        .filter(|s| s.cloud_cover().is_some_and(|c| c < cloud_ceiling))
        .collect()
}

/// Reduce the selected scenes to one per-pixel temporal median composite
/// over the requested bands.
///
/// NaN samples are skipped per pixel; a pixel with no valid sample stays
/// NaN in the composite. An empty selection yields `Ok(None)` rather than
/// a zero-filled raster. Scenes on different grids are a precondition
/// violation and fail with `GridMismatch`.
pub fn median_composite(scenes: &[&Raster], bands: &[&str]) -> Result<Option<Raster>> {
    let Some(first) = scenes.first() else {
        return Ok(None);
    };
    let grid = *first.grid();
    for scene in &scenes[1..] {
        grid.ensure_aligned(scene.grid())?;
    }

    let pixels = grid.width * grid.height;
    let mut out_bands = Vec::with_capacity(bands.len());
    for &band in bands {
        let sources: Vec<&[f32]> = scenes
            .iter()
            .map(|s| s.band(band))
            .collect::<Result<_>>()?;

        let mut data = vec![f32::NAN; pixels];
        data.par_iter_mut().enumerate().for_each(|(i, out)| {
            let mut samples: Vec<f32> = sources
                .iter()
                .map(|s| s[i])
                .filter(|v| !v.is_nan())
                .collect();
            if samples.is_empty() {
                return;
            }
            samples.sort_by(f32::total_cmp);
            let mid = samples.len() / 2;
            *out = if samples.len() % 2 == 0 {
                (samples[mid - 1] + samples[mid]) / 2.0
            } else {
                samples[mid]
            };
        });
        out_bands.push((band.to_string(), data));
    }

    Ok(Some(Raster::new(grid, out_bands)?))
}
