// src/raster.rs
use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;

use crate::error::{Error, Result};

/// Spatial footprint of a raster: grid dimensions in pixels, pixel edge
/// length in meters and the projected coordinates of the top-left corner
/// (x grows east, y grows north). Two rasters are aligned iff their
/// `GridRef`s compare equal; derived rasters inherit the source footprint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridRef {
    pub width: usize,
    pub height: usize,
    pub resolution: f64,
    pub origin: (f64, f64),
}

impl GridRef {
    pub fn new(width: usize, height: usize, resolution: f64, origin: (f64, f64)) -> Self {
        Self {
            width,
            height,
            resolution,
            origin,
        }
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Area of one pixel in square kilometers.
    pub fn pixel_area_km2(&self) -> f64 {
        let km = self.resolution / 1000.0;
        km * km
    }

    /// Projected coordinates of a pixel center.
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.origin.0 + (col as f64 + 0.5) * self.resolution,
            self.origin.1 - (row as f64 + 0.5) * self.resolution,
        )
    }

    /// Projected extent as (min_x, min_y, max_x, max_y).
    pub fn extent(&self) -> (f64, f64, f64, f64) {
        (
            self.origin.0,
            self.origin.1 - self.height as f64 * self.resolution,
            self.origin.0 + self.width as f64 * self.resolution,
            self.origin.1,
        )
    }

    /// Contiguous row bands of at most `tile_rows` rows covering the grid.
    /// Per-pixel stages evaluate one band at a time so intermediate buffers
    /// stay bounded regardless of raster height.
    pub fn row_windows(&self, tile_rows: usize) -> Vec<RowWindow> {
        let tile_rows = tile_rows.max(1);
        (0..self.height)
            .step_by(tile_rows)
            .map(|start_row| RowWindow {
                start_row,
                rows: tile_rows.min(self.height - start_row),
                width: self.width,
            })
            .collect()
    }

    pub(crate) fn ensure_aligned(&self, other: &GridRef) -> Result<()> {
        if self == other {
            Ok(())
        } else {
            Err(Error::GridMismatch {
                expected: *self,
                actual: *other,
            })
        }
    }

    fn check_len(&self, actual: usize) -> Result<()> {
        let expected = self.width * self.height;
        if actual == expected {
            Ok(())
        } else {
            Err(Error::BufferLength { expected, actual })
        }
    }
}

impl fmt::Display for GridRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} @{}m (origin {}, {})",
            self.width, self.height, self.resolution, self.origin.0, self.origin.1
        )
    }
}

/// One contiguous band of rows used for tile-at-a-time evaluation.
#[derive(Debug, Clone, Copy)]
pub struct RowWindow {
    pub start_row: usize,
    pub rows: usize,
    pub width: usize,
}

impl RowWindow {
    /// Flat pixel range covered by this window.
    pub fn range(&self) -> std::ops::Range<usize> {
        let start = self.start_row * self.width;
        start..start + self.rows * self.width
    }
}

/// A multi-band reflectance raster: one acquisition scene or a synthetic
/// composite. Band values are f32 with IEEE NaN as the no-data marker.
/// Composites carry no timestamp. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct Raster {
    grid: GridRef,
    bands: HashMap<String, Vec<f32>>,
    timestamp: Option<NaiveDate>,
    cloud_cover: Option<f32>,
}

impl Raster {
    /// Build a synthetic raster (no acquisition metadata), e.g. a composite.
    pub fn new(grid: GridRef, bands: Vec<(String, Vec<f32>)>) -> Result<Self> {
        Self::build(grid, bands, None, None)
    }

    /// Build an acquisition scene tagged with its date and cloud cover.
    pub fn scene(
        grid: GridRef,
        bands: Vec<(String, Vec<f32>)>,
        timestamp: NaiveDate,
        cloud_cover: f32,
    ) -> Result<Self> {
        Self::build(grid, bands, Some(timestamp), Some(cloud_cover))
    }

    fn build(
        grid: GridRef,
        bands: Vec<(String, Vec<f32>)>,
        timestamp: Option<NaiveDate>,
        cloud_cover: Option<f32>,
    ) -> Result<Self> {
        let mut map = HashMap::with_capacity(bands.len());
        for (name, data) in bands {
            grid.check_len(data.len())?;
            map.insert(name, data);
        }
        Ok(Self {
            grid,
            bands: map,
            timestamp,
            cloud_cover,
        })
    }

    pub fn grid(&self) -> &GridRef {
        &self.grid
    }

    pub fn band(&self, name: &str) -> Result<&[f32]> {
        self.bands
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::MissingBand(name.to_string()))
    }

    pub fn has_bands(&self, names: &[&str]) -> bool {
        names.iter().all(|n| self.bands.contains_key(*n))
    }

    pub fn timestamp(&self) -> Option<NaiveDate> {
        self.timestamp
    }

    pub fn cloud_cover(&self) -> Option<f32> {
        self.cloud_cover
    }
}

/// Single-band index raster derived from a `Raster` by a named formula.
/// NaN marks pixels where the formula is undefined.
#[derive(Debug, Clone)]
pub struct IndexRaster {
    grid: GridRef,
    name: String,
    data: Vec<f32>,
}

impl IndexRaster {
    pub fn new(grid: GridRef, name: impl Into<String>, data: Vec<f32>) -> Result<Self> {
        grid.check_len(data.len())?;
        Ok(Self {
            grid,
            name: name.into(),
            data,
        })
    }

    pub fn grid(&self) -> &GridRef {
        &self.grid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

/// Boolean land-cover mask. Every pixel is exactly true or false; no-data
/// never propagates past mask construction.
#[derive(Debug, Clone)]
pub struct Mask {
    grid: GridRef,
    data: Vec<bool>,
}

impl Mask {
    pub fn new(grid: GridRef, data: Vec<bool>) -> Result<Self> {
        grid.check_len(data.len())?;
        Ok(Self { grid, data })
    }

    pub fn grid(&self) -> &GridRef {
        &self.grid
    }

    pub fn data(&self) -> &[bool] {
        &self.data
    }

    pub fn count_true(&self) -> u64 {
        self.data.iter().filter(|v| **v).count() as u64
    }
}
