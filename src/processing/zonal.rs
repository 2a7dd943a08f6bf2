// src/processing/zonal.rs
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::raster::{GridRef, Mask};

/// Default number of rows evaluated per tile.
pub const DEFAULT_TILE_ROWS: usize = 256;

/// Sums per-pixel areas over a region, masked by a boolean predicate.
///
/// A pixel contributes its full area iff its center falls inside the
/// region and the mask is true there; there is no fractional boundary
/// weighting. Work proceeds tile-by-tile with a running sum so memory
/// stays bounded, and grids larger than the configured pixel budget are
/// rejected up front instead of hanging.
pub struct ZonalAggregator {
    max_pixels: u64,
    tile_rows: usize,
}

impl ZonalAggregator {
    pub fn new(max_pixels: u64, tile_rows: usize) -> Self {
        Self {
            max_pixels,
            tile_rows: tile_rows.max(1),
        }
    }

    pub fn tile_rows(&self) -> usize {
        self.tile_rows
    }

    /// Checked before touching pixel data; oversized grids fail fast.
    pub fn check_budget(&self, grid: &GridRef) -> Result<()> {
        let pixels = grid.pixel_count();
        if pixels > self.max_pixels {
            return Err(Error::ResourceExceeded {
                pixels,
                max_pixels: self.max_pixels,
            });
        }
        Ok(())
    }

    /// Masked area in square kilometers. `region_cells` is the pixel-center
    /// membership of the region on the same grid (see `Region::rasterize`).
    pub fn area_km2(&self, mask: &Mask, region_cells: &[bool]) -> Result<f64> {
        self.check_budget(mask.grid())?;
        let grid = mask.grid();
        if region_cells.len() != mask.data().len() {
            return Err(Error::BufferLength {
                expected: mask.data().len(),
                actual: region_cells.len(),
            });
        }

        let windows = grid.row_windows(self.tile_rows);
        let count: u64 = windows
            .par_iter()
            .map(|window| {
                let range = window.range();
                mask.data()[range.clone()]
                    .iter()
                    .zip(&region_cells[range])
                    .filter(|(m, r)| **m && **r)
                    .count() as u64
            })
            .sum();

        Ok(count as f64 * grid.pixel_area_km2())
    }
}

impl Default for ZonalAggregator {
    fn default() -> Self {
        Self::new(10_000_000_000_000, DEFAULT_TILE_ROWS)
    }
}
