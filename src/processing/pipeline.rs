// src/processing/pipeline.rs
use crate::error::Result;
use crate::raster::{Mask, Raster};

use super::mask::{build_mask, IndexKind, ThresholdConfig};
use super::zonal::ZonalAggregator;

/// Result of classifying one composite under one threshold configuration
pub struct Classification {
    pub mask: Mask,
    pub area_km2: f64,
}

/// Composite -> indices -> threshold mask -> zonal area, evaluated one
/// row-tile at a time.
///
/// Only the boolean mask is materialized full-size (it feeds change
/// detection and map layers downstream); f32 index buffers never exceed
/// one tile. The aggregator's pixel budget is enforced before any pixel
/// work starts.
pub fn classify_composite(
    composite: &Raster,
    config: &ThresholdConfig,
    region_cells: &[bool],
    aggregator: &ZonalAggregator,
) -> Result<Classification> {
    config.validate()?;
    aggregator.check_budget(composite.grid())?;

    let grid = *composite.grid();
    let calculators: Vec<_> = config
        .indices()
        .into_iter()
        .map(|kind| (kind, kind.calculator()))
        .collect();

    let mut mask_data = vec![false; grid.width * grid.height];
    for window in grid.row_windows(aggregator.tile_rows()) {
        let range = window.range();

        let mut tile_indices: Vec<(IndexKind, Vec<f32>)> = Vec::with_capacity(calculators.len());
        for (kind, calculator) in &calculators {
            let inputs: Vec<&[f32]> = calculator
                .required_bands()
                .iter()
                .map(|band| composite.band(band).map(|b| &b[range.clone()]))
                .collect::<Result<_>>()?;
            tile_indices.push((*kind, calculator.calculate(&inputs)));
        }

        let slices: Vec<(IndexKind, &[f32])> = tile_indices
            .iter()
            .map(|(kind, values)| (*kind, values.as_slice()))
            .collect();
        mask_data[range].copy_from_slice(&build_mask(config, &slices)?);
    }

    let mask = Mask::new(grid, mask_data)?;
    let area_km2 = aggregator.area_km2(&mask, region_cells)?;
    Ok(Classification { mask, area_km2 })
}
