// src/render.rs
use tracing::info;

use crate::raster::{Mask, Raster};
use crate::table::ResultTable;

/// Display styling for a multi-band raster layer: a band triplet mapped
/// to RGB with a linear min/max stretch.
#[derive(Debug, Clone)]
pub struct RasterStyle {
    pub bands: [String; 3],
    pub min: f32,
    pub max: f32,
}

impl RasterStyle {
    /// Sentinel-2 true color: B4/B3/B2 stretched over 0..3000.
    pub fn true_color() -> Self {
        Self {
            bands: ["B4".to_string(), "B3".to_string(), "B2".to_string()],
            min: 0.0,
            max: 3000.0,
        }
    }
}

/// Single-color styling for a boolean layer
#[derive(Debug, Clone)]
pub struct MaskStyle {
    pub color: String,
}

impl MaskStyle {
    pub fn new(color: impl Into<String>) -> Self {
        Self {
            color: color.into(),
        }
    }
}

/// Map surface the pipeline renders layers to. The core never consumes
/// anything back from it.
pub trait MapSurface {
    fn add_raster_layer(&mut self, name: &str, raster: &Raster, style: &RasterStyle);
    fn add_mask_layer(&mut self, name: &str, mask: &Mask, style: &MaskStyle);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Line,
    Column,
}

/// Chart surface fed from the result table
pub trait ChartSurface {
    fn render(
        &mut self,
        title: &str,
        table: &ResultTable,
        x_field: &str,
        y_fields: &[&str],
        kind: ChartKind,
    );
}

/// Surface that reports layers and charts through tracing instead of
/// drawing them. Keeps headless runs honest about what would be shown.
#[derive(Debug, Default)]
pub struct LogSurface;

impl MapSurface for LogSurface {
    fn add_raster_layer(&mut self, name: &str, raster: &Raster, style: &RasterStyle) {
        info!(
            layer = name,
            grid = %raster.grid(),
            bands = ?style.bands,
            min = style.min,
            max = style.max,
            "raster layer"
        );
    }

    fn add_mask_layer(&mut self, name: &str, mask: &Mask, style: &MaskStyle) {
        info!(
            layer = name,
            grid = %mask.grid(),
            color = %style.color,
            masked_pixels = mask.count_true(),
            "mask layer"
        );
    }
}

impl ChartSurface for LogSurface {
    fn render(
        &mut self,
        title: &str,
        table: &ResultTable,
        x_field: &str,
        y_fields: &[&str],
        kind: ChartKind,
    ) {
        for &field in y_fields {
            let series = table.series(field);
            info!(
                chart = title,
                x = x_field,
                series = field,
                kind = ?kind,
                points = series.len(),
                "chart series"
            );
        }
    }
}
