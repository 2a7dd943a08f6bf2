// src/processing/indices/mod.rs
pub mod ebbi;
pub mod ndbi;
pub mod ndvi;

// Re-export indices
pub use ebbi::EBBI;
pub use ndbi::NDBI;
pub use ndvi::NDVI;

/// Trait for spectral index calculators
pub trait IndexCalculator: Send + Sync {
    /// Calculate the index elementwise over band slices ordered as
    /// `required_bands`. Slices may cover a whole raster or one tile.
    /// NaN marks pixels where the formula is undefined; calculators never
    /// panic on degenerate values.
    fn calculate(&self, inputs: &[&[f32]]) -> Vec<f32>;

    /// Sentinel-2 band names expected by `calculate`, in input order
    fn required_bands(&self) -> &'static [&'static str];

    /// Return the name of the index
    fn name(&self) -> &'static str;
}
