// src/processing/indices/ndvi.rs
use rayon::prelude::*;

use super::IndexCalculator;

/// Normalized Difference Vegetation Index calculator
///
/// NDVI = (NIR - Red) / (NIR + Red), Sentinel-2 bands B8 and B4.
pub struct NDVI;

impl IndexCalculator for NDVI {
    fn calculate(&self, inputs: &[&[f32]]) -> Vec<f32> {
        let nir = inputs[0];
        let red = inputs[1];

        let mut result = vec![f32::NAN; nir.len()];
        result.par_iter_mut().enumerate().for_each(|(i, out)| {
            let n = nir[i];
            let r = red[i];
            let sum = n + r;
            if sum != 0.0 {
                *out = (n - r) / sum;
            }
        });
        result
    }

    fn required_bands(&self) -> &'static [&'static str] {
        &["B8", "B4"]
    }

    fn name(&self) -> &'static str {
        "NDVI"
    }
}
