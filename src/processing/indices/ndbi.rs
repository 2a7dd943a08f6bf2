// src/processing/indices/ndbi.rs
use rayon::prelude::*;

use super::IndexCalculator;

/// Normalized Difference Built-up Index calculator
///
/// NDBI = (SWIR1 - NIR) / (SWIR1 + NIR), Sentinel-2 bands B11 and B8.
/// Built-up and bare surfaces push the value above zero.
pub struct NDBI;

impl IndexCalculator for NDBI {
    fn calculate(&self, inputs: &[&[f32]]) -> Vec<f32> {
        let swir1 = inputs[0];
        let nir = inputs[1];

        let mut result = vec![f32::NAN; swir1.len()];
        result.par_iter_mut().enumerate().for_each(|(i, out)| {
            let s = swir1[i];
            let n = nir[i];
            let sum = s + n;
            // Zero denominator stays NaN; NaN inputs fall through as well
            if sum != 0.0 {
                *out = (s - n) / sum;
            }
        });
        result
    }

    fn required_bands(&self) -> &'static [&'static str] {
        &["B11", "B8"]
    }

    fn name(&self) -> &'static str {
        "NDBI"
    }
}
