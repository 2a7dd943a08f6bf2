// src/processing/indices/ebbi.rs
use rayon::prelude::*;

use super::IndexCalculator;

/// Enhanced Built-up and Bare-soil Index calculator
///
/// EBBI = (SWIR1 - NIR) / (10 * sqrt(SWIR1 + SWIR2)), Sentinel-2 bands
/// B11, B8 and B12. Unlike the normalized-difference indices the result
/// is unbounded.
pub struct EBBI;

impl IndexCalculator for EBBI {
    fn calculate(&self, inputs: &[&[f32]]) -> Vec<f32> {
        let swir1 = inputs[0];
        let nir = inputs[1];
        let swir2 = inputs[2];

        let mut result = vec![f32::NAN; swir1.len()];
        result.par_iter_mut().enumerate().for_each(|(i, out)| {
            let s1 = swir1[i];
            let n = nir[i];
            let s2 = swir2[i];
            // sqrt of a negative radicand is NaN, which fails the guard
            // along with a zero denominator and NaN inputs
            let denom = 10.0 * (s1 + s2).sqrt();
            if denom > 0.0 {
                *out = (s1 - n) / denom;
            }
        });
        result
    }

    fn required_bands(&self) -> &'static [&'static str] {
        &["B11", "B8", "B12"]
    }

    fn name(&self) -> &'static str {
        "EBBI"
    }
}
