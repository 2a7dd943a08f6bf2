// src/processing/change.rs
use rayon::prelude::*;

use crate::error::Result;
use crate::raster::Mask;

/// The three mutually exclusive change classes between two time periods
#[derive(Debug, Clone)]
pub struct ChangeMasks {
    /// Built-up earlier, not built-up later
    pub loss: Mask,
    /// Not built-up earlier, built-up later
    pub gain: Mask,
    /// Built-up in both periods
    pub stable: Mask,
}

/// Classify per-pixel change between two land-cover masks taken at
/// different times. The three classes are computed independently:
///
/// - loss   = earlier AND NOT later
/// - gain   = NOT earlier AND later
/// - stable = earlier AND later
///
/// Masks on different grids are a precondition violation; this fails
/// fast with `GridMismatch` instead of resampling.
pub fn detect_change(earlier: &Mask, later: &Mask) -> Result<ChangeMasks> {
    earlier.grid().ensure_aligned(later.grid())?;

    let loss = combine(earlier, later, |e, l| e && !l)?;
    let gain = combine(earlier, later, |e, l| !e && l)?;
    let stable = combine(earlier, later, |e, l| e && l)?;

    Ok(ChangeMasks { loss, gain, stable })
}

fn combine(a: &Mask, b: &Mask, op: impl Fn(bool, bool) -> bool + Sync) -> Result<Mask> {
    let data = a
        .data()
        .par_iter()
        .zip(b.data().par_iter())
        .map(|(&x, &y)| op(x, y))
        .collect();
    Mask::new(*a.grid(), data)
}
