// src/processing/mask.rs
use std::fmt;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::raster::{IndexRaster, Mask};

use super::indices::{IndexCalculator, EBBI, NDBI, NDVI};

/// Spectral indices usable in threshold rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    Ndbi,
    Ndvi,
    Ebbi,
}

impl IndexKind {
    pub fn calculator(&self) -> Box<dyn IndexCalculator> {
        match self {
            IndexKind::Ndbi => Box::new(NDBI),
            IndexKind::Ndvi => Box::new(NDVI),
            IndexKind::Ebbi => Box::new(EBBI),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            IndexKind::Ndbi => "NDBI",
            IndexKind::Ndvi => "NDVI",
            IndexKind::Ebbi => "EBBI",
        }
    }
}

/// Comparison operator of a threshold rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
}

impl Comparator {
    /// NaN fails every comparison, so no-data pixels never count as urban.
    pub fn compare(&self, value: f32, threshold: f32) -> bool {
        match self {
            Comparator::Gt => value > threshold,
            Comparator::Lt => value < threshold,
            Comparator::Ge => value >= threshold,
            Comparator::Le => value <= threshold,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Comparator::Gt => ">",
            Comparator::Lt => "<",
            Comparator::Ge => ">=",
            Comparator::Le => "<=",
        };
        f.write_str(s)
    }
}

/// One (index, comparator, threshold) triple
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdRule {
    pub index: IndexKind,
    pub comparator: Comparator,
    pub value: f32,
}

impl ThresholdRule {
    pub fn new(index: IndexKind, comparator: Comparator, value: f32) -> Self {
        Self {
            index,
            comparator,
            value,
        }
    }
}

/// Named conjunction of threshold rules defining one land-cover class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub name: String,
    pub rules: Vec<ThresholdRule>,
}

impl ThresholdConfig {
    pub fn new(name: impl Into<String>, rules: Vec<ThresholdRule>) -> Self {
        Self {
            name: name.into(),
            rules,
        }
    }

    /// NDBI > 0 and NDVI < 0.3
    pub fn original() -> Self {
        Self::new(
            "original",
            vec![
                ThresholdRule::new(IndexKind::Ndbi, Comparator::Gt, 0.0),
                ThresholdRule::new(IndexKind::Ndvi, Comparator::Lt, 0.3),
            ],
        )
    }

    /// NDBI > -0.1 and NDVI < 0.4
    pub fn lenient() -> Self {
        Self::new(
            "lenient",
            vec![
                ThresholdRule::new(IndexKind::Ndbi, Comparator::Gt, -0.1),
                ThresholdRule::new(IndexKind::Ndvi, Comparator::Lt, 0.4),
            ],
        )
    }

    /// NDBI > 0.1 and NDVI < 0.2
    pub fn strict() -> Self {
        Self::new(
            "strict",
            vec![
                ThresholdRule::new(IndexKind::Ndbi, Comparator::Gt, 0.1),
                ThresholdRule::new(IndexKind::Ndvi, Comparator::Lt, 0.2),
            ],
        )
    }

    /// EBBI > 0, the secondary built-up method
    pub fn ebbi() -> Self {
        Self::new(
            "ebbi",
            vec![ThresholdRule::new(IndexKind::Ebbi, Comparator::Gt, 0.0)],
        )
    }

    /// The three-way sensitivity sweep run side by side by default.
    pub fn default_sweep() -> Vec<Self> {
        vec![Self::original(), Self::lenient(), Self::strict()]
    }

    /// Reject malformed configurations before any raster work begins.
    pub fn validate(&self) -> Result<()> {
        if self.rules.is_empty() {
            return self.invalid("no threshold rules");
        }
        for rule in &self.rules {
            if !rule.value.is_finite() {
                return self.invalid(format!(
                    "non-finite threshold for {} {}",
                    rule.index.name(),
                    rule.comparator
                ));
            }
        }
        for (i, a) in self.rules.iter().enumerate() {
            for b in &self.rules[i + 1..] {
                if a.index == b.index && a.comparator == b.comparator {
                    return self.invalid(format!(
                        "duplicate rule {} {}",
                        a.index.name(),
                        a.comparator
                    ));
                }
            }
        }
        Ok(())
    }

    /// Indices referenced by this configuration, first occurrence order.
    pub fn indices(&self) -> Vec<IndexKind> {
        let mut kinds = Vec::new();
        for rule in &self.rules {
            if !kinds.contains(&rule.index) {
                kinds.push(rule.index);
            }
        }
        kinds
    }

    fn invalid<T>(&self, reason: impl Into<String>) -> Result<T> {
        Err(Error::InvalidThresholdConfig {
            config: self.name.clone(),
            reason: reason.into(),
        })
    }
}

/// Conjunction of the configured comparisons over index value slices,
/// elementwise. Slices are keyed by index kind and must share one length;
/// they may cover a whole raster or a single tile.
pub fn build_mask(config: &ThresholdConfig, indices: &[(IndexKind, &[f32])]) -> Result<Vec<bool>> {
    let len = indices.first().map(|(_, s)| s.len()).unwrap_or(0);
    let mut out = vec![true; len];

    for rule in &config.rules {
        let (_, values) = indices
            .iter()
            .find(|(kind, _)| *kind == rule.index)
            .ok_or_else(|| Error::InvalidThresholdConfig {
                config: config.name.clone(),
                reason: format!("no values computed for {}", rule.index.name()),
            })?;
        if values.len() != len {
            return Err(Error::BufferLength {
                expected: len,
                actual: values.len(),
            });
        }
        out.par_iter_mut()
            .zip(values.par_iter())
            .for_each(|(keep, &v)| {
                *keep = *keep && rule.comparator.compare(v, rule.value);
            });
    }
    Ok(out)
}

/// Full-raster convenience wrapper over `build_mask`.
pub fn build_mask_raster(
    config: &ThresholdConfig,
    indices: &[(IndexKind, &IndexRaster)],
) -> Result<Mask> {
    let Some((_, first)) = indices.first() else {
        return Err(Error::InvalidThresholdConfig {
            config: config.name.clone(),
            reason: "no index rasters supplied".to_string(),
        });
    };
    let grid = *first.grid();
    for (_, raster) in &indices[1..] {
        grid.ensure_aligned(raster.grid())?;
    }
    let slices: Vec<(IndexKind, &[f32])> = indices
        .iter()
        .map(|(kind, raster)| (*kind, raster.data()))
        .collect();
    Mask::new(grid, build_mask(config, &slices)?)
}
