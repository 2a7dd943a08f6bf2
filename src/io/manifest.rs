// src/io/manifest.rs
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Sidecar manifest describing the scenes of an imagery directory.
///
/// One GeoTIFF per band per scene, keyed by Sentinel-2 band name; every
/// scene carries its acquisition date and cloud-cover percentage so the
/// catalog can filter without opening any raster.
#[derive(Deserialize, Serialize, Debug)]
pub struct SceneManifest {
    pub scenes: Vec<SceneEntry>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct SceneEntry {
    pub date: NaiveDate,
    pub cloud_cover: f32,
    /// Band name -> band file, relative to the manifest directory
    pub bands: HashMap<String, PathBuf>,
}

impl SceneManifest {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let manifest: SceneManifest = serde_json::from_str(&content)?;
        Ok(manifest)
    }
}

impl SceneEntry {
    pub fn band_path(&self, band: &str) -> Result<&PathBuf> {
        self.bands
            .get(band)
            .ok_or_else(|| Error::MissingBand(band.to_string()))
    }

    pub fn has_bands(&self, bands: &[&str]) -> bool {
        bands.iter().all(|b| self.bands.contains_key(*b))
    }
}
