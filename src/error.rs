// src/error.rs
use thiserror::Error;

use crate::raster::GridRef;

/// Error type for urban-change operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("region lookup for {name:?} matched {matches} features, expected exactly one")]
    RegionNotFound { name: String, matches: usize },

    #[error("no imagery available for {year}")]
    NoImagery { year: i32 },

    #[error("grid mismatch: expected {expected}, got {actual}")]
    GridMismatch { expected: GridRef, actual: GridRef },

    #[error("pixel count {pixels} exceeds the configured ceiling of {max_pixels}")]
    ResourceExceeded { pixels: u64, max_pixels: u64 },

    #[error("invalid threshold configuration {config:?}: {reason}")]
    InvalidThresholdConfig { config: String, reason: String },

    #[error("invalid run configuration: {0}")]
    InvalidConfig(String),

    #[error("band {0:?} missing from raster")]
    MissingBand(String),

    #[error("buffer length {actual} does not match grid size {expected}")]
    BufferLength { expected: usize, actual: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "gdal")]
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),
}

/// Result type alias for urban-change operations
pub type Result<T> = std::result::Result<T, Error>;
