// src/io/mod.rs
pub mod manifest;

#[cfg(feature = "gdal")]
pub mod geotiff;

pub use manifest::{SceneEntry, SceneManifest};

#[cfg(feature = "gdal")]
pub use geotiff::SceneDirectory;
