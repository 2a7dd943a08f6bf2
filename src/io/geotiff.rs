// src/io/geotiff.rs
use std::path::{Path, PathBuf};

use gdal::Dataset;
use tracing::debug;

use crate::catalog::ImageryCatalog;
use crate::error::{Error, Result};
use crate::processing::composite::DateWindow;
use crate::raster::{GridRef, Raster};
use crate::region::Region;

use super::manifest::{SceneEntry, SceneManifest};

/// GeoTIFF-backed imagery catalog: a directory of single-band files
/// described by `manifest.json`. Scene selection runs on manifest
/// metadata alone; band files are read only for scenes that pass every
/// predicate.
pub struct SceneDirectory {
    root: PathBuf,
    manifest: SceneManifest,
}

impl SceneDirectory {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let manifest = SceneManifest::from_file(root.join("manifest.json"))?;
        debug!(
            root = %root.display(),
            scenes = manifest.scenes.len(),
            "scene directory opened"
        );
        Ok(Self { root, manifest })
    }

    fn read_scene(&self, entry: &SceneEntry, bands: &[&str]) -> Result<Raster> {
        let mut grid: Option<GridRef> = None;
        let mut band_data = Vec::with_capacity(bands.len());

        for &name in bands {
            let path = self.root.join(entry.band_path(name)?);
            let dataset = Dataset::open(&path)?;
            let (width, height) = dataset.raster_size();
            let transform = dataset.geo_transform()?;
            let file_grid = GridRef::new(width, height, transform[1], (transform[0], transform[3]));
            match &grid {
                None => grid = Some(file_grid),
                Some(expected) => expected.ensure_aligned(&file_grid)?,
            }

            let band = dataset.rasterband(1)?;
            let nodata = band.no_data_value();
            let buffer = band.read_as::<f32>((0, 0), (width, height), (width, height), None)?;
            let mut data = buffer.data().to_vec();
            if let Some(nodata) = nodata {
                let nodata = nodata as f32;
                for value in &mut data {
                    if *value == nodata {
                        *value = f32::NAN;
                    }
                }
            }
            band_data.push((name.to_string(), data));
        }

        let grid = grid.ok_or_else(|| Error::InvalidConfig("no bands requested".to_string()))?;
        Raster::scene(grid, band_data, entry.date, entry.cloud_cover)
    }
}

impl ImageryCatalog for SceneDirectory {
    fn query(
        &self,
        region: &Region,
        window: DateWindow,
        cloud_ceiling: f32,
        bands: &[&str],
    ) -> Result<Vec<Raster>> {
        let Some(bbox) = region.bounding_rect() else {
            return Ok(Vec::new());
        };

        let mut entries: Vec<&SceneEntry> = self
            .manifest
            .scenes
            .iter()
            .filter(|e| window.contains(e.date))
            .filter(|e| e.cloud_cover < cloud_ceiling)
            .filter(|e| e.has_bands(bands))
            .collect();
        entries.sort_by_key(|e| e.date);

        let mut scenes = Vec::with_capacity(entries.len());
        for entry in entries {
            let scene = self.read_scene(entry, bands)?;
            let (min_x, min_y, max_x, max_y) = scene.grid().extent();
            let intersects = min_x <= bbox.max().x
                && max_x >= bbox.min().x
                && min_y <= bbox.max().y
                && max_y >= bbox.min().y;
            if intersects {
                scenes.push(scene);
            }
        }
        Ok(scenes)
    }
}
