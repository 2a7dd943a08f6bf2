// src/catalog.rs
use crate::error::Result;
use crate::processing::composite::DateWindow;
use crate::raster::Raster;
use crate::region::Region;

/// Black-box seam to the imagery archive. A catalog returns the
/// time-ordered scenes intersecting the region bounds, acquired inside
/// the date window, with cloud cover strictly below the ceiling, each
/// carrying all requested bands plus acquisition date and cloud metadata.
pub trait ImageryCatalog: Send + Sync {
    fn query(
        &self,
        region: &Region,
        window: DateWindow,
        cloud_ceiling: f32,
        bands: &[&str],
    ) -> Result<Vec<Raster>>;
}

/// In-memory catalog over an owned scene collection. Used by tests and
/// synthetic runs; the GeoTIFF-backed counterpart lives in `io::geotiff`
/// behind the `gdal` feature.
#[derive(Debug, Default)]
pub struct SceneCollection {
    scenes: Vec<Raster>,
}

impl SceneCollection {
    pub fn new(scenes: Vec<Raster>) -> Self {
        Self { scenes }
    }

    pub fn push(&mut self, scene: Raster) {
        self.scenes.push(scene);
    }
}

impl ImageryCatalog for SceneCollection {
    fn query(
        &self,
        region: &Region,
        window: DateWindow,
        cloud_ceiling: f32,
        bands: &[&str],
    ) -> Result<Vec<Raster>> {
        let bbox = region.bounding_rect();
        let mut hits: Vec<Raster> = self
            .scenes
            .iter()
            .filter(|s| s.timestamp().is_some_and(|d| window.contains(d)))
            .filter(|s| s.cloud_cover().is_some_and(|c| c < cloud_ceiling))
            .filter(|s| s.has_bands(bands))
            .filter(|s| {
                let (min_x, min_y, max_x, max_y) = s.grid().extent();
                bbox.is_some_and(|b| {
                    min_x <= b.max().x && max_x >= b.min().x && min_y <= b.max().y && max_y >= b.min().y
                })
            })
            .cloned()
            .collect();
        hits.sort_by_key(Raster::timestamp);
        Ok(hits)
    }
}
