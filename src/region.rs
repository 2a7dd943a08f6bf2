// src/region.rs
use std::path::Path;

use geo::{BoundingRect, Contains};
use geo_types::{Coord, LineString, MultiPolygon, Point, Polygon, Rect};
use rayon::prelude::*;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::raster::GridRef;

/// An administrative boundary used as a read-only spatial filter and
/// aggregation extent. Geometry is in the same projected coordinate
/// system as the imagery grids.
#[derive(Debug, Clone)]
pub struct Region {
    name: String,
    geometry: MultiPolygon<f64>,
}

impl Region {
    pub fn new(name: impl Into<String>, geometry: MultiPolygon<f64>) -> Self {
        Self {
            name: name.into(),
            geometry,
        }
    }

    pub fn from_polygon(name: impl Into<String>, polygon: Polygon<f64>) -> Self {
        Self::new(name, MultiPolygon(vec![polygon]))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        self.geometry.bounding_rect()
    }

    /// Pixel membership of the region on a grid, one flag per pixel in
    /// row-major order.
    ///
    /// Membership is decided by pixel-center containment: a pixel belongs
    /// to the region iff its center point lies inside the geometry. This
    /// is the documented region-intersection semantics of every zonal
    /// statistic in this crate; there is no fractional boundary weighting.
    pub fn rasterize(&self, grid: &GridRef) -> Vec<bool> {
        let pixels = grid.width * grid.height;
        let Some(bbox) = self.geometry.bounding_rect() else {
            return vec![false; pixels];
        };

        let mut cells = vec![false; pixels];
        cells
            .par_chunks_mut(grid.width)
            .enumerate()
            .for_each(|(row, row_cells)| {
                let (_, y) = grid.pixel_center(0, row);
                if y < bbox.min().y || y > bbox.max().y {
                    return;
                }
                for (col, cell) in row_cells.iter_mut().enumerate() {
                    let (x, _) = grid.pixel_center(col, row);
                    if x < bbox.min().x || x > bbox.max().x {
                        continue;
                    }
                    *cell = self.geometry.contains(&Point::new(x, y));
                }
            });
        cells
    }
}

/// Deterministic region lookup over a fixed boundary set. A name must
/// match exactly one region; zero or multiple matches fail before any
/// raster work is attempted.
#[derive(Debug, Clone, Default)]
pub struct RegionIndex {
    regions: Vec<Region>,
}

impl RegionIndex {
    pub fn new(regions: Vec<Region>) -> Self {
        Self { regions }
    }

    /// Load a GeoJSON FeatureCollection of named Polygon/MultiPolygon
    /// features (`properties.name` is the lookup key).
    pub fn from_geojson<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_geojson_str(&content)
    }

    pub fn from_geojson_str(content: &str) -> Result<Self> {
        let collection: GeoJsonCollection = serde_json::from_str(content)?;
        let regions = collection
            .features
            .into_iter()
            .map(|feature| Region::new(feature.properties.name, feature.geometry.into_geometry()))
            .collect();
        Ok(Self { regions })
    }

    pub fn lookup(&self, name: &str) -> Result<&Region> {
        let mut matches = self.regions.iter().filter(|r| r.name() == name);
        match (matches.next(), matches.next()) {
            (Some(region), None) => Ok(region),
            (None, _) => Err(Error::RegionNotFound {
                name: name.to_string(),
                matches: 0,
            }),
            (Some(_), Some(_)) => Err(Error::RegionNotFound {
                name: name.to_string(),
                matches: 2 + matches.count(),
            }),
        }
    }
}

#[derive(Deserialize)]
struct GeoJsonCollection {
    features: Vec<GeoJsonFeature>,
}

#[derive(Deserialize)]
struct GeoJsonFeature {
    properties: GeoJsonProperties,
    geometry: GeoJsonGeometry,
}

#[derive(Deserialize)]
struct GeoJsonProperties {
    name: String,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum GeoJsonGeometry {
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<[f64; 2]>>> },
}

impl GeoJsonGeometry {
    fn into_geometry(self) -> MultiPolygon<f64> {
        match self {
            GeoJsonGeometry::Polygon { coordinates } => MultiPolygon(vec![rings_to_polygon(coordinates)]),
            GeoJsonGeometry::MultiPolygon { coordinates } => {
                MultiPolygon(coordinates.into_iter().map(rings_to_polygon).collect())
            }
        }
    }
}

fn rings_to_polygon(rings: Vec<Vec<[f64; 2]>>) -> Polygon<f64> {
    let mut iter = rings.into_iter().map(|ring| {
        LineString(
            ring.into_iter()
                .map(|[x, y]| Coord { x, y })
                .collect(),
        )
    });
    let exterior = iter.next().unwrap_or_else(|| LineString(Vec::new()));
    Polygon::new(exterior, iter.collect())
}
