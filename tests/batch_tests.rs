// tests/batch_tests.rs
use chrono::NaiveDate;
use geo_types::{polygon, Polygon};

use urban_change::batch::BatchDriver;
use urban_change::catalog::SceneCollection;
use urban_change::config::RunConfig;
use urban_change::processing::change::detect_change;
use urban_change::processing::composite::{median_composite, select_scenes, DateWindow};
use urban_change::processing::mask::ThresholdConfig;
use urban_change::processing::zonal::ZonalAggregator;
use urban_change::raster::{GridRef, Mask, Raster};
use urban_change::region::{Region, RegionIndex};
use urban_change::render::{ChartKind, ChartSurface, MapSurface, MaskStyle, RasterStyle};
use urban_change::table::{RecordStatus, ResultTable};
use urban_change::Error;

/// Map/chart surface that records what would be drawn
#[derive(Default)]
struct RecordingSurface {
    rasters: Vec<(String, [String; 3], f32, f32)>,
    masks: Vec<(String, String, u64)>,
    series: Vec<(String, String, usize)>,
}

impl MapSurface for RecordingSurface {
    fn add_raster_layer(&mut self, name: &str, _raster: &Raster, style: &RasterStyle) {
        self.rasters
            .push((name.to_string(), style.bands.clone(), style.min, style.max));
    }

    fn add_mask_layer(&mut self, name: &str, mask: &Mask, style: &MaskStyle) {
        self.masks
            .push((name.to_string(), style.color.clone(), mask.count_true()));
    }
}

impl ChartSurface for RecordingSurface {
    fn render(
        &mut self,
        title: &str,
        table: &ResultTable,
        _x_field: &str,
        y_fields: &[&str],
        _kind: ChartKind,
    ) {
        for &field in y_fields {
            self.series
                .push((title.to_string(), field.to_string(), table.series(field).len()));
        }
    }
}

/// 100x100 pixels at 10 m covering the projected square (0,0)-(1000,1000)
fn test_grid() -> GridRef {
    GridRef::new(100, 100, 10.0, (0.0, 1000.0))
}

fn square(min: f64, max: f64) -> Polygon<f64> {
    polygon![
        (x: min, y: min),
        (x: max, y: min),
        (x: max, y: max),
        (x: min, y: max),
        (x: min, y: min),
    ]
}

/// Region exactly covering the test grid (1 km x 1 km)
fn test_region() -> Region {
    Region::from_polygon("Testville", square(0.0, 1000.0))
}

fn summer_date(year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 7, 15).unwrap()
}

fn uniform_scene(date: NaiveDate, cloud: f32, bands: &[(&str, f32)]) -> Raster {
    let grid = test_grid();
    let data = bands
        .iter()
        .map(|(name, value)| (name.to_string(), vec![*value; 10_000]))
        .collect();
    Raster::scene(grid, data, date, cloud).unwrap()
}

/// Scene whose B11 value varies by column; B8 and B4 are uniform.
fn column_scene(date: NaiveDate, b11: impl Fn(usize) -> f32, b8: f32, b4: f32) -> Raster {
    let grid = test_grid();
    let mut swir = vec![0.0f32; 10_000];
    for row in 0..100 {
        for col in 0..100 {
            swir[row * 100 + col] = b11(col);
        }
    }
    let data = vec![
        ("B11".to_string(), swir),
        ("B8".to_string(), vec![b8; 10_000]),
        ("B4".to_string(), vec![b4; 10_000]),
    ];
    Raster::scene(grid, data, date, 2.0).unwrap()
}

fn base_config(year_range: [i32; 2]) -> RunConfig {
    RunConfig {
        region: "Testville".to_string(),
        year_range,
        month_window: [5, 10],
        cloud_ceiling: 8.0,
        bands: vec!["B8".to_string(), "B11".to_string(), "B4".to_string()],
        threshold_configs: vec![ThresholdConfig::original()],
        change_pairs: vec![],
        max_pixels: 10_000_000_000,
        tile_rows: 32,
    }
}

/// Uniform reflectances B8=3000 B11=2000 B4=1000 give NDBI=-0.2 and
/// NDVI=0.5, so the original thresholds classify nothing as urban.
#[test]
fn test_uniform_composite_zero_urban_area() {
    let bands = [("B8", 3000.0), ("B11", 2000.0), ("B4", 1000.0)];
    let catalog = SceneCollection::new(vec![
        uniform_scene(summer_date(2024), 3.0, &bands),
        uniform_scene(NaiveDate::from_ymd_opt(2024, 8, 20).unwrap(), 5.0, &bands),
    ]);
    let region = test_region();
    let config = base_config([2024, 2024]);

    let table = BatchDriver::new(&catalog, &region, &config).run().unwrap();

    let record = table.area(2024, "original").unwrap();
    assert_eq!(record.status, RecordStatus::Complete);
    assert_eq!(record.image_count, 2);
    assert_eq!(record.area_km2, Some(0.0));
}

/// A fully built-up composite over the 1 km2 region yields 1 km2.
#[test]
fn test_fully_urban_composite_area() {
    let bands = [("B8", 1000.0), ("B11", 2000.0), ("B4", 1000.0)];
    let catalog = SceneCollection::new(vec![uniform_scene(summer_date(2024), 3.0, &bands)]);
    let region = test_region();
    let config = base_config([2024, 2024]);

    let table = BatchDriver::new(&catalog, &region, &config).run().unwrap();

    let area = table.area(2024, "original").unwrap().area_km2.unwrap();
    assert!((area - 1.0).abs() < 1e-9, "expected 1 km2, got {area}");
}

/// A year without qualifying imagery gets explicit no-data records while
/// the rest of the batch still completes.
#[test]
fn test_missing_year_flagged_not_fatal() {
    let bands = [("B8", 1000.0), ("B11", 2000.0), ("B4", 1000.0)];
    let catalog = SceneCollection::new(vec![
        uniform_scene(summer_date(2023), 3.0, &bands),
        uniform_scene(summer_date(2024), 3.0, &bands),
    ]);
    let region = test_region();
    let config = base_config([2023, 2025]);

    let table = BatchDriver::new(&catalog, &region, &config).run().unwrap();

    assert_eq!(table.areas.len(), 3);
    assert_eq!(table.years(), vec![2023, 2024, 2025]);

    for year in [2023, 2024] {
        let record = table.area(year, "original").unwrap();
        assert_eq!(record.status, RecordStatus::Complete);
        assert!(record.area_km2.is_some());
    }

    let missing = table.area(2025, "original").unwrap();
    assert_eq!(missing.status, RecordStatus::NoImagery);
    assert_eq!(missing.image_count, 0);
    assert_eq!(missing.area_km2, None);
    assert!(format!("{table}").contains("n/a (no imagery)"));
}

/// Change classification over two synthetic periods: 2019 urban in
/// columns 0-49, 2023 urban in columns 40-99.
#[test]
fn test_change_classification_areas() {
    let urban_below = |cut: usize| move |col: usize| if col < cut { 2000.0 } else { 500.0 };
    let urban_from = |cut: usize| move |col: usize| if col >= cut { 2000.0 } else { 500.0 };

    let catalog = SceneCollection::new(vec![
        column_scene(summer_date(2019), urban_below(50), 1000.0, 1000.0),
        column_scene(summer_date(2023), urban_from(40), 1000.0, 1000.0),
    ]);
    let region = test_region();
    let mut config = base_config([2019, 2023]);
    config.change_pairs = vec![[2019, 2023]];

    let table = BatchDriver::new(&catalog, &region, &config).run().unwrap();

    let earlier = table.area(2019, "original").unwrap().area_km2.unwrap();
    let later = table.area(2023, "original").unwrap().area_km2.unwrap();
    assert!((earlier - 0.5).abs() < 1e-9);
    assert!((later - 0.6).abs() < 1e-9);

    let change = &table.changes[0];
    assert_eq!(change.status, RecordStatus::Complete);
    let loss = change.loss_km2.unwrap();
    let gain = change.gain_km2.unwrap();
    let stable = change.stable_km2.unwrap();
    assert!((loss - 0.4).abs() < 1e-9);
    assert!((gain - 0.5).abs() < 1e-9);
    assert!((stable - 0.1).abs() < 1e-9);

    // Cross-check invariants against the single-period areas
    assert!((stable + loss - earlier).abs() < 1e-9);
    assert!((stable + gain - later).abs() < 1e-9);
}

/// A change pair involving a no-imagery year is flagged, not fatal.
#[test]
fn test_change_pair_with_missing_year() {
    let bands = [("B8", 1000.0), ("B11", 2000.0), ("B4", 1000.0)];
    let catalog = SceneCollection::new(vec![uniform_scene(summer_date(2019), 3.0, &bands)]);
    let region = test_region();
    let mut config = base_config([2019, 2023]);
    config.change_pairs = vec![[2019, 2023]];

    let table = BatchDriver::new(&catalog, &region, &config).run().unwrap();

    let change = &table.changes[0];
    assert_eq!(change.status, RecordStatus::NoImagery);
    assert_eq!(change.loss_km2, None);
    assert_eq!(change.gain_km2, None);
    assert_eq!(change.stable_km2, None);
}

/// Looser thresholds can only ever classify more area as urban.
#[test]
fn test_threshold_sensitivity_ordering() {
    // NDBI rises with the column from about -0.11 to 0.13 while NDVI
    // stays at 0.11, so each preset cuts at a different column
    let catalog = SceneCollection::new(vec![column_scene(
        summer_date(2024),
        |col| 800.0 + col as f32 * 5.0,
        1000.0,
        800.0,
    )]);
    let region = test_region();
    let mut config = base_config([2024, 2024]);
    config.threshold_configs = ThresholdConfig::default_sweep();

    let table = BatchDriver::new(&catalog, &region, &config).run().unwrap();

    let lenient = table.area(2024, "lenient").unwrap().area_km2.unwrap();
    let original = table.area(2024, "original").unwrap().area_km2.unwrap();
    let strict = table.area(2024, "strict").unwrap().area_km2.unwrap();

    assert!(lenient > original, "lenient {lenient} vs original {original}");
    assert!(original > strict, "original {original} vs strict {strict}");
    assert!(strict > 0.0);
}

/// The three change classes are mutually exclusive and match the
/// Boolean identities exactly.
#[test]
fn test_change_mask_identities() {
    let grid = GridRef::new(10, 10, 10.0, (0.0, 100.0));
    let earlier_data: Vec<bool> = (0..100).map(|i| i % 2 == 0).collect();
    let later_data: Vec<bool> = (0..100).map(|i| i % 3 == 0).collect();
    let earlier = Mask::new(grid, earlier_data.clone()).unwrap();
    let later = Mask::new(grid, later_data.clone()).unwrap();

    let change = detect_change(&earlier, &later).unwrap();

    for i in 0..100 {
        let (e, l) = (earlier_data[i], later_data[i]);
        assert_eq!(change.loss.data()[i], e && !l);
        assert_eq!(change.gain.data()[i], !e && l);
        assert_eq!(change.stable.data()[i], e && l);

        let classes = [change.loss.data()[i], change.gain.data()[i], change.stable.data()[i]];
        assert!(classes.iter().filter(|c| **c).count() <= 1, "pixel {i} in two classes");
    }
}

/// Misaligned grids are a precondition violation, not a resample.
#[test]
fn test_change_grid_mismatch() {
    let a = Mask::new(GridRef::new(10, 10, 10.0, (0.0, 100.0)), vec![false; 100]).unwrap();
    let b = Mask::new(GridRef::new(20, 20, 10.0, (0.0, 200.0)), vec![false; 400]).unwrap();
    assert!(matches!(
        detect_change(&a, &b),
        Err(Error::GridMismatch { .. })
    ));

    // Same shape, different resolution is still a mismatch
    let c = Mask::new(GridRef::new(10, 10, 20.0, (0.0, 100.0)), vec![false; 100]).unwrap();
    assert!(matches!(
        detect_change(&a, &c),
        Err(Error::GridMismatch { .. })
    ));
}

#[test]
fn test_zonal_all_false_and_idempotent() {
    let grid = test_grid();
    let mask = Mask::new(grid, vec![false; 10_000]).unwrap();
    let cells = test_region().rasterize(&grid);
    let aggregator = ZonalAggregator::new(1_000_000, 16);

    assert_eq!(aggregator.area_km2(&mask, &cells).unwrap(), 0.0);

    let urban = Mask::new(grid, vec![true; 10_000]).unwrap();
    let first = aggregator.area_km2(&urban, &cells).unwrap();
    let second = aggregator.area_km2(&urban, &cells).unwrap();
    assert_eq!(first, second);
    assert!((first - 1.0).abs() < 1e-9);
}

/// Only pixels whose center falls inside the region contribute.
#[test]
fn test_zonal_partial_region() {
    let grid = test_grid();
    let region = Region::from_polygon("Southwest", square(0.0, 500.0));
    // Bottom-left quarter: columns 0-49 of rows 50-99
    let cells = region.rasterize(&grid);
    assert_eq!(cells.iter().filter(|c| **c).count(), 50 * 50);

    let urban = Mask::new(grid, vec![true; 10_000]).unwrap();
    let aggregator = ZonalAggregator::new(1_000_000, 16);
    let area = aggregator.area_km2(&urban, &cells).unwrap();
    assert!((area - 0.25).abs() < 1e-9);
}

/// Grids beyond the pixel budget are rejected explicitly.
#[test]
fn test_zonal_pixel_budget() {
    let grid = test_grid();
    let mask = Mask::new(grid, vec![true; 10_000]).unwrap();
    let cells = vec![true; 10_000];
    let aggregator = ZonalAggregator::new(5_000, 16);

    assert!(matches!(
        aggregator.area_km2(&mask, &cells),
        Err(Error::ResourceExceeded {
            pixels: 10_000,
            max_pixels: 5_000
        })
    ));
}

/// A too-small pixel budget flags every record but the batch completes.
#[test]
fn test_batch_survives_pixel_budget() {
    let bands = [("B8", 1000.0), ("B11", 2000.0), ("B4", 1000.0)];
    let catalog = SceneCollection::new(vec![uniform_scene(summer_date(2024), 3.0, &bands)]);
    let region = test_region();
    let mut config = base_config([2024, 2024]);
    config.max_pixels = 100;

    let table = BatchDriver::new(&catalog, &region, &config).run().unwrap();

    let record = table.area(2024, "original").unwrap();
    assert_eq!(record.status, RecordStatus::ResourceExceeded);
    assert_eq!(record.area_km2, None);
}

/// One true-color layer plus one colored mask layer per configuration,
/// colors cycling red/blue/green in sweep order.
#[test]
fn test_render_year_layers() {
    let bands = [("B8", 1000.0), ("B11", 2000.0), ("B4", 1000.0)];
    let catalog = SceneCollection::new(vec![uniform_scene(summer_date(2024), 3.0, &bands)]);
    let region = test_region();
    let mut config = base_config([2024, 2024]);
    config.threshold_configs = ThresholdConfig::default_sweep();

    let driver = BatchDriver::new(&catalog, &region, &config);
    let mut surface = RecordingSurface::default();
    driver.render_year(2024, &mut surface).unwrap();

    assert_eq!(surface.rasters.len(), 1);
    let (name, bands, min, max) = &surface.rasters[0];
    assert_eq!(name, "2024 true color");
    assert_eq!(bands, &["B4".to_string(), "B3".to_string(), "B2".to_string()]);
    assert_eq!((*min, *max), (0.0, 3000.0));

    // NDBI 0.333 and NDVI 0 pass every preset, so each mask is full
    let layers: Vec<(&str, &str, u64)> = surface
        .masks
        .iter()
        .map(|(n, c, p)| (n.as_str(), c.as_str(), *p))
        .collect();
    assert_eq!(
        layers,
        vec![
            ("2024 urban (original)", "red", 10_000),
            ("2024 urban (lenient)", "blue", 10_000),
            ("2024 urban (strict)", "green", 10_000),
        ]
    );
}

/// Change rendering emits the stable/loss/gain layer triple with the
/// fixed gray/red/green palette and the expected pixel counts.
#[test]
fn test_render_change_layers() {
    let urban_below = |cut: usize| move |col: usize| if col < cut { 2000.0 } else { 500.0 };
    let urban_from = |cut: usize| move |col: usize| if col >= cut { 2000.0 } else { 500.0 };
    let catalog = SceneCollection::new(vec![
        column_scene(summer_date(2019), urban_below(50), 1000.0, 1000.0),
        column_scene(summer_date(2023), urban_from(40), 1000.0, 1000.0),
    ]);
    let region = test_region();
    let config = base_config([2019, 2023]);

    let driver = BatchDriver::new(&catalog, &region, &config);
    let mut surface = RecordingSurface::default();
    driver.render_change(2019, 2023, &mut surface).unwrap();

    let layers: Vec<(&str, &str, u64)> = surface
        .masks
        .iter()
        .map(|(n, c, p)| (n.as_str(), c.as_str(), *p))
        .collect();
    assert_eq!(
        layers,
        vec![
            ("stable 2019-2023", "gray", 1_000),
            ("loss 2019-2023", "red", 4_000),
            ("gain 2019-2023", "green", 5_000),
        ]
    );
}

/// Chart surfaces receive one series per requested configuration.
#[test]
fn test_chart_series_per_config() {
    let bands = [("B8", 1000.0), ("B11", 2000.0), ("B4", 1000.0)];
    let catalog = SceneCollection::new(vec![uniform_scene(summer_date(2024), 3.0, &bands)]);
    let region = test_region();
    let mut config = base_config([2024, 2024]);
    config.threshold_configs = ThresholdConfig::default_sweep();

    let table = BatchDriver::new(&catalog, &region, &config).run().unwrap();

    let mut surface = RecordingSurface::default();
    let fields: Vec<&str> = table.configs();
    surface.render("Urban area", &table, "year", &fields, ChartKind::Line);

    assert_eq!(surface.series.len(), 3);
    for (title, field, points) in &surface.series {
        assert_eq!(title, "Urban area");
        assert!(["original", "lenient", "strict"].contains(&field.as_str()));
        assert_eq!(*points, 1);
    }
}

/// An over-budget grid is rejected before any layer is emitted.
#[test]
fn test_render_rejects_over_budget_grid() {
    let bands = [("B8", 1000.0), ("B11", 2000.0), ("B4", 1000.0)];
    let catalog = SceneCollection::new(vec![uniform_scene(summer_date(2024), 3.0, &bands)]);
    let region = test_region();
    let mut config = base_config([2024, 2024]);
    config.max_pixels = 100;

    let driver = BatchDriver::new(&catalog, &region, &config);
    let mut surface = RecordingSurface::default();
    assert!(matches!(
        driver.render_year(2024, &mut surface),
        Err(Error::ResourceExceeded { .. })
    ));
    assert!(surface.rasters.is_empty());
    assert!(surface.masks.is_empty());
}

#[test]
fn test_region_lookup_is_deterministic() {
    let index = RegionIndex::new(vec![
        Region::from_polygon("Montreal", square(0.0, 1000.0)),
        Region::from_polygon("Laval", square(1000.0, 2000.0)),
    ]);

    assert_eq!(index.lookup("Laval").unwrap().name(), "Laval");

    match index.lookup("Atlantis") {
        Err(Error::RegionNotFound { name, matches }) => {
            assert_eq!(name, "Atlantis");
            assert_eq!(matches, 0);
        }
        other => panic!("expected RegionNotFound, got {other:?}"),
    }

    let ambiguous = RegionIndex::new(vec![
        Region::from_polygon("Montreal", square(0.0, 1000.0)),
        Region::from_polygon("Montreal", square(0.0, 500.0)),
    ]);
    assert!(matches!(
        ambiguous.lookup("Montreal"),
        Err(Error::RegionNotFound { matches: 2, .. })
    ));
}

/// An unknown region fails before any raster work is attempted.
#[test]
fn test_unknown_region_fails_before_rasters() {
    let index = RegionIndex::new(vec![test_region()]);
    assert!(index.lookup("Nowhere").is_err());
}

#[test]
fn test_region_from_geojson() {
    let geojson = r#"{
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {"name": "Testville"},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[0.0, 0.0], [1000.0, 0.0], [1000.0, 1000.0], [0.0, 1000.0], [0.0, 0.0]]]
            }
        }]
    }"#;

    let index = RegionIndex::from_geojson_str(geojson).unwrap();
    let region = index.lookup("Testville").unwrap();
    let cells = region.rasterize(&test_grid());
    assert_eq!(cells.iter().filter(|c| **c).count(), 10_000);
}

/// Median compositing skips NaN samples per pixel and averages the two
/// central samples for even counts.
#[test]
fn test_median_composite_values() {
    let grid = test_grid();
    let make = |day: u32, value: f32| {
        Raster::scene(
            grid,
            vec![("B8".to_string(), vec![value; 10_000])],
            NaiveDate::from_ymd_opt(2024, 7, day).unwrap(),
            1.0,
        )
        .unwrap()
    };

    let a = make(1, 1.0);
    let b = make(10, 2.0);
    let c = make(20, 9.0);

    let composite = median_composite(&[&a, &b, &c], &["B8"]).unwrap().unwrap();
    assert_eq!(composite.band("B8").unwrap()[0], 2.0);
    assert!(composite.timestamp().is_none());

    let composite = median_composite(&[&a, &b], &["B8"]).unwrap().unwrap();
    assert_eq!(composite.band("B8").unwrap()[0], 1.5);

    // NaN samples are ignored per pixel
    let mut nan_band = vec![f32::NAN; 10_000];
    nan_band[0] = 5.0;
    let d = Raster::scene(
        grid,
        vec![("B8".to_string(), nan_band)],
        NaiveDate::from_ymd_opt(2024, 7, 25).unwrap(),
        1.0,
    )
    .unwrap();
    let composite = median_composite(&[&a, &c, &d], &["B8"]).unwrap().unwrap();
    assert_eq!(composite.band("B8").unwrap()[0], 5.0);
    assert_eq!(composite.band("B8").unwrap()[1], 5.0); // median of {1, 9}
}

#[test]
fn test_empty_selection_yields_no_composite() {
    let composite = median_composite(&[], &["B8"]).unwrap();
    assert!(composite.is_none());
}

/// Scene selection applies the date window and the strict cloud ceiling.
#[test]
fn test_scene_selection_filters() {
    let bands = [("B8", 1000.0)];
    let scenes = vec![
        uniform_scene(summer_date(2024), 3.0, &bands),
        // At the ceiling: excluded (strictly below required)
        uniform_scene(NaiveDate::from_ymd_opt(2024, 8, 1).unwrap(), 8.0, &bands),
        // Outside the seasonal window
        uniform_scene(NaiveDate::from_ymd_opt(2024, 12, 1).unwrap(), 1.0, &bands),
    ];

    let window = DateWindow::for_year(2024, (5, 10)).unwrap();
    let selected = select_scenes(&scenes, window, 8.0);
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].timestamp(), Some(summer_date(2024)));
}

#[test]
fn test_run_config_validation() {
    let mut reversed = base_config([2024, 2019]);
    reversed.threshold_configs = vec![ThresholdConfig::original()];
    assert!(matches!(reversed.validate(), Err(Error::InvalidConfig(_))));

    // EBBI needs B12, which the configured band list lacks
    let mut missing_band = base_config([2024, 2024]);
    missing_band.threshold_configs = vec![ThresholdConfig::ebbi()];
    assert!(matches!(
        missing_band.validate(),
        Err(Error::InvalidThresholdConfig { .. })
    ));

    let mut bad_pair = base_config([2020, 2024]);
    bad_pair.change_pairs = vec![[2019, 2023]];
    assert!(matches!(bad_pair.validate(), Err(Error::InvalidConfig(_))));

    let mut unordered_pair = base_config([2019, 2024]);
    unordered_pair.change_pairs = vec![[2023, 2023]];
    assert!(matches!(
        unordered_pair.validate(),
        Err(Error::InvalidConfig(_))
    ));

    assert!(base_config([2019, 2024]).validate().is_ok());
}
