// src/batch.rs
use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use itertools::Itertools;
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::catalog::ImageryCatalog;
use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::processing::change::{detect_change, ChangeMasks};
use crate::processing::composite::{median_composite, select_scenes, DateWindow};
use crate::processing::mask::ThresholdConfig;
use crate::processing::pipeline::classify_composite;
use crate::processing::zonal::ZonalAggregator;
use crate::raster::{GridRef, Mask, Raster};
use crate::region::Region;
use crate::render::{MapSurface, MaskStyle, RasterStyle};
use crate::table::{AreaRecord, ChangeRecord, RecordStatus, ResultTable};

type RegionCellCache = Mutex<Vec<(GridRef, Arc<Vec<bool>>)>>;

/// Runs the composite -> index -> mask -> zonal pipeline across the
/// configured sweep of years and threshold configurations, plus change
/// classification for the configured year pairs, and assembles one
/// ordered result table.
///
/// Years are independent: each task reads only the shared scene subset
/// and region, so they fan out to worker threads over channels and the
/// results are merged by year afterwards. A year with no qualifying
/// imagery yields explicit no-data records instead of aborting the batch;
/// configuration and region errors abort before any raster work.
pub struct BatchDriver<'a> {
    catalog: &'a dyn ImageryCatalog,
    region: &'a Region,
    config: &'a RunConfig,
}

struct YearOutcome {
    year: i32,
    records: Vec<AreaRecord>,
    /// Mask of the primary (first) configuration plus the region cells on
    /// its grid, kept for change detection
    primary: Option<(Mask, Arc<Vec<bool>>)>,
}

impl YearOutcome {
    fn primary_status(&self) -> RecordStatus {
        self.records
            .first()
            .map(|r| r.status)
            .unwrap_or(RecordStatus::NoImagery)
    }
}

impl<'a> BatchDriver<'a> {
    pub fn new(catalog: &'a dyn ImageryCatalog, region: &'a Region, config: &'a RunConfig) -> Self {
        Self {
            catalog,
            region,
            config,
        }
    }

    pub fn run(&self) -> Result<ResultTable> {
        self.config.validate()?;

        let bands: Vec<&str> = self.config.bands.iter().map(String::as_str).collect();
        let window = self.config.run_window()?;
        let scenes =
            self.catalog
                .query(self.region, window, self.config.cloud_ceiling, &bands)?;
        info!(
            region = self.region.name(),
            scenes = scenes.len(),
            bands = %bands.iter().join(","),
            "catalog query complete"
        );

        let years = self.config.years();
        let aggregator = ZonalAggregator::new(self.config.max_pixels, self.config.tile_rows);
        let cell_cache: RegionCellCache = Mutex::new(Vec::new());

        let workers = num_cpus::get().min(years.len()).max(1);
        let (task_tx, task_rx) = flume::unbounded::<i32>();
        let (result_tx, result_rx) = flume::unbounded::<Result<YearOutcome>>();

        for &year in &years {
            let _ = task_tx.send(year);
        }
        drop(task_tx);

        let scenes = &scenes;
        let bands = &bands;
        let aggregator = &aggregator;
        let cell_cache = &cell_cache;
        thread::scope(|scope| {
            for _ in 0..workers {
                let task_rx = task_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    for year in task_rx {
                        let outcome =
                            self.process_year(year, scenes, bands, aggregator, cell_cache);
                        if result_tx.send(outcome).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(result_tx);

        let mut outcomes: BTreeMap<i32, YearOutcome> = BTreeMap::new();
        for outcome in result_rx {
            let outcome = outcome?;
            outcomes.insert(outcome.year, outcome);
        }

        let changes = self.classify_pairs(&outcomes, aggregator)?;
        let areas = outcomes
            .into_values()
            .flat_map(|outcome| outcome.records)
            .collect();
        Ok(ResultTable::assemble(
            self.region.name().to_string(),
            areas,
            changes,
        ))
    }

    fn process_year(
        &self,
        year: i32,
        scenes: &[Raster],
        bands: &[&str],
        aggregator: &ZonalAggregator,
        cell_cache: &RegionCellCache,
    ) -> Result<YearOutcome> {
        let window = DateWindow::for_year(year, self.config.months())?;
        let selected = select_scenes(scenes, window, self.config.cloud_ceiling);
        let image_count = selected.len();

        let Some(composite) = median_composite(&selected, bands)? else {
            warn!(year, "no qualifying imagery, emitting no-data records");
            let records = self
                .config
                .threshold_configs
                .iter()
                .map(|tc| AreaRecord {
                    year,
                    config: tc.name.clone(),
                    image_count,
                    area_km2: None,
                    status: RecordStatus::NoImagery,
                })
                .collect();
            return Ok(YearOutcome {
                year,
                records,
                primary: None,
            });
        };

        // Budget check precedes region rasterization, which is itself a
        // full O(pixels) pass over the grid
        if let Err(Error::ResourceExceeded { pixels, max_pixels }) =
            aggregator.check_budget(composite.grid())
        {
            warn!(year, pixels, max_pixels, "pixel budget exceeded, year skipped");
            let records = self
                .config
                .threshold_configs
                .iter()
                .map(|tc| AreaRecord {
                    year,
                    config: tc.name.clone(),
                    image_count,
                    area_km2: None,
                    status: RecordStatus::ResourceExceeded,
                })
                .collect();
            return Ok(YearOutcome {
                year,
                records,
                primary: None,
            });
        }

        let cells = self.region_cells(composite.grid(), cell_cache);
        let mut records = Vec::with_capacity(self.config.threshold_configs.len());
        let mut primary = None;
        for (i, tc) in self.config.threshold_configs.iter().enumerate() {
            match classify_composite(&composite, tc, &cells, aggregator) {
                Ok(classification) => {
                    if i == 0 {
                        primary = Some((classification.mask, Arc::clone(&cells)));
                    }
                    records.push(AreaRecord {
                        year,
                        config: tc.name.clone(),
                        image_count,
                        area_km2: Some(classification.area_km2),
                        status: RecordStatus::Complete,
                    });
                }
                Err(Error::ResourceExceeded { pixels, max_pixels }) => {
                    warn!(
                        year,
                        config = %tc.name,
                        pixels,
                        max_pixels,
                        "pixel budget exceeded, record skipped"
                    );
                    records.push(AreaRecord {
                        year,
                        config: tc.name.clone(),
                        image_count,
                        area_km2: None,
                        status: RecordStatus::ResourceExceeded,
                    });
                }
                Err(e) => return Err(e),
            }
        }

        info!(year, image_count, "year pipeline complete");
        Ok(YearOutcome {
            year,
            records,
            primary,
        })
    }

    fn classify_pairs(
        &self,
        outcomes: &BTreeMap<i32, YearOutcome>,
        aggregator: &ZonalAggregator,
    ) -> Result<Vec<ChangeRecord>> {
        let mut changes = Vec::with_capacity(self.config.change_pairs.len());
        for &[earlier, later] in &self.config.change_pairs {
            let (Some(a), Some(b)) = (outcomes.get(&earlier), outcomes.get(&later)) else {
                continue;
            };
            let record = match (&a.primary, &b.primary) {
                (Some((mask_a, cells)), Some((mask_b, _))) => {
                    let change = detect_change(mask_a, mask_b)?;
                    match self.change_areas(&change, cells, aggregator) {
                        Ok((loss, gain, stable)) => ChangeRecord {
                            from_year: earlier,
                            to_year: later,
                            loss_km2: Some(loss),
                            gain_km2: Some(gain),
                            stable_km2: Some(stable),
                            status: RecordStatus::Complete,
                        },
                        Err(Error::ResourceExceeded { pixels, max_pixels }) => {
                            warn!(
                                earlier,
                                later, pixels, max_pixels, "pixel budget exceeded for change pair"
                            );
                            self.no_data_change(earlier, later, RecordStatus::ResourceExceeded)
                        }
                        Err(e) => return Err(e),
                    }
                }
                _ => {
                    let status = if a.primary_status() == RecordStatus::NoImagery
                        || b.primary_status() == RecordStatus::NoImagery
                    {
                        RecordStatus::NoImagery
                    } else {
                        RecordStatus::ResourceExceeded
                    };
                    self.no_data_change(earlier, later, status)
                }
            };
            changes.push(record);
        }
        Ok(changes)
    }

    fn change_areas(
        &self,
        change: &ChangeMasks,
        cells: &[bool],
        aggregator: &ZonalAggregator,
    ) -> Result<(f64, f64, f64)> {
        Ok((
            aggregator.area_km2(&change.loss, cells)?,
            aggregator.area_km2(&change.gain, cells)?,
            aggregator.area_km2(&change.stable, cells)?,
        ))
    }

    fn no_data_change(&self, from_year: i32, to_year: i32, status: RecordStatus) -> ChangeRecord {
        ChangeRecord {
            from_year,
            to_year,
            loss_km2: None,
            gain_km2: None,
            stable_km2: None,
            status,
        }
    }

    fn region_cells(&self, grid: &GridRef, cell_cache: &RegionCellCache) -> Arc<Vec<bool>> {
        let mut cache = cell_cache.lock();
        if let Some((_, cells)) = cache.iter().find(|(cached, _)| cached == grid) {
            return Arc::clone(cells);
        }
        let cells = Arc::new(self.region.rasterize(grid));
        cache.push((*grid, Arc::clone(&cells)));
        cells
    }

    /// Render one year's true-color composite plus the urban mask of each
    /// threshold configuration as map layers.
    pub fn render_year(&self, year: i32, surface: &mut dyn MapSurface) -> Result<()> {
        self.config.validate()?;
        let composite = self.composite_for(year)?;
        let aggregator = ZonalAggregator::new(self.config.max_pixels, self.config.tile_rows);
        aggregator.check_budget(composite.grid())?;
        surface.add_raster_layer(
            &format!("{year} true color"),
            &composite,
            &RasterStyle::true_color(),
        );

        let cells = self.region.rasterize(composite.grid());
        let colors = ["red", "blue", "green"];
        for (tc, color) in self
            .config
            .threshold_configs
            .iter()
            .zip(colors.iter().cycle())
        {
            let classification = classify_composite(&composite, tc, &cells, &aggregator)?;
            surface.add_mask_layer(
                &format!("{year} urban ({})", tc.name),
                &classification.mask,
                &MaskStyle::new(*color),
            );
        }
        Ok(())
    }

    /// Render the gain/loss/stable classification of a year pair under
    /// the primary configuration.
    pub fn render_change(
        &self,
        earlier: i32,
        later: i32,
        surface: &mut dyn MapSurface,
    ) -> Result<()> {
        self.config.validate()?;
        let mask_earlier = self.primary_mask_for(earlier)?;
        let mask_later = self.primary_mask_for(later)?;
        let change = detect_change(&mask_earlier, &mask_later)?;

        surface.add_mask_layer(
            &format!("stable {earlier}-{later}"),
            &change.stable,
            &MaskStyle::new("gray"),
        );
        surface.add_mask_layer(
            &format!("loss {earlier}-{later}"),
            &change.loss,
            &MaskStyle::new("red"),
        );
        surface.add_mask_layer(
            &format!("gain {earlier}-{later}"),
            &change.gain,
            &MaskStyle::new("green"),
        );
        Ok(())
    }

    fn composite_for(&self, year: i32) -> Result<Raster> {
        let bands: Vec<&str> = self.config.bands.iter().map(String::as_str).collect();
        let window = DateWindow::for_year(year, self.config.months())?;
        let scenes =
            self.catalog
                .query(self.region, window, self.config.cloud_ceiling, &bands)?;
        let selected = select_scenes(&scenes, window, self.config.cloud_ceiling);
        median_composite(&selected, &bands)?.ok_or(Error::NoImagery { year })
    }

    fn primary_mask_for(&self, year: i32) -> Result<Mask> {
        let primary = self
            .config
            .threshold_configs
            .first()
            .ok_or_else(|| Error::InvalidConfig("no threshold configurations".to_string()))?;
        self.mask_for(year, primary)
    }

    fn mask_for(&self, year: i32, config: &ThresholdConfig) -> Result<Mask> {
        let composite = self.composite_for(year)?;
        let aggregator = ZonalAggregator::new(self.config.max_pixels, self.config.tile_rows);
        aggregator.check_budget(composite.grid())?;
        let cells = self.region.rasterize(composite.grid());
        Ok(classify_composite(&composite, config, &cells, &aggregator)?.mask)
    }
}
