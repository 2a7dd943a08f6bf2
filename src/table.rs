// src/table.rs
use std::fmt;

use serde::Serialize;

/// Outcome of one (year, configuration) cell of the batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Complete,
    NoImagery,
    ResourceExceeded,
}

impl RecordStatus {
    fn marker(&self) -> &'static str {
        match self {
            RecordStatus::Complete => "",
            RecordStatus::NoImagery => "n/a (no imagery)",
            RecordStatus::ResourceExceeded => "n/a (pixel budget exceeded)",
        }
    }
}

/// Built-up area for one year under one threshold configuration
#[derive(Debug, Clone, Serialize)]
pub struct AreaRecord {
    pub year: i32,
    pub config: String,
    pub image_count: usize,
    pub area_km2: Option<f64>,
    pub status: RecordStatus,
}

/// Change classification areas for one year pair
#[derive(Debug, Clone, Serialize)]
pub struct ChangeRecord {
    pub from_year: i32,
    pub to_year: i32,
    pub loss_km2: Option<f64>,
    pub gain_km2: Option<f64>,
    pub stable_km2: Option<f64>,
    pub status: RecordStatus,
}

/// The assembled results of one batch run: the sole externally consumed
/// artifact, immutable after assembly. Records are ordered year-ascending
/// (configuration order preserved within a year) and change records by
/// year pair.
#[derive(Debug, Clone, Serialize, Default)]
pub struct ResultTable {
    pub region: String,
    pub areas: Vec<AreaRecord>,
    pub changes: Vec<ChangeRecord>,
}

impl ResultTable {
    pub(crate) fn assemble(
        region: String,
        mut areas: Vec<AreaRecord>,
        mut changes: Vec<ChangeRecord>,
    ) -> Self {
        // Stable sort keeps configuration order within a year
        areas.sort_by_key(|r| r.year);
        changes.sort_by_key(|r| (r.from_year, r.to_year));
        Self {
            region,
            areas,
            changes,
        }
    }

    pub fn area(&self, year: i32, config: &str) -> Option<&AreaRecord> {
        self.areas
            .iter()
            .find(|r| r.year == year && r.config == config)
    }

    /// Distinct years in ascending order.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.areas.iter().map(|r| r.year).collect();
        years.dedup();
        years
    }

    /// Distinct configuration names in first-occurrence order.
    pub fn configs(&self) -> Vec<&str> {
        let mut configs: Vec<&str> = Vec::new();
        for record in &self.areas {
            if !configs.contains(&record.config.as_str()) {
                configs.push(&record.config);
            }
        }
        configs
    }

    /// One (year, area) chart series for a configuration; `None` marks
    /// no-data cells.
    pub fn series(&self, config: &str) -> Vec<(i32, Option<f64>)> {
        self.areas
            .iter()
            .filter(|r| r.config == config)
            .map(|r| (r.year, r.area_km2))
            .collect()
    }
}

impl fmt::Display for ResultTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Urban area by year, region {}", self.region)?;
        writeln!(f, "{:>6}  {:<10} {:>7}  area_km2", "year", "config", "images")?;
        for r in &self.areas {
            match r.area_km2 {
                Some(area) => writeln!(
                    f,
                    "{:>6}  {:<10} {:>7}  {:.3}",
                    r.year, r.config, r.image_count, area
                )?,
                None => writeln!(
                    f,
                    "{:>6}  {:<10} {:>7}  {}",
                    r.year,
                    r.config,
                    r.image_count,
                    r.status.marker()
                )?,
            }
        }

        if !self.changes.is_empty() {
            writeln!(f)?;
            writeln!(f, "Change classification (km2)")?;
            for c in &self.changes {
                match (c.loss_km2, c.gain_km2, c.stable_km2) {
                    (Some(loss), Some(gain), Some(stable)) => writeln!(
                        f,
                        "{} -> {}  loss {:.3}  gain {:.3}  stable {:.3}",
                        c.from_year, c.to_year, loss, gain, stable
                    )?,
                    _ => writeln!(
                        f,
                        "{} -> {}  {}",
                        c.from_year,
                        c.to_year,
                        c.status.marker()
                    )?,
                }
            }
        }
        Ok(())
    }
}
