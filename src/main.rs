// src/main.rs
use std::fs;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use urban_change::batch::BatchDriver;
use urban_change::cli::{Cli, Commands};
use urban_change::config::RunConfig;
use urban_change::io::geotiff::SceneDirectory;
use urban_change::processing::mask::ThresholdConfig;
use urban_change::region::RegionIndex;
use urban_change::render::{ChartKind, ChartSurface, LogSurface};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let mut config = RunConfig::from_file(&cli.config)?;

    // Each subcommand fixes one sweep axis of the shared driver
    let chart: Option<(&str, ChartKind)> = match &cli.command {
        Commands::Area => {
            config.threshold_configs = vec![ThresholdConfig::original(), ThresholdConfig::ebbi()];
            config.change_pairs.clear();
            Some(("Urban area: NDBI vs EBBI", ChartKind::Line))
        }
        Commands::Change { from, to } => {
            config.threshold_configs = vec![ThresholdConfig::original()];
            if let (Some(from), Some(to)) = (from, to) {
                config.change_pairs = vec![[*from, *to]];
            }
            None
        }
        Commands::Diagnostics => {
            config.threshold_configs = ThresholdConfig::default_sweep();
            config.change_pairs.clear();
            Some(("Urban area with different thresholds", ChartKind::Line))
        }
    };

    let regions = RegionIndex::from_geojson(&cli.regions)?;
    let region = regions.lookup(&config.region)?;
    let catalog = SceneDirectory::open(&cli.scenes)?;

    let driver = BatchDriver::new(&catalog, region, &config);
    let table = driver.run()?;
    print!("{table}");

    // Rendering failures (e.g. a no-imagery year) should not discard the
    // table that was already printed
    let mut surface = LogSurface;
    if let Some(&last_year) = config.years().last() {
        if let Err(e) = driver.render_year(last_year, &mut surface) {
            tracing::warn!(year = last_year, error = %e, "year rendering skipped");
        }
    }
    for &[earlier, later] in &config.change_pairs {
        if let Err(e) = driver.render_change(earlier, later, &mut surface) {
            tracing::warn!(earlier, later, error = %e, "change rendering skipped");
        }
    }
    if let Some((title, kind)) = chart {
        let configs: Vec<String> = table.configs().iter().map(|c| c.to_string()).collect();
        let fields: Vec<&str> = configs.iter().map(String::as_str).collect();
        surface.render(title, &table, "year", &fields, kind);
    }

    if let Some(path) = &cli.json {
        fs::write(path, serde_json::to_string_pretty(&table)?)?;
        println!("Result table written to {}", path.display());
    }

    Ok(())
}
