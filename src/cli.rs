// src/cli.rs
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "urban-change")]
#[command(about = "Built-up land-cover change analysis from satellite composites")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Run configuration (JSON)
    #[arg(short, long, default_value = "run.json", global = true)]
    pub config: PathBuf,

    /// Scene directory containing manifest.json and band GeoTIFFs
    #[arg(short, long, default_value = "scenes", global = true)]
    pub scenes: PathBuf,

    /// Region boundaries (GeoJSON FeatureCollection with named features)
    #[arg(short, long, default_value = "regions.geojson", global = true)]
    pub regions: PathBuf,

    /// Also write the result table as JSON
    #[arg(long, global = true)]
    pub json: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Yearly built-up area sweep, primary and EBBI methods side by side
    Area,

    /// Gain/loss/stable classification for the configured year pairs
    Change {
        /// Override the earlier year
        #[arg(long, requires = "to")]
        from: Option<i32>,

        /// Override the later year
        #[arg(long, requires = "from")]
        to: Option<i32>,
    },

    /// Threshold sensitivity sweep with per-year image counts
    Diagnostics,
}
