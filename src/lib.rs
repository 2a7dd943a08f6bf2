// src/lib.rs
pub mod batch;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod io;
pub mod processing;
pub mod raster;
pub mod region;
pub mod render;
pub mod table;

pub use error::{Error, Result};

// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
