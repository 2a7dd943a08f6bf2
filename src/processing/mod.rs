// src/processing/mod.rs
pub mod change;
pub mod composite;
pub mod indices;
pub mod mask;
pub mod pipeline;
pub mod zonal;

// Re-export main components
pub use change::{detect_change, ChangeMasks};
pub use composite::{median_composite, select_scenes, DateWindow};
pub use mask::{Comparator, IndexKind, ThresholdConfig, ThresholdRule};
pub use pipeline::{classify_composite, Classification};
pub use zonal::ZonalAggregator;
