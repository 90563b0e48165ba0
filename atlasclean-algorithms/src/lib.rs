//! # atlasclean Algorithms
//!
//! Algorithms for cleaning small islands out of 3D label atlases.
//!
//! This crate provides connected-component labeling, per-region intensity
//! statistics, binary dilation, intensity-profile distance, and the island
//! cleaner that combines them, together with its configuration and reports.

pub mod cleanup;
pub mod components;
pub mod config;
pub mod dilation;
pub mod distance;
pub mod report;
pub mod statistics;

// Re-export commonly used items
pub use cleanup::*;
pub use components::*;
pub use config::*;
pub use dilation::*;
pub use distance::*;
pub use report::*;
pub use statistics::*;
