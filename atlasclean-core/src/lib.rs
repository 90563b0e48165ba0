//! Core data structures for atlasclean
//!
//! This crate provides the voxel grid types shared by the atlas cleanup
//! algorithms and volume I/O: dimensions and geometry, typed 3D grids,
//! binary masks, label atlases, connectivity, and the common error type.

pub mod connectivity;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod label;

pub use connectivity::*;
pub use error::*;
pub use geometry::*;
pub use grid::*;
