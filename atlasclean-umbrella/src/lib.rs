//! # atlasclean
//!
//! Small-island ("dust") cleanup for 3D segmentation label atlases.
//!
//! This is the umbrella crate that provides convenient access to all atlasclean
//! functionality. You can use this crate to get everything in one place, or use
//! individual crates for more granular control over dependencies.
//!
//! ## Features
//!
//! - **Core**: Voxel grids, geometry, connectivity and the common error type
//! - **Algorithms**: Connected components, region statistics, dilation and the island cleaner
//! - **I/O**: NIfTI-1 reading and writing (`.nii`, `.nii.gz`)
//!
//! ## Quick Start
//!
//! ```rust
//! use atlasclean::prelude::*;
//!
//! let geometry = Geometry::new(Dims::new(10, 10, 10));
//! let mut atlas = LabelVolume::filled(geometry, 1);
//! let mut t1 = IntensityVolume::filled(geometry, 52.0);
//! for position in [[4, 4, 4], [5, 4, 4]] {
//!     atlas[position] = 99;
//!     t1[position] = 50.0;
//! }
//!
//! let cleaner = IslandCleaner::new(CleanupConfig::new(5));
//! let stats = cleaner.run(&mut atlas, &[&t1]).unwrap();
//!
//! assert_eq!(atlas.count_label(99), 0);
//! assert_eq!(stats.islands_cleaned(99), 1);
//! ```
//!
//! ## Feature Flags
//!
//! - `default`: Enables core, algorithms and io
//! - `algorithms`: Island cleanup algorithms
//! - `io`: Volume file support
//! - `all`: Enables all features

// Re-export core functionality
pub use atlasclean_core::*;

// Re-export sub-crates
#[cfg(feature = "algorithms")]
pub use atlasclean_algorithms as algorithms;

#[cfg(feature = "io")]
pub use atlasclean_io as io;

/// Convenient imports for common use cases
pub mod prelude {
    pub use atlasclean_core::*;

    #[cfg(feature = "algorithms")]
    pub use atlasclean_algorithms::*;

    #[cfg(feature = "io")]
    pub use atlasclean_io::{
        read_intensity_volume, read_label_volume, write_intensity_volume, write_label_volume,
        VolumeFormat,
    };
}
