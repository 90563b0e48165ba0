//! Volume I/O for label atlases and intensity images
//!
//! This crate reads and writes NIfTI-1 volumes (`.nii` and `.nii.gz`) as
//! atlasclean voxel grids. The file format is chosen from the path's
//! extension; gzip compression is also detected from the file contents when
//! reading.

pub mod error;
pub mod nifti_io;

pub use error::*;
pub use nifti_io::NiftiVoxel;

use atlasclean_core::{IntensityVolume, LabelVolume, Result, VoxelGrid};
use std::path::Path;

/// Supported volume file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeFormat {
    /// Uncompressed single-file NIfTI-1
    Nifti,
    /// Gzip-compressed single-file NIfTI-1
    NiftiGz,
}

impl VolumeFormat {
    /// Detect the format from a file name
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        if name.ends_with(".nii.gz") {
            Ok(VolumeFormat::NiftiGz)
        } else if name.ends_with(".nii") {
            Ok(VolumeFormat::Nifti)
        } else {
            Err(atlasclean_core::Error::UnsupportedFormat(format!(
                "Unsupported volume format: {}",
                path.display()
            )))
        }
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self, VolumeFormat::NiftiGz)
    }
}

/// Trait for reading volumes from files
pub trait VolumeReader {
    fn read_labels<P: AsRef<Path>>(path: P) -> Result<LabelVolume>;
    fn read_intensity<P: AsRef<Path>>(path: P) -> Result<IntensityVolume>;
}

/// Trait for writing volumes to files
pub trait VolumeWriter {
    fn write_volume<T: NiftiVoxel, P: AsRef<Path>>(volume: &VoxelGrid<T>, path: P) -> Result<()>;
}

/// NIfTI-1 reader and writer
pub struct NiftiFormat;

impl VolumeReader for NiftiFormat {
    fn read_labels<P: AsRef<Path>>(path: P) -> Result<LabelVolume> {
        Ok(nifti_io::read_labels(path.as_ref())?)
    }

    fn read_intensity<P: AsRef<Path>>(path: P) -> Result<IntensityVolume> {
        Ok(nifti_io::read_intensity(path.as_ref())?)
    }
}

impl VolumeWriter for NiftiFormat {
    fn write_volume<T: NiftiVoxel, P: AsRef<Path>>(volume: &VoxelGrid<T>, path: P) -> Result<()> {
        let path = path.as_ref();
        let format = VolumeFormat::from_path(path)?;
        Ok(nifti_io::write(volume, path, format.is_compressed())?)
    }
}

/// Auto-detect format and read a label atlas
pub fn read_label_volume<P: AsRef<Path>>(path: P) -> Result<LabelVolume> {
    let path = path.as_ref();
    match VolumeFormat::from_path(path)? {
        VolumeFormat::Nifti | VolumeFormat::NiftiGz => NiftiFormat::read_labels(path),
    }
}

/// Auto-detect format and read an intensity image
pub fn read_intensity_volume<P: AsRef<Path>>(path: P) -> Result<IntensityVolume> {
    let path = path.as_ref();
    match VolumeFormat::from_path(path)? {
        VolumeFormat::Nifti | VolumeFormat::NiftiGz => NiftiFormat::read_intensity(path),
    }
}

/// Auto-detect format and write a label atlas
pub fn write_label_volume<P: AsRef<Path>>(volume: &LabelVolume, path: P) -> Result<()> {
    NiftiFormat::write_volume(volume, path)
}

/// Auto-detect format and write an intensity image
pub fn write_intensity_volume<P: AsRef<Path>>(volume: &IntensityVolume, path: P) -> Result<()> {
    NiftiFormat::write_volume(volume, path)
}
