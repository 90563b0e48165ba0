//! NIfTI-1 reading and writing
//!
//! Reading goes through the `nifti` crate and accepts any datatype it
//! understands, gzip-compressed or not. Writing produces a single-file
//! NIfTI-1 image (`n+1`) with the sform set from the grid geometry.

use crate::error::{IoError, IoResult};
use atlasclean_core::{Dims, Geometry, IntensityVolume, LabelVolume, VoxelGrid};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use nifti::volume::ndarray::IntoNdArray;
use nifti::{InMemNiftiObject, NiftiHeader, NiftiObject};
use std::io::{Cursor, Write};
use std::path::Path;

const HEADER_SIZE: usize = 348;
const VOX_OFFSET: usize = 352;

/// Voxel types that can be stored in a NIfTI file
pub trait NiftiVoxel: Copy {
    /// NIfTI datatype code
    const DATATYPE: i16;
    /// Bits per voxel
    const BITPIX: i16;

    fn write_le(self, out: &mut Vec<u8>);
}

impl NiftiVoxel for i16 {
    const DATATYPE: i16 = 4;
    const BITPIX: i16 = 16;

    fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

impl NiftiVoxel for f32 {
    const DATATYPE: i16 = 16;
    const BITPIX: i16 = 32;

    fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

/// Check if bytes are gzip compressed
fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == 0x1f && bytes[1] == 0x8b
}

fn read_bytes(path: &Path) -> IoResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => IoError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => IoError::Io(e),
    })
}

/// Voxel-to-world affine, preferring the sform
fn get_affine(header: &NiftiHeader) -> [f64; 16] {
    if header.sform_code > 0 {
        let s = &header.srow_x;
        let t = &header.srow_y;
        let u = &header.srow_z;
        [
            s[0] as f64, s[1] as f64, s[2] as f64, s[3] as f64,
            t[0] as f64, t[1] as f64, t[2] as f64, t[3] as f64,
            u[0] as f64, u[1] as f64, u[2] as f64, u[3] as f64,
            0.0, 0.0, 0.0, 1.0,
        ]
    } else {
        let vsx = header.pixdim[1] as f64;
        let vsy = header.pixdim[2] as f64;
        let vsz = header.pixdim[3] as f64;
        [
            vsx, 0.0, 0.0, 0.0,
            0.0, vsy, 0.0, 0.0,
            0.0, 0.0, vsz, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ]
    }
}

/// Decode a NIfTI image into its geometry and voxel values in Fortran order.
///
/// Only the first volume of a 4D image is kept.
pub fn decode(bytes: &[u8]) -> IoResult<(Geometry, Vec<f64>)> {
    let obj = if is_gzip(bytes) {
        InMemNiftiObject::from_reader(GzDecoder::new(Cursor::new(bytes)))?
    } else {
        InMemNiftiObject::from_reader(Cursor::new(bytes))?
    };

    let header = obj.header();
    let ndim = header.dim[0] as usize;
    if ndim < 3 {
        return Err(IoError::InvalidFormat {
            format: format!("expected a 3D volume, got {}D", ndim),
        });
    }
    let spacing = [
        header.pixdim[1].abs() as f64,
        header.pixdim[2].abs() as f64,
        header.pixdim[3].abs() as f64,
    ];
    let affine = get_affine(header);

    let array = obj.into_volume().into_ndarray::<f64>()?;
    let shape = array.shape().to_vec();
    if shape.len() < 3 {
        return Err(IoError::ParseError {
            message: format!("expected at least 3D array, got {}D", shape.len()),
        });
    }

    let (nx, ny, nz) = (shape[0], shape[1], shape[2]);
    let mut data = Vec::with_capacity(nx * ny * nz);
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                let value = if shape.len() == 3 {
                    array[[i, j, k]]
                } else {
                    array[[i, j, k, 0]]
                };
                data.push(value);
            }
        }
    }

    let geometry = Geometry::new(Dims::new(nx, ny, nz))
        .with_spacing(spacing)
        .with_affine(affine);
    Ok((geometry, data))
}

/// Encode a grid as an uncompressed NIfTI-1 image
pub fn encode<T: NiftiVoxel>(grid: &VoxelGrid<T>) -> IoResult<Vec<u8>> {
    let geometry = grid.geometry();
    let dims = geometry.dims;
    let dim_field = |n: usize| {
        i16::try_from(n).map_err(|_| IoError::WriteError {
            message: format!("dimension {} does not fit a NIfTI-1 header", n),
        })
    };

    let mut header = [0u8; HEADER_SIZE];
    header[0..4].copy_from_slice(&(HEADER_SIZE as i32).to_le_bytes());

    let dim: [i16; 8] = [
        3,
        dim_field(dims.nx)?,
        dim_field(dims.ny)?,
        dim_field(dims.nz)?,
        1,
        1,
        1,
        1,
    ];
    for (i, &d) in dim.iter().enumerate() {
        let offset = 40 + i * 2;
        header[offset..offset + 2].copy_from_slice(&d.to_le_bytes());
    }

    header[70..72].copy_from_slice(&T::DATATYPE.to_le_bytes());
    header[72..74].copy_from_slice(&T::BITPIX.to_le_bytes());

    let [sx, sy, sz] = geometry.spacing;
    let pixdim: [f32; 8] = [1.0, sx as f32, sy as f32, sz as f32, 1.0, 1.0, 1.0, 1.0];
    for (i, &p) in pixdim.iter().enumerate() {
        let offset = 76 + i * 4;
        header[offset..offset + 4].copy_from_slice(&p.to_le_bytes());
    }

    header[108..112].copy_from_slice(&(VOX_OFFSET as f32).to_le_bytes());
    header[112..116].copy_from_slice(&1.0f32.to_le_bytes());
    // Spatial units: millimetres
    header[123] = 2;
    // sform_code = 1 (scanner anat)
    header[254..256].copy_from_slice(&1i16.to_le_bytes());

    for (row, base) in [280usize, 296, 312].into_iter().enumerate() {
        for col in 0..4 {
            let offset = base + col * 4;
            let value = geometry.affine[row * 4 + col] as f32;
            header[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        }
    }
    header[344..348].copy_from_slice(b"n+1\0");

    let mut buffer = Vec::with_capacity(VOX_OFFSET + grid.len() * (T::BITPIX as usize / 8));
    buffer.extend_from_slice(&header);
    buffer.extend_from_slice(&[0u8; VOX_OFFSET - HEADER_SIZE]);
    for &value in grid.iter() {
        value.write_le(&mut buffer);
    }
    Ok(buffer)
}

/// Encode a grid as a gzip-compressed NIfTI-1 image
pub fn encode_gz<T: NiftiVoxel>(grid: &VoxelGrid<T>) -> IoResult<Vec<u8>> {
    let uncompressed = encode(grid)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&uncompressed)?;
    Ok(encoder.finish()?)
}

/// Read any NIfTI image as a label atlas.
///
/// Fractional values are truncated toward zero, like an integer cast, and
/// must fit in i16.
pub fn read_labels(path: &Path) -> IoResult<LabelVolume> {
    let (geometry, values) = decode(&read_bytes(path)?)?;
    let labels = values
        .into_iter()
        .map(|v| {
            let truncated = v.trunc();
            if v.is_finite() && truncated >= i16::MIN as f64 && truncated <= i16::MAX as f64 {
                Ok(truncated as i16)
            } else {
                Err(IoError::ParseError {
                    message: format!("label value {} does not fit in 16 bits", v),
                })
            }
        })
        .collect::<IoResult<Vec<i16>>>()?;

    tracing::debug!(
        "Read label atlas {}: {}",
        path.display(),
        geometry.dims
    );
    VoxelGrid::from_vec(geometry, labels).map_err(|e| IoError::ParseError {
        message: e.to_string(),
    })
}

/// Read any NIfTI image as single-precision intensities
pub fn read_intensity(path: &Path) -> IoResult<IntensityVolume> {
    let (geometry, values) = decode(&read_bytes(path)?)?;
    tracing::debug!(
        "Read intensity volume {}: {}",
        path.display(),
        geometry.dims
    );
    VoxelGrid::from_vec(geometry, values.into_iter().map(|v| v as f32).collect()).map_err(|e| {
        IoError::ParseError {
            message: e.to_string(),
        }
    })
}

/// Write a grid, gzip-compressed when `compress` is set
pub fn write<T: NiftiVoxel>(grid: &VoxelGrid<T>, path: &Path, compress: bool) -> IoResult<()> {
    let bytes = if compress { encode_gz(grid)? } else { encode(grid)? };
    std::fs::write(path, bytes)?;
    tracing::debug!("Wrote {} ({})", path.display(), grid.dims());
    Ok(())
}
