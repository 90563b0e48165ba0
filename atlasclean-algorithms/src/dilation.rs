//! Binary dilation with a 3x3x3 box structuring element

use atlasclean_core::{BinaryMask, Dims, BACKGROUND, FOREGROUND};
use rayon::prelude::*;

/// Grow every foreground voxel by one voxel in all 26 directions.
///
/// The structuring element is always the full box, independent of the
/// connectivity used for component labeling. Positions outside the grid are
/// background and there is no wraparound. Output slices are computed in
/// parallel.
///
/// # Arguments
/// * `mask` - Input binary mask
///
/// # Returns
/// * `BinaryMask` - Dilated mask with the same geometry
pub fn dilate(mask: &BinaryMask) -> BinaryMask {
    let dims = mask.dims();
    let mut out = BinaryMask::empty(*mask.geometry());
    if dims.is_empty() {
        return out;
    }

    let slice_len = dims.nx * dims.ny;
    let input = mask.as_slice();

    out.as_mut_slice()
        .par_chunks_mut(slice_len)
        .enumerate()
        .for_each(|(z, slice)| {
            let z_lo = z.saturating_sub(1);
            let z_hi = (z + 1).min(dims.nz - 1);
            for y in 0..dims.ny {
                let y_lo = y.saturating_sub(1);
                let y_hi = (y + 1).min(dims.ny - 1);
                for x in 0..dims.nx {
                    let x_lo = x.saturating_sub(1);
                    let x_hi = (x + 1).min(dims.nx - 1);
                    let hit = (z_lo..=z_hi).any(|zz| {
                        (y_lo..=y_hi).any(|yy| {
                            let row = dims.index(0, yy, zz);
                            input[row + x_lo..=row + x_hi]
                                .iter()
                                .any(|&v| v != BACKGROUND)
                        })
                    });
                    if hit {
                        slice[x + y * dims.nx] = FOREGROUND;
                    }
                }
            }
        });

    out
}

/// Sparse form of [`dilate`] over a list of voxel indices.
///
/// Returns the sorted, deduplicated indices of the dilated set, including the
/// input voxels. Work is proportional to the number of input voxels.
pub fn dilate_voxels(dims: Dims, voxels: &[usize]) -> Vec<usize> {
    let mut out = Vec::with_capacity(voxels.len() * 27);
    for &v in voxels {
        for dz in -1..=1 {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    if let Some(n) = dims.offset(v, dx, dy, dz) {
                        out.push(n);
                    }
                }
            }
        }
    }
    out.sort_unstable();
    out.dedup();
    out
}

/// Voxels of the dilated set that are not in `voxels` (the one-voxel shell)
pub fn dilation_ring(dims: Dims, voxels: &[usize]) -> Vec<usize> {
    let mut own = voxels.to_vec();
    own.sort_unstable();
    dilate_voxels(dims, voxels)
        .into_iter()
        .filter(|v| own.binary_search(v).is_err())
        .collect()
}
