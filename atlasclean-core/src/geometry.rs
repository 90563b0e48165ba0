//! Grid dimensions and physical geometry
//!
//! Voxels are stored in Fortran order to match the NIfTI convention:
//! `index = x + y*nx + z*nx*ny`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dimensions of a 3D voxel grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dims {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
}

impl Dims {
    pub fn new(nx: usize, ny: usize, nz: usize) -> Self {
        Self { nx, ny, nz }
    }

    /// Total number of voxels
    pub fn len(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Linear index of voxel (x, y, z)
    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        x + y * self.nx + z * self.nx * self.ny
    }

    /// Voxel coordinates of a linear index
    #[inline]
    pub fn coords(&self, index: usize) -> (usize, usize, usize) {
        let slice = self.nx * self.ny;
        let z = index / slice;
        let rem = index % slice;
        (rem % self.nx, rem / self.nx, z)
    }

    /// Linear index of the voxel at `index` shifted by (dx, dy, dz),
    /// or `None` if the shifted position falls outside the grid.
    #[inline]
    pub fn offset(&self, index: usize, dx: isize, dy: isize, dz: isize) -> Option<usize> {
        let (x, y, z) = self.coords(index);
        let x = x.checked_add_signed(dx).filter(|&v| v < self.nx)?;
        let y = y.checked_add_signed(dy).filter(|&v| v < self.ny)?;
        let z = z.checked_add_signed(dz).filter(|&v| v < self.nz)?;
        Some(self.index(x, y, z))
    }
}

impl fmt::Display for Dims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.nx, self.ny, self.nz)
    }
}

/// Physical placement of a grid, carried through processing untouched
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub dims: Dims,
    /// Voxel size in mm along x, y, z
    pub spacing: [f64; 3],
    /// Voxel-to-world affine (4x4, row-major)
    pub affine: [f64; 16],
}

impl Geometry {
    /// Unit spacing and an identity affine
    pub fn new(dims: Dims) -> Self {
        Self {
            dims,
            spacing: [1.0, 1.0, 1.0],
            affine: [
                1.0, 0.0, 0.0, 0.0,
                0.0, 1.0, 0.0, 0.0,
                0.0, 0.0, 1.0, 0.0,
                0.0, 0.0, 0.0, 1.0,
            ],
        }
    }

    pub fn with_spacing(mut self, spacing: [f64; 3]) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn with_affine(mut self, affine: [f64; 16]) -> Self {
        self.affine = affine;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_coords_roundtrip() {
        let dims = Dims::new(4, 3, 2);
        assert_eq!(dims.len(), 24);
        assert_eq!(dims.index(1, 2, 1), 1 + 2 * 4 + 12);
        for i in 0..dims.len() {
            let (x, y, z) = dims.coords(i);
            assert_eq!(dims.index(x, y, z), i);
        }
    }

    #[test]
    fn test_offset_stays_inside_grid() {
        let dims = Dims::new(3, 3, 3);
        let corner = dims.index(0, 0, 0);
        assert_eq!(dims.offset(corner, -1, 0, 0), None);
        assert_eq!(dims.offset(corner, 1, 1, 1), Some(dims.index(1, 1, 1)));

        let far = dims.index(2, 2, 2);
        assert_eq!(dims.offset(far, 1, 0, 0), None);
        assert_eq!(dims.offset(far, 0, 0, 1), None);
        assert_eq!(dims.offset(far, -2, -2, -2), Some(corner));
    }
}
