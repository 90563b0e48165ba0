//! Typed 3D voxel grid

use crate::geometry::{Dims, Geometry};
use crate::{Error, Result};
use std::ops::{Index, IndexMut};

/// A dense 3D grid of voxels in Fortran order with attached geometry
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelGrid<T> {
    geometry: Geometry,
    data: Vec<T>,
}

/// Label atlas: small non-negative label ids, 0 is background
pub type LabelVolume = VoxelGrid<i16>;

/// Scalar intensity image (T1, T2)
pub type IntensityVolume = VoxelGrid<f32>;

/// Binary mask using the `BACKGROUND` / `FOREGROUND` sentinels
pub type BinaryMask = VoxelGrid<u8>;

/// Connected component ids; 0 is background, 1..K by descending size
pub type ComponentGrid = VoxelGrid<u32>;

/// Mask value for voxels outside the region
pub const BACKGROUND: u8 = 0;
/// Mask value for voxels inside the region
pub const FOREGROUND: u8 = 1;

impl<T: Clone> VoxelGrid<T> {
    /// Create a grid with every voxel set to `value`
    pub fn filled(geometry: Geometry, value: T) -> Self {
        Self {
            data: vec![value; geometry.dims.len()],
            geometry,
        }
    }
}

impl<T> VoxelGrid<T> {
    /// Wrap existing voxel data; `data.len()` must match the geometry
    pub fn from_vec(geometry: Geometry, data: Vec<T>) -> Result<Self> {
        if data.len() != geometry.dims.len() {
            return Err(Error::InvalidData(format!(
                "grid {} needs {} voxels, got {}",
                geometry.dims,
                geometry.dims.len(),
                data.len()
            )));
        }
        Ok(Self { geometry, data })
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn dims(&self) -> Dims {
        self.geometry.dims
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    /// Voxel at (x, y, z), or `None` outside the grid
    pub fn get(&self, x: usize, y: usize, z: usize) -> Option<&T> {
        let dims = self.dims();
        if x >= dims.nx || y >= dims.ny || z >= dims.nz {
            return None;
        }
        self.data.get(dims.index(x, y, z))
    }

    pub fn set(&mut self, x: usize, y: usize, z: usize, value: T) {
        let index = self.dims().index(x, y, z);
        self.data[index] = value;
    }

    /// Apply `f` to every voxel, keeping the geometry
    pub fn map<U, F: Fn(&T) -> U>(&self, f: F) -> VoxelGrid<U> {
        VoxelGrid {
            geometry: self.geometry,
            data: self.data.iter().map(f).collect(),
        }
    }

    /// Fail with `InvalidGeometry` unless `other` has the same dimensions
    pub fn ensure_same_dims<U>(&self, other: &VoxelGrid<U>) -> Result<()> {
        ensure_dims(self.dims(), other.dims())
    }
}

/// Fail with `InvalidGeometry` unless `found == expected`
pub fn ensure_dims(expected: Dims, found: Dims) -> Result<()> {
    if expected != found {
        return Err(Error::InvalidGeometry { expected, found });
    }
    Ok(())
}

impl<T> Index<usize> for VoxelGrid<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.data[index]
    }
}

impl<T> IndexMut<usize> for VoxelGrid<T> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.data[index]
    }
}

impl<T> Index<[usize; 3]> for VoxelGrid<T> {
    type Output = T;

    fn index(&self, [x, y, z]: [usize; 3]) -> &Self::Output {
        &self.data[self.geometry.dims.index(x, y, z)]
    }
}

impl<T> IndexMut<[usize; 3]> for VoxelGrid<T> {
    fn index_mut(&mut self, [x, y, z]: [usize; 3]) -> &mut Self::Output {
        let index = self.geometry.dims.index(x, y, z);
        &mut self.data[index]
    }
}

impl<'a, T> IntoIterator for &'a VoxelGrid<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

impl BinaryMask {
    /// Empty mask with the given geometry
    pub fn empty(geometry: Geometry) -> Self {
        Self::filled(geometry, BACKGROUND)
    }

    /// Mask whose foreground is exactly `voxels`
    pub fn from_voxels(geometry: Geometry, voxels: &[usize]) -> Self {
        let mut mask = Self::empty(geometry);
        for &v in voxels {
            mask.data[v] = FOREGROUND;
        }
        mask
    }

    pub fn is_foreground(&self, index: usize) -> bool {
        self.data[index] != BACKGROUND
    }

    pub fn count_foreground(&self) -> usize {
        self.data.iter().filter(|&&v| v != BACKGROUND).count()
    }

    /// Sorted linear indices of foreground voxels
    pub fn foreground_indices(&self) -> Vec<usize> {
        self.data
            .iter()
            .enumerate()
            .filter(|(_, &v)| v != BACKGROUND)
            .map(|(i, _)| i)
            .collect()
    }
}
