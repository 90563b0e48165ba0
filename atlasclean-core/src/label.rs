//! Label atlas helpers

use crate::grid::{BinaryMask, LabelVolume, BACKGROUND, FOREGROUND};
use std::collections::BTreeSet;

impl LabelVolume {
    /// Label values present in the atlas, ascending
    pub fn present_labels(&self) -> BTreeSet<i16> {
        self.iter().copied().collect()
    }

    pub fn count_label(&self, label: i16) -> usize {
        self.iter().filter(|&&v| v == label).count()
    }

    /// Binary mask of the voxels currently equal to `label`
    pub fn threshold(&self, label: i16) -> BinaryMask {
        self.map(|&v| if v == label { FOREGROUND } else { BACKGROUND })
    }

    /// Set every voxel in `voxels` to `label`
    pub fn relabel_voxels(&mut self, voxels: &[usize], label: i16) {
        let data = self.as_mut_slice();
        for &v in voxels {
            data[v] = label;
        }
    }
}
