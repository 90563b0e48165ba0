//! Voxel neighbour topology

use serde::{Deserialize, Serialize};

/// Voxel connectivity for connected component labeling.
///
/// Determines which voxels are considered neighbours when grouping
/// voxels of one label into islands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    /// 6-connectivity: voxels sharing a face.
    #[default]
    Face,
    /// 26-connectivity: voxels sharing a face, an edge or a corner.
    Full,
}

impl Connectivity {
    /// `Full` when `fully_connected` is set, `Face` otherwise
    pub fn from_fully_connected(fully_connected: bool) -> Self {
        if fully_connected {
            Connectivity::Full
        } else {
            Connectivity::Face
        }
    }
}
