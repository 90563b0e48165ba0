//! Per-region intensity statistics

use crate::report::LabelStatisticsTable;
use atlasclean_core::{IntensityVolume, LabelVolume, Result, VoxelGrid};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Intensity statistics of one region
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionStats {
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
    /// Sample standard deviation (N - 1); 0 for single-voxel regions
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

/// Welford accumulator
#[derive(Debug, Clone, Copy)]
struct Accumulator {
    count: usize,
    sum: f64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    #[inline]
    fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    fn finish(&self) -> RegionStats {
        let variance = if self.count > 1 {
            self.m2 / (self.count - 1) as f64
        } else {
            0.0
        };
        RegionStats {
            count: self.count,
            sum: self.sum,
            mean: self.mean,
            std_dev: variance.max(0.0).sqrt(),
            min: self.min,
            max: self.max,
        }
    }
}

/// Compute intensity statistics for every region key present in `regions`.
///
/// Single pass over the grids. Every key with at least one voxel appears in
/// the result, including background (0); callers looking at islands skip it.
///
/// # Arguments
/// * `intensity` - Intensity image
/// * `regions` - Region key per voxel (component ids or label values)
///
/// # Returns
/// * `Result<BTreeMap<K, RegionStats>>` - Statistics ordered by key, or
///   `InvalidGeometry` if the grids differ in size
pub fn region_statistics<K>(
    intensity: &IntensityVolume,
    regions: &VoxelGrid<K>,
) -> Result<BTreeMap<K, RegionStats>>
where
    K: Copy + Ord,
{
    regions.ensure_same_dims(intensity)?;

    let mut accumulators: BTreeMap<K, Accumulator> = BTreeMap::new();
    let mut last: Option<(K, Accumulator)> = None;

    // Neighbouring voxels usually share a key; keep the current accumulator
    // out of the map until the key changes.
    for (&key, &value) in regions.iter().zip(intensity.iter()) {
        match last.as_mut() {
            Some((k, acc)) if *k == key => acc.push(value as f64),
            _ => {
                if let Some((k, acc)) = last.take() {
                    accumulators.insert(k, acc);
                }
                let mut acc = accumulators.remove(&key).unwrap_or_else(Accumulator::new);
                acc.push(value as f64);
                last = Some((key, acc));
            }
        }
    }
    if let Some((k, acc)) = last {
        accumulators.insert(k, acc);
    }

    Ok(accumulators.into_iter().map(|(k, acc)| (k, acc.finish())).collect())
}

/// Region statistics for several intensity channels, one map per channel.
///
/// Channels are independent and computed in parallel.
pub fn region_statistics_multi<K>(
    channels: &[&IntensityVolume],
    regions: &VoxelGrid<K>,
) -> Result<Vec<BTreeMap<K, RegionStats>>>
where
    K: Copy + Ord + Send + Sync,
{
    channels
        .par_iter()
        .map(|channel| region_statistics(channel, regions))
        .collect()
}

/// Intensity statistics of every label in an atlas, background included
pub fn label_statistics_table(
    labels: &LabelVolume,
    intensity: &IntensityVolume,
) -> Result<LabelStatisticsTable> {
    Ok(LabelStatisticsTable {
        rows: region_statistics(intensity, labels)?,
    })
}
