//! Small-island cleanup of label atlases
//!
//! For each selected label the current atlas is thresholded, split into
//! connected components, and every component at or below the size threshold
//! is relabeled to the bordering label whose mean intensity profile is
//! closest to the island's own. Components are visited smallest first, so the
//! first component over the threshold ends the label.
//!
//! Relabeling happens in place and is visible to every later island and label.
//! Candidate means are taken over the atlas as it stands when the island is
//! scored.

use crate::components::label_components;
use crate::config::{CleanupConfig, LabelSelection};
use crate::dilation::dilation_ring;
use crate::distance::{select_target, TargetCandidate};
use crate::report::RunStatistics;
use crate::statistics::region_statistics_multi;
use atlasclean_core::{Error, IntensityVolume, LabelVolume, Result};
use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet};

/// An island under consideration
#[derive(Debug, Clone, PartialEq)]
pub struct IslandDescriptor {
    pub label: i16,
    pub component: u32,
    pub voxel_count: usize,
    /// Mean intensity per channel over the island's own voxels
    pub mean: Vec<f64>,
}

impl IslandDescriptor {
    pub fn describe(
        label: i16,
        component: u32,
        voxels: &[usize],
        channels: &[&IntensityVolume],
    ) -> Self {
        let n = voxels.len().max(1) as f64;
        let mean = channels
            .iter()
            .map(|channel| {
                let data = channel.as_slice();
                voxels.iter().map(|&v| data[v] as f64).sum::<f64>() / n
            })
            .collect();
        Self {
            label,
            component,
            voxel_count: voxels.len(),
            mean,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct LabelSums {
    count: usize,
    sums: Vec<f64>,
}

/// Running per-label voxel counts and intensity sums for every channel.
///
/// Updated on each relabel so label means always reflect the current atlas.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelIntensityTable {
    labels: BTreeMap<i16, LabelSums>,
    channels: usize,
}

impl LabelIntensityTable {
    pub fn new(volume: &LabelVolume, channels: &[&IntensityVolume]) -> Result<Self> {
        let per_channel = region_statistics_multi(channels, volume)?;
        let mut labels: BTreeMap<i16, LabelSums> = BTreeMap::new();
        for (c, stats) in per_channel.iter().enumerate() {
            for (&label, s) in stats {
                let entry = labels.entry(label).or_insert_with(|| LabelSums {
                    count: s.count,
                    sums: vec![0.0; channels.len()],
                });
                entry.sums[c] = s.sum;
            }
        }
        Ok(Self {
            labels,
            channels: channels.len(),
        })
    }

    /// Mean intensity vector of `label`, if it has any voxels
    pub fn mean(&self, label: i16) -> Option<Vec<f64>> {
        self.labels
            .get(&label)
            .filter(|s| s.count > 0)
            .map(|s| s.sums.iter().map(|sum| sum / s.count as f64).collect())
    }

    pub fn count(&self, label: i16) -> usize {
        self.labels.get(&label).map_or(0, |s| s.count)
    }

    /// Move `voxels` from label `from` to label `to`
    pub fn transfer(
        &mut self,
        from: i16,
        to: i16,
        voxels: &[usize],
        channels: &[&IntensityVolume],
    ) {
        if from == to || voxels.is_empty() {
            return;
        }
        let moved: Vec<f64> = channels
            .iter()
            .map(|channel| {
                let data = channel.as_slice();
                voxels.iter().map(|&v| data[v] as f64).sum()
            })
            .collect();

        let width = self.channels;
        if let Some(source) = self.labels.get_mut(&from) {
            source.count = source.count.saturating_sub(voxels.len());
            for (sum, m) in source.sums.iter_mut().zip(&moved) {
                *sum -= m;
            }
            if source.count == 0 {
                self.labels.remove(&from);
            }
        }
        let target = self.labels.entry(to).or_insert_with(|| LabelSums {
            count: 0,
            sums: vec![0.0; width],
        });
        target.count += voxels.len();
        for (sum, m) in target.sums.iter_mut().zip(&moved) {
            *sum += m;
        }
    }
}

/// Labels of the voxels in the one-voxel shell around `voxels`.
///
/// Positions outside the grid contribute nothing.
pub fn bordering_labels(volume: &LabelVolume, voxels: &[usize]) -> BTreeSet<i16> {
    let data = volume.as_slice();
    dilation_ring(volume.dims(), voxels)
        .into_iter()
        .map(|v| data[v])
        .collect()
}

/// Relabels small islands of an atlas in place
#[derive(Debug, Clone)]
pub struct IslandCleaner {
    config: CleanupConfig,
}

impl IslandCleaner {
    pub fn new(config: CleanupConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CleanupConfig {
        &self.config
    }

    /// Clean every selected label of `volume`.
    ///
    /// # Arguments
    /// * `volume` - Label atlas, modified in place
    /// * `channels` - One or more intensity images co-registered with the atlas
    ///
    /// # Returns
    /// * `Result<RunStatistics>` - Islands found and cleaned per label.
    ///   Fails before touching the atlas if no channel is given or any
    ///   channel's dimensions differ from the atlas.
    pub fn run(
        &self,
        volume: &mut LabelVolume,
        channels: &[&IntensityVolume],
    ) -> Result<RunStatistics> {
        if channels.is_empty() {
            return Err(Error::InvalidConfiguration(
                "at least one intensity channel is required".to_string(),
            ));
        }
        for channel in channels {
            volume.ensure_same_dims(*channel)?;
        }

        let labels = self.select_labels(volume);
        tracing::info!(
            "Cleaning {} labels: threshold={}, connectivity={:?}, force_change={}",
            labels.len(),
            self.config.max_island_voxel_count,
            self.config.connectivity,
            self.config.force_change,
        );

        let mut table = LabelIntensityTable::new(volume, channels)?;
        let mut stats = RunStatistics::new();

        for label in labels {
            match self.clean_label(label, volume, channels, &mut table, &mut stats) {
                Ok(()) => {}
                Err(e) if e.is_recoverable() => {
                    tracing::warn!("{}, skipping", e);
                    stats.touch(label);
                }
                Err(e) => return Err(e),
            }
        }

        let total = stats.total();
        tracing::info!(
            "Cleanup finished: {} of {} islands relabeled",
            total.islands_cleaned,
            total.islands_found,
        );
        Ok(stats)
    }

    /// Labels to visit, in visiting order
    pub fn select_labels(&self, volume: &LabelVolume) -> Vec<i16> {
        let present = volume.present_labels();
        match &self.config.selection {
            LabelSelection::All => present.into_iter().collect(),
            LabelSelection::Include(list) => list
                .iter()
                .copied()
                .filter(|&label| {
                    let found = present.contains(&label);
                    if !found {
                        tracing::warn!(label, "Label is not present in the atlas, dropping");
                    }
                    found
                })
                .unique()
                .collect(),
            LabelSelection::Exclude(list) => {
                let excluded: BTreeSet<i16> = list.iter().copied().collect();
                for label in excluded.difference(&present) {
                    tracing::warn!(label = *label, "Excluded label is not present in the atlas");
                }
                present.difference(&excluded).copied().collect()
            }
        }
    }

    fn clean_label(
        &self,
        label: i16,
        volume: &mut LabelVolume,
        channels: &[&IntensityVolume],
        table: &mut LabelIntensityTable,
        stats: &mut RunStatistics,
    ) -> Result<()> {
        let mask = volume.threshold(label);
        let labeling = label_components(&mask, volume.dims(), self.config.connectivity)?;
        if labeling.num_components() == 0 {
            return Err(Error::EmptyLabel(label));
        }
        stats.record_found(label, labeling.num_components());

        for component in labeling.ids_smallest_first() {
            let voxels = labeling.voxels(component);
            if voxels.len() > self.config.max_island_voxel_count {
                tracing::debug!(
                    label,
                    component,
                    size = voxels.len(),
                    "Island exceeds threshold, done with label"
                );
                break;
            }

            let island = IslandDescriptor::describe(label, component, voxels, channels);
            match self.choose_target(&island, volume, voxels, table) {
                Ok(target) if target.label == label => {
                    tracing::debug!(
                        label,
                        component,
                        size = island.voxel_count,
                        "Closest label is its own, leaving island in place"
                    );
                }
                Ok(target) => {
                    tracing::debug!(
                        label,
                        component,
                        size = island.voxel_count,
                        target = target.label,
                        distance = target.distance,
                        "Relabeling island"
                    );
                    volume.relabel_voxels(voxels, target.label);
                    table.transfer(label, target.label, voxels, channels);
                    stats.record_cleaned(label);
                }
                Err(e) if e.is_recoverable() => {
                    tracing::warn!("{}, leaving it in place", e);
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            "Label {}: cleaned {} of {} islands",
            label,
            stats.islands_cleaned(label),
            stats.islands_found(label),
        );
        Ok(())
    }

    fn choose_target(
        &self,
        island: &IslandDescriptor,
        volume: &LabelVolume,
        voxels: &[usize],
        table: &LabelIntensityTable,
    ) -> Result<TargetCandidate> {
        let mut neighbors = bordering_labels(volume, voxels);
        if self.config.force_change {
            neighbors.remove(&island.label);
        }

        let candidates = neighbors
            .into_iter()
            .filter_map(|label| table.mean(label).map(|mean| (label, mean)))
            .map(|(label, mean)| TargetCandidate::score(label, mean, &island.mean))
            .collect::<Result<Vec<_>>>()?;

        select_target(&candidates)
            .cloned()
            .ok_or(Error::NoCandidates {
                label: island.label,
                component: island.component,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use atlasclean_core::{Connectivity, Dims, Geometry, VoxelGrid};

    fn geometry(n: usize) -> Geometry {
        Geometry::new(Dims::new(n, n, n))
    }

    #[test]
    fn test_island_mean() {
        let g = geometry(3);
        let t1 = VoxelGrid::from_vec(g, (0..27).map(|v| v as f32).collect()).unwrap();
        let t2 = t1.map(|&v| v * 10.0);
        let island = IslandDescriptor::describe(4, 2, &[1, 3], &[&t1, &t2]);
        assert_eq!(island.voxel_count, 2);
        assert_relative_eq!(island.mean[0], 2.0);
        assert_relative_eq!(island.mean[1], 20.0);
    }

    #[test]
    fn test_table_transfer() {
        let g = Geometry::new(Dims::new(4, 1, 1));
        let volume = VoxelGrid::from_vec(g, vec![1i16, 1, 2, 2]).unwrap();
        let t1 = VoxelGrid::from_vec(g, vec![1.0f32, 3.0, 10.0, 20.0]).unwrap();

        let mut table = LabelIntensityTable::new(&volume, &[&t1]).unwrap();
        assert_relative_eq!(table.mean(1).unwrap()[0], 2.0);
        assert_relative_eq!(table.mean(2).unwrap()[0], 15.0);

        table.transfer(2, 1, &[3], &[&t1]);
        assert_eq!(table.count(1), 3);
        assert_eq!(table.count(2), 1);
        assert_relative_eq!(table.mean(1).unwrap()[0], 8.0);
        assert_relative_eq!(table.mean(2).unwrap()[0], 10.0);

        table.transfer(2, 5, &[2], &[&t1]);
        assert!(table.mean(2).is_none());
        assert_relative_eq!(table.mean(5).unwrap()[0], 10.0);
    }

    #[test]
    fn test_bordering_labels_skip_outside() {
        let g = geometry(3);
        let mut volume = LabelVolume::filled(g, 7);
        volume[[1, 0, 0]] = 3;
        // Corner voxel: the ring stays inside the grid
        let labels = bordering_labels(&volume, &[0]);
        assert_eq!(labels.into_iter().collect::<Vec<_>>(), vec![3, 7]);
    }

    #[test]
    fn test_select_labels_include_order_and_missing() {
        let g = geometry(2);
        let volume = VoxelGrid::from_vec(g, vec![0i16, 1, 2, 3, 3, 2, 1, 0]).unwrap();
        let cleaner = IslandCleaner::new(
            CleanupConfig::new(5).with_selection(LabelSelection::Include(vec![3, 9, 1, 3])),
        );
        assert_eq!(cleaner.select_labels(&volume), vec![3, 1]);
    }

    #[test]
    fn test_select_labels_exclude() {
        let g = geometry(2);
        let volume = VoxelGrid::from_vec(g, vec![0i16, 1, 2, 3, 3, 2, 1, 0]).unwrap();
        let cleaner = IslandCleaner::new(
            CleanupConfig::new(5).with_selection(LabelSelection::Exclude(vec![0, 42])),
        );
        assert_eq!(cleaner.select_labels(&volume), vec![1, 2, 3]);

        let all = IslandCleaner::new(CleanupConfig::new(5));
        assert_eq!(all.select_labels(&volume), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_empty_label_is_reported() {
        let g = geometry(3);
        let mut volume = LabelVolume::filled(g, 1);
        let t1 = VoxelGrid::filled(g, 1.0f32);
        let cleaner = IslandCleaner::new(CleanupConfig::new(5));
        let mut table = LabelIntensityTable::new(&volume, &[&t1]).unwrap();
        let mut stats = RunStatistics::new();

        let err = cleaner
            .clean_label(42, &mut volume, &[&t1], &mut table, &mut stats)
            .unwrap_err();
        assert!(matches!(err, Error::EmptyLabel(42)));
        assert!(err.is_recoverable());
        assert!(stats.get(42).is_none());
    }

    #[test]
    fn test_no_candidates_when_label_fills_grid() {
        let g = geometry(3);
        let mut volume = LabelVolume::filled(g, 4);
        let t1 = VoxelGrid::filled(g, 1.0f32);
        let cleaner = IslandCleaner::new(CleanupConfig::new(100));

        let stats = cleaner.run(&mut volume, &[&t1]).unwrap();
        assert_eq!(stats.islands_found(4), 1);
        assert_eq!(stats.islands_cleaned(4), 0);
        assert!(volume.iter().all(|&v| v == 4));
    }

    #[test]
    fn test_own_label_candidate_under_face_connectivity() {
        // Two label-2 voxels touching only at a corner are separate islands
        // under face connectivity and see each other across the ring.
        let g = geometry(4);
        let mut volume = LabelVolume::filled(g, 1);
        volume[[1, 1, 1]] = 2;
        volume[[2, 2, 1]] = 2;
        let mut t1 = VoxelGrid::filled(g, 0.0f32);
        t1[[1, 1, 1]] = 50.0;
        t1[[2, 2, 1]] = 50.0;

        let keep = IslandCleaner::new(CleanupConfig::new(1).with_connectivity(Connectivity::Face));
        let mut kept = volume.clone();
        let stats = keep.run(&mut kept, &[&t1]).unwrap();
        // Both islands pick their own label and stay in place
        assert_eq!(kept, volume);
        assert_eq!(stats.islands_found(2), 2);
        assert_eq!(stats.islands_cleaned(2), 0);

        let force = IslandCleaner::new(
            CleanupConfig::new(1)
                .with_connectivity(Connectivity::Face)
                .with_force_change(true),
        );
        let stats = force.run(&mut volume, &[&t1]).unwrap();
        assert_eq!(volume.count_label(2), 0);
        assert_eq!(stats.islands_cleaned(2), 2);
    }

    #[test]
    fn test_rejects_missing_channels() {
        let g = geometry(2);
        let mut volume = LabelVolume::filled(g, 1);
        let cleaner = IslandCleaner::new(CleanupConfig::new(5));
        assert!(matches!(
            cleaner.run(&mut volume, &[]),
            Err(Error::InvalidConfiguration(_))
        ));
    }
}
