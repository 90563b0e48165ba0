//! End-to-end cleanup scenarios
//!
//! These tests run the island cleaner over small synthetic atlases and check
//! the relabeled volumes and run statistics together.

use atlasclean_algorithms::*;
use atlasclean_core::{Connectivity, Dims, Error, Geometry, IntensityVolume, LabelVolume, VoxelGrid};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;

/// 10x10x10 atlas of label 1 with a two-voxel island of label 99
fn enclosed_island() -> (LabelVolume, IntensityVolume) {
    let geometry = Geometry::new(Dims::new(10, 10, 10));
    let mut labels = LabelVolume::filled(geometry, 1);
    let mut t1 = IntensityVolume::filled(geometry, 52.0);
    for position in [[4, 4, 4], [5, 4, 4]] {
        labels[position] = 99;
        t1[position] = 50.0;
    }
    (labels, t1)
}

/// Atlas of three random labels with random intensities
fn random_atlas(seed: u64, n: usize) -> (LabelVolume, IntensityVolume, IntensityVolume) {
    let mut rng = StdRng::seed_from_u64(seed);
    let geometry = Geometry::new(Dims::new(n, n, n));
    let len = geometry.dims.len();
    let labels = VoxelGrid::from_vec(geometry, (0..len).map(|_| rng.gen_range(1..=3)).collect()).unwrap();
    let t1 = VoxelGrid::from_vec(geometry, (0..len).map(|_| rng.gen_range(0.0..100.0)).collect()).unwrap();
    let t2 = VoxelGrid::from_vec(geometry, (0..len).map(|_| rng.gen_range(0.0..100.0)).collect()).unwrap();
    (labels, t1, t2)
}

#[test]
fn test_enclosed_island_is_cleaned() {
    let (mut labels, t1) = enclosed_island();
    let cleaner = IslandCleaner::new(CleanupConfig::new(5));

    let stats = cleaner.run(&mut labels, &[&t1]).unwrap();

    assert_eq!(labels.count_label(99), 0);
    assert_eq!(labels.count_label(1), 1000);
    assert_eq!(stats.islands_cleaned(99), 1);
    assert_eq!(stats.islands_found(99), 1);
    assert_eq!(stats.islands_found(1), 1);
    assert_eq!(stats.islands_cleaned(1), 0);
    assert_eq!(stats.total().islands_cleaned, 1);
}

#[test]
fn test_threshold_short_circuit() {
    let (mut labels, t1) = enclosed_island();
    let original = labels.clone();
    let cleaner = IslandCleaner::new(CleanupConfig::new(1));

    let stats = cleaner.run(&mut labels, &[&t1]).unwrap();

    assert_eq!(labels, original);
    assert_eq!(stats.islands_cleaned(99), 0);
    assert_eq!(stats.islands_found(99), 1);
}

#[test]
fn test_zero_threshold_is_identity() {
    let (mut labels, t1, t2) = random_atlas(11, 12);
    let original = labels.clone();

    for connectivity in [Connectivity::Face, Connectivity::Full] {
        let cleaner = IslandCleaner::new(CleanupConfig::new(0).with_connectivity(connectivity));
        let stats = cleaner.run(&mut labels, &[&t1, &t2]).unwrap();
        assert_eq!(labels, original);
        assert_eq!(stats.total().islands_cleaned, 0);
        assert!(stats.total().islands_found > 0);
    }
}

#[test]
fn test_random_atlases_conserve_voxels() {
    for seed in 0..5 {
        let (mut labels, t1, t2) = random_atlas(seed, 12);
        let before: BTreeSet<i16> = labels.present_labels();
        let len = labels.len();

        let cleaner = IslandCleaner::new(
            CleanupConfig::new(4).with_connectivity(if seed % 2 == 0 {
                Connectivity::Face
            } else {
                Connectivity::Full
            }),
        );
        let stats = cleaner.run(&mut labels, &[&t1, &t2]).unwrap();

        assert_eq!(labels.len(), len);
        assert!(labels.present_labels().is_subset(&before));

        let mut found = 0;
        let mut cleaned = 0;
        for (_, counts) in stats.iter() {
            assert!(counts.islands_cleaned <= counts.islands_found);
            found += counts.islands_found;
            cleaned += counts.islands_cleaned;
        }
        assert_eq!(stats.total().islands_found, found);
        assert_eq!(stats.total().islands_cleaned, cleaned);
    }
}

#[test]
fn test_corner_touching_islands_depend_on_connectivity() {
    let geometry = Geometry::new(Dims::new(5, 5, 5));
    let mut labels = LabelVolume::filled(geometry, 1);
    labels[[1, 1, 1]] = 2;
    labels[[2, 2, 2]] = 2;
    let t1 = IntensityVolume::filled(geometry, 10.0);
    let only_two = LabelSelection::Include(vec![2]);

    let face = IslandCleaner::new(CleanupConfig::new(0).with_selection(only_two.clone()));
    let stats = face.run(&mut labels.clone(), &[&t1]).unwrap();
    assert_eq!(stats.islands_found(2), 2);

    let full = IslandCleaner::new(
        CleanupConfig::new(0)
            .with_selection(only_two)
            .with_connectivity(Connectivity::Full),
    );
    let stats = full.run(&mut labels, &[&t1]).unwrap();
    assert_eq!(stats.islands_found(2), 1);
}

#[test]
fn test_closest_mean_wins() {
    let geometry = Geometry::new(Dims::new(3, 1, 1));
    let mut labels = VoxelGrid::from_vec(geometry, vec![3i16, 5, 7]).unwrap();
    let t1 = VoxelGrid::from_vec(geometry, vec![40.0f32, 50.0, 55.0]).unwrap();
    let cleaner = IslandCleaner::new(CleanupConfig::new(1).with_selection(LabelSelection::Include(vec![5])));

    cleaner.run(&mut labels, &[&t1]).unwrap();
    assert_eq!(labels.as_slice(), &[3, 7, 7]);
}

#[test]
fn test_near_tie_resolved_by_distance() {
    // Means of 10.01 and 10.0 against an island mean of 10.0: the exact match
    // must win over the lower label
    assert!(intensity_distance(&[10.0], &[10.01]).unwrap() > intensity_distance(&[10.0], &[10.0]).unwrap());

    let geometry = Geometry::new(Dims::new(3, 1, 1));
    let mut labels = VoxelGrid::from_vec(geometry, vec![3i16, 5, 7]).unwrap();
    let t1 = VoxelGrid::from_vec(geometry, vec![10.01f32, 10.0, 10.0]).unwrap();
    let cleaner = IslandCleaner::new(CleanupConfig::new(1).with_selection(LabelSelection::Include(vec![5])));

    let stats = cleaner.run(&mut labels, &[&t1]).unwrap();
    assert_eq!(labels.as_slice(), &[3, 7, 7]);
    assert_eq!(stats.islands_cleaned(5), 1);
}

#[test]
fn test_equal_distance_picks_lowest_label() {
    let geometry = Geometry::new(Dims::new(3, 1, 1));
    let t1 = VoxelGrid::from_vec(geometry, vec![48.0f32, 50.0, 52.0]).unwrap();
    let cleaner = IslandCleaner::new(CleanupConfig::new(1).with_selection(LabelSelection::Include(vec![5])));

    let mut labels = VoxelGrid::from_vec(geometry, vec![3i16, 5, 7]).unwrap();
    cleaner.run(&mut labels, &[&t1]).unwrap();
    assert_eq!(labels.as_slice(), &[3, 3, 7]);

    let mut mirrored = VoxelGrid::from_vec(geometry, vec![7i16, 5, 3]).unwrap();
    cleaner.run(&mut mirrored, &[&t1]).unwrap();
    assert_eq!(mirrored.as_slice(), &[7, 3, 3]);
}

#[test]
fn test_second_channel_breaks_tie() {
    let geometry = Geometry::new(Dims::new(3, 1, 1));
    let t1 = VoxelGrid::from_vec(geometry, vec![48.0f32, 50.0, 52.0]).unwrap();
    let t2 = VoxelGrid::from_vec(geometry, vec![10.0f32, 30.0, 31.0]).unwrap();
    let cleaner = IslandCleaner::new(CleanupConfig::new(1).with_selection(LabelSelection::Include(vec![5])));

    let mut labels = VoxelGrid::from_vec(geometry, vec![3i16, 5, 7]).unwrap();
    let stats = cleaner.run(&mut labels, &[&t1, &t2]).unwrap();
    assert_eq!(labels.as_slice(), &[3, 7, 7]);
    assert_eq!(stats.islands_cleaned(5), 1);
}

#[test]
fn test_relabeling_is_visible_to_later_labels() {
    // Label 4 is absorbed into label 2, which makes label 2 one component
    // too large to clean when it is processed afterwards.
    let geometry = Geometry::new(Dims::new(5, 1, 1));
    let mut labels = VoxelGrid::from_vec(geometry, vec![2i16, 4, 2, 6, 6]).unwrap();
    let t1 = VoxelGrid::from_vec(geometry, vec![10.0f32, 11.0, 10.0, 90.0, 90.0]).unwrap();
    let cleaner = IslandCleaner::new(
        CleanupConfig::new(2).with_selection(LabelSelection::Include(vec![4, 2])),
    );

    let stats = cleaner.run(&mut labels, &[&t1]).unwrap();
    assert_eq!(labels.as_slice(), &[2, 2, 2, 6, 6]);
    assert_eq!(stats.islands_found(2), 1);
    assert_eq!(stats.islands_cleaned(2), 0);
}

#[test]
fn test_excluded_label_untouched() {
    let (mut labels, t1) = enclosed_island();
    let cleaner = IslandCleaner::new(
        CleanupConfig::new(5).with_selection(LabelSelection::Exclude(vec![99])),
    );

    let stats = cleaner.run(&mut labels, &[&t1]).unwrap();
    assert_eq!(labels.count_label(99), 2);
    assert!(stats.get(99).is_none());
}

#[test]
fn test_force_change_keeps_result_for_enclosed_island() {
    let (mut labels, t1) = enclosed_island();
    let cleaner = IslandCleaner::new(CleanupConfig::new(5).with_force_change(true));
    cleaner.run(&mut labels, &[&t1]).unwrap();
    assert_eq!(labels.count_label(99), 0);
}

#[test]
fn test_geometry_mismatch_is_fatal() {
    let (mut labels, _) = enclosed_island();
    let original = labels.clone();
    let t1 = IntensityVolume::filled(Geometry::new(Dims::new(10, 10, 9)), 1.0);

    let result = IslandCleaner::new(CleanupConfig::new(5)).run(&mut labels, &[&t1]);
    assert!(matches!(result, Err(Error::InvalidGeometry { .. })));
    assert_eq!(labels, original);
}

#[test]
fn test_options_drive_cleaner() {
    let options = CleanupOptions::from_json_str(
        r#"{"includeLabelsList": "99", "maximumIslandVoxelCount": 5}"#,
    )
    .unwrap();
    let (mut labels, t1) = enclosed_island();

    let stats = IslandCleaner::new(options.to_config().unwrap())
        .run(&mut labels, &[&t1])
        .unwrap();
    assert_eq!(stats.to_string(), "label,islands_cleaned,islands_found\n99,1,1\nTotal,1,1");
}
