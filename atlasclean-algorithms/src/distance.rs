//! Intensity-profile distance and relabel target selection

use atlasclean_core::{Error, Result};
use serde::Serialize;
use std::cmp::Ordering;

/// Euclidean distance between two per-channel mean intensity vectors.
///
/// # Arguments
/// * `a` - Mean intensity per channel
/// * `b` - Mean intensity per channel
///
/// # Returns
/// * `Result<f64>` - `sqrt(sum((a[c] - b[c])^2))`, or `InvalidData` when the
///   channel counts differ
pub fn intensity_distance(a: &[f64], b: &[f64]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(Error::InvalidData(format!(
            "channel count mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    Ok(a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt())
}

/// A label an island could be reassigned to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetCandidate {
    pub label: i16,
    pub mean: Vec<f64>,
    /// Distance from the island's mean vector
    pub distance: f64,
}

impl TargetCandidate {
    /// Score a candidate label against the island's mean vector
    pub fn score(label: i16, mean: Vec<f64>, island_mean: &[f64]) -> Result<Self> {
        let distance = intensity_distance(&mean, island_mean)?;
        Ok(Self { label, mean, distance })
    }
}

/// Pick the candidate with the smallest distance; exact ties go to the lowest label.
pub fn select_target(candidates: &[TargetCandidate]) -> Option<&TargetCandidate> {
    candidates.iter().min_by(|a, b| compare(a, b))
}

fn compare(a: &TargetCandidate, b: &TargetCandidate) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| a.label.cmp(&b.label))
}
