//! Cleanup configuration
//!
//! [`CleanupOptions`] is the loosely typed surface read from JSON files and
//! command-line flags. [`CleanupOptions::validate`] turns it into a
//! [`CleanupJob`] holding the typed [`CleanupConfig`] the cleaner runs with.

use atlasclean_core::{Connectivity, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which labels the cleaner visits
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelSelection {
    /// Every label present in the atlas, ascending (background included)
    #[default]
    All,
    /// Only these labels, in the given order
    Include(Vec<i16>),
    /// Every label present except these
    Exclude(Vec<i16>),
}

/// Typed parameters of one cleanup run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanupConfig {
    pub selection: LabelSelection,
    /// Islands with more voxels than this are left alone; 0 cleans nothing
    pub max_island_voxel_count: usize,
    pub connectivity: Connectivity,
    /// Never let an island keep its own label
    pub force_change: bool,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            selection: LabelSelection::All,
            max_island_voxel_count: 0,
            connectivity: Connectivity::Face,
            force_change: false,
        }
    }
}

impl CleanupConfig {
    pub fn new(max_island_voxel_count: usize) -> Self {
        Self {
            max_island_voxel_count,
            ..Default::default()
        }
    }

    pub fn with_selection(mut self, selection: LabelSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = connectivity;
        self
    }

    pub fn with_force_change(mut self, force_change: bool) -> Self {
        self.force_change = force_change;
        self
    }
}

/// Configuration as written in a JSON file or assembled from flags
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CleanupOptions {
    pub input_atlas_path: Option<PathBuf>,
    pub output_atlas_path: Option<PathBuf>,
    pub input_t1_path: Option<PathBuf>,
    pub input_t2_path: Option<PathBuf>,
    /// Comma-separated label values
    pub include_labels_list: Option<String>,
    /// Comma-separated label values
    pub exclude_labels_list: Option<String>,
    pub maximum_island_voxel_count: Option<i64>,
    pub use_fully_connected_in_connected_component_filter: Option<bool>,
    pub force_suspicious_label_change: Option<bool>,
}

/// Validated inputs and parameters of a cleanup run
#[derive(Debug, Clone, PartialEq)]
pub struct CleanupJob {
    pub input_atlas: PathBuf,
    pub output_atlas: PathBuf,
    pub input_t1: PathBuf,
    pub input_t2: Option<PathBuf>,
    pub config: CleanupConfig,
}

impl CleanupJob {
    /// Intensity channel paths in channel order
    pub fn intensity_paths(&self) -> Vec<&Path> {
        std::iter::once(self.input_t1.as_path())
            .chain(self.input_t2.as_deref())
            .collect()
    }
}

impl CleanupOptions {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidConfiguration(e.to_string()))
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Overlay every value set in `other` onto `self`
    pub fn merge(mut self, other: CleanupOptions) -> Self {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() { self.$field = other.$field; })*
            };
        }
        take!(
            input_atlas_path,
            output_atlas_path,
            input_t1_path,
            input_t2_path,
            include_labels_list,
            exclude_labels_list,
            maximum_island_voxel_count,
            use_fully_connected_in_connected_component_filter,
            force_suspicious_label_change
        );
        self
    }

    /// Typed cleanup parameters, without requiring any paths
    pub fn to_config(&self) -> Result<CleanupConfig> {
        let selection = match (&self.include_labels_list, &self.exclude_labels_list) {
            (Some(_), Some(_)) => {
                return Err(Error::InvalidConfiguration(
                    "include and exclude label lists are mutually exclusive".to_string(),
                ))
            }
            (Some(list), None) => LabelSelection::Include(parse_label_list(list)?),
            (None, Some(list)) => LabelSelection::Exclude(parse_label_list(list)?),
            (None, None) => LabelSelection::All,
        };

        let threshold = self.maximum_island_voxel_count.ok_or_else(|| {
            Error::InvalidConfiguration("maximum island voxel count is required".to_string())
        })?;
        if threshold <= 0 {
            return Err(Error::InvalidConfiguration(format!(
                "maximum island voxel count must be positive, got {}",
                threshold
            )));
        }
        let max_island_voxel_count = usize::try_from(threshold).map_err(|_| {
            Error::InvalidConfiguration(format!("maximum island voxel count {} is too large", threshold))
        })?;

        Ok(CleanupConfig {
            selection,
            max_island_voxel_count,
            connectivity: Connectivity::from_fully_connected(
                self.use_fully_connected_in_connected_component_filter.unwrap_or(false),
            ),
            force_change: self.force_suspicious_label_change.unwrap_or(false),
        })
    }

    /// Check every option and produce a runnable job
    pub fn validate(&self) -> Result<CleanupJob> {
        let config = self.to_config()?;
        Ok(CleanupJob {
            input_atlas: required(&self.input_atlas_path, "inputAtlasPath")?,
            output_atlas: required(&self.output_atlas_path, "outputAtlasPath")?,
            input_t1: required(&self.input_t1_path, "inputT1Path")?,
            input_t2: self.input_t2_path.clone(),
            config,
        })
    }
}

fn required(path: &Option<PathBuf>, name: &str) -> Result<PathBuf> {
    path.clone()
        .ok_or_else(|| Error::InvalidConfiguration(format!("{} is required", name)))
}

/// Parse a comma-separated list of label values, e.g. `"3, 17,42"`.
///
/// Whitespace around entries is ignored. Empty entries and values outside
/// the i16 range are rejected.
pub fn parse_label_list(list: &str) -> Result<Vec<i16>> {
    list.split(',')
        .map(str::trim)
        .map(|entry| {
            if entry.is_empty() {
                return Err(Error::InvalidConfiguration(format!(
                    "empty entry in label list '{}'",
                    list
                )));
            }
            entry.parse::<i16>().map_err(|e| {
                Error::InvalidConfiguration(format!("invalid label '{}': {}", entry, e))
            })
        })
        .collect()
}
