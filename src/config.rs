//! Loader configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// What to do when two files of one run resolve to the same modality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Later file (in path order) replaces the earlier one; reported.
    #[default]
    KeepLast,
    /// Drop the whole run; reported.
    RejectRun,
}

/// Layout and parsing settings for a session directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Subdirectory with per-device tables
    pub processed_dir: String,

    /// Subdirectory with detector/annotation/metric outputs
    pub derived_dir: String,

    /// File extension of device tables, matched case-insensitively
    pub extension: String,

    /// Absolute timestamp column present in every device table
    pub time_column: String,

    pub collision_policy: CollisionPolicy,

    /// Nominal sampling rate (Hz) per modality identifier
    pub sampling_rates: BTreeMap<String, f64>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            processed_dir: "processed".to_string(),
            derived_dir: "derived".to_string(),
            extension: "csv".to_string(),
            time_column: "utc".to_string(),
            collision_policy: CollisionPolicy::KeepLast,
            sampling_rates: BTreeMap::new(),
        }
    }
}

impl LoaderConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `from_file` when a path is given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    pub fn processed_path(&self, session: &Path) -> PathBuf {
        session.join(&self.processed_dir)
    }

    pub fn derived_path(&self, session: &Path) -> PathBuf {
        session.join(&self.derived_dir)
    }

    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(&self.extension))
    }
}
