use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, S2pError};

// ---------------------------------------------------------------------------
// Plane ordering
// ---------------------------------------------------------------------------

/// How discovered `plane<N>` directories are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaneOrder {
    /// Sort by the numeric suffix: plane2 before plane10.
    #[default]
    Numeric,
    /// Keep whatever order the directory listing returns.
    Enumeration,
}

// ---------------------------------------------------------------------------
// DatasetConfig
// ---------------------------------------------------------------------------

/// File naming and behavioural knobs for [`crate::PlaneDataset`].
///
/// The defaults match a suite2p output directory whose record files were
/// exported to JSON. Every field may be omitted from a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Name of the pipeline output folder below the dataset root.
    pub subfolder: String,
    /// Shared options file inside `subfolder`, one record per plane.
    pub options_file: String,
    pub stat_file: String,
    pub iscell_file: String,
    pub fluorescence_file: String,
    pub spikes_file: String,
    /// Raw image stack naming. Kept for callers that locate the movie next
    /// to the pipeline output; the reader itself never opens it.
    pub image_file_stem: String,
    pub image_file_extension: String,
    pub plane_order: PlaneOrder,
    /// Reject unknown selector names instead of ignoring them.
    pub strict_selectors: bool,
    /// Fixed seed for trace shuffling. `None` seeds from the clock.
    pub shuffle_seed: Option<u64>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            subfolder: "suite2p".to_string(),
            options_file: "ops1.json".to_string(),
            stat_file: "stat.json".to_string(),
            iscell_file: "iscell.npy".to_string(),
            fluorescence_file: "F.npy".to_string(),
            spikes_file: "spks.npy".to_string(),
            image_file_stem: String::new(),
            image_file_extension: "tif".to_string(),
            plane_order: PlaneOrder::Numeric,
            strict_selectors: false,
            shuffle_seed: None,
        }
    }
}

impl DatasetConfig {
    /// Read a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| S2pError::data_load(path, e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| S2pError::data_load(path, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: DatasetConfig =
            serde_json::from_str(r#"{ "strict_selectors": true, "plane_order": "enumeration" }"#)
                .unwrap();
        assert!(cfg.strict_selectors);
        assert_eq!(cfg.plane_order, PlaneOrder::Enumeration);
        assert_eq!(cfg.subfolder, "suite2p");
        assert_eq!(cfg.spikes_file, "spks.npy");
        assert_eq!(cfg.shuffle_seed, None);
    }

    #[test]
    fn from_json_file_reports_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = DatasetConfig::from_json_file(&path).unwrap_err();
        assert!(matches!(err, S2pError::DataLoad { .. }));
    }
}
