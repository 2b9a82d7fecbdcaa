use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::debug;
use ndarray::Array2;
use ndarray_npy::{read_npy, ReadNpyError};
use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::model::{AspectRatio, Classification, PlaneOptions, RoiCoordinates, RoiStat, TraceKind};
use crate::config::{DatasetConfig, PlaneOrder};
use crate::error::{Result, S2pError};

// ---------------------------------------------------------------------------
// Eagerly loaded per-plane metadata
// ---------------------------------------------------------------------------

/// Everything about a plane that is small enough to keep resident.
#[derive(Debug, Clone)]
pub struct PlaneMetadata {
    pub path: PathBuf,
    pub options: PlaneOptions,
    pub rois: Vec<RoiStat>,
    pub classification: Classification,
    pub coords: RoiCoordinates,
}

impl PlaneMetadata {
    pub fn roi_count(&self) -> usize {
        self.rois.len()
    }
}

/// Resolve the pipeline folder, discover planes and load their metadata.
///
/// Returns the planes in the configured order. Fails on the first missing or
/// malformed file; nothing is returned partially.
pub fn load_metadata(root: &Path, config: &DatasetConfig) -> Result<Vec<PlaneMetadata>> {
    if !root.is_dir() {
        return Err(S2pError::not_found(root));
    }
    let s2p_root = root.join(&config.subfolder);
    if !s2p_root.is_dir() {
        return Err(S2pError::not_found(&s2p_root));
    }

    let plane_paths = discover_planes(&s2p_root, config.plane_order)?;
    debug!("found {} plane(s) under {}", plane_paths.len(), s2p_root.display());
    if plane_paths.is_empty() {
        return Ok(Vec::new());
    }

    let mut options = load_options(&s2p_root.join(&config.options_file))?;
    if options.len() < plane_paths.len() {
        return Err(S2pError::data_load(
            &s2p_root.join(&config.options_file),
            format!(
                "{} options record(s) for {} plane(s)",
                options.len(),
                plane_paths.len()
            ),
        ));
    }
    options.truncate(plane_paths.len());

    plane_paths
        .into_iter()
        .zip(options)
        .map(|(path, options)| load_plane(path, options, config))
        .collect()
}

fn load_plane(
    path: PathBuf,
    options: PlaneOptions,
    config: &DatasetConfig,
) -> Result<PlaneMetadata> {
    let rois = load_stats(&path.join(&config.stat_file))?;
    let iscell_path = path.join(&config.iscell_file);
    let classification = load_classification(&iscell_path)?;
    if classification.len() != rois.len() {
        return Err(S2pError::data_load(
            &iscell_path,
            format!(
                "{} classification row(s) for {} ROI(s)",
                classification.len(),
                rois.len()
            ),
        ));
    }
    let coords = RoiCoordinates::from_stats(&rois);
    debug!("{}: {} ROI(s)", path.display(), rois.len());

    Ok(PlaneMetadata {
        path,
        options,
        rois,
        classification,
        coords,
    })
}

// ---------------------------------------------------------------------------
// Plane discovery
// ---------------------------------------------------------------------------

/// Parse the `N` out of a `plane<N>` directory name.
fn plane_number(name: &str) -> Option<u32> {
    let digits = name.strip_prefix("plane")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// List the `plane<N>` subdirectories of the pipeline folder.
pub fn discover_planes(s2p_root: &Path, order: PlaneOrder) -> Result<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(s2p_root).map_err(|e| S2pError::data_load(s2p_root, e.to_string()))?;

    let mut planes: Vec<(u32, PathBuf)> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| S2pError::data_load(s2p_root, e.to_string()))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(number) = entry.file_name().to_str().and_then(plane_number) else {
            continue;
        };
        planes.push((number, path));
    }

    if order == PlaneOrder::Numeric {
        planes.sort_by_key(|(n, _)| *n);
    }
    Ok(planes.into_iter().map(|(_, p)| p).collect())
}

// ---------------------------------------------------------------------------
// JSON record files
// ---------------------------------------------------------------------------

/// Options record as written to disk; `meanImg` is a nested row list.
#[derive(Deserialize)]
struct RawOptions {
    #[serde(rename = "meanImg")]
    mean_img: Vec<Vec<f64>>,
    aspect: AspectRatio,
    #[serde(flatten)]
    extra: BTreeMap<String, JsonValue>,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).map_err(|e| S2pError::data_load(path, e.to_string()))?;
    serde_json::from_str(&text).map_err(|e| S2pError::data_load(path, e.to_string()))
}

/// Load the shared options file: a JSON array with one record per plane.
pub fn load_options(path: &Path) -> Result<Vec<PlaneOptions>> {
    let raw: Vec<RawOptions> = read_json(path)?;
    raw.into_iter()
        .enumerate()
        .map(|(plane, rec)| {
            let mean_image = nested_to_array2(rec.mean_img).map_err(|reason| {
                S2pError::data_load(path, format!("plane {plane} meanImg: {reason}"))
            })?;
            Ok(PlaneOptions {
                mean_image,
                aspect_ratio: rec.aspect,
                extra: rec.extra,
            })
        })
        .collect()
}

fn nested_to_array2(rows: Vec<Vec<f64>>) -> std::result::Result<Array2<f64>, String> {
    let n_rows = rows.len();
    let n_cols = rows.first().map_or(0, Vec::len);
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_cols) {
        return Err(format!("row {i} has {} values, expected {n_cols}", row.len()));
    }
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((n_rows, n_cols), flat).map_err(|e| e.to_string())
}

/// Load a plane's ROI list.
pub fn load_stats(path: &Path) -> Result<Vec<RoiStat>> {
    read_json(path)
}

// ---------------------------------------------------------------------------
// NumPy matrices
// ---------------------------------------------------------------------------

fn npy_error(path: &Path, err: ReadNpyError) -> S2pError {
    S2pError::data_load(path, err.to_string())
}

/// Read a 2-D `.npy` as `f64`, accepting `float32` files as well.
fn read_matrix_f64(path: &Path) -> Result<Array2<f64>> {
    match read_npy::<_, Array2<f64>>(path) {
        Ok(arr) => Ok(arr),
        Err(ReadNpyError::WrongDescriptor(_)) => read_npy::<_, Array2<f32>>(path)
            .map(|arr| arr.mapv(f64::from))
            .map_err(|e| npy_error(path, e)),
        Err(e) => Err(npy_error(path, e)),
    }
}

/// Read a 2-D `.npy` as `f32`, narrowing `float64` files.
fn read_matrix_f32(path: &Path) -> Result<Array2<f32>> {
    match read_npy::<_, Array2<f32>>(path) {
        Ok(arr) => Ok(arr),
        Err(ReadNpyError::WrongDescriptor(_)) => read_npy::<_, Array2<f64>>(path)
            .map(|arr| arr.mapv(|v| v as f32))
            .map_err(|e| npy_error(path, e)),
        Err(e) => Err(npy_error(path, e)),
    }
}

/// Load the `[nROI x 2]` classification table.
pub fn load_classification(path: &Path) -> Result<Classification> {
    let table = read_matrix_f64(path)?;
    let shape = table.dim();
    Classification::new(table).ok_or_else(|| {
        S2pError::data_load(path, format!("expected 2 columns, got shape {shape:?}"))
    })
}

// ---------------------------------------------------------------------------
// Lazily loaded trace matrices
// ---------------------------------------------------------------------------

/// Source of the full `[nROI x nTime]` trace matrices of a plane.
pub trait TraceSource: Send {
    fn load(&self, plane_dir: &Path, kind: TraceKind) -> Result<Array2<f32>>;
}

/// Reads traces from the plane directory's `.npy` files.
#[derive(Debug, Clone)]
pub struct NpyTraceSource {
    pub fluorescence_file: String,
    pub spikes_file: String,
}

impl NpyTraceSource {
    pub fn from_config(config: &DatasetConfig) -> Self {
        Self {
            fluorescence_file: config.fluorescence_file.clone(),
            spikes_file: config.spikes_file.clone(),
        }
    }

    fn file_name(&self, kind: TraceKind) -> &str {
        match kind {
            TraceKind::Fluorescence => &self.fluorescence_file,
            TraceKind::Spikes => &self.spikes_file,
        }
    }
}

impl Default for NpyTraceSource {
    fn default() -> Self {
        Self::from_config(&DatasetConfig::default())
    }
}

impl TraceSource for NpyTraceSource {
    fn load(&self, plane_dir: &Path, kind: TraceKind) -> Result<Array2<f32>> {
        let path = plane_dir.join(self.file_name(kind));
        debug!("reading {kind} matrix from {}", path.display());
        read_matrix_f32(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use ndarray_npy::write_npy;

    #[test]
    fn plane_names_need_numeric_suffix() {
        assert_eq!(plane_number("plane0"), Some(0));
        assert_eq!(plane_number("plane12"), Some(12));
        assert_eq!(plane_number("plane"), None);
        assert_eq!(plane_number("plane1_old"), None);
        assert_eq!(plane_number("combined"), None);
    }

    #[test]
    fn discovery_sorts_numerically_and_skips_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["plane10", "plane2", "plane0", "combined"] {
            std::fs::create_dir(dir.path().join(name)).unwrap();
        }
        std::fs::write(dir.path().join("plane3"), b"not a dir").unwrap();

        let planes = discover_planes(dir.path(), PlaneOrder::Numeric).unwrap();
        let names: Vec<_> = planes
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["plane0", "plane2", "plane10"]);

        let unordered = discover_planes(dir.path(), PlaneOrder::Enumeration).unwrap();
        assert_eq!(unordered.len(), 3);
    }

    #[test]
    fn options_parse_mean_image_and_keep_extra_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ops1.json");
        std::fs::write(
            &path,
            r#"[{ "meanImg": [[1, 2, 3], [4, 5, 6]], "aspect": 1.0, "fs": 30.0 }]"#,
        )
        .unwrap();
        let ops = load_options(&path).unwrap();
        assert_eq!(ops[0].mean_image, array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert_eq!(ops[0].aspect_ratio, AspectRatio::Scalar(1.0));
        assert_eq!(ops[0].extra.get("fs"), Some(&JsonValue::from(30.0)));
    }

    #[test]
    fn ragged_mean_image_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ops1.json");
        std::fs::write(&path, r#"[{ "meanImg": [[1, 2], [3]], "aspect": 1.0 }]"#).unwrap();
        let err = load_options(&path).unwrap_err();
        assert!(matches!(err, S2pError::DataLoad { .. }), "{err}");
    }

    #[test]
    fn classification_accepts_float32_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("iscell.npy");
        write_npy(&path, &array![[1.0f32, 0.75], [0.0, 0.5]]).unwrap();
        let c = load_classification(&path).unwrap();
        assert_eq!(c.probabilities().to_vec(), vec![0.75, 0.5]);
    }

    #[test]
    fn classification_with_wrong_width_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("iscell.npy");
        write_npy(&path, &array![[1.0f64, 0.75, 3.0]]).unwrap();
        assert!(matches!(
            load_classification(&path),
            Err(S2pError::DataLoad { .. })
        ));
    }

    #[test]
    fn npy_trace_source_narrows_f64() {
        let dir = tempfile::tempdir().unwrap();
        write_npy(dir.path().join("spks.npy"), &array![[0.5f64, 1.5], [2.0, 0.0]]).unwrap();
        let source = NpyTraceSource::default();
        let spikes = source.load(dir.path(), TraceKind::Spikes).unwrap();
        assert_eq!(spikes, array![[0.5f32, 1.5], [2.0, 0.0]]);

        let missing = source.load(dir.path(), TraceKind::Fluorescence);
        assert!(matches!(missing, Err(S2pError::DataLoad { .. })));
    }
}
