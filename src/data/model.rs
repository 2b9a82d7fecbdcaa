use std::collections::BTreeMap;
use std::fmt;

use ndarray::{Array1, Array2, ArrayView1};
use serde::Deserialize;
use serde_json::Value as JsonValue;

// ---------------------------------------------------------------------------
// AspectRatio – the `aspect` field of a plane's options record
// ---------------------------------------------------------------------------

/// Pixel aspect ratio as stored by the pipeline: usually a single number,
/// occasionally one value per axis.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AspectRatio {
    Scalar(f64),
    PerAxis(Vec<f64>),
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AspectRatio::Scalar(v) => write!(f, "{v}"),
            AspectRatio::PerAxis(vs) => write!(f, "{vs:?}"),
        }
    }
}

// ---------------------------------------------------------------------------
// PlaneOptions – one entry of the shared options file
// ---------------------------------------------------------------------------

/// Per-plane options record with the fields the reader needs decoded.
#[derive(Debug, Clone)]
pub struct PlaneOptions {
    /// Mean image of the registered movie, `[Ly x Lx]`.
    pub mean_image: Array2<f64>,
    pub aspect_ratio: AspectRatio,
    /// Every other key of the record, untouched.
    pub extra: BTreeMap<String, JsonValue>,
}

// ---------------------------------------------------------------------------
// RoiStat – one entry of a plane's ROI list
// ---------------------------------------------------------------------------

/// ROI record. Only the median pixel position is interpreted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RoiStat {
    /// `[row, column]` of the ROI's median pixel.
    pub med: [f64; 2],
    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

impl RoiStat {
    pub fn row(&self) -> i64 {
        self.med[0] as i64
    }

    pub fn col(&self) -> i64 {
        self.med[1] as i64
    }
}

// ---------------------------------------------------------------------------
// Classification – the `[nROI x 2]` iscell table
// ---------------------------------------------------------------------------

/// Classifier output: column 0 is the cell flag, column 1 the probability.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    table: Array2<f64>,
}

impl Classification {
    /// Wrap a table. Returns `None` unless it has exactly two columns.
    pub fn new(table: Array2<f64>) -> Option<Self> {
        (table.ncols() == 2).then_some(Self { table })
    }

    pub fn flags(&self) -> ArrayView1<'_, f64> {
        self.table.column(0)
    }

    pub fn probabilities(&self) -> ArrayView1<'_, f64> {
        self.table.column(1)
    }

    /// Number of classified ROIs.
    pub fn len(&self) -> usize {
        self.table.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.table.nrows() == 0
    }
}

// ---------------------------------------------------------------------------
// TraceKind
// ---------------------------------------------------------------------------

/// The two lazily loaded `[nROI x nTime]` matrices of a plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceKind {
    Fluorescence,
    Spikes,
}

impl fmt::Display for TraceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceKind::Fluorescence => write!(f, "fluorescence"),
            TraceKind::Spikes => write!(f, "spike"),
        }
    }
}

// ---------------------------------------------------------------------------
// RoiCoordinates – x/y derived from the ROI list
// ---------------------------------------------------------------------------

/// Integer ROI centres of one plane: row → `y`, column → `x`.
#[derive(Debug, Clone, PartialEq)]
pub struct RoiCoordinates {
    pub x: Array1<i64>,
    pub y: Array1<i64>,
}

impl RoiCoordinates {
    pub fn from_stats(stats: &[RoiStat]) -> Self {
        Self {
            x: stats.iter().map(RoiStat::col).collect(),
            y: stats.iter().map(RoiStat::row).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}
