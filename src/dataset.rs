use std::fmt;
use std::path::{Path, PathBuf};

use log::debug;
use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::config::DatasetConfig;
use crate::data::filter::Selector;
use crate::data::loader::{load_metadata, NpyTraceSource, PlaneMetadata, TraceSource};
use crate::data::model::{AspectRatio, Classification, PlaneOptions, RoiStat, TraceKind};
use crate::error::{Result, S2pError};
use crate::events::{DatasetEvent, EventSink, LogSink};
use crate::rng::SimpleRng;

// ---------------------------------------------------------------------------
// Per-plane trace cache
// ---------------------------------------------------------------------------

/// Full (unfiltered) trace matrices of one plane, filled on first access.
#[derive(Default)]
struct TraceCache {
    fluorescence: Option<Array2<f32>>,
    spikes: Option<Array2<f32>>,
}

impl TraceCache {
    fn get(&self, kind: TraceKind) -> Option<&Array2<f32>> {
        match kind {
            TraceKind::Fluorescence => self.fluorescence.as_ref(),
            TraceKind::Spikes => self.spikes.as_ref(),
        }
    }

    fn slot(&mut self, kind: TraceKind) -> &mut Option<Array2<f32>> {
        match kind {
            TraceKind::Fluorescence => &mut self.fluorescence,
            TraceKind::Spikes => &mut self.spikes,
        }
    }
}

// ---------------------------------------------------------------------------
// PlaneDataset
// ---------------------------------------------------------------------------

/// Stateful reader over a suite2p output directory.
///
/// Metadata of every plane is loaded when the dataset is opened. The
/// fluorescence and spike matrices are read on first access per plane and
/// kept for the lifetime of the dataset. All accessors act on the current
/// plane and on that plane's current ROI selection.
pub struct PlaneDataset {
    root_path: PathBuf,
    config: DatasetConfig,
    planes: Vec<PlaneMetadata>,
    /// Current ROI selection, one list per plane.
    selected: Vec<Vec<usize>>,
    caches: Vec<TraceCache>,
    current_plane: usize,
    shuffle_traces: bool,
    rng: SimpleRng,
    source: Box<dyn TraceSource>,
    events: Box<dyn EventSink>,
}

impl PlaneDataset {
    /// Open `<root>/suite2p` with the default file layout.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        Self::with_config(root, DatasetConfig::default())
    }

    /// Open a dataset with explicit naming and behaviour settings.
    pub fn with_config(root: impl AsRef<Path>, config: DatasetConfig) -> Result<Self> {
        let root_path = root.as_ref().to_path_buf();
        let planes = load_metadata(&root_path, &config)?;
        debug!(
            "opened {} with {} plane(s)",
            root_path.display(),
            planes.len()
        );

        let selected = planes.iter().map(|p| (0..p.roi_count()).collect()).collect();
        let caches = planes.iter().map(|_| TraceCache::default()).collect();
        let rng = match config.shuffle_seed {
            Some(seed) => SimpleRng::new(seed),
            None => SimpleRng::from_clock(),
        };
        let source = Box::new(NpyTraceSource::from_config(&config));

        Ok(Self {
            root_path,
            config,
            planes,
            selected,
            caches,
            current_plane: 0,
            shuffle_traces: false,
            rng,
            source,
            events: Box::new(LogSink),
        })
    }

    /// Replace where trace matrices are read from.
    pub fn with_trace_source(mut self, source: Box<dyn TraceSource>) -> Self {
        self.source = source;
        self
    }

    /// Replace the receiver of dataset events (default: [`LogSink`]).
    pub fn with_event_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    // -- Dataset-wide properties --

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    /// Number of imaging planes found.
    pub fn plane_count(&self) -> usize {
        self.planes.len()
    }

    pub fn plane_paths(&self) -> Vec<&Path> {
        self.planes.iter().map(|p| p.path.as_path()).collect()
    }

    // -- Plane selection --

    pub fn current_plane(&self) -> usize {
        self.current_plane
    }

    /// Switch the plane all other accessors act on.
    pub fn set_current_plane(&mut self, plane: usize) -> Result<()> {
        if plane >= self.planes.len() {
            return Err(S2pError::IndexOutOfRange {
                what: "plane",
                index: plane,
                len: self.planes.len(),
            });
        }
        self.current_plane = plane;
        self.events.emit(&DatasetEvent::PlaneSelected { plane });
        Ok(())
    }

    fn plane(&self) -> Result<&PlaneMetadata> {
        self.planes
            .get(self.current_plane)
            .ok_or_else(S2pError::no_planes)
    }

    // -- Image / metadata --

    /// Mean image of the current plane.
    pub fn mean_image(&self) -> Result<ArrayView2<'_, f64>> {
        Ok(self.plane()?.options.mean_image.view())
    }

    pub fn aspect_ratio(&self) -> Result<&AspectRatio> {
        Ok(&self.plane()?.options.aspect_ratio)
    }

    pub fn classification(&self) -> Result<&Classification> {
        Ok(&self.plane()?.classification)
    }

    /// Full options record of the current plane, including fields the
    /// reader does not interpret.
    pub fn options(&self) -> Result<&PlaneOptions> {
        Ok(&self.plane()?.options)
    }

    /// ROI records of the current plane in file order, unaffected by the
    /// selection.
    pub fn roi_records(&self) -> Result<&[RoiStat]> {
        Ok(&self.plane()?.rois)
    }

    // -- ROI selection --

    /// ROI indices currently selected on this plane, in selection order.
    pub fn selected_neurons(&self) -> Result<&[usize]> {
        self.plane()?;
        Ok(&self.selected[self.current_plane])
    }

    /// Replace the selection of the current plane.
    ///
    /// Order and duplicates are kept as given. Every id must be a valid ROI
    /// index on this plane; otherwise the selection is left unchanged.
    pub fn set_selected_neurons(&mut self, ids: Vec<usize>) -> Result<()> {
        check_ids(&ids, self.plane()?.roi_count())?;
        self.selected[self.current_plane] = ids;
        Ok(())
    }

    /// Select every ROI of the current plane again.
    pub fn reset_selection(&mut self) -> Result<()> {
        let total = self.plane()?.roi_count();
        self.selected[self.current_plane] = (0..total).collect();
        Ok(())
    }

    /// Number of selected ROIs on the current plane.
    pub fn roi_count(&self) -> Result<usize> {
        Ok(self.selected_neurons()?.len())
    }

    /// Number of ROIs detected on the current plane, selected or not.
    pub fn roi_count_total(&self) -> Result<usize> {
        Ok(self.plane()?.roi_count())
    }

    /// Column positions of the selected ROIs.
    pub fn x(&self) -> Result<Array1<i64>> {
        let plane = self.plane()?;
        gather(&plane.coords.x, &self.selected[self.current_plane])
    }

    /// Row positions of the selected ROIs.
    pub fn y(&self) -> Result<Array1<i64>> {
        let plane = self.plane()?;
        gather(&plane.coords.y, &self.selected[self.current_plane])
    }

    /// Replace the current selection using a named classification policy.
    ///
    /// Unknown names leave the selection untouched, unless
    /// `strict_selectors` is set in the config.
    pub fn select_neurons(&mut self, selector: &str, threshold: Option<f64>) -> Result<()> {
        match Selector::from_name(selector, threshold)? {
            Some(selector) => self.select(selector),
            None if self.config.strict_selectors => Err(S2pError::InvalidArgument(format!(
                "unknown selector '{selector}'"
            ))),
            None => {
                debug!("ignoring unknown selector '{selector}'");
                Ok(())
            }
        }
    }

    /// Replace the current selection with the ROIs `selector` keeps.
    pub fn select(&mut self, selector: Selector) -> Result<()> {
        let ids = selector.apply(&self.plane()?.classification);
        let count = ids.len();
        self.selected[self.current_plane] = ids;
        self.events.emit(&DatasetEvent::SelectionChanged {
            plane: self.current_plane,
            description: selector.to_string(),
            count,
        });
        Ok(())
    }

    // -- Shuffling --

    pub fn shuffle_traces(&self) -> bool {
        self.shuffle_traces
    }

    /// When set, every returned trace row is independently permuted in time.
    pub fn set_shuffle_traces(&mut self, shuffle: bool) {
        self.shuffle_traces = shuffle;
    }

    // -- Trace matrices --

    /// `[selected ROI x time]` fluorescence of the current plane.
    pub fn fluorescence(&mut self) -> Result<Array2<f32>> {
        self.traces(TraceKind::Fluorescence)
    }

    /// `[selected ROI x time]` deconvolved spikes of the current plane.
    pub fn spikes(&mut self) -> Result<Array2<f32>> {
        self.traces(TraceKind::Spikes)
    }

    fn traces(&mut self, kind: TraceKind) -> Result<Array2<f32>> {
        self.ensure_loaded(kind)?;
        let plane = self.current_plane;
        let full = self.caches[plane]
            .get(kind)
            .ok_or_else(|| S2pError::InvalidState(format!("{kind} matrix not loaded")))?;
        let mut out = gather_rows(full, &self.selected[plane])?;

        if self.shuffle_traces {
            self.events.emit(&DatasetEvent::TracesShuffled { plane, kind });
            for mut row in out.rows_mut() {
                let mut values = row.to_vec();
                self.rng.shuffle(&mut values);
                row.assign(&Array1::from(values));
            }
        }
        Ok(out)
    }

    /// Read the full matrix of the current plane unless already cached.
    fn ensure_loaded(&mut self, kind: TraceKind) -> Result<()> {
        let plane_idx = self.current_plane;
        let plane = self
            .planes
            .get(plane_idx)
            .ok_or_else(S2pError::no_planes)?;
        let slot = self.caches[plane_idx].slot(kind);
        if slot.is_some() {
            return Ok(());
        }

        let matrix = self.source.load(&plane.path, kind)?;
        if matrix.nrows() != plane.roi_count() {
            return Err(S2pError::data_load(
                &plane.path,
                format!(
                    "{kind} matrix has {} rows for {} ROI(s)",
                    matrix.nrows(),
                    plane.roi_count()
                ),
            ));
        }
        self.events.emit(&DatasetEvent::TraceLoaded {
            plane: plane_idx,
            kind,
            rows: matrix.nrows(),
            cols: matrix.ncols(),
        });
        *slot = Some(matrix);
        Ok(())
    }
}

fn check_ids(ids: &[usize], len: usize) -> Result<()> {
    match ids.iter().find(|&&id| id >= len) {
        Some(&bad) => Err(S2pError::IndexOutOfRange {
            what: "ROI",
            index: bad,
            len,
        }),
        None => Ok(()),
    }
}

fn gather(values: &Array1<i64>, ids: &[usize]) -> Result<Array1<i64>> {
    check_ids(ids, values.len())?;
    Ok(values.select(Axis(0), ids))
}

/// Copy the rows at `ids` (in that order) into a new matrix.
fn gather_rows(matrix: &Array2<f32>, ids: &[usize]) -> Result<Array2<f32>> {
    check_ids(ids, matrix.nrows())?;
    Ok(matrix.select(Axis(0), ids))
}

impl fmt::Display for PlaneDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Suite2pData of {}\n* # of planes: {}",
            self.root_path.display(),
            self.planes.len()
        )
    }
}
