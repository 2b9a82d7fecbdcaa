//! Read access to suite2p calcium-imaging output.
//!
//! [`PlaneDataset`] opens a recording directory, loads the small per-plane
//! metadata (mean image, ROI positions, cell classification) immediately and
//! reads the large fluorescence and spike matrices on demand.
//!
//! ```no_run
//! use s2p_reader::PlaneDataset;
//!
//! let mut ds = PlaneDataset::open("/data/mouse01/session3")?;
//! ds.select_neurons("iscell", None)?;
//! let f = ds.fluorescence()?;
//! println!("{} cells x {} frames", f.nrows(), f.ncols());
//! # Ok::<(), s2p_reader::S2pError>(())
//! ```

pub mod config;
pub mod data;
pub mod dataset;
pub mod error;
pub mod events;
pub mod rng;
pub mod sample;

pub use config::{DatasetConfig, PlaneOrder};
pub use data::filter::Selector;
pub use data::loader::{NpyTraceSource, TraceSource};
pub use data::model::{AspectRatio, Classification, TraceKind};
pub use dataset::PlaneDataset;
pub use error::{Result, S2pError};
pub use events::{DatasetEvent, EventSink, LogSink};
