/// Data layer: record types, loading, and ROI selection.
///
/// Architecture:
/// ```text
///  suite2p/ops1.json   plane<N>/stat.json, iscell.npy
///        │                      │
///        ▼                      ▼
///   ┌──────────┐
///   │  loader   │  discover planes → PlaneMetadata (eager)
///   └──────────┘   TraceSource → F / spks matrices (lazy)
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  classification table → selected ROI indices
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
