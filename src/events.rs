use std::fmt;

use crate::data::model::TraceKind;

// ---------------------------------------------------------------------------
// Observable dataset events
// ---------------------------------------------------------------------------

/// Things a [`crate::PlaneDataset`] reports while it is being used.
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetEvent {
    PlaneSelected { plane: usize },
    SelectionChanged { plane: usize, description: String, count: usize },
    TraceLoaded { plane: usize, kind: TraceKind, rows: usize, cols: usize },
    /// Returned traces were permuted in time. Warning level.
    TracesShuffled { plane: usize, kind: TraceKind },
}

impl DatasetEvent {
    pub fn is_warning(&self) -> bool {
        matches!(self, DatasetEvent::TracesShuffled { .. })
    }
}

impl fmt::Display for DatasetEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetEvent::PlaneSelected { plane } => write!(f, "Selected plane {plane}"),
            DatasetEvent::SelectionChanged {
                plane,
                description,
                count,
            } => write!(f, "Plane {plane}: selecting {count} neurons {description}"),
            DatasetEvent::TraceLoaded {
                plane,
                kind,
                rows,
                cols,
            } => write!(f, "Loaded {kind} matrix for plane {plane} ({rows} x {cols})"),
            DatasetEvent::TracesShuffled { plane, kind } => write!(
                f,
                "{kind} data of plane {plane} is shuffled (per neuron) in time domain"
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Receiver for [`DatasetEvent`]s, injected into the dataset at construction.
pub trait EventSink: Send {
    fn emit(&self, event: &DatasetEvent);
}

/// Default sink: forwards events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: &DatasetEvent) {
        if event.is_warning() {
            log::warn!("{event}");
        } else {
            log::info!("{event}");
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_shuffle_is_a_warning() {
        let shuffled = DatasetEvent::TracesShuffled {
            plane: 0,
            kind: TraceKind::Spikes,
        };
        assert!(shuffled.is_warning());
        assert!(!DatasetEvent::PlaneSelected { plane: 1 }.is_warning());
        assert_eq!(
            shuffled.to_string(),
            "spike data of plane 0 is shuffled (per neuron) in time domain"
        );
    }
}
