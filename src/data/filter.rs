use std::fmt;
use std::str::FromStr;

use super::model::Classification;
use crate::error::S2pError;

// ---------------------------------------------------------------------------
// Selector – classification-based ROI selection policies
// ---------------------------------------------------------------------------

/// A named policy that picks ROIs from a plane's classification table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Selector {
    /// Flag column equals 1.
    IsCell,
    /// Flag column equals 0.
    IsNotCell,
    /// Probability strictly greater than the threshold.
    ProbabilityAbove(f64),
    /// Probability strictly smaller than the threshold.
    ProbabilityBelow(f64),
}

/// Selector names as accepted by [`Selector::from_name`].
pub const SELECTOR_NAMES: [&str; 4] = [
    "iscell",
    "isnotcell",
    "iscell_p_larger_than",
    "iscell_p_smaller_than",
];

impl Selector {
    /// Build a selector from its string name.
    ///
    /// * `Ok(Some(_))` – a known selector
    /// * `Ok(None)` – the name is not a known selector
    /// * `Err(InvalidArgument)` – a threshold selector without a threshold
    pub fn from_name(name: &str, threshold: Option<f64>) -> Result<Option<Self>, S2pError> {
        let need_threshold = || {
            threshold.ok_or_else(|| {
                S2pError::InvalidArgument(format!("selector '{name}' requires a threshold"))
            })
        };
        let selector = match name {
            "iscell" => Selector::IsCell,
            "isnotcell" => Selector::IsNotCell,
            "iscell_p_larger_than" => Selector::ProbabilityAbove(need_threshold()?),
            "iscell_p_smaller_than" => Selector::ProbabilityBelow(need_threshold()?),
            _ => return Ok(None),
        };
        Ok(Some(selector))
    }

    /// Indices (ascending) of the ROIs this selector keeps.
    pub fn apply(&self, classification: &Classification) -> Vec<usize> {
        match *self {
            Selector::IsCell => indices_where(classification.flags().iter(), |f| f == 1.0),
            Selector::IsNotCell => indices_where(classification.flags().iter(), |f| f == 0.0),
            Selector::ProbabilityAbove(t) => {
                indices_where(classification.probabilities().iter(), |p| p > t)
            }
            Selector::ProbabilityBelow(t) => {
                indices_where(classification.probabilities().iter(), |p| p < t)
            }
        }
    }
}

fn indices_where<'a>(values: impl Iterator<Item = &'a f64>, keep: impl Fn(f64) -> bool) -> Vec<usize> {
    values
        .enumerate()
        .filter(|(_, v)| keep(**v))
        .map(|(i, _)| i)
        .collect()
}

/// Parses the threshold-free names. `"iscell_p_larger_than:0.5"` carries its
/// threshold after a colon.
impl FromStr for Selector {
    type Err = S2pError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, threshold) = match s.split_once(':') {
            Some((name, t)) => {
                let t = t.trim().parse::<f64>().map_err(|_| {
                    S2pError::InvalidArgument(format!("'{t}' is not a valid threshold"))
                })?;
                (name.trim(), Some(t))
            }
            None => (s.trim(), None),
        };
        Selector::from_name(name, threshold)?.ok_or_else(|| {
            S2pError::InvalidArgument(format!(
                "unknown selector '{name}' (expected one of {})",
                SELECTOR_NAMES.join(", ")
            ))
        })
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::IsCell => write!(f, "that Suite2p classified as iscell"),
            Selector::IsNotCell => write!(f, "that Suite2p classified as NOT iscell"),
            Selector::ProbabilityAbove(t) => {
                write!(f, "that Suite2p classified as iscell with a probability > {t}")
            }
            Selector::ProbabilityBelow(t) => {
                write!(f, "that Suite2p classified as iscell with a probability < {t}")
            }
        }
    }
}
