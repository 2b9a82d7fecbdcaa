use std::path::Path;

use anyhow::{Context, Result};
use ndarray::{Array2, Axis};
use ndarray_npy::write_npy;
use serde_json::json;

use crate::rng::SimpleRng;

// ---------------------------------------------------------------------------
// In-memory description of one plane's pipeline output
// ---------------------------------------------------------------------------

/// Contents written for one plane by [`write_dataset`].
#[derive(Debug, Clone)]
pub struct SamplePlane {
    pub mean_image: Array2<f64>,
    pub aspect: f64,
    /// `[row, column]` per ROI.
    pub med: Vec<[f64; 2]>,
    /// `[nROI x 2]`: flag, probability.
    pub iscell: Array2<f64>,
    pub fluorescence: Array2<f32>,
    pub spikes: Array2<f32>,
}

/// Write `<root>/suite2p/` with one `plane<N>` folder per entry.
pub fn write_dataset(root: &Path, planes: &[SamplePlane]) -> Result<()> {
    let s2p_root = root.join("suite2p");
    std::fs::create_dir_all(&s2p_root)
        .with_context(|| format!("creating {}", s2p_root.display()))?;

    let ops: Vec<_> = planes
        .iter()
        .map(|p| {
            let rows: Vec<Vec<f64>> = p.mean_image.outer_iter().map(|r| r.to_vec()).collect();
            json!({
                "meanImg": rows,
                "aspect": p.aspect,
                "Ly": p.mean_image.nrows(),
                "Lx": p.mean_image.ncols(),
                "nframes": p.fluorescence.ncols(),
            })
        })
        .collect();
    let ops_path = s2p_root.join("ops1.json");
    std::fs::write(&ops_path, serde_json::to_string(&ops)?)
        .with_context(|| format!("writing {}", ops_path.display()))?;

    for (i, plane) in planes.iter().enumerate() {
        let dir = s2p_root.join(format!("plane{i}"));
        std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

        let stat: Vec<_> = plane.med.iter().map(|m| json!({ "med": m })).collect();
        std::fs::write(dir.join("stat.json"), serde_json::to_string(&stat)?)
            .context("writing stat.json")?;
        write_npy(dir.join("iscell.npy"), &plane.iscell).context("writing iscell.npy")?;
        write_npy(dir.join("F.npy"), &plane.fluorescence).context("writing F.npy")?;
        write_npy(dir.join("spks.npy"), &plane.spikes).context("writing spks.npy")?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Synthetic data
// ---------------------------------------------------------------------------

/// Box-Muller transform for normal distribution
fn gauss(rng: &mut SimpleRng, mean: f64, std_dev: f64) -> f64 {
    let u1 = rng.next_f64().max(1e-15);
    let u2 = rng.next_f64();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std_dev * z
}

/// Generate a plane of `n_rois` ROIs imaged for `n_frames` frames on a
/// `ly x lx` field of view.
///
/// Spikes are sparse random events; fluorescence is the spike train
/// convolved with an exponential calcium kernel plus baseline and noise.
pub fn synthetic_plane(
    rng: &mut SimpleRng,
    n_rois: usize,
    n_frames: usize,
    (ly, lx): (usize, usize),
) -> SamplePlane {
    let med: Vec<[f64; 2]> = (0..n_rois)
        .map(|_| {
            [
                (rng.next_f64() * ly as f64).floor(),
                (rng.next_f64() * lx as f64).floor(),
            ]
        })
        .collect();

    let mut mean_image = Array2::from_elem((ly, lx), 100.0);
    for &[row, col] in &med {
        for ((r, c), px) in mean_image.indexed_iter_mut() {
            let d2 = (r as f64 - row).powi(2) + (c as f64 - col).powi(2);
            *px += 400.0 * (-d2 / 18.0).exp();
        }
    }

    let mut iscell = Array2::zeros((n_rois, 2));
    for mut row in iscell.axis_iter_mut(Axis(0)) {
        let p = rng.next_f64();
        row[0] = if p > 0.5 { 1.0 } else { 0.0 };
        row[1] = p;
    }

    let decay = (-1.0f64 / 10.0).exp();
    let mut spikes = Array2::<f32>::zeros((n_rois, n_frames));
    let mut fluorescence = Array2::<f32>::zeros((n_rois, n_frames));
    for roi in 0..n_rois {
        let rate = 0.01 + 0.05 * iscell[[roi, 1]];
        let mut calcium = 0.0f64;
        for t in 0..n_frames {
            let event = if rng.next_f64() < rate {
                1.0 + rng.next_f64() * 4.0
            } else {
                0.0
            };
            calcium = calcium * decay + event;
            spikes[[roi, t]] = event as f32;
            fluorescence[[roi, t]] = (200.0 + 50.0 * calcium + gauss(rng, 0.0, 5.0)) as f32;
        }
    }

    SamplePlane {
        mean_image,
        aspect: 1.0,
        med,
        iscell,
        fluorescence,
        spikes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PlaneDataset;

    #[test]
    fn synthetic_planes_have_consistent_shapes() {
        let mut rng = SimpleRng::new(42);
        let plane = synthetic_plane(&mut rng, 7, 50, (32, 24));
        assert_eq!(plane.med.len(), 7);
        assert_eq!(plane.iscell.dim(), (7, 2));
        assert_eq!(plane.fluorescence.dim(), (7, 50));
        assert_eq!(plane.spikes.dim(), (7, 50));
        assert_eq!(plane.mean_image.dim(), (32, 24));
        assert!(plane.med.iter().all(|m| m[0] < 32.0 && m[1] < 24.0));
    }

    #[test]
    fn written_dataset_opens() {
        let dir = tempfile::tempdir().unwrap();
        let mut rng = SimpleRng::new(1);
        let planes = vec![
            synthetic_plane(&mut rng, 5, 20, (16, 16)),
            synthetic_plane(&mut rng, 3, 20, (16, 16)),
        ];
        write_dataset(dir.path(), &planes).unwrap();

        let mut ds = PlaneDataset::open(dir.path()).unwrap();
        assert_eq!(ds.plane_count(), 2);
        assert_eq!(ds.roi_count().unwrap(), 5);
        assert_eq!(ds.mean_image().unwrap().dim(), (16, 16));
        assert_eq!(ds.fluorescence().unwrap(), planes[0].fluorescence);
        ds.set_current_plane(1).unwrap();
        assert_eq!(ds.spikes().unwrap(), planes[1].spikes);
    }
}
