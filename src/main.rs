use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use s2p_reader::{DatasetConfig, PlaneDataset, Selector};

/// Summarise a suite2p output directory.
#[derive(Parser)]
#[command(name = "s2p-inspect", version, about)]
struct Cli {
    /// Recording directory that contains the `suite2p` folder.
    root: PathBuf,

    /// JSON file overriding file names and reader behaviour.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Only inspect this plane.
    #[arg(long)]
    plane: Option<usize>,

    /// ROI selector, e.g. `iscell` or `iscell_p_larger_than:0.5`.
    #[arg(long)]
    select: Option<Selector>,

    /// Also load the trace matrices and report their shapes.
    #[arg(long)]
    traces: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => DatasetConfig::from_json_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => DatasetConfig::default(),
    };
    let mut ds = PlaneDataset::with_config(&cli.root, config)
        .with_context(|| format!("opening {}", cli.root.display()))?;
    println!("{ds}");

    let planes: Vec<usize> = match cli.plane {
        Some(p) => vec![p],
        None => (0..ds.plane_count()).collect(),
    };
    for plane in planes {
        ds.set_current_plane(plane)?;
        if let Some(selector) = cli.select {
            ds.select(selector)?;
        }
        let image = ds.mean_image()?;
        println!(
            "plane {plane}: {} of {} ROIs selected, mean image {}x{}, aspect {}",
            ds.roi_count()?,
            ds.roi_count_total()?,
            image.nrows(),
            image.ncols(),
            ds.aspect_ratio()?
        );
        if cli.traces {
            let f = ds.fluorescence().context("loading fluorescence")?;
            let s = ds.spikes().context("loading spikes")?;
            println!(
                "  F {}x{}, spks {}x{}",
                f.nrows(),
                f.ncols(),
                s.nrows(),
                s.ncols()
            );
        }
    }
    Ok(())
}
