use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use s2p_reader::rng::SimpleRng;
use s2p_reader::sample::{synthetic_plane, write_dataset};

/// Write a synthetic suite2p output directory.
#[derive(Parser)]
#[command(name = "generate_sample", about)]
struct Args {
    /// Directory to create `suite2p/` in.
    #[arg(default_value = "sample_recording")]
    output: PathBuf,

    #[arg(long, default_value_t = 2)]
    planes: usize,

    #[arg(long, default_value_t = 40)]
    rois: usize,

    #[arg(long, default_value_t = 1000)]
    frames: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut rng = SimpleRng::new(args.seed);

    let planes: Vec<_> = (0..args.planes)
        .map(|_| synthetic_plane(&mut rng, args.rois, args.frames, (128, 128)))
        .collect();
    write_dataset(&args.output, &planes)?;

    println!(
        "Wrote {} plane(s) of {} ROIs ({} frames each) to {}",
        args.planes,
        args.rois,
        args.frames,
        args.output.join("suite2p").display()
    );
    Ok(())
}
