//! Fiducial parameter file generator
//!
//! Simulates a CMB+noise map, kSZ and tSZ maps at the requested resolution,
//! extracts CMB anisotropy amplitudes by inpainting and writes the sampled
//! `(R, 5)` parameter matrix to `<project root>/files/parameter_file_<R>.npy`.
//!
//! Usage:
//! ```
//! cargo run --release --bin parameter_file -- --realizations 100 --seed 40
//! ```

use std::path::PathBuf;

use clap::Parser;
use log::info;
use sift::cosmology::PowerSpectrumSolver;
use sift::sims::CompositeMapMode;
use sift::{
    ParameterFileBuilder, ParameterStore, SimulationConfig, TabulatedSolver, TemplateSolver,
};

/// Command-line arguments for parameter file generation
#[derive(Parser, Debug)]
#[command(author, version, about = "Build a fiducial CMB/kSZ/tSZ parameter file")]
struct Args {
    /// Pixel resolution (and beam FWHM) in arcmin
    #[arg(short, long, default_value_t = 3.0)]
    resolution: f64,

    /// Number of Monte Carlo realizations (rows)
    #[arg(short = 'n', long, default_value_t = 100)]
    realizations: usize,

    /// Master random seed
    #[arg(short, long, default_value_t = 40)]
    seed: u64,

    /// JSON configuration overriding the fiducial settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write into this directory instead of <project root>/files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// CAMB total Cl table (L TT EE BB TE in µK²) replacing the built-in template
    #[arg(long)]
    spectrum: Option<PathBuf>,

    /// Draw a new CMB+noise map for every realization instead of reusing one
    #[arg(long, default_value_t = false)]
    per_realization_maps: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SimulationConfig::from_json_file(path)?,
        None => SimulationConfig::default(),
    };
    if args.per_realization_maps {
        config.inpainting.composite_map = CompositeMapMode::PerRealization;
    }
    config.validate(args.resolution)?;

    let store = match &args.output_dir {
        Some(dir) => ParameterStore::with_path(dir.clone(), &config.output.prefix),
        None => ParameterStore::discover(&config.output)?,
    };

    let solver: Box<dyn PowerSpectrumSolver> = match &args.spectrum {
        Some(path) => {
            info!("Using tabulated spectrum {}", path.display());
            Box::new(TabulatedSolver::from_file(path)?)
        }
        None => Box::new(TemplateSolver),
    };

    let builder = ParameterFileBuilder::new(config, solver);
    let path = builder.build_and_save(args.resolution, args.realizations, args.seed, &store)?;
    println!("Wrote {}", path.display());

    Ok(())
}
