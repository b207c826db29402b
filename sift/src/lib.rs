//! Synthetic CMB and Sunyaev-Zel'dovich sky simulation
//!
//! This crate draws flat-sky Gaussian realizations of the CMB and of the
//! kinetic and thermal SZ secondaries, recovers small-scale CMB anisotropy
//! by constrained inpainting, converts tSZ temperature maps to Compton-y,
//! and samples everything into the fiducial parameter files used to train
//! and validate foreground removal.

pub mod algo;
pub mod config;
pub mod cosmology;
pub mod flatsky;
pub mod inpaint;
pub mod io;
pub mod sims;
pub mod spectral;

// Re-exports for easier access
pub use config::{ConfigError, SimulationConfig};
pub use cosmology::{PowerSpectrumSolver, TabulatedSolver, TemplateSolver};
pub use flatsky::{CmbSkyModel, FourierGrid, MapParams};
pub use io::{ParameterStore, RunMetadata};
pub use sims::{
    AnisotropyExtractor, BuildError, ComptonYSolver, FieldSynthesizer, ParameterFileBuilder,
    ParameterMatrix, ParameterRow,
};
pub use spectral::{classical_tsz_brightness, differential_brightness, SI};
