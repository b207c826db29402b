//! Monte Carlo pipeline producing the fiducial parameter file.
//!
//! Stages, leaf first:
//! * [`field`] draws CMB+noise, kSZ and tSZ temperature maps
//! * [`anisotropy`] recovers CMB anisotropy amplitudes by inpainting
//! * [`compton_y`] inverts the tSZ spectral law pixel by pixel
//! * [`parameter_file`] samples the maps and assembles the parameter matrix

pub mod anisotropy;
pub mod compton_y;
pub mod field;
pub mod parameter_file;

pub use anisotropy::{AnisotropyExtractor, CompositeMapMode};
pub use compton_y::{ComptonYError, ComptonYMap, ComptonYSolver, ConvergencePolicy};
pub use field::{CmbRealization, FieldSynthesizer};
pub use parameter_file::{
    local_amplitude, sample_coordinates, BuildError, ParameterFileBuilder, ParameterMatrix,
    ParameterRow, SampledCoordinates,
};
