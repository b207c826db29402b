//! Phenomenological ΛCDM temperature spectrum.
//!
//! Stands in for a Boltzmann code when none is available. The shape is a
//! Sachs-Wolfe plateau with a damping tail plus Gaussian acoustic peaks at
//! the fiducial positions; the primordial amplitude, tilt and reionization
//! optical depth rescale it. Other parameters do not move the peaks. Use
//! [`TabulatedSolver`](super::TabulatedSolver) with real solver output when
//! the spectrum shape matters.

use super::{
    AngularPowerSpectrum, CosmologyError, CosmologyParams, PowerSpectrumSolver, SpectrumField,
};
use crate::spectral::SI;

/// Fiducial amplitude the template is normalized to
const REFERENCE_A_S: f64 = 2e-9;
const REFERENCE_TAU: f64 = 0.06;
const REFERENCE_N_S: f64 = 0.965;

/// Multipole where the tilt correction vanishes
const PIVOT_ELL: f64 = 700.0;

/// Low-ℓ plateau in µK² and the scale/shape of its damping
const PLATEAU_UK2: f64 = 1050.0;
const DAMPING_ELL: f64 = 1200.0;
const DAMPING_POWER: f64 = 1.25;

/// Acoustic peaks: (centre ℓ, height in µK², width in ℓ)
const PEAKS: [(f64, f64, f64); 7] = [
    (220.0, 4800.0, 75.0),
    (537.0, 1600.0, 70.0),
    (810.0, 1750.0, 75.0),
    (1130.0, 900.0, 80.0),
    (1430.0, 550.0, 85.0),
    (1725.0, 330.0, 90.0),
    (2030.0, 180.0, 95.0),
];

/// Template TT solver
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateSolver;

impl TemplateSolver {
    /// `D_ℓ` in µK² of the fiducial template before amplitude rescaling
    fn fiducial_dl_uk2(ell: f64) -> f64 {
        let plateau = PLATEAU_UK2 * (-(ell / DAMPING_ELL).powf(DAMPING_POWER)).exp();
        let peaks: f64 = PEAKS
            .iter()
            .map(|&(centre, height, width)| {
                let z = (ell - centre) / width;
                height * (-0.5 * z * z).exp()
            })
            .sum();
        plateau + peaks
    }
}

impl PowerSpectrumSolver for TemplateSolver {
    fn total_spectra(
        &self,
        cosmology: &CosmologyParams,
        lmax: usize,
    ) -> Result<AngularPowerSpectrum, CosmologyError> {
        if cosmology.a_s.is_nan() || cosmology.a_s <= 0.0 {
            return Err(CosmologyError::InvalidParameter(format!(
                "a_s must be positive, got {}",
                cosmology.a_s
            )));
        }
        if cosmology.tau < 0.0 {
            return Err(CosmologyError::InvalidParameter(format!(
                "tau must be non-negative, got {}",
                cosmology.tau
            )));
        }

        let amplitude = cosmology.a_s / REFERENCE_A_S
            * (-2.0 * (cosmology.tau - REFERENCE_TAU)).exp();
        let to_dimensionless = 1.0 / (SI::T_CMB * 1e6).powi(2);

        let dl = (0..=lmax)
            .map(|l| {
                let ell = l as f64;
                if l < 2 {
                    return 0.0;
                }
                let tilt = (ell / PIVOT_ELL).powf(cosmology.n_s - REFERENCE_N_S);
                amplitude * tilt * Self::fiducial_dl_uk2(ell) * to_dimensionless
            })
            .collect();

        let mut spectra = AngularPowerSpectrum::new();
        spectra.insert(SpectrumField::TT, dl);
        Ok(spectra)
    }
}
