//! Angular power spectra and the solvers that produce them.
//!
//! Solvers return total `D_ℓ = ℓ(ℓ+1)C_ℓ/2π` spectra, dimensionless in units
//! of `T_CMB²`. [`dl_to_cl`] converts those to `C_ℓ` in µK², the units the
//! map generator works in.

pub mod tabulated;
pub mod template;

use std::collections::BTreeMap;
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::spectral::SI;

pub use tabulated::TabulatedSolver;
pub use template::TemplateSolver;

/// Errors that can occur while obtaining power spectra
#[derive(Debug, Error)]
pub enum CosmologyError {
    #[error("Failed to read spectrum table {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed spectrum table at line {line}: {reason}")]
    Parse { line: usize, reason: String },
    #[error("Spectrum {0:?} is not provided by this solver")]
    MissingField(SpectrumField),
    #[error("Invalid cosmological parameter: {0}")]
    InvalidParameter(String),
}

/// Field combination a spectrum describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SpectrumField {
    TT,
    EE,
    BB,
    TE,
}

/// Cosmological model handed to a [`PowerSpectrumSolver`].
///
/// Defaults are the fiducial flat ΛCDM model with one massive neutrino used
/// for every generated parameter file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CosmologyParams {
    /// Hubble constant in km/s/Mpc
    pub h0: f64,
    /// Physical baryon density Ω_b h²
    pub ombh2: f64,
    /// Physical cold dark matter density Ω_c h²
    pub omch2: f64,
    /// Sum of neutrino masses in eV
    pub mnu: f64,
    /// Curvature density Ω_k
    pub omk: f64,
    /// Optical depth to reionization
    pub tau: f64,
    /// Primordial scalar amplitude
    pub a_s: f64,
    /// Scalar spectral index
    pub n_s: f64,
    /// Tensor-to-scalar ratio
    pub r: f64,
}

impl Default for CosmologyParams {
    fn default() -> Self {
        Self {
            h0: 67.5,
            ombh2: 0.022,
            omch2: 0.122,
            mnu: 0.06,
            omk: 0.0,
            tau: 0.06,
            a_s: 2e-9,
            n_s: 0.965,
            r: 0.0,
        }
    }
}

/// Power spectra keyed by field, each indexed by multipole `ℓ = 0..=lmax`.
///
/// The monopole of every stored spectrum is zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AngularPowerSpectrum {
    spectra: BTreeMap<SpectrumField, Vec<f64>>,
}

impl AngularPowerSpectrum {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a spectrum, removing its monopole.
    pub fn insert(&mut self, field: SpectrumField, mut values: Vec<f64>) {
        if let Some(monopole) = values.first_mut() {
            *monopole = 0.0;
        }
        self.spectra.insert(field, values);
    }

    pub fn get(&self, field: SpectrumField) -> Option<&[f64]> {
        self.spectra.get(&field).map(Vec::as_slice)
    }

    /// Like [`get`](Self::get) but reporting a missing field as an error
    pub fn require(&self, field: SpectrumField) -> Result<&[f64], CosmologyError> {
        self.get(field).ok_or(CosmologyError::MissingField(field))
    }

    pub fn fields(&self) -> impl Iterator<Item = SpectrumField> + '_ {
        self.spectra.keys().copied()
    }

    /// Apply `f` to every stored spectrum, keeping monopoles at zero.
    pub fn map(&self, f: impl Fn(&[f64]) -> Vec<f64>) -> Self {
        let mut out = Self::new();
        for (&field, values) in &self.spectra {
            out.insert(field, f(values));
        }
        out
    }
}

/// Source of theoretical CMB power spectra.
pub trait PowerSpectrumSolver: Send + Sync {
    /// Total (lensed, all-source) `D_ℓ` spectra for `ℓ = 0..=lmax`, in units of `T_CMB²`.
    fn total_spectra(
        &self,
        cosmology: &CosmologyParams,
        lmax: usize,
    ) -> Result<AngularPowerSpectrum, CosmologyError>;
}

/// Convert a dimensionless `D_ℓ` spectrum to `C_ℓ` in µK².
///
/// `C_ℓ = T_CMB² · D_ℓ · 10¹² / (ℓ(ℓ+1)/2π)` with the monopole set to zero.
pub fn dl_to_cl(dl: &[f64]) -> Vec<f64> {
    let scale = SI::T_CMB * SI::T_CMB * 1e12;
    dl.iter()
        .enumerate()
        .map(|(l, &d)| {
            if l == 0 {
                return 0.0;
            }
            let l = l as f64;
            scale * d / (l * (l + 1.0) / (2.0 * PI))
        })
        .collect()
}

/// Flat `D_ℓ = amplitude` for `ℓ = 0..=lmax`, monopole removed.
pub fn flat_dl(amplitude: f64, lmax: usize) -> Vec<f64> {
    let mut dl = vec![amplitude; lmax + 1];
    dl[0] = 0.0;
    dl
}
