//! Constrained-realization inpainting of a masked disc.
//!
//! The map is split into an inner disc (the region to reconstruct) and a
//! surrounding annulus (the data the reconstruction is conditioned on).
//! Pixel covariances between the two regions are estimated once from
//! filtered CMB+noise simulations; each inpainting call then draws a fresh
//! simulation `t̃` and replaces the disc with
//!
//! ```text
//! t₁ = t̃₁ + Σ₁₂ Σ₂₂⁺ (t₂ − t̃₂)
//! ```
//!
//! a Gaussian draw of the disc conditioned on the observed annulus `t₂`.

pub mod covariance;
pub mod mask;

use ndarray::Array2;
use rand::Rng;
use thiserror::Error;

use crate::flatsky::CmbSkyModel;

pub use covariance::{build_covariance, CovarianceModel};
pub use mask::{MaskGeometry, MaskRadii};

/// Errors that can occur while building covariances or inpainting
#[derive(Debug, Error)]
pub enum InpaintError {
    #[error("Invalid mask radii: inner {inner} arcmin, outer {outer} arcmin")]
    InvalidRadii { inner: f64, outer: f64 },
    #[error("The {0} mask region contains no pixels")]
    EmptyRegion(&'static str),
    #[error("At least 2 simulations are needed for a covariance estimate, got {0}")]
    TooFewSimulations(usize),
    #[error("Annulus covariance could not be pseudo-inverted: {0}")]
    PseudoInverse(String),
    #[error("Map shape {found:?} does not match covariance grid {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("Inpainted values are not finite")]
    NonFinite,
    #[error("Probe pixel ({row}, {col}) lies outside the inpainted disc")]
    ProbeOutsideDisc { row: usize, col: usize },
}

/// Maps produced by one inpainting call
#[derive(Debug, Clone)]
pub struct InpaintResult {
    /// Constrained simulation: the fresh draw with its disc conditioned on the data
    pub inpainted_map: Array2<f64>,
    /// Filtered input map with its disc replaced by the constrained values
    pub input_inpainted: Array2<f64>,
    /// Filtered input map
    pub filtered_map: Array2<f64>,
}

/// Inpaint the masked disc of `map`.
///
/// # Arguments
/// * `map` - Unfiltered map in µK on the sky model's grid
/// * `sky` - Model used for the constrained draw and for filtering
/// * `covariance` - Disc/annulus covariance built from the same model
/// * `rng` - Random source for the constrained draw
pub fn inpaint<R: Rng + ?Sized>(
    map: &Array2<f64>,
    sky: &CmbSkyModel,
    covariance: &CovarianceModel,
    rng: &mut R,
) -> Result<InpaintResult, InpaintError> {
    let expected = sky.params().shape();
    if map.dim() != expected || covariance.geometry().shape() != expected {
        return Err(InpaintError::ShapeMismatch {
            expected: covariance.geometry().shape(),
            found: map.dim(),
        });
    }

    let filtered_map = sky.filter_map(map);
    let mut inpainted_map = sky.simulate_filtered(rng);

    let geometry = covariance.geometry();
    let data_annulus = geometry.annulus_values(&filtered_map);
    let sim_annulus = geometry.annulus_values(&inpainted_map);
    let sim_inner = geometry.inner_values(&inpainted_map);

    let constrained = sim_inner + covariance.projection() * (data_annulus - sim_annulus);
    if constrained.iter().any(|v| !v.is_finite()) {
        return Err(InpaintError::NonFinite);
    }

    let mut input_inpainted = filtered_map.clone();
    geometry.fill_inner(&mut input_inpainted, constrained.as_slice());
    geometry.fill_inner(&mut inpainted_map, constrained.as_slice());

    Ok(InpaintResult {
        inpainted_map,
        input_inpainted,
        filtered_map,
    })
}
