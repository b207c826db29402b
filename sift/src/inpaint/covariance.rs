//! Disc/annulus pixel covariance estimated from simulations.

use std::time::Instant;

use log::{debug, info};
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use super::{InpaintError, MaskGeometry, MaskRadii};
use crate::flatsky::CmbSkyModel;

/// Default relative cutoff on singular values when pseudo-inverting `Σ₂₂`
pub const DEFAULT_PINV_RCOND: f64 = 1e-12;

/// Conditioning operator of the disc on the annulus.
///
/// Holds `P = Σ₁₂ Σ₂₂⁺` together with the pixel selections it was built for.
/// Immutable once built; share it by reference between inpainting calls.
#[derive(Debug, Clone)]
pub struct CovarianceModel {
    geometry: MaskGeometry,
    projection: DMatrix<f64>,
    num_sims: usize,
}

impl CovarianceModel {
    pub fn geometry(&self) -> &MaskGeometry {
        &self.geometry
    }

    /// `Σ₁₂ Σ₂₂⁺`, shape `(n_disc, n_annulus)`
    pub fn projection(&self) -> &DMatrix<f64> {
        &self.projection
    }

    /// Number of simulations the covariance was estimated from
    pub fn num_sims(&self) -> usize {
        self.num_sims
    }
}

/// Estimate the disc/annulus covariance from `num_sims` filtered simulations.
///
/// Simulations run in parallel; each one gets its own generator seeded from
/// `rng`, so the result depends only on the state of `rng`.
///
/// # Arguments
/// * `sky` - CMB+noise model (with the filter used for inpainting)
/// * `radii` - Disc and annulus radii
/// * `num_sims` - Number of simulations, at least 2
/// * `pinv_rcond` - Singular values below `pinv_rcond · σ_max` are discarded
/// * `rng` - Source of the per-simulation seeds
pub fn build_covariance<R: Rng + ?Sized>(
    sky: &CmbSkyModel,
    radii: MaskRadii,
    num_sims: usize,
    pinv_rcond: f64,
    rng: &mut R,
) -> Result<CovarianceModel, InpaintError> {
    if num_sims < 2 {
        return Err(InpaintError::TooFewSimulations(num_sims));
    }
    let geometry = MaskGeometry::new(sky.params(), radii)?;
    let n_inner = geometry.inner_pixels().len();
    let n_annulus = geometry.annulus_pixels().len();
    let started = Instant::now();

    let seeds: Vec<u64> = (0..num_sims).map(|_| rng.gen()).collect();
    let samples: Vec<Vec<f64>> = seeds
        .par_iter()
        .map(|&seed| {
            let mut sim_rng = StdRng::seed_from_u64(seed);
            geometry.stacked_values(&sky.simulate_filtered(&mut sim_rng))
        })
        .collect();
    debug!(
        "Drew {} covariance simulations in {:.2?}",
        num_sims,
        started.elapsed()
    );

    let width = n_inner + n_annulus;
    let mut means = vec![0.0; width];
    for sample in &samples {
        for (mean, value) in means.iter_mut().zip(sample) {
            *mean += value;
        }
    }
    for mean in means.iter_mut() {
        *mean /= num_sims as f64;
    }

    let centred = DMatrix::from_fn(num_sims, width, |i, j| samples[i][j] - means[j]);
    let inner = centred.columns(0, n_inner);
    let annulus = centred.columns(n_inner, n_annulus);
    let norm = 1.0 / (num_sims - 1) as f64;
    let sigma_12 = inner.transpose() * annulus * norm;
    let sigma_22 = annulus.transpose() * annulus * norm;

    let svd = sigma_22.svd(true, true);
    let cutoff = svd.singular_values.max() * pinv_rcond;
    let sigma_22_inv = svd
        .pseudo_inverse(cutoff)
        .map_err(|e| InpaintError::PseudoInverse(e.to_string()))?;

    let projection = sigma_12 * sigma_22_inv;
    info!(
        "Covariance model: {} disc / {} annulus pixels from {} simulations in {:.2?}",
        n_inner,
        n_annulus,
        num_sims,
        started.elapsed()
    );

    Ok(CovarianceModel {
        geometry,
        projection,
        num_sims,
    })
}
