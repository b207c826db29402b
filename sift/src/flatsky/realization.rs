//! Gaussian random field realizations of angular power spectra.
//!
//! A unit white-noise field is transformed to Fourier space, weighted by
//! `sqrt(C_ℓ / Ω_pix)` (and the beam, when given) and transformed back.
//! The mean of the result is removed.

use ndarray::Array2;
use rand::Rng;
use rand_distr::StandardNormal;

use super::{BeamTransfer, FourierGrid};

/// Precomputed Fourier weights for repeated draws of the same field.
#[derive(Debug, Clone)]
pub struct FieldKernel {
    transfer: Array2<f64>,
}

impl FieldKernel {
    /// # Arguments
    /// * `grid` - Fourier grid of the target map
    /// * `cl` - Power spectrum indexed by multipole, in map units squared × sr
    /// * `beam` - Optional beam applied to the field
    pub fn new(grid: &FourierGrid, cl: &[f64], beam: Option<&BeamTransfer>) -> Self {
        let norm = 1.0 / grid.params().pixel_area_sr();
        let mut transfer = grid.interpolate(cl).mapv(|c| {
            let amplitude = (c * norm).sqrt();
            if amplitude.is_finite() {
                amplitude
            } else {
                0.0
            }
        });
        if let Some(beam) = beam {
            transfer *= &beam.on_grid(grid);
        }
        Self { transfer }
    }

    /// Fourier-space amplitude applied to white noise
    pub fn transfer(&self) -> &Array2<f64> {
        &self.transfer
    }

    /// Draw one realization, consuming `ny·nx` normal deviates from `rng`
    /// in row-major order.
    pub fn draw<R: Rng + ?Sized>(&self, grid: &FourierGrid, rng: &mut R) -> Array2<f64> {
        let white = Array2::from_shape_simple_fn(grid.params().shape(), || {
            rng.sample::<f64, _>(StandardNormal)
        });
        let mut field = grid.apply(&white, &self.transfer);
        let mean = field.mean().unwrap_or(0.0);
        field -= mean;
        field
    }
}

/// One Gaussian realization of `cl` on `grid`, optionally beam-convolved.
pub fn gaussian_realization<R: Rng + ?Sized>(
    grid: &FourierGrid,
    cl: &[f64],
    beam: Option<&BeamTransfer>,
    rng: &mut R,
) -> Array2<f64> {
    FieldKernel::new(grid, cl, beam).draw(grid, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatsky::{white_noise_power, MapParams};
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_same_seed_same_field() {
        let grid = FourierGrid::new(MapParams::new(32, 32, 2.0, 2.0));
        let cl = white_noise_power(5.0, 20000);
        let a = gaussian_realization(&grid, &cl, None, &mut StdRng::seed_from_u64(7));
        let b = gaussian_realization(&grid, &cl, None, &mut StdRng::seed_from_u64(7));
        let c = gaussian_realization(&grid, &cl, None, &mut StdRng::seed_from_u64(8));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_zero_mean() {
        let grid = FourierGrid::new(MapParams::new(24, 24, 2.0, 2.0));
        let cl = white_noise_power(5.0, 20000);
        let field = gaussian_realization(&grid, &cl, None, &mut StdRng::seed_from_u64(1));
        assert_relative_eq!(field.mean().unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_white_noise_pixel_variance() {
        // A flat spectrum covering every mode gives σ_pix = noise / pixel size
        let params = MapParams::new(64, 64, 2.0, 2.0);
        let grid = FourierGrid::new(params);
        let cl = white_noise_power(4.0, 100_000);
        let field = gaussian_realization(&grid, &cl, None, &mut StdRng::seed_from_u64(3));
        let variance = field.mapv(|v| v * v).mean().unwrap();
        assert_relative_eq!(variance.sqrt(), 2.0, max_relative = 0.05);
    }

    #[test]
    fn test_beam_suppresses_power() {
        let grid = FourierGrid::new(MapParams::new(32, 32, 1.0, 1.0));
        let cl = white_noise_power(4.0, 100_000);
        let beam = BeamTransfer::gaussian(5.0, 100_000);
        let raw = gaussian_realization(&grid, &cl, None, &mut StdRng::seed_from_u64(11));
        let smoothed =
            gaussian_realization(&grid, &cl, Some(&beam), &mut StdRng::seed_from_u64(11));
        let power = |m: &Array2<f64>| m.mapv(|v| v * v).sum();
        assert!(power(&smoothed) < 0.5 * power(&raw));
    }

    #[test]
    fn test_negative_power_is_zeroed() {
        let grid = FourierGrid::new(MapParams::new(8, 8, 1.0, 1.0));
        let kernel = FieldKernel::new(&grid, &vec![-1.0; 50_000], None);
        assert!(kernel.transfer().iter().all(|&v| v == 0.0));
    }
}
