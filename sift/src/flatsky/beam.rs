//! Instrument beam transfer functions.

use ndarray::Array2;

use super::{FourierGrid, ARCMIN_TO_RAD};

/// Attenuation applied to each angular scale by the instrument beam.
#[derive(Debug, Clone, PartialEq)]
pub enum BeamTransfer {
    /// `b_ℓ` indexed by multipole
    Radial(Vec<f64>),
    /// `b(ℓx, ℓy)` on a map's Fourier grid
    Fourier(Array2<f64>),
}

impl BeamTransfer {
    /// Gaussian beam `b_ℓ = exp(−ℓ(ℓ+1)σ²/2)` for `ℓ = 0..=lmax`.
    ///
    /// `σ = FWHM / sqrt(8 ln 2)` in radians.
    pub fn gaussian(fwhm_arcmin: f64, lmax: usize) -> Self {
        let sigma = fwhm_arcmin * ARCMIN_TO_RAD / (8.0 * std::f64::consts::LN_2).sqrt();
        let values = (0..=lmax)
            .map(|l| {
                let l = l as f64;
                (-l * (l + 1.0) * sigma * sigma / 2.0).exp()
            })
            .collect();
        BeamTransfer::Radial(values)
    }

    /// Transfer function on the Fourier grid, interpolating a radial profile.
    ///
    /// # Panics
    /// If a 2-D beam was built for a different map shape.
    pub fn on_grid(&self, grid: &FourierGrid) -> Array2<f64> {
        match self {
            BeamTransfer::Radial(values) => grid.interpolate(values),
            BeamTransfer::Fourier(values) => {
                assert_eq!(
                    values.dim(),
                    grid.params().shape(),
                    "2-D beam shape does not match map grid"
                );
                values.clone()
            }
        }
    }
}

/// Gaussian beam, optionally projected onto the 2-D Fourier grid of a map.
pub fn build_beam(
    fwhm_arcmin: f64,
    lmax: usize,
    make_2d: bool,
    grid: &FourierGrid,
) -> BeamTransfer {
    let radial = BeamTransfer::gaussian(fwhm_arcmin, lmax);
    if make_2d {
        BeamTransfer::Fourier(radial.on_grid(grid))
    } else {
        radial
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatsky::MapParams;
    use approx::assert_relative_eq;

    #[test]
    fn test_gaussian_beam_shape() {
        let BeamTransfer::Radial(bl) = BeamTransfer::gaussian(3.0, 5000) else {
            panic!("expected radial beam");
        };
        assert_eq!(bl.len(), 5001);
        assert_eq!(bl[0], 1.0);
        assert!(bl.windows(2).all(|w| w[1] < w[0]));

        // Half power near ℓ ≈ sqrt(8 ln 2 · ln 2)/θ_fwhm
        let sigma = 3.0 * ARCMIN_TO_RAD / (8.0 * std::f64::consts::LN_2).sqrt();
        let l = 1000usize;
        let expected = (-((l * (l + 1)) as f64) * sigma * sigma / 2.0).exp();
        assert_relative_eq!(bl[l], expected);
    }

    #[test]
    fn test_2d_beam_matches_grid() {
        let grid = FourierGrid::new(MapParams::new(16, 16, 3.0, 3.0));
        let beam = build_beam(3.0, 10000, true, &grid);
        let BeamTransfer::Fourier(values) = &beam else {
            panic!("expected 2-D beam");
        };
        assert_eq!(values.dim(), (16, 16));
        assert_eq!(values[[0, 0]], 1.0);
        assert_eq!(beam.on_grid(&grid), *values);
    }
}
