//! Flat-sky map geometry and Fourier-space primitives.
//!
//! Small sky patches are treated as flat: a map is an `ny × nx` array of
//! square pixels and multipoles are Fourier wavenumbers `ℓ = 2π|f|` with `f`
//! in cycles per radian. Everything needed to turn an angular power spectrum
//! into a pixelized Gaussian field lives here.

pub mod beam;
pub mod filter;
pub mod fourier;
pub mod noise;
pub mod realization;
pub mod sky;

use serde::{Deserialize, Serialize};

pub use beam::{build_beam, BeamTransfer};
pub use filter::{fourier_filter, FilterType};
pub use fourier::{fftfreq, FourierGrid};
pub use noise::white_noise_power;
pub use realization::{gaussian_realization, FieldKernel};
pub use sky::CmbSkyModel;

/// Radians per arcminute
pub const ARCMIN_TO_RAD: f64 = std::f64::consts::PI / (180.0 * 60.0);

/// Pixel grid of a flat-sky map.
///
/// `nx`/`ny` count pixels along the two axes and `dx_arcmin`/`dy_arcmin` are
/// the angular pixel sizes. Arrays built on this grid have shape `(ny, nx)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapParams {
    pub nx: usize,
    pub ny: usize,
    pub dx_arcmin: f64,
    pub dy_arcmin: f64,
}

impl MapParams {
    /// Create a map geometry.
    ///
    /// # Panics
    /// If a dimension is zero or a pixel size is not positive and finite.
    pub fn new(nx: usize, ny: usize, dx_arcmin: f64, dy_arcmin: f64) -> Self {
        if nx == 0 || ny == 0 {
            panic!("Map dimensions must be non-zero, got {nx}x{ny}");
        }
        if !(dx_arcmin.is_finite() && dx_arcmin > 0.0 && dy_arcmin.is_finite() && dy_arcmin > 0.0)
        {
            panic!("Pixel sizes must be positive, got {dx_arcmin}x{dy_arcmin} arcmin");
        }
        Self {
            nx,
            ny,
            dx_arcmin,
            dy_arcmin,
        }
    }

    /// Square map covering `box_arcmin` on a side at `resolution_arcmin` pixels.
    ///
    /// The pixel count is truncated, so a 200 arcmin box at 3 arcmin holds 66
    /// pixels per side.
    pub fn square(box_arcmin: f64, resolution_arcmin: f64) -> Self {
        let n = (box_arcmin / resolution_arcmin) as usize;
        Self::new(n, n, resolution_arcmin, resolution_arcmin)
    }

    /// Array shape `(rows, cols) = (ny, nx)`
    pub fn shape(&self) -> (usize, usize) {
        (self.ny, self.nx)
    }

    /// Number of pixels
    pub(crate) fn len(&self) -> usize {
        self.nx * self.ny
    }

    pub fn dx_radians(&self) -> f64 {
        self.dx_arcmin * ARCMIN_TO_RAD
    }

    pub fn dy_radians(&self) -> f64 {
        self.dy_arcmin * ARCMIN_TO_RAD
    }

    /// Solid angle of a single pixel in steradians
    pub fn pixel_area_sr(&self) -> f64 {
        self.dx_radians() * self.dy_radians()
    }

    /// Pixel centre coordinates along x in arcmin, `linspace(-nx/2·dx, nx/2·dx, nx)`.
    pub fn x_coordinates_arcmin(&self) -> Vec<f64> {
        linspace_centered(self.nx, self.dx_arcmin)
    }

    /// Pixel centre coordinates along y in arcmin
    pub fn y_coordinates_arcmin(&self) -> Vec<f64> {
        linspace_centered(self.ny, self.dy_arcmin)
    }

    /// Central pixel `(row, col)`
    pub fn center_pixel(&self) -> (usize, usize) {
        (self.ny / 2, self.nx / 2)
    }
}

fn linspace_centered(n: usize, step: f64) -> Vec<f64> {
    let half = n as f64 / 2.0 * step;
    if n == 1 {
        return vec![-half];
    }
    let spacing = 2.0 * half / (n - 1) as f64;
    (0..n).map(|i| -half + i as f64 * spacing).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_square_truncates_pixel_count() {
        let params = MapParams::square(200.0, 3.0);
        assert_eq!(params.nx, 66);
        assert_eq!(params.ny, 66);
        assert_eq!(params.center_pixel(), (33, 33));
        assert_eq!(params.len(), 66 * 66);

        let params = MapParams::square(3000.0, 3.0);
        assert_eq!(params.shape(), (1000, 1000));
    }

    #[test]
    fn test_coordinates_span_box() {
        let params = MapParams::square(200.0, 3.0);
        let x = params.x_coordinates_arcmin();
        assert_eq!(x.len(), 66);
        assert_relative_eq!(x[0], -99.0);
        assert_relative_eq!(x[65], 99.0, epsilon = 1e-9);
    }

    #[test]
    fn test_pixel_area() {
        let params = MapParams::new(4, 4, 60.0, 60.0);
        let one_degree = 1.0f64.to_radians();
        assert_relative_eq!(params.pixel_area_sr(), one_degree * one_degree);
    }

    #[test]
    #[should_panic(expected = "Pixel sizes must be positive")]
    fn test_rejects_zero_pixel_size() {
        MapParams::new(4, 4, 0.0, 1.0);
    }
}
