//! Disc and annulus pixel selections around the map centre.

use nalgebra::DVector;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::InpaintError;
use crate::flatsky::MapParams;

/// Radii of the inpainted disc and of the conditioning annulus
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaskRadii {
    pub inner_arcmin: f64,
    pub outer_arcmin: f64,
}

impl Default for MaskRadii {
    fn default() -> Self {
        Self {
            inner_arcmin: 8.0,
            outer_arcmin: 60.0,
        }
    }
}

/// Pixel indices of the disc `r ≤ r_in` and the annulus `r_in < r ≤ r_out`.
///
/// Radii are measured from the map centre using the pixel coordinates
/// `linspace(−n/2·d, n/2·d, n)` along each axis.
#[derive(Debug, Clone)]
pub struct MaskGeometry {
    shape: (usize, usize),
    inner: Vec<(usize, usize)>,
    annulus: Vec<(usize, usize)>,
}

impl MaskGeometry {
    pub fn new(params: &MapParams, radii: MaskRadii) -> Result<Self, InpaintError> {
        let MaskRadii {
            inner_arcmin,
            outer_arcmin,
        } = radii;
        if !(inner_arcmin > 0.0 && outer_arcmin > inner_arcmin) {
            return Err(InpaintError::InvalidRadii {
                inner: inner_arcmin,
                outer: outer_arcmin,
            });
        }

        let xs = params.x_coordinates_arcmin();
        let ys = params.y_coordinates_arcmin();
        let mut inner = Vec::new();
        let mut annulus = Vec::new();
        for (row, y) in ys.iter().enumerate() {
            for (col, x) in xs.iter().enumerate() {
                let r = (x * x + y * y).sqrt();
                if r <= inner_arcmin {
                    inner.push((row, col));
                } else if r <= outer_arcmin {
                    annulus.push((row, col));
                }
            }
        }

        if inner.is_empty() {
            return Err(InpaintError::EmptyRegion("inner"));
        }
        if annulus.is_empty() {
            return Err(InpaintError::EmptyRegion("annulus"));
        }

        Ok(Self {
            shape: params.shape(),
            inner,
            annulus,
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    pub fn inner_pixels(&self) -> &[(usize, usize)] {
        &self.inner
    }

    pub fn annulus_pixels(&self) -> &[(usize, usize)] {
        &self.annulus
    }

    pub fn contains_inner(&self, pixel: (usize, usize)) -> bool {
        self.inner.contains(&pixel)
    }

    pub fn inner_values(&self, map: &Array2<f64>) -> DVector<f64> {
        DVector::from_iterator(self.inner.len(), self.inner.iter().map(|&p| map[p]))
    }

    pub fn annulus_values(&self, map: &Array2<f64>) -> DVector<f64> {
        DVector::from_iterator(self.annulus.len(), self.annulus.iter().map(|&p| map[p]))
    }

    /// Disc values followed by annulus values
    pub fn stacked_values(&self, map: &Array2<f64>) -> Vec<f64> {
        self.inner
            .iter()
            .chain(self.annulus.iter())
            .map(|&p| map[p])
            .collect()
    }

    /// Overwrite the disc pixels of `map` with `values`, in disc order.
    pub fn fill_inner(&self, map: &mut Array2<f64>, values: &[f64]) {
        for (&pixel, &value) in self.inner.iter().zip(values) {
            map[pixel] = value;
        }
    }
}
