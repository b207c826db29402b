//! CMB + instrumental noise sky model.

use ndarray::Array2;
use rand::Rng;

use super::{BeamTransfer, FieldKernel, FourierGrid, MapParams};

/// Everything needed to draw and filter CMB+noise maps on one grid.
///
/// Built once per map configuration and shared read-only between the
/// covariance estimate and every inpainting call.
#[derive(Debug)]
pub struct CmbSkyModel {
    grid: FourierGrid,
    cl_tt: Vec<f64>,
    beam: BeamTransfer,
    noise_power: Vec<f64>,
    filter: Option<Array2<f64>>,
    signal_kernel: FieldKernel,
    noise_kernel: FieldKernel,
}

impl CmbSkyModel {
    /// # Arguments
    /// * `grid` - Fourier grid of the maps
    /// * `cl_tt` - Temperature power spectrum in µK² indexed by multipole
    /// * `beam` - Beam applied to the CMB signal (not to the noise)
    /// * `noise_power` - Noise spectrum in µK² indexed by multipole
    /// * `filter` - Optional Fourier mask applied by [`filter_map`](Self::filter_map)
    pub fn new(
        grid: FourierGrid,
        cl_tt: Vec<f64>,
        beam: BeamTransfer,
        noise_power: Vec<f64>,
        filter: Option<Array2<f64>>,
    ) -> Self {
        if let Some(filter) = &filter {
            assert_eq!(
                filter.dim(),
                grid.params().shape(),
                "Filter shape does not match map grid"
            );
        }
        let signal_kernel = FieldKernel::new(&grid, &cl_tt, Some(&beam));
        let noise_kernel = FieldKernel::new(&grid, &noise_power, None);
        Self {
            grid,
            cl_tt,
            beam,
            noise_power,
            filter,
            signal_kernel,
            noise_kernel,
        }
    }

    pub fn grid(&self) -> &FourierGrid {
        &self.grid
    }

    pub fn params(&self) -> &MapParams {
        self.grid.params()
    }

    pub fn cl_tt(&self) -> &[f64] {
        &self.cl_tt
    }

    pub fn beam(&self) -> &BeamTransfer {
        &self.beam
    }

    pub fn noise_power(&self) -> &[f64] {
        &self.noise_power
    }

    pub fn filter(&self) -> Option<&Array2<f64>> {
        self.filter.as_ref()
    }

    /// Beam-convolved CMB signal realization in µK
    pub fn signal<R: Rng + ?Sized>(&self, rng: &mut R) -> Array2<f64> {
        self.signal_kernel.draw(&self.grid, rng)
    }

    /// Instrumental noise realization in µK
    pub fn noise<R: Rng + ?Sized>(&self, rng: &mut R) -> Array2<f64> {
        self.noise_kernel.draw(&self.grid, rng)
    }

    /// Signal plus noise, drawn in that order from `rng`
    pub fn simulate<R: Rng + ?Sized>(&self, rng: &mut R) -> Array2<f64> {
        let signal = self.signal(rng);
        signal + self.noise(rng)
    }

    /// Apply the model's Fourier filter, or copy the map when there is none.
    pub fn filter_map(&self, map: &Array2<f64>) -> Array2<f64> {
        match &self.filter {
            Some(filter) => self.grid.apply(map, filter),
            None => map.clone(),
        }
    }

    /// A filtered signal-plus-noise realization
    pub fn simulate_filtered<R: Rng + ?Sized>(&self, rng: &mut R) -> Array2<f64> {
        let sim = self.simulate(rng);
        self.filter_map(&sim)
    }
}
