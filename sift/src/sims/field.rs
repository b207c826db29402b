//! Temperature map synthesis for the CMB and the two SZ secondaries.

use log::debug;
use ndarray::Array2;
use rand::Rng;

use crate::config::SimulationConfig;
use crate::cosmology::{
    dl_to_cl, flat_dl, CosmologyError, PowerSpectrumSolver, SpectrumField, TemplateSolver,
};
use crate::flatsky::{
    build_beam, fourier_filter, gaussian_realization, white_noise_power, CmbSkyModel,
    FourierGrid,
};

/// µK → K
const MICROKELVIN: f64 = 1e-6;

/// A CMB+noise map together with the model it was drawn from
#[derive(Debug)]
pub struct CmbRealization {
    /// Signal plus noise in µK
    pub map: Array2<f64>,
    /// Spectra, beam, noise and filter needed to inpaint `map`
    pub sky: CmbSkyModel,
}

/// Draws pixelized temperature maps from theoretical spectra.
pub struct FieldSynthesizer {
    config: SimulationConfig,
    solver: Box<dyn PowerSpectrumSolver>,
}

impl std::fmt::Debug for FieldSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldSynthesizer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FieldSynthesizer {
    pub fn new(config: SimulationConfig, solver: Box<dyn PowerSpectrumSolver>) -> Self {
        Self { config, solver }
    }

    /// Synthesizer backed by the built-in ΛCDM template
    pub fn with_template(config: SimulationConfig) -> Self {
        Self::new(config, Box::new(TemplateSolver))
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// CMB+noise model on the CMB grid at `resolution_arcmin`.
    ///
    /// The TT spectrum comes from the power-spectrum solver at the configured
    /// cosmology; the beam FWHM equals the pixel resolution.
    pub fn cmb_sky_model(&self, resolution_arcmin: f64) -> Result<CmbSkyModel, CosmologyError> {
        let cmb = &self.config.cmb;
        let spectra = self.solver.total_spectra(&self.config.cosmology, cmb.lmax)?;
        let mut cl_tt = dl_to_cl(spectra.require(SpectrumField::TT)?);
        cl_tt.truncate(cmb.lmax + 1);

        let grid = FourierGrid::new(self.config.cmb_params(resolution_arcmin));
        let beam = build_beam(resolution_arcmin, cmb.lmax, true, &grid);
        let noise_power = white_noise_power(cmb.noise_uk_arcmin, cmb.lmax);
        let filter = fourier_filter(&grid, cmb.filter);
        debug!(
            "CMB sky model: {:?} pixels at {} arcmin, lmax {}",
            grid.params().shape(),
            resolution_arcmin,
            cmb.lmax
        );

        Ok(CmbSkyModel::new(grid, cl_tt, beam, noise_power, Some(filter)))
    }

    /// Beam-convolved CMB signal plus independent white noise, in µK.
    pub fn cmb_realization<R: Rng + ?Sized>(
        &self,
        resolution_arcmin: f64,
        rng: &mut R,
    ) -> Result<CmbRealization, CosmologyError> {
        let sky = self.cmb_sky_model(resolution_arcmin)?;
        let map = sky.simulate(rng);
        Ok(CmbRealization { map, sky })
    }

    /// kSZ temperature map in K
    pub fn ksz_realization<R: Rng + ?Sized>(
        &self,
        resolution_arcmin: f64,
        rng: &mut R,
    ) -> Array2<f64> {
        self.secondary_realization(self.config.secondaries.ksz_dl, resolution_arcmin, rng)
    }

    /// tSZ temperature map in K.
    ///
    /// The spectrum is frequency independent; the frequency dependence enters
    /// when the map is converted to Compton-y.
    pub fn tsz_temperature_realization<R: Rng + ?Sized>(
        &self,
        resolution_arcmin: f64,
        rng: &mut R,
    ) -> Array2<f64> {
        self.secondary_realization(self.config.secondaries.tsz_dl, resolution_arcmin, rng)
    }

    fn secondary_realization<R: Rng + ?Sized>(
        &self,
        amplitude: f64,
        resolution_arcmin: f64,
        rng: &mut R,
    ) -> Array2<f64> {
        let lmax = self.config.secondaries.lmax;
        let cl = dl_to_cl(&flat_dl(amplitude, lmax));
        let grid = FourierGrid::new(self.config.secondary_params(resolution_arcmin));
        let beam = build_beam(resolution_arcmin, lmax, true, &grid);
        debug!(
            "Secondary map: D_ℓ = {:e}, {:?} pixels",
            amplitude,
            grid.params().shape()
        );
        gaussian_realization(&grid, &cl, Some(&beam), rng) * MICROKELVIN
    }
}
