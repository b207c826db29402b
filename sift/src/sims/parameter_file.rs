//! Monte Carlo assembly of the fiducial parameter file.

use std::path::PathBuf;
use std::time::Instant;

use log::info;
use ndarray::{s, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use super::{AnisotropyExtractor, ComptonYError, ComptonYSolver, FieldSynthesizer};
use crate::config::{ConfigError, SimulationConfig};
use crate::cosmology::{CosmologyError, PowerSpectrumSolver};
use crate::inpaint::InpaintError;
use crate::io::{ParameterStore, RunMetadata, StoreError};

/// Number of columns of a parameter matrix
pub const PARAMETER_COLUMNS: usize = 5;

/// Errors that abort a parameter-file build
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Power spectrum error: {0}")]
    Cosmology(#[from] CosmologyError),
    #[error("Anisotropy extraction failed: {0}")]
    Inpaint(#[from] InpaintError),
    #[error(transparent)]
    ComptonY(#[from] ComptonYError),
    #[error("Failed to store parameter file: {0}")]
    Store(#[from] StoreError),
}

/// One Monte Carlo sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterRow {
    pub catalog_long: f64,
    pub catalog_lat: f64,
    /// CMB anisotropy amplitude in K
    pub cmb_anisotropy: f64,
    /// Background-subtracted kSZ temperature in K
    pub ksz_amplitude: f64,
    /// Background-subtracted Compton-y
    pub tsz_amplitude: f64,
}

impl ParameterRow {
    pub fn to_array(&self) -> [f64; PARAMETER_COLUMNS] {
        [
            self.catalog_long,
            self.catalog_lat,
            self.cmb_anisotropy,
            self.ksz_amplitude,
            self.tsz_amplitude,
        ]
    }

    pub fn from_array(values: [f64; PARAMETER_COLUMNS]) -> Self {
        let [catalog_long, catalog_lat, cmb_anisotropy, ksz_amplitude, tsz_amplitude] = values;
        Self {
            catalog_long,
            catalog_lat,
            cmb_anisotropy,
            ksz_amplitude,
            tsz_amplitude,
        }
    }
}

/// Rows of a parameter file, one per realization.
///
/// Row order follows realization order but carries no meaning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterMatrix {
    rows: Vec<ParameterRow>,
}

impl ParameterMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, row: ParameterRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[ParameterRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `(R, 5)` array in column order
    /// `(catalog_long, catalog_lat, cmb_anisotropy, ksz_amplitude, tsz_amplitude)`
    pub fn to_array2(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.rows.len(), PARAMETER_COLUMNS), |(i, j)| {
            self.rows[i].to_array()[j]
        })
    }

    /// Inverse of [`to_array2`](Self::to_array2); `None` unless the array has 5 columns.
    pub fn from_array2(array: &Array2<f64>) -> Option<Self> {
        if array.ncols() != PARAMETER_COLUMNS {
            return None;
        }
        let rows = array
            .rows()
            .into_iter()
            .map(|row| ParameterRow::from_array([row[0], row[1], row[2], row[3], row[4]]))
            .collect();
        Some(Self { rows })
    }
}

/// Pixel value minus the mean of its `(2h+1)×(2h+1)` neighbourhood.
///
/// # Panics
/// If the neighbourhood extends past the map edge.
pub fn local_amplitude(map: &Array2<f64>, row: usize, col: usize, half_width: usize) -> f64 {
    let (nrows, ncols) = map.dim();
    assert!(
        row >= half_width
            && col >= half_width
            && row + half_width < nrows
            && col + half_width < ncols,
        "Neighbourhood of ({row}, {col}) exceeds the {nrows}×{ncols} map"
    );
    let patch = map.slice(s![
        row - half_width..=row + half_width,
        col - half_width..=col + half_width
    ]);
    map[[row, col]] - patch.sum() / patch.len() as f64
}

/// Catalog position and map pixel drawn for one row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampledCoordinates {
    /// `(long, lat)` in `[0, catalog_extent)`
    pub catalog: (usize, usize),
    /// `(row, col)` in `[h, n - h)` along each axis
    pub pixel: (usize, usize),
}

/// Draw catalog coordinates and a map pixel whose `(2h+1)×(2h+1)`
/// neighbourhood fits inside a `shape` map.
///
/// Draw order is catalog long, catalog lat, row, col.
///
/// # Panics
/// If `catalog_extent` is zero or a map side is not larger than `2h`.
pub fn sample_coordinates<R: Rng + ?Sized>(
    rng: &mut R,
    catalog_extent: usize,
    shape: (usize, usize),
    half_width: usize,
) -> SampledCoordinates {
    let (nrows, ncols) = shape;
    assert!(
        nrows > 2 * half_width && ncols > 2 * half_width,
        "{nrows}×{ncols} map has no pixel with a full neighbourhood of half-width {half_width}"
    );
    let catalog = (
        rng.gen_range(0..catalog_extent),
        rng.gen_range(0..catalog_extent),
    );
    let pixel = (
        rng.gen_range(half_width..nrows - half_width),
        rng.gen_range(half_width..ncols - half_width),
    );
    SampledCoordinates { catalog, pixel }
}

/// Builds parameter matrices from freshly simulated maps.
#[derive(Debug)]
pub struct ParameterFileBuilder {
    synthesizer: FieldSynthesizer,
}

impl ParameterFileBuilder {
    pub fn new(config: SimulationConfig, solver: Box<dyn PowerSpectrumSolver>) -> Self {
        Self {
            synthesizer: FieldSynthesizer::new(config, solver),
        }
    }

    /// Builder using the built-in ΛCDM template spectrum
    pub fn with_template(config: SimulationConfig) -> Self {
        Self {
            synthesizer: FieldSynthesizer::with_template(config),
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        self.synthesizer.config()
    }

    /// Simulate all maps and draw `realizations` parameter rows.
    ///
    /// Everything downstream of `seed` is deterministic: the CMB map, the
    /// covariance and inpainting draws, both secondaries and the coordinate
    /// sampling each get their own generator seeded from a master generator.
    ///
    /// # Arguments
    /// * `resolution_arcmin` - Pixel size of every map (also the beam FWHM)
    /// * `realizations` - Number of rows `R`
    /// * `seed` - Master seed
    pub fn build(
        &self,
        resolution_arcmin: f64,
        realizations: usize,
        seed: u64,
    ) -> Result<ParameterMatrix, BuildError> {
        let config = self.config();
        config.validate(resolution_arcmin)?;
        let started = Instant::now();

        let mut master = StdRng::seed_from_u64(seed);
        let mut cmb_rng = StdRng::seed_from_u64(master.gen());
        let mut inpaint_rng = StdRng::seed_from_u64(master.gen());
        let mut ksz_rng = StdRng::seed_from_u64(master.gen());
        let mut tsz_rng = StdRng::seed_from_u64(master.gen());
        let mut sampling_rng = StdRng::seed_from_u64(master.gen());

        info!(
            "Building {} realizations at {} arcmin (seed {})",
            realizations, resolution_arcmin, seed
        );
        let cmb = self
            .synthesizer
            .cmb_realization(resolution_arcmin, &mut cmb_rng)?;
        let amplitudes = AnisotropyExtractor::new(config.inpainting.clone()).extract(
            &cmb.sky,
            &cmb.map,
            realizations,
            &mut inpaint_rng,
        )?;

        let ksz = self
            .synthesizer
            .ksz_realization(resolution_arcmin, &mut ksz_rng);
        let tsz_temperature = self
            .synthesizer
            .tsz_temperature_realization(resolution_arcmin, &mut tsz_rng);
        let tsz = ComptonYSolver::from_config(&config.compton_y).solve(&tsz_temperature)?;

        let h = config.sampling.neighbourhood_half_width;
        let extent = config.sampling.catalog_extent;
        let mut matrix = ParameterMatrix::with_capacity(realizations);
        for cmb_anisotropy in amplitudes {
            let coords = sample_coordinates(&mut sampling_rng, extent, ksz.dim(), h);
            let (row, col) = coords.pixel;
            matrix.push(ParameterRow {
                catalog_long: coords.catalog.0 as f64,
                catalog_lat: coords.catalog.1 as f64,
                cmb_anisotropy,
                ksz_amplitude: local_amplitude(&ksz, row, col, h),
                tsz_amplitude: local_amplitude(&tsz.y, row, col, h),
            });
        }

        info!(
            "Built {}×{} parameter matrix in {:.2?}",
            matrix.len(),
            PARAMETER_COLUMNS,
            started.elapsed()
        );
        Ok(matrix)
    }

    /// [`build`](Self::build) and persist the result with its run metadata.
    ///
    /// Nothing is written unless the whole build succeeds.
    pub fn build_and_save(
        &self,
        resolution_arcmin: f64,
        realizations: usize,
        seed: u64,
        store: &ParameterStore,
    ) -> Result<PathBuf, BuildError> {
        let matrix = self.build(resolution_arcmin, realizations, seed)?;
        let metadata = RunMetadata {
            seed,
            resolution_arcmin,
            realizations,
            config: self.config().clone(),
        };
        Ok(store.save(&matrix, &metadata)?)
    }
}
