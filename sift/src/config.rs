//! Run configuration for parameter-file builds.
//!
//! Every constant the build depends on (box sizes, spectrum amplitudes,
//! mask radii, probe pixel, sampling ranges) lives here so that changing
//! the grid never silently desynchronizes a hard-coded index. Defaults
//! reproduce the fiducial run; [`SimulationConfig::validate`] checks the
//! derived grid sizes for a given resolution before any map is drawn.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::algo::RootOptions;
use crate::cosmology::CosmologyParams;
use crate::flatsky::{FilterType, MapParams};
use crate::inpaint::covariance::DEFAULT_PINV_RCOND;
use crate::inpaint::MaskRadii;
use crate::sims::{CompositeMapMode, ConvergencePolicy};

/// Errors from loading or validating a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Resolution must be positive and finite, got {0} arcmin")]
    InvalidResolution(f64),
    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// CMB map settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CmbConfig {
    /// Side of the square CMB map in arcmin
    pub box_arcmin: f64,
    /// Highest multipole requested from the power-spectrum solver
    pub lmax: usize,
    /// White noise level in µK-arcmin
    pub noise_uk_arcmin: f64,
    /// Filter applied before covariance estimation and inpainting
    pub filter: FilterType,
}

impl Default for CmbConfig {
    fn default() -> Self {
        Self {
            box_arcmin: 200.0,
            lmax: 10_000,
            noise_uk_arcmin: 1.0,
            filter: FilterType::LowPass { cutoff: 3000.0 },
        }
    }
}

/// kSZ / tSZ map settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecondaryConfig {
    /// Side of the square secondary maps in arcmin
    pub box_arcmin: f64,
    pub lmax: usize,
    /// Flat kSZ `D_ℓ` in units of `T_CMB²`
    pub ksz_dl: f64,
    /// Flat tSZ `D_ℓ` in units of `T_CMB²`
    pub tsz_dl: f64,
}

impl Default for SecondaryConfig {
    fn default() -> Self {
        Self {
            box_arcmin: 3000.0,
            lmax: 5050,
            ksz_dl: 3e-12,
            tsz_dl: 3.42e-12,
        }
    }
}

/// Covariance estimation and inpainting settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InpaintConfig {
    /// Simulations used to estimate the pixel covariance
    pub num_sims: usize,
    pub radii: MaskRadii,
    /// Pixel `(row, col)` the anisotropy is read at; the grid centre when unset
    pub probe_pixel: Option<(usize, usize)>,
    pub composite_map: CompositeMapMode,
    /// Relative singular-value cutoff of the annulus pseudo-inverse
    pub pinv_rcond: f64,
}

impl Default for InpaintConfig {
    fn default() -> Self {
        Self {
            num_sims: 1000,
            radii: MaskRadii::default(),
            probe_pixel: None,
            composite_map: CompositeMapMode::default(),
            pinv_rcond: DEFAULT_PINV_RCOND,
        }
    }
}

/// Compton-y inversion settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComptonYConfig {
    /// Reference observing frequency in Hz
    pub frequency_hz: f64,
    pub root: RootOptions,
    pub policy: ConvergencePolicy,
}

impl Default for ComptonYConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 143e9,
            root: RootOptions::default(),
            policy: ConvergencePolicy::default(),
        }
    }
}

/// Monte Carlo coordinate sampling settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Catalog coordinates are drawn from `[0, catalog_extent)`
    pub catalog_extent: usize,
    /// Half-width of the background neighbourhood (2 → 5×5)
    pub neighbourhood_half_width: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            catalog_extent: 160,
            neighbourhood_half_width: 2,
        }
    }
}

/// Where the parameter file is written, relative to the project root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("files"),
            prefix: "parameter_file".to_string(),
        }
    }
}

/// Complete configuration of a parameter-file build
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub cosmology: CosmologyParams,
    pub cmb: CmbConfig,
    pub secondaries: SecondaryConfig,
    pub inpainting: InpaintConfig,
    pub compton_y: ComptonYConfig,
    pub sampling: SamplingConfig,
    pub output: OutputConfig,
}

impl SimulationConfig {
    /// Load a configuration from JSON; missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Grid of the CMB maps at `resolution_arcmin`
    pub fn cmb_params(&self, resolution_arcmin: f64) -> MapParams {
        MapParams::square(self.cmb.box_arcmin, resolution_arcmin)
    }

    /// Grid of the kSZ/tSZ maps at `resolution_arcmin`
    pub fn secondary_params(&self, resolution_arcmin: f64) -> MapParams {
        MapParams::square(self.secondaries.box_arcmin, resolution_arcmin)
    }

    /// Check the configuration against the grids it implies at `resolution_arcmin`.
    pub fn validate(&self, resolution_arcmin: f64) -> Result<(), ConfigError> {
        if !(resolution_arcmin.is_finite() && resolution_arcmin > 0.0) {
            return Err(ConfigError::InvalidResolution(resolution_arcmin));
        }

        let cmb_pixels = (self.cmb.box_arcmin / resolution_arcmin) as usize;
        if cmb_pixels < 2 {
            return Err(invalid(
                "cmb.box_arcmin",
                format!(
                    "{} arcmin box holds {} pixels at {} arcmin",
                    self.cmb.box_arcmin, cmb_pixels, resolution_arcmin
                ),
            ));
        }
        if self.cmb.noise_uk_arcmin.is_nan() || self.cmb.noise_uk_arcmin < 0.0 {
            return Err(invalid("cmb.noise_uk_arcmin", "must be non-negative"));
        }

        let radii = self.inpainting.radii;
        if !(radii.inner_arcmin > 0.0 && radii.outer_arcmin > radii.inner_arcmin) {
            return Err(invalid(
                "inpainting.radii",
                format!(
                    "need 0 < inner < outer, got {} and {}",
                    radii.inner_arcmin, radii.outer_arcmin
                ),
            ));
        }
        if radii.outer_arcmin > self.cmb.box_arcmin / 2.0 {
            return Err(invalid(
                "inpainting.radii",
                format!(
                    "outer radius {} arcmin exceeds half the {} arcmin box",
                    radii.outer_arcmin, self.cmb.box_arcmin
                ),
            ));
        }
        if self.inpainting.num_sims < 2 {
            return Err(invalid("inpainting.num_sims", "at least 2 are required"));
        }
        if let Some((row, col)) = self.inpainting.probe_pixel {
            if row >= cmb_pixels || col >= cmb_pixels {
                return Err(invalid(
                    "inpainting.probe_pixel",
                    format!("({row}, {col}) outside the {cmb_pixels}×{cmb_pixels} CMB grid"),
                ));
            }
        }

        let secondary_pixels = (self.secondaries.box_arcmin / resolution_arcmin) as usize;
        let h = self.sampling.neighbourhood_half_width;
        if secondary_pixels <= 2 * h {
            return Err(invalid(
                "secondaries.box_arcmin",
                format!(
                    "{secondary_pixels} pixel maps leave no room for a {}×{} neighbourhood",
                    2 * h + 1,
                    2 * h + 1
                ),
            ));
        }
        if self.sampling.catalog_extent == 0 {
            return Err(invalid("sampling.catalog_extent", "must be positive"));
        }
        if self.compton_y.frequency_hz.is_nan() || self.compton_y.frequency_hz <= 0.0 {
            return Err(invalid("compton_y.frequency_hz", "must be positive"));
        }
        if self.output.prefix.is_empty() {
            return Err(invalid("output.prefix", "must not be empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_fiducial_run() {
        let config = SimulationConfig::default();
        assert_eq!(config.cmb_params(3.0).shape(), (66, 66));
        assert_eq!(config.secondary_params(3.0).shape(), (1000, 1000));
        assert_eq!(config.inpainting.num_sims, 1000);
        assert_eq!(config.inpainting.radii, MaskRadii::default());
        assert_eq!(config.sampling.catalog_extent, 160);
        assert_eq!(config.compton_y.frequency_hz, 143e9);
        config.validate(3.0).unwrap();
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "inpainting": { "num_sims": 50, "probe_pixel": [10, 12] },
            "cmb": { "filter": { "type": "high_pass", "cutoff": 500.0 } }
        }"#;
        let config: SimulationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.inpainting.num_sims, 50);
        assert_eq!(config.inpainting.probe_pixel, Some((10, 12)));
        assert_eq!(config.cmb.filter, FilterType::HighPass { cutoff: 500.0 });
        assert_eq!(config.cmb.box_arcmin, 200.0);
        assert_eq!(config.secondaries, SecondaryConfig::default());
    }

    #[test]
    fn test_json_file_round_trip() {
        let mut config = SimulationConfig::default();
        config.inpainting.composite_map = CompositeMapMode::PerRealization;
        config.compton_y.policy = ConvergencePolicy::Flag;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", serde_json::to_string_pretty(&config).unwrap()).unwrap();
        let loaded = SimulationConfig::from_json_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file() {
        let err = SimulationConfig::from_json_file("/nonexistent/sift.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_rejects_bad_resolution() {
        let config = SimulationConfig::default();
        assert!(matches!(
            config.validate(0.0),
            Err(ConfigError::InvalidResolution(_))
        ));
        assert!(matches!(
            config.validate(f64::NAN),
            Err(ConfigError::InvalidResolution(_))
        ));
    }

    #[test]
    fn test_rejects_probe_outside_grid() {
        let mut config = SimulationConfig::default();
        config.inpainting.probe_pixel = Some((66, 0));
        let err = config.validate(3.0).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "inpainting.probe_pixel",
                ..
            }
        ));
        // Same pixel fits once the grid is finer
        config.validate(2.0).unwrap();
    }

    #[test]
    fn test_rejects_mask_larger_than_box() {
        let mut config = SimulationConfig::default();
        config.inpainting.radii.outer_arcmin = 150.0;
        assert!(config.validate(3.0).is_err());
    }

    #[test]
    fn test_rejects_tiny_secondary_maps() {
        let mut config = SimulationConfig::default();
        config.secondaries.box_arcmin = 12.0;
        assert!(config.validate(3.0).is_err());
        config.secondaries.box_arcmin = 18.0;
        config.validate(3.0).unwrap();
    }
}
