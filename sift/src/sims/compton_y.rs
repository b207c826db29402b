//! Temperature → Compton-y inversion.
//!
//! Each pixel solves `ΔI_tSZ(y, ν) = ΔI_T(ΔT, ν)` for `y` at a single
//! reference frequency. Pixels are independent, so the solve is a parallel
//! map over the temperature array.

use log::{info, warn};
use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::algo::{solve_scalar, RootOptions, RootSolution};
use crate::config::ComptonYConfig;
use crate::spectral::brightness::classical_tsz_shape;
use crate::spectral::differential_brightness;

/// What to do with pixels whose root search did not converge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergencePolicy {
    /// Abort with [`ComptonYError::NotConverged`] on the first such pixel
    #[default]
    Fail,
    /// Keep the last iterate, mark the pixel in [`ComptonYMap::converged`] and log a warning
    Flag,
}

#[derive(Debug, Error)]
pub enum ComptonYError {
    #[error("Compton-y solve did not converge at pixel ({row}, {col}), residual {residual:e}")]
    NotConverged {
        row: usize,
        col: usize,
        residual: f64,
    },
}

/// Compton-y map with per-pixel convergence flags
#[derive(Debug, Clone)]
pub struct ComptonYMap {
    pub y: Array2<f64>,
    pub converged: Array2<bool>,
}

impl ComptonYMap {
    pub fn unconverged_count(&self) -> usize {
        self.converged.iter().filter(|&&ok| !ok).count()
    }
}

/// Per-pixel tSZ inverter at a fixed observing frequency
#[derive(Debug, Clone)]
pub struct ComptonYSolver {
    frequency_hz: f64,
    options: RootOptions,
    policy: ConvergencePolicy,
}

impl ComptonYSolver {
    pub fn new(frequency_hz: f64, options: RootOptions, policy: ConvergencePolicy) -> Self {
        assert!(frequency_hz > 0.0, "Frequency must be positive");
        Self {
            frequency_hz,
            options,
            policy,
        }
    }

    pub fn from_config(config: &ComptonYConfig) -> Self {
        Self::new(config.frequency_hz, config.root, config.policy)
    }

    pub fn frequency_hz(&self) -> f64 {
        self.frequency_hz
    }

    /// Root search for a single temperature perturbation `delta_t` (K), starting at `y = 0`
    pub fn solve_pixel(&self, delta_t: f64) -> RootSolution {
        let target = differential_brightness(delta_t, self.frequency_hz);
        let shape = classical_tsz_shape(self.frequency_hz);
        solve_scalar(|y| y * shape - target, 0.0, &self.options)
    }

    /// Convert a tSZ temperature map (K) to Compton-y.
    pub fn solve(&self, temperature: &Array2<f64>) -> Result<ComptonYMap, ComptonYError> {
        let solutions = Zip::from(temperature).par_map_collect(|&dt| self.solve_pixel(dt));

        let y = solutions.mapv(|s| s.root);
        let converged = solutions.mapv(|s| s.converged);
        let failed = converged.iter().filter(|&&ok| !ok).count();

        if failed > 0 {
            match self.policy {
                ConvergencePolicy::Fail => {
                    if let Some(((row, col), s)) =
                        solutions.indexed_iter().find(|(_, s)| !s.converged)
                    {
                        return Err(ComptonYError::NotConverged {
                            row,
                            col,
                            residual: s.residual,
                        });
                    }
                }
                ConvergencePolicy::Flag => {
                    warn!(
                        "{} of {} Compton-y pixels did not converge",
                        failed,
                        temperature.len()
                    );
                }
            }
        }

        info!(
            "Solved Compton-y for {:?} pixels at {:.0} GHz",
            temperature.dim(),
            self.frequency_hz / 1e9
        );
        Ok(ComptonYMap { y, converged })
    }
}
