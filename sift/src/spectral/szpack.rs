//! Combined thermal + kinematic SZ signal with temperature/velocity moments.
//!
//! Mirrors the call contract of SZpack's `combo_means`: given dimensionless
//! frequencies `xo = hν/(k_B T_CMB)`, optical depth, electron temperature,
//! line-of-sight velocity and the second-order moments of the temperature
//! and velocity distributions, return `x³ Δn(x)` (intensity in units of
//! `2 (k_B T_CMB)³ / (hc)²`).
//!
//! [`AsymptoticComboModel`] evaluates the signal with the standard
//! asymptotic expansion in `θ_e = k_B T_e / m_e c²`:
//!
//! ```text
//! Δn/τ = G(x) [ θ Y₀ + θ² Y₁ − β (1 + θ C₁) ]
//!      + ½ ω θ² ∂²_θ + σ θ β ∂_θ∂_β          (moment corrections)
//!      + G(x) Y₀ (κ β² + β⊥²) / 3            (velocity-dispersion y-term)
//! ```
//!
//! Positive `betac_para` is a cluster receding from the observer (kSZ
//! decrement). The expansion degrades above a few tens of keV.

use super::npl::g_function;
use super::SI;

/// Cluster parameters for the SZ combination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SzPackParams {
    /// Thomson optical depth
    pub tau: f64,
    /// Mean electron temperature in keV
    pub te_kev: f64,
    /// Line-of-sight peculiar velocity in units of c
    pub betac_para: f64,
    /// Temperature dispersion `⟨T²⟩/⟨T⟩² − 1`
    pub omega: f64,
    /// Temperature-velocity correlation
    pub sigma: f64,
    /// Line-of-sight velocity dispersion `⟨β²⟩/β² − 1`
    pub kappa: f64,
    /// Transverse velocity variance `⟨β⊥²⟩`
    pub betac2_perp: f64,
}

impl SzPackParams {
    /// Cluster without temperature or velocity dispersion
    pub fn new(tau: f64, te_kev: f64, betac_para: f64) -> Self {
        Self {
            tau,
            te_kev,
            betac_para,
            omega: 0.0,
            sigma: 0.0,
            kappa: 0.0,
            betac2_perp: 0.0,
        }
    }

    /// Attach second-order moments of the temperature/velocity distributions
    pub fn with_moments(mut self, omega: f64, sigma: f64, kappa: f64, betac2_perp: f64) -> Self {
        self.omega = omega;
        self.sigma = sigma;
        self.kappa = kappa;
        self.betac2_perp = betac2_perp;
        self
    }

    /// Electron temperature in units of the electron rest energy
    pub fn theta_e(&self) -> f64 {
        self.te_kev / SI::ELECTRON_REST_ENERGY_KEV
    }

    /// Evaluate `x³ Δn` with the default asymptotic model.
    pub fn sz_combo_means(&self, xo: &[f64]) -> Vec<f64> {
        AsymptoticComboModel.combo_means(self, xo)
    }
}

/// A model producing `x³ Δn` for a set of dimensionless frequencies.
pub trait SzComboModel {
    fn combo_means(&self, params: &SzPackParams, xo: &[f64]) -> Vec<f64>;
}

/// Second-order asymptotic expansion of the SZ effect.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsymptoticComboModel;

/// Frequency shape functions evaluated once per `x`.
struct ShapeTerms {
    g: f64,
    y0: f64,
    y1: f64,
    c1: f64,
}

impl ShapeTerms {
    fn at(x: f64) -> Self {
        let xt = x / (0.5 * x).tanh();
        let st = x / (0.5 * x).sinh();
        let st2 = st * st;

        let y0 = xt - 4.0;
        let y1 = -10.0 + 47.0 / 2.0 * xt - 42.0 / 5.0 * xt * xt
            + 7.0 / 10.0 * xt.powi(3)
            + st2 * (-21.0 / 5.0 + 7.0 / 5.0 * xt);
        let c1 = 10.0 - 47.0 / 5.0 * xt + 7.0 / 5.0 * xt * xt + 7.0 / 10.0 * st2;

        Self {
            g: g_function(x),
            y0,
            y1,
            c1,
        }
    }
}

impl SzComboModel for AsymptoticComboModel {
    fn combo_means(&self, params: &SzPackParams, xo: &[f64]) -> Vec<f64> {
        let theta = params.theta_e();
        let beta = params.betac_para;

        xo.iter()
            .map(|&x| {
                let s = ShapeTerms::at(x);
                let thermal = theta * s.y0 + theta * theta * s.y1;
                let kinematic = -beta * (1.0 + theta * s.c1);
                let temperature_moment = params.omega * theta * theta * s.y1;
                let correlation_moment = -params.sigma * theta * beta * s.c1;
                let dispersion = s.y0 * (params.kappa * beta * beta + params.betac2_perp) / 3.0;

                let dn = params.tau
                    * s.g
                    * (thermal + kinematic + temperature_moment + correlation_moment + dispersion);
                x.powi(3) * dn
            })
            .collect()
    }
}

/// Flat-argument form of the SZpack `combo_means` call.
#[allow(clippy::too_many_arguments)]
pub fn combo_means(
    xo: &[f64],
    tau: f64,
    te_kev: f64,
    betac_para: f64,
    omega: f64,
    sigma: f64,
    kappa: f64,
    betac2_perp: f64,
) -> Vec<f64> {
    SzPackParams::new(tau, te_kev, betac_para)
        .with_moments(omega, sigma, kappa, betac2_perp)
        .sz_combo_means(xo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectral::{classical_tsz_brightness, SI};
    use approx::assert_relative_eq;

    /// `2 (k_B T_CMB)³ / (hc)²`, the intensity unit of `x³ Δn`
    fn intensity_unit() -> f64 {
        let kt = SI::BOLTZMANN_CONSTANT * SI::T_CMB;
        2.0 * kt.powi(3) / (SI::PLANCK_CONSTANT * SI::SPEED_OF_LIGHT).powi(2)
    }

    #[test]
    fn test_empty_cluster_has_no_signal() {
        let out = combo_means(&[0.5, 1.0, 5.0], 0.01, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        assert!(out.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_cold_cluster_matches_classical_tsz() {
        let params = SzPackParams::new(0.01, 0.01, 0.0);
        let y = params.tau * params.theta_e();
        for x in [1.0, 2.0, 6.0] {
            let nu = x * SI::BOLTZMANN_CONSTANT * SI::T_CMB / SI::PLANCK_CONSTANT;
            let expected = classical_tsz_brightness(y, nu) / intensity_unit();
            let got = params.sz_combo_means(&[x])[0];
            assert_relative_eq!(got, expected, max_relative = 1e-3);
        }
    }

    #[test]
    fn test_kinematic_term_sign() {
        // Receding cluster: decrement at every frequency
        let out = combo_means(&[0.5, 2.0, 8.0], 0.01, 0.0, 1e-3, 0.0, 0.0, 0.0, 0.0);
        for (x, value) in [0.5f64, 2.0, 8.0].iter().zip(out) {
            assert!(value < 0.0);
            assert_relative_eq!(
                value,
                -0.01 * 1e-3 * x.powi(3) * g_function(*x),
                max_relative = 1e-12
            );
        }
    }

    #[test]
    fn test_temperature_dispersion_adds_y1_term() {
        let base = SzPackParams::new(0.01, 8.0, 0.0);
        let spread = base.with_moments(0.3, 0.0, 0.0, 0.0);
        let x = 3.0;
        let s = ShapeTerms::at(x);
        let theta = base.theta_e();
        let delta = spread.sz_combo_means(&[x])[0] - base.sz_combo_means(&[x])[0];
        assert_relative_eq!(
            delta,
            x.powi(3) * 0.01 * s.g * 0.3 * theta * theta * s.y1,
            max_relative = 1e-10
        );
    }

    #[test]
    fn test_transverse_velocity_acts_like_y() {
        let params = SzPackParams::new(0.01, 0.0, 0.0).with_moments(0.0, 0.0, 0.0, 3e-6);
        let x = 1.5;
        let s = ShapeTerms::at(x);
        assert_relative_eq!(
            params.sz_combo_means(&[x])[0],
            x.powi(3) * 0.01 * s.g * s.y0 * 1e-6,
            max_relative = 1e-12
        );
    }
}
