//! Blackbody differential brightness and the classical tSZ distortion.
//!
//! Both laws are pure and elementwise. Scalar versions are the primitives;
//! the `_spectrum` variants sweep a frequency list and the `_array`
//! variants broadcast over an `ndarray` of Compton-y or temperature values.
//! No range checks are applied: physically implausible inputs return
//! whatever the formulas produce.

use ndarray::{Array, ArrayBase, Data, Dimension};

use super::{dimensionless_frequency, SI};

/// Planck spectral radiance `B_ν(T)` in W m⁻² Hz⁻¹ sr⁻¹.
///
/// Written as `2 k_B T ν²/c² · x/(eˣ − 1)`, the form used by the tSZ law.
pub fn planck_brightness(frequency_hz: f64, temperature: f64) -> f64 {
    let x = dimensionless_frequency(frequency_hz, temperature);
    2.0 * SI::BOLTZMANN_CONSTANT * temperature * frequency_hz * frequency_hz
        / (SI::SPEED_OF_LIGHT * SI::SPEED_OF_LIGHT)
        * (x / x.exp_m1())
}

/// Brightness change of the CMB blackbody caused by a temperature perturbation.
///
/// The perturbed blackbody temperature is `T_eff = T_CMB / (1 + ΔT)` and the
/// result is `I·x⁴·eˣ/(eˣ − 1)² / T_eff · ΔT` with `x = hν/(k_B T_eff)` and
/// `I = (2h/c²)(k_B T_eff/h)³`.
///
/// # Arguments
/// * `delta_t` - Temperature perturbation of the pixel
/// * `frequency_hz` - Observing frequency in Hz
///
/// # Returns
/// Spectral radiance in W m⁻² Hz⁻¹ sr⁻¹. Zero when `delta_t` is zero.
pub fn differential_brightness(delta_t: f64, frequency_hz: f64) -> f64 {
    let temperature = SI::T_CMB / (1.0 + delta_t);
    let x = dimensionless_frequency(frequency_hz, temperature);
    let intensity = (2.0 * SI::PLANCK_CONSTANT / (SI::SPEED_OF_LIGHT * SI::SPEED_OF_LIGHT))
        * (SI::BOLTZMANN_CONSTANT * temperature / SI::PLANCK_CONSTANT).powi(3);
    let exp_m1 = x.exp_m1();
    intensity * (x.powi(4) * x.exp() / (exp_m1 * exp_m1)) / temperature * delta_t
}

/// Classical non-relativistic thermal SZ brightness for Compton parameter `y`.
///
/// `y · [x eˣ/(eˣ − 1)] · [x (eˣ + 1)/(eˣ − 1) − 4] · B_ν(T_CMB)` with
/// `x = hν/(k_B T_CMB)`. Negative below the ~217 GHz null, positive above.
pub fn classical_tsz_brightness(y: f64, frequency_hz: f64) -> f64 {
    y * classical_tsz_shape(frequency_hz)
}

/// Brightness per unit Compton-y at `frequency_hz`.
pub(crate) fn classical_tsz_shape(frequency_hz: f64) -> f64 {
    let x = dimensionless_frequency(frequency_hz, SI::T_CMB);
    let exp_x = x.exp();
    let exp_m1 = x.exp_m1();
    (x * exp_x / exp_m1) * (x * (exp_x + 1.0) / exp_m1 - 4.0)
        * planck_brightness(frequency_hz, SI::T_CMB)
}

/// Classical tSZ brightness of a fixed `y` across a list of frequencies.
pub fn classical_tsz_spectrum(y: f64, frequencies_hz: &[f64]) -> Vec<f64> {
    frequencies_hz
        .iter()
        .map(|&nu| classical_tsz_brightness(y, nu))
        .collect()
}

/// Differential brightness of a fixed `delta_t` across a list of frequencies.
pub fn differential_brightness_spectrum(delta_t: f64, frequencies_hz: &[f64]) -> Vec<f64> {
    frequencies_hz
        .iter()
        .map(|&nu| differential_brightness(delta_t, nu))
        .collect()
}

/// Elementwise [`differential_brightness`] over an array of perturbations.
pub fn differential_brightness_array<S, D>(
    delta_t: &ArrayBase<S, D>,
    frequency_hz: f64,
) -> Array<f64, D>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    delta_t.mapv(|dt| differential_brightness(dt, frequency_hz))
}

/// Elementwise [`classical_tsz_brightness`] over an array of Compton-y values.
pub fn classical_tsz_brightness_array<S, D>(
    y: &ArrayBase<S, D>,
    frequency_hz: f64,
) -> Array<f64, D>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    let shape = classical_tsz_shape(frequency_hz);
    y.mapv(|value| value * shape)
}
