//! Instrumental noise power spectra.

use super::ARCMIN_TO_RAD;

/// White noise power `N_ℓ = (σ · arcmin)²` for `ℓ = 0..=lmax`.
///
/// # Arguments
/// * `noise_uk_arcmin` - Map noise level in µK-arcmin
/// * `lmax` - Highest multipole to tabulate
///
/// # Returns
/// Flat spectrum in µK² sr, one entry per multipole.
pub fn white_noise_power(noise_uk_arcmin: f64, lmax: usize) -> Vec<f64> {
    let delta_t_radians = noise_uk_arcmin * ARCMIN_TO_RAD;
    vec![delta_t_radians * delta_t_radians; lmax + 1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_white_noise_level() {
        let nl = white_noise_power(1.0, 100);
        assert_eq!(nl.len(), 101);
        assert_relative_eq!(nl[0], 8.461_594_994_075_24e-8, max_relative = 1e-9);
        assert!(nl.iter().all(|&v| v == nl[0]));
    }

    #[test]
    fn test_noise_scales_quadratically() {
        let low = white_noise_power(1.0, 0)[0];
        let high = white_noise_power(3.0, 0)[0];
        assert_relative_eq!(high / low, 9.0, max_relative = 1e-12);
    }
}
