//! Sharp Fourier-space filters.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::FourierGrid;

/// Which multipoles a filter keeps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterType {
    /// Keep `ℓ ≤ cutoff`
    LowPass { cutoff: f64 },
    /// Keep `ℓ ≥ cutoff`
    HighPass { cutoff: f64 },
    /// Keep `lmin ≤ ℓ ≤ lmax`
    BandPass { lmin: f64, lmax: f64 },
}

impl FilterType {
    fn keeps(&self, ell: f64) -> bool {
        match *self {
            FilterType::LowPass { cutoff } => ell <= cutoff,
            FilterType::HighPass { cutoff } => ell >= cutoff,
            FilterType::BandPass { lmin, lmax } => ell >= lmin && ell <= lmax,
        }
    }
}

/// 0/1 mask over the Fourier modes of `grid`.
pub fn fourier_filter(grid: &FourierGrid, filter: FilterType) -> Array2<f64> {
    grid.ell()
        .mapv(|ell| if filter.keeps(ell) { 1.0 } else { 0.0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatsky::MapParams;

    fn grid() -> FourierGrid {
        FourierGrid::new(MapParams::new(32, 32, 3.0, 3.0))
    }

    #[test]
    fn test_low_and_high_pass_are_complementary_off_cutoff() {
        let grid = grid();
        let low = fourier_filter(&grid, FilterType::LowPass { cutoff: 1500.5 });
        let high = fourier_filter(&grid, FilterType::HighPass { cutoff: 1500.5 });
        for (l, h) in low.iter().zip(high.iter()) {
            assert_eq!(l + h, 1.0);
        }
        assert_eq!(low[[0, 0]], 1.0);
    }

    #[test]
    fn test_band_pass_excludes_monopole() {
        let grid = grid();
        let band = fourier_filter(
            &grid,
            FilterType::BandPass {
                lmin: 100.0,
                lmax: 2000.0,
            },
        );
        assert_eq!(band[[0, 0]], 0.0);
        let kept = band.iter().filter(|&&v| v == 1.0).count();
        assert!(kept > 0 && kept < band.len());
    }

    #[test]
    fn test_low_pass_removes_signal_above_cutoff() {
        let grid = grid();
        let filter = fourier_filter(&grid, FilterType::LowPass { cutoff: 0.0 });
        let map = Array2::from_shape_fn((32, 32), |(r, c)| ((r + 2 * c) % 3) as f64);
        let mean = map.mean().unwrap_or(0.0);
        let filtered = grid.apply(&map, &filter);
        for value in filtered.iter() {
            assert!((value - mean).abs() < 1e-12);
        }
    }
}
