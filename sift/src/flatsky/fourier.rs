//! 2-D FFTs and multipole grids for flat-sky maps.

use std::sync::Arc;

use ndarray::{Array2, ArrayViewMut1};
use rustfft::{num_complex::Complex64, Fft, FftPlanner};

use super::MapParams;

/// Sample frequencies of a length-`n` DFT with sample spacing `d`.
///
/// Same ordering as numpy's `fftfreq`: non-negative frequencies first, then
/// the negative ones.
pub fn fftfreq(n: usize, d: f64) -> Vec<f64> {
    let scale = 1.0 / (n as f64 * d);
    let positive = (n - 1) / 2 + 1;
    (0..n)
        .map(|i| {
            if i < positive {
                i as f64 * scale
            } else {
                (i as f64 - n as f64) * scale
            }
        })
        .collect()
}

/// Planned FFTs and the multipole magnitude of every Fourier mode of a map.
///
/// Plans are shared behind `Arc`, so a grid can be used from many rayon
/// tasks at once.
pub struct FourierGrid {
    params: MapParams,
    ell: Array2<f64>,
    forward_rows: Arc<dyn Fft<f64>>,
    inverse_rows: Arc<dyn Fft<f64>>,
    forward_cols: Arc<dyn Fft<f64>>,
    inverse_cols: Arc<dyn Fft<f64>>,
}

impl std::fmt::Debug for FourierGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FourierGrid")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl FourierGrid {
    pub fn new(params: MapParams) -> Self {
        let lx = fftfreq(params.nx, params.dx_radians());
        let ly = fftfreq(params.ny, params.dy_radians());
        let two_pi = 2.0 * std::f64::consts::PI;
        let ell = Array2::from_shape_fn(params.shape(), |(row, col)| {
            two_pi * (lx[col] * lx[col] + ly[row] * ly[row]).sqrt()
        });

        let mut planner = FftPlanner::new();
        Self {
            params,
            ell,
            forward_rows: planner.plan_fft_forward(params.nx),
            inverse_rows: planner.plan_fft_inverse(params.nx),
            forward_cols: planner.plan_fft_forward(params.ny),
            inverse_cols: planner.plan_fft_inverse(params.ny),
        }
    }

    pub fn params(&self) -> &MapParams {
        &self.params
    }

    /// Multipole `ℓ` of every Fourier mode, shape `(ny, nx)`
    pub fn ell(&self) -> &Array2<f64> {
        &self.ell
    }

    /// Unnormalized forward 2-D FFT of a real map.
    pub fn forward(&self, map: &Array2<f64>) -> Array2<Complex64> {
        assert_eq!(
            map.dim(),
            self.params.shape(),
            "Map shape does not match Fourier grid"
        );
        let mut data = map.mapv(|v| Complex64::new(v, 0.0));
        self.transform(&mut data, &self.forward_rows, &self.forward_cols);
        data
    }

    /// Inverse 2-D FFT normalized by `1/(nx·ny)`, keeping the real part.
    pub fn inverse_real(&self, mut spectrum: Array2<Complex64>) -> Array2<f64> {
        self.transform(&mut spectrum, &self.inverse_rows, &self.inverse_cols);
        let norm = 1.0 / self.params.len() as f64;
        spectrum.mapv(|c| c.re * norm)
    }

    /// Multiply the Fourier transform of `map` by `transfer` and transform back.
    pub fn apply(&self, map: &Array2<f64>, transfer: &Array2<f64>) -> Array2<f64> {
        let mut spectrum = self.forward(map);
        spectrum.zip_mut_with(transfer, |c, &t| *c *= t);
        self.inverse_real(spectrum)
    }

    /// Linearly interpolate an ℓ-indexed spectrum onto every Fourier mode.
    ///
    /// Index `i` of `spectrum` holds the value at `ℓ = i`; modes beyond the
    /// last tabulated multipole get zero.
    pub fn interpolate(&self, spectrum: &[f64]) -> Array2<f64> {
        self.ell.mapv(|l| interpolate_spectrum(spectrum, l))
    }

    fn transform(
        &self,
        data: &mut Array2<Complex64>,
        rows: &Arc<dyn Fft<f64>>,
        cols: &Arc<dyn Fft<f64>>,
    ) {
        let mut buffer = vec![Complex64::default(); self.params.nx.max(self.params.ny)];
        for row in data.rows_mut() {
            process_lane(row, rows.as_ref(), &mut buffer);
        }
        for col in data.columns_mut() {
            process_lane(col, cols.as_ref(), &mut buffer);
        }
    }
}

fn process_lane(
    mut lane: ArrayViewMut1<Complex64>,
    fft: &dyn Fft<f64>,
    buffer: &mut [Complex64],
) {
    if let Some(slice) = lane.as_slice_mut() {
        fft.process(slice);
        return;
    }
    let buffer = &mut buffer[..lane.len()];
    for (b, v) in buffer.iter_mut().zip(lane.iter()) {
        *b = *v;
    }
    fft.process(buffer);
    for (v, b) in lane.iter_mut().zip(buffer.iter()) {
        *v = *b;
    }
}

fn interpolate_spectrum(spectrum: &[f64], ell: f64) -> f64 {
    let Some(last) = spectrum.len().checked_sub(1) else {
        return 0.0;
    };
    if ell > last as f64 {
        return 0.0;
    }
    if ell <= 0.0 {
        return spectrum[0];
    }
    let lower = ell.floor() as usize;
    if lower >= last {
        return spectrum[last];
    }
    let frac = ell - lower as f64;
    spectrum[lower] * (1.0 - frac) + spectrum[lower + 1] * frac
}
