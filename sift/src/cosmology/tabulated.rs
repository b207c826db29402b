//! Power spectra read from Boltzmann-code output tables.
//!
//! Accepts the plain-text `*_totCls.dat` / `*_lensedCls.dat` layout written
//! by CAMB: one row per multipole, columns `L TT [EE BB TE ...]` holding
//! `D_ℓ` in µK². Lines starting with `#` are comments. Tables usually start
//! at `L = 2`; missing multipoles are zero.

use std::io::BufRead;
use std::path::Path;

use log::warn;

use super::{
    AngularPowerSpectrum, CosmologyError, CosmologyParams, PowerSpectrumSolver, SpectrumField,
};
use crate::spectral::SI;

/// Column order after the multipole column
const COLUMNS: [SpectrumField; 4] = [
    SpectrumField::TT,
    SpectrumField::EE,
    SpectrumField::BB,
    SpectrumField::TE,
];

/// Solver backed by a precomputed table; the cosmology argument is ignored.
#[derive(Debug, Clone)]
pub struct TabulatedSolver {
    spectra: AngularPowerSpectrum,
    table_lmax: usize,
}

impl TabulatedSolver {
    /// Load a table from disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CosmologyError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| CosmologyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_reader(std::io::BufReader::new(file)).map_err(|e| match e {
            CosmologyError::Io { source, .. } => CosmologyError::Io {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })
    }

    /// Parse a table from any buffered reader.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, CosmologyError> {
        let mut rows: Vec<(usize, Vec<f64>)> = Vec::new();
        let mut n_columns: Option<usize> = None;

        for (index, line) in reader.lines().enumerate() {
            let line_number = index + 1;
            let line = line.map_err(|source| CosmologyError::Io {
                path: String::from("<reader>"),
                source,
            })?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let mut fields = trimmed.split_whitespace();
            let ell = fields
                .next()
                .and_then(|s| s.parse::<f64>().ok())
                .filter(|l| *l >= 0.0 && l.fract() == 0.0)
                .ok_or_else(|| CosmologyError::Parse {
                    line: line_number,
                    reason: "first column must be a non-negative integer multipole".into(),
                })? as usize;

            let values = fields
                .take(COLUMNS.len())
                .map(|s| s.parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| CosmologyError::Parse {
                    line: line_number,
                    reason: e.to_string(),
                })?;

            if values.is_empty() {
                return Err(CosmologyError::Parse {
                    line: line_number,
                    reason: "no spectrum columns".into(),
                });
            }
            match n_columns {
                None => n_columns = Some(values.len()),
                Some(n) if n != values.len() => {
                    return Err(CosmologyError::Parse {
                        line: line_number,
                        reason: format!("expected {n} spectrum columns, found {}", values.len()),
                    })
                }
                Some(_) => {}
            }
            rows.push((ell, values));
        }

        let (Some(n_columns), Some(table_lmax)) =
            (n_columns, rows.iter().map(|(l, _)| *l).max())
        else {
            return Err(CosmologyError::Parse {
                line: 0,
                reason: "table contains no data rows".into(),
            });
        };

        let to_dimensionless = 1.0 / (SI::T_CMB * 1e6).powi(2);
        let mut spectra = AngularPowerSpectrum::new();
        for (column, &field) in COLUMNS.iter().enumerate().take(n_columns) {
            let mut dl = vec![0.0; table_lmax + 1];
            for (ell, values) in &rows {
                dl[*ell] = values[column] * to_dimensionless;
            }
            spectra.insert(field, dl);
        }

        Ok(Self {
            spectra,
            table_lmax,
        })
    }

    /// Highest multipole present in the table
    pub fn table_lmax(&self) -> usize {
        self.table_lmax
    }
}

impl PowerSpectrumSolver for TabulatedSolver {
    fn total_spectra(
        &self,
        _cosmology: &CosmologyParams,
        lmax: usize,
    ) -> Result<AngularPowerSpectrum, CosmologyError> {
        if lmax > self.table_lmax {
            warn!(
                "Spectrum table ends at l={}, padding with zeros up to l={}",
                self.table_lmax, lmax
            );
        }
        Ok(self.spectra.map(|values| {
            let mut out = values.iter().copied().take(lmax + 1).collect::<Vec<_>>();
            out.resize(lmax + 1, 0.0);
            out
        }))
    }
}
