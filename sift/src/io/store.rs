//! On-disk storage of parameter files.
//!
//! Parameter files live in `<project root>/files/` by default, where the
//! project root is the nearest ancestor directory holding a `.git` entry.
//! Each matrix is written as `<prefix>_<R>.npy` next to a
//! `<prefix>_<R>.json` sidecar recording how it was produced.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;
use ndarray::Array2;
use ndarray_npy::{read_npy, ReadNpyError, WriteNpyError, WriteNpyExt};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::config::{OutputConfig, SimulationConfig};
use crate::sims::ParameterMatrix;

/// Entry marking the project root
const ROOT_MARKER: &str = ".git";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No project root (directory containing .git) above {0}")]
    ProjectRootNotFound(PathBuf),
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write npy file: {0}")]
    WriteNpy(#[from] WriteNpyError),
    #[error("Failed to read npy file: {0}")]
    ReadNpy(#[from] ReadNpyError),
    #[error("Metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
    #[error("Stored array has shape {0:?}, expected 5 columns")]
    BadShape((usize, usize)),
}

/// Provenance written next to every parameter file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub seed: u64,
    pub resolution_arcmin: f64,
    pub realizations: usize,
    pub config: SimulationConfig,
}

/// Nearest ancestor of `start` (inclusive) that contains `.git`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    find_marked_ancestor(start, ROOT_MARKER)
}

fn find_marked_ancestor(start: &Path, marker: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(marker).exists())
        .map(Path::to_path_buf)
}

/// Location and naming of stored parameter files
#[derive(Debug, Clone)]
pub struct ParameterStore {
    output_dir: PathBuf,
    prefix: String,
}

impl ParameterStore {
    /// Store under the project root enclosing the current directory.
    pub fn discover(output: &OutputConfig) -> Result<Self, StoreError> {
        let cwd = std::env::current_dir().map_err(|source| StoreError::Io {
            path: PathBuf::from("."),
            source,
        })?;
        Self::discover_from(&cwd, output)
    }

    /// Store under the project root enclosing `start`.
    pub fn discover_from(start: &Path, output: &OutputConfig) -> Result<Self, StoreError> {
        Self::discover_marked(start, ROOT_MARKER, output)
    }

    fn discover_marked(
        start: &Path,
        marker: &str,
        output: &OutputConfig,
    ) -> Result<Self, StoreError> {
        let root = find_marked_ancestor(start, marker)
            .ok_or_else(|| StoreError::ProjectRootNotFound(start.to_path_buf()))?;
        Ok(Self::with_path(root.join(&output.dir), &output.prefix))
    }

    /// Store in an explicit directory
    pub fn with_path(output_dir: PathBuf, prefix: &str) -> Self {
        Self {
            output_dir,
            prefix: prefix.to_string(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path of the `.npy` file for a run of `realizations` rows
    pub fn matrix_path(&self, realizations: usize) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}.npy", self.prefix, realizations))
    }

    /// Path of the JSON sidecar for a run of `realizations` rows
    pub fn metadata_path(&self, realizations: usize) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}.json", self.prefix, realizations))
    }

    /// Write `matrix` and its metadata, creating the output directory if needed.
    ///
    /// Both files are staged as temporaries in the output directory and only
    /// renamed into place once both are complete. If either rename fails,
    /// neither final file is left behind. Returns the path of the `.npy` file.
    /// Existing files are overwritten.
    pub fn save(
        &self,
        matrix: &ParameterMatrix,
        metadata: &RunMetadata,
    ) -> Result<PathBuf, StoreError> {
        std::fs::create_dir_all(&self.output_dir).map_err(|source| StoreError::Io {
            path: self.output_dir.clone(),
            source,
        })?;

        let staged_matrix = self.stage_matrix(&matrix.to_array2())?;
        let staged_metadata = self.stage_metadata(metadata)?;

        let path = self.matrix_path(matrix.len());
        let sidecar = self.metadata_path(matrix.len());

        staged_metadata
            .persist(&sidecar)
            .map_err(|err| StoreError::Io {
                path: sidecar.clone(),
                source: err.error,
            })?;
        if let Err(err) = staged_matrix.persist(&path) {
            // Sidecar without its matrix is not a parameter file
            let _ = std::fs::remove_file(&sidecar);
            return Err(StoreError::Io {
                path,
                source: err.error,
            });
        }

        info!("Saved parameter file {}", path.display());
        Ok(path)
    }

    fn temp_file(&self) -> Result<NamedTempFile, StoreError> {
        NamedTempFile::new_in(&self.output_dir).map_err(|source| StoreError::Io {
            path: self.output_dir.clone(),
            source,
        })
    }

    fn stage_matrix(&self, array: &Array2<f64>) -> Result<NamedTempFile, StoreError> {
        let mut staged = self.temp_file()?;
        let staged_path = staged.path().to_path_buf();
        let mut writer = BufWriter::new(staged.as_file_mut());
        array.write_npy(&mut writer)?;
        writer.flush().map_err(|source| StoreError::Io {
            path: staged_path,
            source,
        })?;
        drop(writer);
        Ok(staged)
    }

    fn stage_metadata(&self, metadata: &RunMetadata) -> Result<NamedTempFile, StoreError> {
        let mut staged = self.temp_file()?;
        let staged_path = staged.path().to_path_buf();
        let mut writer = BufWriter::new(staged.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, metadata)?;
        writer.flush().map_err(|source| StoreError::Io {
            path: staged_path,
            source,
        })?;
        drop(writer);
        Ok(staged)
    }

    /// Read back the matrix stored for `realizations` rows.
    pub fn load(&self, realizations: usize) -> Result<ParameterMatrix, StoreError> {
        let array: Array2<f64> = read_npy(self.matrix_path(realizations))?;
        ParameterMatrix::from_array2(&array).ok_or(StoreError::BadShape(array.dim()))
    }

    /// Read back the metadata stored for `realizations` rows.
    pub fn load_metadata(&self, realizations: usize) -> Result<RunMetadata, StoreError> {
        let path = self.metadata_path(realizations);
        let text = std::fs::read_to_string(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sims::ParameterRow;

    fn matrix() -> ParameterMatrix {
        let mut matrix = ParameterMatrix::new();
        matrix.push(ParameterRow::from_array([12.0, 150.0, 1.5e-6, -2e-7, 3e-6]));
        matrix.push(ParameterRow::from_array([0.0, 7.0, -4e-6, 1e-7, -1e-6]));
        matrix
    }

    fn metadata() -> RunMetadata {
        RunMetadata {
            seed: 40,
            resolution_arcmin: 3.0,
            realizations: 2,
            config: SimulationConfig::default(),
        }
    }

    #[test]
    fn test_finds_enclosing_git_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_project_root(&nested), Some(dir.path().to_path_buf()));

        let store = ParameterStore::discover_from(&nested, &OutputConfig::default()).unwrap();
        assert_eq!(store.output_dir(), dir.path().join("files"));
        assert_eq!(
            store.matrix_path(100),
            dir.path().join("files").join("parameter_file_100.npy")
        );
    }

    #[test]
    fn test_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a");
        std::fs::create_dir(&nested).unwrap();
        let marker = format!(
            ".root-{}",
            dir.path().file_name().unwrap().to_string_lossy()
        );

        assert_eq!(find_marked_ancestor(&nested, &marker), None);
        let err = ParameterStore::discover_marked(&nested, &marker, &OutputConfig::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::ProjectRootNotFound(path) if path == nested));

        std::fs::create_dir(dir.path().join(&marker)).unwrap();
        let store =
            ParameterStore::discover_marked(&nested, &marker, &OutputConfig::default()).unwrap();
        assert_eq!(store.output_dir(), dir.path().join("files"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParameterStore::with_path(dir.path().join("out"), "parameter_file");
        let path = store.save(&matrix(), &metadata()).unwrap();

        assert_eq!(path, dir.path().join("out").join("parameter_file_2.npy"));
        assert_eq!(store.load(2).unwrap(), matrix());
        assert_eq!(store.load_metadata(2).unwrap(), metadata());
    }

    fn entries(dir: &Path) -> Vec<PathBuf> {
        let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        entries.sort();
        entries
    }

    #[test]
    fn test_save_leaves_only_final_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParameterStore::with_path(dir.path().to_path_buf(), "parameter_file");
        store.save(&matrix(), &metadata()).unwrap();

        assert_eq!(
            entries(dir.path()),
            vec![store.metadata_path(2), store.matrix_path(2)]
        );
    }

    #[test]
    fn test_failed_sidecar_leaves_no_matrix() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParameterStore::with_path(dir.path().to_path_buf(), "parameter_file");
        // A directory in the sidecar's place cannot be replaced by a file
        std::fs::create_dir(store.metadata_path(2)).unwrap();

        let result = store.save(&matrix(), &metadata());

        assert!(matches!(result, Err(StoreError::Io { .. })));
        assert!(!store.matrix_path(2).exists());
        assert_eq!(entries(dir.path()), vec![store.metadata_path(2)]);
    }

    #[test]
    fn test_failed_matrix_removes_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParameterStore::with_path(dir.path().to_path_buf(), "parameter_file");
        std::fs::create_dir(store.matrix_path(2)).unwrap();

        let result = store.save(&matrix(), &metadata());

        assert!(matches!(result, Err(StoreError::Io { .. })));
        assert!(!store.metadata_path(2).exists());
        assert_eq!(entries(dir.path()), vec![store.matrix_path(2)]);
    }

    #[test]
    fn test_empty_matrix_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParameterStore::with_path(dir.path().to_path_buf(), "parameter_file");
        let empty = ParameterMatrix::new();
        let meta = RunMetadata {
            realizations: 0,
            ..metadata()
        };

        let path = store.save(&empty, &meta).unwrap();

        assert_eq!(path, dir.path().join("parameter_file_0.npy"));
        let array: Array2<f64> = read_npy(&path).unwrap();
        assert_eq!(array.dim(), (0, 5));
        assert!(store.load(0).unwrap().is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParameterStore::with_path(dir.path().to_path_buf(), "parameter_file");
        assert!(matches!(store.load(3), Err(StoreError::ReadNpy(_))));
    }

    #[test]
    fn test_load_rejects_wrong_width() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParameterStore::with_path(dir.path().to_path_buf(), "parameter_file");
        ndarray_npy::write_npy(store.matrix_path(4), &Array2::<f64>::zeros((4, 3))).unwrap();
        assert!(matches!(store.load(4), Err(StoreError::BadShape((4, 3)))));
    }
}
