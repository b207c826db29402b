//! Persistence of parameter matrices.

pub mod store;

pub use store::{find_project_root, ParameterStore, RunMetadata, StoreError};
