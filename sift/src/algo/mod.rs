//! Numerical algorithms shared by the map and parameter pipelines.

pub mod root;

pub use root::{solve_scalar, RootOptions, RootSolution};
