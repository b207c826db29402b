//! Scalar nonlinear root finding.
//!
//! Newton iteration with a forward-difference derivative. The step size of
//! the difference scales with the iterate so the solver behaves the same for
//! roots of order 1e-6 as for roots of order 1. Every call reports whether
//! it converged instead of silently handing back the last iterate.

use serde::{Deserialize, Serialize};

/// Stopping criteria for [`solve_scalar`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootOptions {
    /// Relative step tolerance: stop once `|Δx| ≤ xtol · (|x| + xtol)`
    pub xtol: f64,
    /// Maximum number of Newton steps
    pub max_iterations: usize,
}

impl Default for RootOptions {
    fn default() -> Self {
        Self {
            xtol: 1.49012e-8,
            max_iterations: 100,
        }
    }
}

/// Outcome of a root search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootSolution {
    /// Last iterate
    pub root: f64,
    /// `f(root)`
    pub residual: f64,
    /// Newton steps taken
    pub iterations: usize,
    /// Whether a stopping criterion was met
    pub converged: bool,
}

/// Find `x` with `f(x) = 0` starting from `x0`.
///
/// # Arguments
/// * `f` - Function whose root is sought
/// * `x0` - Starting point
/// * `options` - Stopping criteria
///
/// # Returns
/// The final iterate with its residual. `converged` is false when the
/// iteration cap was hit, the derivative vanished, or a non-finite value
/// appeared.
pub fn solve_scalar<F>(f: F, x0: f64, options: &RootOptions) -> RootSolution
where
    F: Fn(f64) -> f64,
{
    let sqrt_eps = f64::EPSILON.sqrt();
    let mut x = x0;
    let mut fx = f(x);

    for iteration in 0..options.max_iterations {
        if fx == 0.0 {
            return RootSolution {
                root: x,
                residual: fx,
                iterations: iteration,
                converged: true,
            };
        }
        if !fx.is_finite() {
            break;
        }

        let h = if x == 0.0 { sqrt_eps } else { sqrt_eps * x.abs() };
        let slope = (f(x + h) - fx) / h;
        if slope == 0.0 || !slope.is_finite() {
            return RootSolution {
                root: x,
                residual: fx,
                iterations: iteration,
                converged: false,
            };
        }

        let step = fx / slope;
        x -= step;
        fx = f(x);

        if step.abs() <= options.xtol * (x.abs() + options.xtol) {
            return RootSolution {
                root: x,
                residual: fx,
                iterations: iteration + 1,
                converged: fx.is_finite(),
            };
        }
    }

    RootSolution {
        root: x,
        residual: fx,
        iterations: options.max_iterations,
        converged: false,
    }
}
