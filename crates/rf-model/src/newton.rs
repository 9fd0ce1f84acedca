//! Newton iteration with a per-iteration change limit.

use nalgebra::{DMatrix, DVector};

use crate::error::{ModelError, ModelResult};

/// Newton solver configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewtonSettings {
    /// Maximum Newton updates
    pub max_iterations: usize,
    /// Tolerance on the max-norm of the scaled residual
    pub tolerance: f64,
    /// Largest allowed change of any unknown from the initial guess
    pub max_change: f64,
}

impl Default for NewtonSettings {
    fn default() -> Self {
        Self {
            max_iterations: 30,
            tolerance: 1e-9,
            max_change: 5.0e6,
        }
    }
}

/// Converged Newton solve.
#[derive(Debug, Clone)]
pub struct NewtonOutcome {
    pub x: DVector<f64>,
    pub residual_norm: f64,
    /// Newton updates applied.
    pub iterations: usize,
    /// Linear solves performed (one per update with a direct solver).
    pub linear_iterations: usize,
}

/// Solve `r(x) = 0` from `x0`.
///
/// `assemble` returns the residual and its Jacobian at `x`. Convergence is
/// declared when the residual max-norm drops below `tolerance`; the solve fails
/// on a non-finite residual or update, a singular Jacobian, a change larger than
/// `max_change`, or when the iteration budget runs out.
pub fn newton_solve<F>(
    x0: &DVector<f64>,
    mut assemble: F,
    settings: &NewtonSettings,
) -> ModelResult<NewtonOutcome>
where
    F: FnMut(&DVector<f64>) -> (DVector<f64>, DMatrix<f64>),
{
    let mut x = x0.clone();
    let mut iterations = 0;

    loop {
        let (r, jac) = assemble(&x);
        if r.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::NoConvergence {
                reason: "non-finite residual".to_string(),
                iterations,
            });
        }

        let r_norm = r.amax();
        if r_norm < settings.tolerance {
            return Ok(NewtonOutcome {
                x,
                residual_norm: r_norm,
                iterations,
                linear_iterations: iterations,
            });
        }
        if iterations >= settings.max_iterations {
            return Err(ModelError::NoConvergence {
                reason: format!(
                    "iteration limit {} reached, residual = {:e}",
                    settings.max_iterations, r_norm
                ),
                iterations,
            });
        }

        // Solve J * dx = -r
        let dx = jac
            .lu()
            .solve(&(-r))
            .ok_or_else(|| ModelError::NoConvergence {
                reason: "singular Jacobian".to_string(),
                iterations,
            })?;
        x += dx;
        iterations += 1;

        if x.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::NoConvergence {
                reason: "non-finite update".to_string(),
                iterations,
            });
        }
        let change = (&x - x0).amax();
        if change > settings.max_change {
            return Err(ModelError::NoConvergence {
                reason: format!(
                    "change {:e} exceeds limit {:e}",
                    change, settings.max_change
                ),
                iterations,
            });
        }
    }
}
