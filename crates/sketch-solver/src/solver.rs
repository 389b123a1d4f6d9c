use model_types::{SketchConstraint, SketchElement};
use nalgebra::{DMatrix, DVector};
use tracing::instrument;

use crate::entity_mapping::SolverSystem;
use crate::status::classify_status;
use crate::types::{SolveError, SolvedSketch, SolverConfig, SolverResult};

/// Relative singular-value cutoff used when counting independent equations.
const RANK_EPSILON: f64 = 1e-6;

/// Solve the constraints of a sketch and return its repositioned elements.
///
/// The input is never modified; on error the caller keeps its geometry.
#[instrument(skip_all, fields(elements = elements.len(), constraints = constraints.len()))]
pub fn solve_sketch(
    elements: &[SketchElement],
    constraints: &[SketchConstraint],
    config: &SolverConfig,
) -> Result<SolvedSketch, SolveError> {
    let mut system = SolverSystem::from_elements(elements);
    system.add_constraints(constraints)?;

    let result = solve_system(&system, config)?;
    let rank = jacobian_rank(&system, &result.params, config.finite_difference_step);
    let status = classify_status(system.params.len(), rank);
    tracing::debug!(
        iterations = result.iterations,
        residual = result.final_residual,
        ?status,
        "sketch solved"
    );

    Ok(SolvedSketch {
        elements: system.project(elements, &result.params),
        status,
        iterations: result.iterations,
        residual: result.final_residual,
    })
}

/// Levenberg-Marquardt over the system's parameters.
///
/// Each iteration solves `(JᵀJ + λI) δ = -Jᵀr`. A step is kept only if it lowers
/// the squared residual; λ shrinks after a kept step and grows otherwise.
pub fn solve_system(system: &SolverSystem, config: &SolverConfig) -> Result<SolverResult, SolveError> {
    let mut params = system.params.clone();
    if params.iter().any(|p| !p.is_finite()) {
        return Err(SolveError::NonFinite);
    }

    let n = params.len();
    let mut residuals = system.residuals(&params);
    if n == 0 || residuals.is_empty() {
        return Ok(SolverResult {
            iterations: 0,
            final_residual: 0.0,
            params,
        });
    }

    let mut lambda = config.lambda_initial;

    for iteration in 0..config.max_iterations {
        if residuals.iter().any(|r| !r.is_finite()) {
            return Err(SolveError::NonFinite);
        }
        let worst = max_abs(&residuals);
        if worst <= config.tolerance {
            return Ok(SolverResult {
                iterations: iteration,
                final_residual: worst,
                params,
            });
        }

        let jacobian = numeric_jacobian(system, &params, config.finite_difference_step);
        let r = DVector::from_column_slice(&residuals);
        let jt = jacobian.transpose();
        let normal = &jt * &jacobian;
        let gradient = &jt * &r;
        let cost = r.norm_squared();

        let step = (normal + DMatrix::<f64>::identity(n, n) * lambda)
            .cholesky()
            .map(|chol| -chol.solve(&gradient));

        match step {
            Some(delta) if delta.iter().all(|d| d.is_finite()) => {
                let scale = params.iter().fold(1.0_f64, |acc, p| acc.max(p.abs()));
                if delta.amax() <= f64::EPSILON * scale {
                    return Err(SolveError::Stalled {
                        iterations: iteration,
                        residual: worst,
                    });
                }

                let trial: Vec<f64> = params.iter().zip(delta.iter()).map(|(p, d)| p + d).collect();
                let trial_residuals = system.residuals(&trial);
                let trial_cost: f64 = trial_residuals.iter().map(|r| r * r).sum();

                if trial_cost.is_finite() && trial_cost < cost {
                    params = trial;
                    residuals = trial_residuals;
                    lambda = (lambda / config.lambda_factor).max(1e-12);
                    continue;
                }
                lambda *= config.lambda_factor;
            }
            _ => lambda *= config.lambda_factor,
        }

        if lambda > config.lambda_max {
            return Err(SolveError::Stalled {
                iterations: iteration + 1,
                residual: worst,
            });
        }
    }

    let worst = max_abs(&residuals);
    if worst <= config.tolerance {
        Ok(SolverResult {
            iterations: config.max_iterations,
            final_residual: worst,
            params,
        })
    } else {
        Err(SolveError::DidNotConverge {
            max_iterations: config.max_iterations,
            residual: worst,
        })
    }
}

fn max_abs(values: &[f64]) -> f64 {
    values.iter().fold(0.0, |acc, v| acc.max(v.abs()))
}

/// Central-difference Jacobian, one row per residual and one column per parameter.
fn numeric_jacobian(system: &SolverSystem, params: &[f64], h: f64) -> DMatrix<f64> {
    let rows = system.residual_count();
    let mut jacobian = DMatrix::zeros(rows, params.len());
    let mut probe = params.to_vec();

    for col in 0..params.len() {
        let original = probe[col];
        probe[col] = original + h;
        let plus = system.residuals(&probe);
        probe[col] = original - h;
        let minus = system.residuals(&probe);
        probe[col] = original;

        for row in 0..rows {
            jacobian[(row, col)] = (plus[row] - minus[row]) / (2.0 * h);
        }
    }

    jacobian
}

/// Number of independent equations at `params`.
fn jacobian_rank(system: &SolverSystem, params: &[f64], h: f64) -> usize {
    if params.is_empty() || system.residual_count() == 0 {
        return 0;
    }
    let svd = numeric_jacobian(system, params, h).svd(false, false);
    let largest = svd.singular_values.max();
    svd.rank(RANK_EPSILON * largest.max(1.0))
}
