use model_types::{SketchElement, SolveStatus};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ── Configuration ───────────────────────────────────────────────────────────

/// Configuration for the Levenberg-Marquardt solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SolverConfig {
    pub max_iterations: usize,
    /// Converged once every residual is at most this in magnitude.
    pub tolerance: f64,
    pub lambda_initial: f64,
    pub lambda_factor: f64,
    /// Damping above this means no step can make progress.
    pub lambda_max: f64,
    /// Step used for the central-difference Jacobian.
    pub finite_difference_step: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-9,
            lambda_initial: 1e-3,
            lambda_factor: 10.0,
            lambda_max: 1e12,
            finite_difference_step: 1e-7,
        }
    }
}

// ── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    #[error("did not converge after {max_iterations} iterations (residual {residual:e})")]
    DidNotConverge { max_iterations: usize, residual: f64 },
    #[error("stalled after {iterations} iterations (residual {residual:e}); constraints may be inconsistent")]
    Stalled { iterations: usize, residual: f64 },
    #[error("solver produced a non-finite value")]
    NonFinite,
    #[error("constraint refers to unknown element {0}")]
    UnknownElement(Uuid),
    #[error("constraint {constraint_id} has an invalid target: {reason}")]
    InvalidTarget { constraint_id: Uuid, reason: String },
    #[error("constraint {0} needs a value")]
    MissingValue(Uuid),
}

// ── Results ─────────────────────────────────────────────────────────────────

/// Raw outcome of one numeric solve.
#[derive(Debug, Clone)]
pub struct SolverResult {
    pub iterations: usize,
    /// Largest residual magnitude at the returned parameters.
    pub final_residual: f64,
    pub params: Vec<f64>,
}

/// Sketch geometry after a successful solve.
#[derive(Debug, Clone, PartialEq)]
pub struct SolvedSketch {
    /// Elements in their original order, with solved positions.
    pub elements: Vec<SketchElement>,
    pub status: SolveStatus,
    pub iterations: usize,
    pub residual: f64,
}
