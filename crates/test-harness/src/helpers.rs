//! Helper functions: error type, tracing setup, sketch shape builders.

use std::sync::Once;

use model_types::{Point2, SketchElement};
use tracing_subscriber::EnvFilter;

// ── Error Type ──────────────────────────────────────────────────────────────

/// Unified error type for the test harness.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("feature not found: {name}")]
    FeatureNotFound { name: String },

    #[error("sketch element not found: {name}")]
    ElementNotFound { name: String },

    #[error("dispatch error: {message}")]
    DispatchError { message: String },

    #[error("assertion failed: {detail}")]
    AssertionFailed { detail: String },

    #[error("duplicate name: {name}")]
    DuplicateName { name: String },
}

// ── Tracing ─────────────────────────────────────────────────────────────────

static TRACING: Once = Once::new();

/// Install a test-friendly subscriber once per process.
///
/// Filtered by `RUST_LOG`, defaulting to warnings.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

// ── Shape Builders ──────────────────────────────────────────────────────────

/// Lines joining `points` in order, closed back to the first point.
pub fn polygon(points: &[[f64; 2]]) -> Vec<SketchElement> {
    let n = points.len();
    (0..n)
        .map(|i| {
            let [x0, y0] = points[i];
            let [x1, y1] = points[(i + 1) % n];
            SketchElement::line(Point2::new(x0, y0), Point2::new(x1, y1))
        })
        .collect()
}

/// Lines joining `points` in order, left open.
pub fn polyline(points: &[[f64; 2]]) -> Vec<SketchElement> {
    points
        .windows(2)
        .map(|w| SketchElement::line(Point2::new(w[0][0], w[0][1]), Point2::new(w[1][0], w[1][1])))
        .collect()
}

/// Four lines tracing an axis-aligned square, counter-clockwise from `(x, y)`.
pub fn square_lines(x: f64, y: f64, size: f64) -> Vec<SketchElement> {
    polygon(&[[x, y], [x + size, y], [x + size, y + size], [x, y + size]])
}
