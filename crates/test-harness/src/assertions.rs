//! Assertion helpers with diagnostic output.
//!
//! Every failure names the context string and enough of the model to see
//! what went wrong without a debugger.

use std::sync::Arc;

use feature_engine::{DependentsIndex, Engine, Feature};
use model_types::{Point2, Sketch};
use uuid::Uuid;

use crate::helpers::HarnessError;

fn fail(ctx: &str, detail: String) -> Result<(), HarnessError> {
    Err(HarnessError::AssertionFailed {
        detail: format!("[{ctx}] {detail}"),
    })
}

/// Assert the incrementally patched dependents index equals a fresh rebuild.
pub fn assert_index_consistent(engine: &Engine, ctx: &str) -> Result<(), HarnessError> {
    let fresh = DependentsIndex::from_features(engine.features().iter().map(Arc::as_ref));
    if engine.graph().index() == &fresh {
        Ok(())
    } else {
        fail(
            ctx,
            format!(
                "dependents index drifted: live {:?}, rebuilt {:?}",
                engine.graph().index(),
                fresh
            ),
        )
    }
}

/// Assert every feature comes after all of its present dependencies.
pub fn assert_dependencies_first(engine: &Engine, ctx: &str) -> Result<(), HarnessError> {
    let order = engine.evaluation_order();
    if let Some(fault) = &order.fault {
        return fail(ctx, format!("unexpected cycle among {:?}", fault.unresolved));
    }
    let position = |id: Uuid| order.ids.iter().position(|x| *x == id);
    for feature in engine.features() {
        let Some(at) = position(feature.id) else {
            return fail(ctx, format!("feature '{}' missing from order", feature.name));
        };
        for dep in feature.operation.dependencies() {
            if let Some(dep_at) = position(dep) {
                if dep_at >= at {
                    return fail(
                        ctx,
                        format!("'{}' ordered before its dependency {dep}", feature.name),
                    );
                }
            }
        }
    }
    Ok(())
}

/// Assert a feature is invalid and its message mentions `needle`.
pub fn assert_invalid_with(feature: &Feature, needle: &str, ctx: &str) -> Result<(), HarnessError> {
    match (&feature.is_valid, &feature.error_message) {
        (false, Some(message)) if message.contains(needle) => Ok(()),
        (valid, message) => fail(
            ctx,
            format!(
                "expected '{}' invalid with message containing {needle:?}, got valid={valid} message={message:?}",
                feature.name
            ),
        ),
    }
}

/// Assert the sketch has exactly these closed profiles, compared as element id
/// lists in traversal order.
pub fn assert_closed_profiles(
    sketch: &Sketch,
    expected: &[Vec<Uuid>],
    ctx: &str,
) -> Result<(), HarnessError> {
    let actual: Vec<Vec<Uuid>> = sketch
        .closed_profiles
        .iter()
        .map(|p| p.element_ids.clone())
        .collect();
    if actual == expected {
        Ok(())
    } else {
        fail(ctx, format!("expected closed profiles {expected:?}, got {actual:?}"))
    }
}

/// Assert two feature lists are equal apart from dirty flags.
pub fn assert_same_features(
    actual: &[Arc<Feature>],
    expected: &[Arc<Feature>],
    ctx: &str,
) -> Result<(), HarnessError> {
    let strip = |features: &[Arc<Feature>]| -> Vec<Feature> {
        features
            .iter()
            .map(|f| Feature {
                is_dirty: false,
                ..f.as_ref().clone()
            })
            .collect()
    };
    let (a, e) = (strip(actual), strip(expected));
    if a == e {
        return Ok(());
    }
    let names = |fs: &[Feature]| fs.iter().map(|f| f.name.clone()).collect::<Vec<_>>();
    fail(
        ctx,
        format!(
            "feature lists differ: expected {:?}, got {:?}",
            names(&e),
            names(&a)
        ),
    )
}

/// Assert a point lies within `tol` of `(x, y)`.
pub fn assert_point_near(point: Point2, x: f64, y: f64, tol: f64, ctx: &str) -> Result<(), HarnessError> {
    if approx::abs_diff_eq!(point.x, x, epsilon = tol) && approx::abs_diff_eq!(point.y, y, epsilon = tol) {
        Ok(())
    } else {
        fail(
            ctx,
            format!("expected ({x:.6}, {y:.6}), got ({:.6}, {:.6}) (tol={tol})", point.x, point.y),
        )
    }
}
