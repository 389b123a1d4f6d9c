use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::graph::FeatureGraph;
use crate::order::CycleFault;
use crate::types::{Feature, InvalidSource};

/// How far a face boundary point may sit off its reconstructed plane.
const PLANE_TOLERANCE: f64 = 1e-6;

/// Opaque per-feature output of an [`Evaluator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub body: String,
}

impl Artifact {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }
}

/// Turns a feature into an artifact, given the artifacts of its dependencies.
///
/// Evaluators read features but never mutate the graph.
pub trait Evaluator {
    fn evaluate(
        &mut self,
        feature: &Feature,
        inputs: &[(&Feature, &Artifact)],
    ) -> Result<Artifact, String>;
}

/// What happened to each feature during a rebuild.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RebuildReport {
    /// Evaluated successfully, in order.
    pub evaluated: Vec<Uuid>,
    /// Clean features whose cached artifact was kept.
    pub reused: Vec<Uuid>,
    /// Invalid from a delete, a failed solve or an unchanged evaluator
    /// failure, left alone.
    pub skipped: Vec<Uuid>,
    /// Invalidated because a dependency is missing, invalid or unbuilt, or a
    /// face sketch cannot be placed.
    pub invalidated: Vec<Uuid>,
    /// Evaluator errors.
    pub failed: Vec<(Uuid, String)>,
    pub cycle: Option<CycleFault>,
}

/// Walk the evaluation order and bring every artifact up to date.
///
/// Dirty or uncached valid features are evaluated; success clears the dirty
/// flag. Features whose dependencies cannot be used are marked invalid.
/// Features this rebuild invalidated earlier are evaluated again once they are
/// dirty and their dependencies are usable; other invalid features are skipped.
pub(crate) fn rebuild(
    graph: &mut FeatureGraph,
    artifacts: &mut HashMap<Uuid, Artifact>,
    evaluator: &mut dyn Evaluator,
) -> RebuildReport {
    let order = graph.evaluation_order();
    let mut report = RebuildReport {
        cycle: order.fault,
        ..RebuildReport::default()
    };

    for id in order.ids {
        let Some(feature) = graph.get(id) else {
            continue;
        };

        let problem = dependency_problem(graph, artifacts, feature).or_else(|| {
            feature
                .sketch()
                .and_then(|sketch| sketch.reference.placement_problem(PLANE_TOLERANCE))
        });
        if let Some(problem) = problem {
            artifacts.remove(&id);
            if let Some(feature) = graph.get_mut(id) {
                if feature.is_valid || feature.invalid_source == Some(InvalidSource::Rebuild) {
                    feature.invalidate(InvalidSource::Rebuild, problem);
                }
            }
            report.invalidated.push(id);
            continue;
        }

        if !feature.is_valid {
            let recheck =
                feature.is_dirty && feature.invalid_source == Some(InvalidSource::Rebuild);
            if !recheck {
                artifacts.remove(&id);
                report.skipped.push(id);
                continue;
            }
        }

        if !feature.is_dirty && artifacts.contains_key(&id) {
            report.reused.push(id);
            continue;
        }

        let outcome = {
            let inputs: Vec<(&Feature, &Artifact)> = feature
                .operation
                .dependencies()
                .into_iter()
                .filter_map(|dep| Some((graph.get(dep)?, artifacts.get(&dep)?)))
                .collect();
            evaluator.evaluate(feature, &inputs)
        };

        match outcome {
            Ok(artifact) => {
                artifacts.insert(id, artifact);
                if let Some(feature) = graph.get_mut(id) {
                    if !feature.is_valid {
                        feature.revalidate();
                    }
                    feature.is_dirty = false;
                }
                report.evaluated.push(id);
            }
            Err(message) => {
                tracing::debug!(%id, %message, "feature evaluation failed");
                artifacts.remove(&id);
                if let Some(feature) = graph.get_mut(id) {
                    // Failed until the feature or something upstream changes.
                    feature.invalidate(InvalidSource::Rebuild, message.clone());
                    feature.is_dirty = false;
                }
                report.failed.push((id, message));
            }
        }
    }

    report
}

fn dependency_problem(
    graph: &FeatureGraph,
    artifacts: &HashMap<Uuid, Artifact>,
    feature: &Feature,
) -> Option<String> {
    feature
        .operation
        .dependencies()
        .into_iter()
        .find_map(|dep| match graph.get(dep) {
            None => Some(format!("Dependency {dep} does not exist")),
            Some(upstream) if !upstream.is_valid => {
                Some(format!("Dependency '{}' is invalid", upstream.name))
            }
            Some(upstream) if !artifacts.contains_key(&dep) => {
                Some(format!("Dependency '{}' has no result", upstream.name))
            }
            Some(_) => None,
        })
}
