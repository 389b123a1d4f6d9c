use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::graph::FeatureGraph;

/// A total order over the graph, safe to evaluate front to back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationOrder {
    pub ids: Vec<Uuid>,
    /// Set when the dependency relation has a cycle and `ids` fell back to
    /// creation order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<CycleFault>,
}

impl EvaluationOrder {
    pub fn has_cycle(&self) -> bool {
        self.fault.is_some()
    }
}

/// Features that could not be topologically ordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleFault {
    /// In sequence order.
    pub unresolved: Vec<Uuid>,
}

impl FeatureGraph {
    /// Kahn's algorithm over dependency edges between present features.
    ///
    /// Ready features are processed first in, first out, seeded and fed in
    /// sequence order. On a cycle every feature is returned sorted by creation
    /// time and the leftover features are reported in [`CycleFault`].
    pub fn evaluation_order(&self) -> EvaluationOrder {
        let features = self.features();
        let position: HashMap<Uuid, usize> =
            features.iter().enumerate().map(|(i, f)| (f.id, i)).collect();

        let mut in_degree: Vec<usize> = features
            .iter()
            .map(|f| {
                f.operation
                    .dependencies()
                    .iter()
                    .filter(|dep| position.contains_key(dep))
                    .count()
            })
            .collect();

        let mut queue: VecDeque<usize> = (0..features.len()).filter(|&i| in_degree[i] == 0).collect();
        let mut ids = Vec::with_capacity(features.len());
        let mut emitted = vec![false; features.len()];

        while let Some(i) = queue.pop_front() {
            let id = features[i].id;
            ids.push(id);
            emitted[i] = true;

            let mut ready: Vec<usize> = self
                .index()
                .dependents_of(id)
                .into_iter()
                .flatten()
                .filter_map(|dependent| position.get(dependent).copied())
                .collect();
            ready.sort_unstable();
            for j in ready {
                in_degree[j] -= 1;
                if in_degree[j] == 0 {
                    queue.push_back(j);
                }
            }
        }

        if ids.len() == features.len() {
            return EvaluationOrder { ids, fault: None };
        }

        let unresolved: Vec<Uuid> = features
            .iter()
            .zip(&emitted)
            .filter(|(_, done)| !**done)
            .map(|(f, _)| f.id)
            .collect();
        tracing::warn!(
            unresolved = unresolved.len(),
            "dependency cycle detected; falling back to creation order"
        );

        let mut by_creation: Vec<(usize, &Uuid, _)> = features
            .iter()
            .enumerate()
            .map(|(i, f)| (i, &f.id, f.created_at))
            .collect();
        by_creation.sort_by_key(|(i, _, created)| (*created, *i));

        EvaluationOrder {
            ids: by_creation.into_iter().map(|(_, id, _)| *id).collect(),
            fault: Some(CycleFault { unresolved }),
        }
    }
}
