pub mod deps;
pub mod graph;
pub mod history;
pub mod order;
pub mod pending;
pub mod rebuild;
pub mod sketch_edit;
pub mod types;

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

pub use crate::deps::DependentsIndex;
pub use crate::graph::FeatureGraph;
pub use crate::history::{History, Snapshot};
pub use crate::order::{CycleFault, EvaluationOrder};
pub use crate::pending::SolveTicket;
pub use crate::rebuild::{Artifact, Evaluator, RebuildReport};
pub use crate::types::*;

use crate::pending::PendingSolves;

/// The parametric modeling engine.
///
/// Owns the feature graph and its history. Every mutating command commits
/// exactly one snapshot; commands that fail on an unknown id change nothing.
pub struct Engine {
    graph: FeatureGraph,
    history: History,
    config: EngineConfig,
    /// Sketch currently open in the sketch editor.
    editing_sketch: Option<Uuid>,
    /// Feature selected in the feature list.
    active_feature: Option<Uuid>,
    /// Cached results from the last rebuild.
    artifacts: HashMap<Uuid, Artifact>,
    pending: PendingSolves,
}

impl Engine {
    /// Create a new engine with default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            graph: FeatureGraph::new(),
            history: History::new(config.max_snapshots),
            config,
            editing_sketch: None,
            active_feature: None,
            artifacts: HashMap::new(),
            pending: PendingSolves::default(),
        }
    }

    // ── Reads ───────────────────────────────────────────────────────────────

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn graph(&self) -> &FeatureGraph {
        &self.graph
    }

    pub fn features(&self) -> &[Arc<Feature>] {
        self.graph.features()
    }

    pub fn feature(&self, id: Uuid) -> Option<&Feature> {
        self.graph.get(id)
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn editing_sketch(&self) -> Option<Uuid> {
        self.editing_sketch
    }

    pub fn active_feature(&self) -> Option<Uuid> {
        self.active_feature
    }

    pub fn artifact(&self, id: Uuid) -> Option<&Artifact> {
        self.artifacts.get(&id)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn evaluation_order(&self) -> EvaluationOrder {
        self.graph.evaluation_order()
    }

    pub fn dependencies(&self, id: Uuid) -> Result<Vec<Uuid>, EngineError> {
        self.graph
            .dependencies(id)
            .ok_or(EngineError::FeatureNotFound { id })
    }

    pub fn dependents(&self, id: Uuid) -> Result<Vec<Uuid>, EngineError> {
        if !self.graph.contains(id) {
            return Err(EngineError::FeatureNotFound { id });
        }
        Ok(self.graph.dependents(id))
    }

    // ── Feature commands ────────────────────────────────────────────────────

    /// Add a feature at the end of the sequence.
    pub fn add_feature(&mut self, new: NewFeature) -> Uuid {
        let new = NewFeature {
            operation: self.with_detected_profiles(new.operation),
            ..new
        };
        let id = self.graph.add(new);
        let label = self.label_for("Add", id);
        self.commit(label);
        id
    }

    /// Merge a partial update and dirty everything downstream.
    pub fn update_feature(&mut self, id: Uuid, update: FeatureUpdate) -> Result<(), EngineError> {
        let update = FeatureUpdate {
            operation: update.operation.map(|op| self.with_detected_profiles(op)),
            ..update
        };
        self.graph.update(id, update)?;
        self.graph.mark_dirty_with_dependents(id)?;
        let label = self.label_for("Update", id);
        self.commit(label);
        Ok(())
    }

    pub fn delete_feature(&mut self, id: Uuid) -> Result<(), EngineError> {
        let removed = self.graph.delete(id)?;
        self.artifacts.remove(&id);
        if self.editing_sketch == Some(id) {
            self.editing_sketch = None;
        }
        if self.active_feature == Some(id) {
            self.active_feature = None;
        }
        self.commit(format!("Delete {}", removed.name));
        Ok(())
    }

    /// Move a feature in sequence order. Returns its final index.
    pub fn reorder_feature(&mut self, id: Uuid, new_index: usize) -> Result<usize, EngineError> {
        let index = self.graph.reorder(id, new_index)?;
        let label = self.label_for("Reorder", id);
        self.commit(label);
        Ok(index)
    }

    // ── Selection ───────────────────────────────────────────────────────────

    /// Open a sketch for editing. Selection is not recorded in history.
    pub fn set_editing_sketch(&mut self, id: Uuid) -> Result<(), EngineError> {
        self.sketch(id)?;
        self.editing_sketch = Some(id);
        Ok(())
    }

    pub fn stop_editing(&mut self) {
        self.editing_sketch = None;
    }

    pub fn set_active_feature(&mut self, id: Option<Uuid>) -> Result<(), EngineError> {
        if let Some(id) = id {
            if !self.graph.contains(id) {
                tracing::warn!(%id, "cannot select unknown feature");
                return Err(EngineError::FeatureNotFound { id });
            }
        }
        self.active_feature = id;
        Ok(())
    }

    // ── History ─────────────────────────────────────────────────────────────

    /// Step back one snapshot. Returns false if there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(features) => {
                tracing::info!(cursor = self.history.cursor_index(), "undo");
                self.restore_snapshot(features);
                true
            }
            None => false,
        }
    }

    /// Step forward one snapshot. Returns false if there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(features) => {
                tracing::info!(cursor = self.history.cursor_index(), "redo");
                self.restore_snapshot(features);
                true
            }
            None => false,
        }
    }

    pub fn rollback_to_snapshot(&mut self, index: usize) -> Result<(), EngineError> {
        let features = match self.history.rollback_to(index) {
            Ok(features) => features,
            Err(err) => {
                tracing::warn!(index, "rollback to unknown snapshot ignored");
                return Err(err);
            }
        };
        tracing::info!(index, "rolled back to snapshot");
        self.restore_snapshot(features);
        Ok(())
    }

    /// Roll back to the state right after `feature_id` was last added.
    /// Returns the snapshot index used.
    pub fn rollback_to_feature(&mut self, feature_id: Uuid) -> Result<usize, EngineError> {
        let Some(index) = self.history.rollback_target(feature_id) else {
            tracing::warn!(%feature_id, "no snapshot contains feature");
            return Err(EngineError::NoSnapshotFound { feature_id });
        };
        self.rollback_to_snapshot(index)?;
        Ok(index)
    }

    // ── Evaluation ──────────────────────────────────────────────────────────

    /// Evaluate dirty features in order. Records no snapshot.
    pub fn rebuild(&mut self, evaluator: &mut dyn Evaluator) -> RebuildReport {
        let report = rebuild::rebuild(&mut self.graph, &mut self.artifacts, evaluator);
        tracing::debug!(
            evaluated = report.evaluated.len(),
            reused = report.reused.len(),
            invalidated = report.invalidated.len(),
            failed = report.failed.len(),
            "rebuild finished"
        );
        report
    }

    // ── Project ─────────────────────────────────────────────────────────────

    /// Replace the whole model with loaded features and history.
    ///
    /// Dirty flags are kept as persisted; caches and selection are cleared.
    pub fn restore_project(&mut self, features: Vec<Feature>, history: History) {
        self.graph = FeatureGraph::from_features(features.into_iter().map(Arc::new).collect());
        self.history = history;
        self.clear_derived_state();
        tracing::info!(features = self.graph.len(), "project restored");
    }

    /// Empty the model and its history.
    pub fn clear(&mut self) {
        self.graph = FeatureGraph::new();
        self.history = History::new(self.config.max_snapshots);
        self.clear_derived_state();
        tracing::info!("project cleared");
    }

    // ── Internals ───────────────────────────────────────────────────────────

    fn commit(&mut self, label: impl Into<String>) {
        let label = label.into();
        tracing::debug!(%label, "snapshot committed");
        self.history.push(label, self.graph.shared());
    }

    fn label_for(&self, verb: &str, id: Uuid) -> String {
        match self.graph.get(id) {
            Some(feature) => format!("{verb} {}", feature.name),
            None => verb.to_string(),
        }
    }

    fn restore_snapshot(&mut self, features: Vec<Arc<Feature>>) {
        self.graph = FeatureGraph::from_features(features);
        self.graph.mark_all_dirty();
        self.clear_derived_state();
    }

    fn clear_derived_state(&mut self) {
        self.editing_sketch = None;
        self.active_feature = None;
        self.artifacts.clear();
        self.pending.clear();
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
