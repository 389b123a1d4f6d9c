use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::deps::DependentsIndex;
use crate::types::{EngineError, Feature, FeatureUpdate, InvalidSource, NewFeature};

/// The ordered feature list and its dependents index.
///
/// Features are shared with history snapshots; every write goes through
/// `Arc::make_mut`, so snapshots never observe later edits.
#[derive(Debug, Clone, Default)]
pub struct FeatureGraph {
    features: Vec<Arc<Feature>>,
    index: DependentsIndex,
}

impl FeatureGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt a feature list as-is and rebuild the index from it.
    pub fn from_features(features: Vec<Arc<Feature>>) -> Self {
        let index = DependentsIndex::from_features(features.iter().map(|f| f.as_ref()));
        Self { features, index }
    }

    pub fn features(&self) -> &[Arc<Feature>] {
        &self.features
    }

    /// A structural copy of the feature list, sharing every feature.
    pub fn shared(&self) -> Vec<Arc<Feature>> {
        self.features.clone()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&Feature> {
        self.features.iter().find(|f| f.id == id).map(|f| f.as_ref())
    }

    /// The shared handle of a feature, for identity checks.
    pub fn get_shared(&self, id: Uuid) -> Option<&Arc<Feature>> {
        self.features.iter().find(|f| f.id == id)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.position(id).is_some()
    }

    pub fn position(&self, id: Uuid) -> Option<usize> {
        self.features.iter().position(|f| f.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: Uuid) -> Option<&mut Feature> {
        self.features
            .iter_mut()
            .find(|f| f.id == id)
            .map(Arc::make_mut)
    }

    pub fn index(&self) -> &DependentsIndex {
        &self.index
    }

    /// True when the incrementally maintained index matches a fresh rebuild.
    pub fn index_is_consistent(&self) -> bool {
        self.index == DependentsIndex::from_features(self.features.iter().map(|f| f.as_ref()))
    }

    /// Append a feature. Never fails; unknown dependencies are accepted.
    pub fn add(&mut self, new: NewFeature) -> Uuid {
        let id = Uuid::new_v4();
        let kind = new.operation.kind();
        let name = match new.name {
            Some(name) => self.unique_name(&name, None),
            None => self.next_default_name(kind.display_name()),
        };
        let feature = Feature {
            id,
            name,
            created_at: Utc::now(),
            is_valid: true,
            is_dirty: true,
            error_message: None,
            invalid_source: None,
            operation: new.operation,
        };

        self.index.link(id, &feature.operation.dependencies());
        tracing::debug!(%id, name = %feature.name, ?kind, "feature added");
        self.features.push(Arc::new(feature));
        id
    }

    /// Merge `update` into a feature and mark it dirty.
    ///
    /// When the dependency set changes, the index is patched and the feature is
    /// re-validated against the graph.
    pub fn update(&mut self, id: Uuid, update: FeatureUpdate) -> Result<(), EngineError> {
        let Some(pos) = self.position(id) else {
            tracing::warn!(%id, "update of unknown feature ignored");
            return Err(EngineError::FeatureNotFound { id });
        };

        let name = update.name.map(|n| self.unique_name(&n, Some(id)));
        let old_deps = self.features[pos].operation.dependencies();

        let feature = Arc::make_mut(&mut self.features[pos]);
        if let Some(name) = name {
            feature.name = name;
        }
        if let Some(operation) = update.operation {
            feature.operation = operation;
        }
        feature.is_dirty = true;

        let new_deps = feature.operation.dependencies();
        if new_deps != old_deps {
            self.index.relink(id, &old_deps, &new_deps);
            let missing = new_deps.iter().find(|dep| !self.contains(**dep)).copied();
            let feature = Arc::make_mut(&mut self.features[pos]);
            match missing {
                None => feature.revalidate(),
                Some(dep) => feature.invalidate(
                    InvalidSource::Dependency,
                    format!("Dependency {dep} does not exist"),
                ),
            }
        }

        tracing::debug!(%id, "feature updated");
        Ok(())
    }

    /// Remove a feature and invalidate its recorded direct dependents.
    ///
    /// Dependents of dependents are left alone.
    pub fn delete(&mut self, id: Uuid) -> Result<Arc<Feature>, EngineError> {
        let Some(pos) = self.position(id) else {
            tracing::warn!(%id, "delete of unknown feature ignored");
            return Err(EngineError::FeatureNotFound { id });
        };

        let removed = self.features.remove(pos);
        self.index.unlink(id, &removed.operation.dependencies());

        let dependents: Vec<Uuid> = self
            .index
            .dependents_of(id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        let message = format!("Dependency '{}' was deleted", removed.name);
        for dependent in dependents {
            if let Some(feature) = self.get_mut(dependent) {
                feature.invalidate(InvalidSource::Dependency, message.clone());
                feature.is_dirty = true;
            }
        }

        tracing::debug!(%id, name = %removed.name, "feature deleted");
        Ok(removed)
    }

    /// Move a feature to `new_index` (clamped) and dirty everything from the
    /// lower of the two positions onward. Returns the final position.
    pub fn reorder(&mut self, id: Uuid, new_index: usize) -> Result<usize, EngineError> {
        let Some(old) = self.position(id) else {
            tracing::warn!(%id, "reorder of unknown feature ignored");
            return Err(EngineError::FeatureNotFound { id });
        };

        let feature = self.features.remove(old);
        let target = new_index.min(self.features.len());
        self.features.insert(target, feature);

        for feature in self.features.iter_mut().skip(old.min(target)) {
            Arc::make_mut(feature).is_dirty = true;
        }
        Ok(target)
    }

    /// Mark a feature and everything downstream of it dirty, breadth first.
    /// Returns how many features were visited.
    pub fn mark_dirty_with_dependents(&mut self, id: Uuid) -> Result<usize, EngineError> {
        if !self.contains(id) {
            tracing::warn!(%id, "dirty propagation from unknown feature ignored");
            return Err(EngineError::FeatureNotFound { id });
        }

        let mut seen = HashSet::from([id]);
        let mut queue = VecDeque::from([id]);
        let mut marked = 0;
        while let Some(current) = queue.pop_front() {
            match self.get(current) {
                Some(feature) if !feature.is_dirty => {
                    if let Some(feature) = self.get_mut(current) {
                        feature.is_dirty = true;
                    }
                    marked += 1;
                }
                Some(_) => marked += 1,
                None => {}
            }
            if let Some(next) = self.index.dependents_of(current) {
                for dependent in next {
                    if seen.insert(*dependent) {
                        queue.push_back(*dependent);
                    }
                }
            }
        }
        Ok(marked)
    }

    pub fn mark_all_dirty(&mut self) {
        for feature in &mut self.features {
            if !feature.is_dirty {
                Arc::make_mut(feature).is_dirty = true;
            }
        }
    }

    /// The derived dependency ids of a feature.
    pub fn dependencies(&self, id: Uuid) -> Option<Vec<Uuid>> {
        self.get(id).map(|f| f.operation.dependencies())
    }

    /// Features that depend on `id`, in sequence order.
    pub fn dependents(&self, id: Uuid) -> Vec<Uuid> {
        match self.index.dependents_of(id) {
            Some(set) => self
                .features
                .iter()
                .filter(|f| set.contains(&f.id))
                .map(|f| f.id)
                .collect(),
            None => Vec::new(),
        }
    }

    fn name_taken(&self, name: &str, except: Option<Uuid>) -> bool {
        self.features
            .iter()
            .any(|f| f.name == name && Some(f.id) != except)
    }

    /// `base`, or `base 2`, `base 3`... whichever is free first.
    fn unique_name(&self, base: &str, except: Option<Uuid>) -> String {
        if !self.name_taken(base, except) {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{base} {n}"))
            .find(|candidate| !self.name_taken(candidate, except))
            .unwrap_or_else(|| base.to_string())
    }

    fn next_default_name(&self, kind: &str) -> String {
        (1..)
            .map(|n| format!("{kind} {n}"))
            .find(|candidate| !self.name_taken(candidate, None))
            .unwrap_or_else(|| kind.to_string())
    }
}
