use std::collections::{BTreeSet, HashMap};

use uuid::Uuid;

use crate::types::{Feature, Operation};

impl Operation {
    /// Ids this operation reads from, in declaration order without duplicates.
    pub fn dependencies(&self) -> Vec<Uuid> {
        let raw: Vec<Uuid> = match self {
            Operation::Sketch { sketch } => sketch.reference.feature_id().into_iter().collect(),
            Operation::Extrusion { params } => vec![params.sketch_id],
            Operation::Cut { params } => vec![params.sketch_id],
            Operation::Chamfer { params } => vec![params.target_id],
            Operation::Fillet { params } => vec![params.target_id],
            Operation::Shell { params } => vec![params.target_id],
            Operation::Sweep { params } => vec![params.profile_sketch_id, params.path_sketch_id],
            Operation::Loft { params } => params.profile_sketch_ids.clone(),
            Operation::LinearPattern { params } => vec![params.target_id],
            Operation::PolarPattern { params } => vec![params.target_id],
        };

        let mut seen = BTreeSet::new();
        raw.into_iter().filter(|id| seen.insert(*id)).collect()
    }
}

/// Reverse dependency edges: for each id, the features that depend on it.
///
/// Always the exact transpose of `Operation::dependencies` over the graph,
/// including edges to ids no longer present. Never holds empty sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependentsIndex {
    edges: HashMap<Uuid, BTreeSet<Uuid>>,
}

impl DependentsIndex {
    /// Rebuild the index from scratch.
    pub fn from_features<'a>(features: impl IntoIterator<Item = &'a Feature>) -> Self {
        let mut index = Self::default();
        for feature in features {
            index.link(feature.id, &feature.operation.dependencies());
        }
        index
    }

    /// Record `dependent` under each of `dependencies`.
    pub fn link(&mut self, dependent: Uuid, dependencies: &[Uuid]) {
        for dep in dependencies {
            self.edges.entry(*dep).or_default().insert(dependent);
        }
    }

    /// Remove `dependent` from each of `dependencies`.
    pub fn unlink(&mut self, dependent: Uuid, dependencies: &[Uuid]) {
        for dep in dependencies {
            if let Some(set) = self.edges.get_mut(dep) {
                set.remove(&dependent);
                if set.is_empty() {
                    self.edges.remove(dep);
                }
            }
        }
    }

    /// Replace the edges of `dependent`, touching only what changed.
    pub fn relink(&mut self, dependent: Uuid, old: &[Uuid], new: &[Uuid]) {
        let stale: Vec<Uuid> = old.iter().filter(|id| !new.contains(id)).copied().collect();
        let added: Vec<Uuid> = new.iter().filter(|id| !old.contains(id)).copied().collect();
        self.unlink(dependent, &stale);
        self.link(dependent, &added);
    }

    pub fn dependents_of(&self, id: Uuid) -> Option<&BTreeSet<Uuid>> {
        self.edges.get(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EdgeSelection, FilletParams, LoftParams};

    #[test]
    fn loft_dependencies_collapse_duplicates_in_order() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let op = Operation::Loft {
            params: LoftParams {
                profile_sketch_ids: vec![a, b, a],
                ruled: false,
                mode: Default::default(),
            },
        };
        assert_eq!(op.dependencies(), vec![a, b]);
    }

    #[test]
    fn relink_moves_edges() {
        let (f, a, b) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut index = DependentsIndex::default();
        index.link(f, &[a]);
        index.relink(f, &[a], &[b]);
        assert!(index.dependents_of(a).is_none());
        assert!(index.dependents_of(b).is_some_and(|s| s.contains(&f)));
    }

    #[test]
    fn fillet_depends_on_target() {
        let target = Uuid::new_v4();
        let op = Operation::Fillet {
            params: FilletParams {
                target_id: target,
                radius: 1.0,
                edges: EdgeSelection::All,
            },
        };
        assert_eq!(op.dependencies(), vec![target]);
    }
}
