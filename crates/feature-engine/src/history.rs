use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{EngineError, Feature};

/// The committed feature list after one mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub id: Uuid,
    pub label: String,
    pub timestamp: DateTime<Utc>,
    pub features: Vec<Arc<Feature>>,
}

impl Snapshot {
    pub fn new(label: impl Into<String>, features: Vec<Arc<Feature>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            label: label.into(),
            timestamp: Utc::now(),
            features,
        }
    }

    /// Id of the feature last in sequence order, if any.
    pub fn last_feature_id(&self) -> Option<Uuid> {
        self.features.last().map(|f| f.id)
    }

    pub fn contains(&self, feature_id: Uuid) -> bool {
        self.features.iter().any(|f| f.id == feature_id)
    }
}

/// Capped snapshot list with a cursor.
///
/// The cursor names the snapshot matching the live graph; `None` is the empty
/// graph before any recorded change.
#[derive(Debug, Clone)]
pub struct History {
    snapshots: VecDeque<Snapshot>,
    cursor: Option<usize>,
    max_snapshots: usize,
}

impl History {
    pub fn new(max_snapshots: usize) -> Self {
        Self {
            snapshots: VecDeque::new(),
            cursor: None,
            max_snapshots: max_snapshots.max(1),
        }
    }

    /// Rebuild a history from persisted parts.
    ///
    /// The cursor must lie within the list. Snapshots beyond the cap are
    /// evicted oldest first, shifting the cursor with them.
    pub fn from_parts(
        snapshots: Vec<Snapshot>,
        cursor: Option<usize>,
        max_snapshots: usize,
    ) -> Result<Self, EngineError> {
        if let Some(index) = cursor {
            if index >= snapshots.len() {
                return Err(EngineError::SnapshotOutOfRange {
                    index,
                    len: snapshots.len(),
                });
            }
        }

        let mut history = Self {
            snapshots: snapshots.into(),
            cursor,
            max_snapshots: max_snapshots.max(1),
        };
        while history.snapshots.len() > history.max_snapshots {
            history.snapshots.pop_front();
            history.cursor = history.cursor.and_then(|c| c.checked_sub(1));
        }
        Ok(history)
    }

    /// Record `features` as the new current state.
    ///
    /// Drops any redo branch, evicts the oldest snapshot past the cap and moves
    /// the cursor to the new snapshot.
    pub fn push(&mut self, label: impl Into<String>, features: Vec<Arc<Feature>>) {
        let keep = self.cursor.map_or(0, |c| c + 1);
        self.snapshots.truncate(keep);
        self.snapshots.push_back(Snapshot::new(label, features));
        while self.snapshots.len() > self.max_snapshots {
            self.snapshots.pop_front();
        }
        self.cursor = Some(self.snapshots.len() - 1);
    }

    /// Step back one snapshot. Returns the features to restore, empty when
    /// stepping back past the first snapshot, or `None` if already there.
    pub fn undo(&mut self) -> Option<Vec<Arc<Feature>>> {
        match self.cursor? {
            0 => {
                self.cursor = None;
                Some(Vec::new())
            }
            c => {
                self.cursor = Some(c - 1);
                Some(self.snapshots[c - 1].features.clone())
            }
        }
    }

    /// Step forward one snapshot, or `None` at the newest.
    pub fn redo(&mut self) -> Option<Vec<Arc<Feature>>> {
        let next = self.next_index()?;
        self.cursor = Some(next);
        Some(self.snapshots[next].features.clone())
    }

    /// Jump to snapshot `index`.
    pub fn rollback_to(&mut self, index: usize) -> Result<Vec<Arc<Feature>>, EngineError> {
        let snapshot = self
            .snapshots
            .get(index)
            .ok_or(EngineError::SnapshotOutOfRange {
                index,
                len: self.snapshots.len(),
            })?;
        let features = snapshot.features.clone();
        self.cursor = Some(index);
        Ok(features)
    }

    /// The snapshot to roll back to for a feature.
    ///
    /// Newest first: a snapshot whose last feature is `feature_id`, otherwise the
    /// newest snapshot containing it anywhere.
    pub fn rollback_target(&self, feature_id: Uuid) -> Option<usize> {
        let newest_first = || self.snapshots.iter().enumerate().rev();
        newest_first()
            .find(|(_, s)| s.last_feature_id() == Some(feature_id))
            .or_else(|| newest_first().find(|(_, s)| s.contains(feature_id)))
            .map(|(i, _)| i)
    }

    fn next_index(&self) -> Option<usize> {
        let next = self.cursor.map_or(0, |c| c + 1);
        (next < self.snapshots.len()).then_some(next)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn can_redo(&self) -> bool {
        self.next_index().is_some()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// The cursor as persisted: `-1` before any snapshot.
    pub fn cursor_index(&self) -> i64 {
        self.cursor.map_or(-1, |c| c as i64)
    }

    pub fn snapshots(&self) -> impl ExactSizeIterator<Item = &Snapshot> {
        self.snapshots.iter()
    }

    pub fn snapshot(&self, index: usize) -> Option<&Snapshot> {
        self.snapshots.get(index)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn max_snapshots(&self) -> usize {
        self.max_snapshots
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.cursor = None;
    }
}
