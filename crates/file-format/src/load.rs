use std::sync::Arc;

use chrono::{DateTime, Utc};
use feature_engine::{Engine, Feature, History, Snapshot};
use serde_json::Value;

use crate::errors::LoadError;
use crate::save::{ProjectFile, FORMAT_VERSION};

/// A parsed and migrated project, ready to hand to an [`Engine`].
#[derive(Debug, Clone)]
pub struct LoadedProject {
    /// Version found in the file, before migration.
    pub version: u64,
    pub saved_at: Option<DateTime<Utc>>,
    pub features: Vec<Feature>,
    pub history: History,
}

impl LoadedProject {
    /// Replace the engine's model and history with this project.
    pub fn restore_into(self, engine: &mut Engine) {
        engine.restore_project(self.features, self.history);
    }
}

/// Deserialize a project from a JSON string.
///
/// Validates the version and the shape of `features` before anything else,
/// migrates older files, and rebuilds the history capped at `max_snapshots`.
pub fn load_project(json: &str, max_snapshots: usize) -> Result<LoadedProject, LoadError> {
    let mut payload: Value =
        serde_json::from_str(json).map_err(|e| LoadError::ParseError(e.to_string()))?;

    let version = payload
        .get("version")
        .and_then(Value::as_u64)
        .ok_or(LoadError::MissingVersion)?;
    if !payload.get("features").is_some_and(Value::is_array) {
        return Err(LoadError::FeaturesNotSequence);
    }
    if version > u64::from(FORMAT_VERSION) {
        return Err(LoadError::FutureVersion {
            file_version: version,
            supported_version: FORMAT_VERSION,
        });
    }
    if version < u64::from(FORMAT_VERSION) {
        tracing::info!(from = version, to = FORMAT_VERSION, "migrating project file");
        payload = crate::migrate::migrate(payload, version, FORMAT_VERSION)?;
    }

    let file: ProjectFile =
        serde_json::from_value(payload).map_err(|e| LoadError::ParseError(e.to_string()))?;
    let history = rebuild_history(file.snapshots, file.current_snapshot_index, max_snapshots)?;
    let features: Vec<Feature> = file.features.into_iter().map(unshare).collect();

    tracing::info!(
        version,
        features = features.len(),
        snapshots = history.len(),
        "project loaded"
    );
    Ok(LoadedProject {
        version,
        saved_at: DateTime::from_timestamp_millis(file.saved_at),
        features,
        history,
    })
}

fn rebuild_history(
    snapshots: Option<Vec<Snapshot>>,
    index: Option<i64>,
    max_snapshots: usize,
) -> Result<History, LoadError> {
    let Some(snapshots) = snapshots else {
        return Ok(History::new(max_snapshots));
    };
    let cursor = match index {
        // Files without an index resume at the newest snapshot.
        None => snapshots.len().checked_sub(1),
        Some(-1) => None,
        Some(i) => Some(usize::try_from(i).map_err(|_| {
            LoadError::InvalidHistory(format!("snapshot index {i} is out of range"))
        })?),
    };
    History::from_parts(snapshots, cursor, max_snapshots)
        .map_err(|e| LoadError::InvalidHistory(e.to_string()))
}

fn unshare(feature: Arc<Feature>) -> Feature {
    Arc::try_unwrap(feature).unwrap_or_else(|shared| (*shared).clone())
}
