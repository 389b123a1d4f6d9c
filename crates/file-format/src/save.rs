use std::sync::Arc;

use chrono::{DateTime, Utc};
use feature_engine::{Engine, Feature, Snapshot};
use serde::{Deserialize, Serialize};

use crate::errors::StoreError;

/// Current file format version.
pub const FORMAT_VERSION: u32 = 2;

/// The top-level file structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    pub version: u32,
    /// Milliseconds since the Unix epoch.
    pub saved_at: i64,
    pub features: Vec<Arc<Feature>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshots: Option<Vec<Snapshot>>,
    /// Snapshot matching `features`; -1 before any recorded change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_snapshot_index: Option<i64>,
}

/// Capture the engine's model and history as a [`ProjectFile`].
pub fn project_file(engine: &Engine, saved_at: DateTime<Utc>) -> ProjectFile {
    ProjectFile {
        version: FORMAT_VERSION,
        saved_at: saved_at.timestamp_millis(),
        features: engine.graph().shared(),
        snapshots: Some(engine.history().snapshots().cloned().collect()),
        current_snapshot_index: Some(engine.history().cursor_index()),
    }
}

/// Serialize a project to a pretty-printed JSON string.
pub fn save_project(engine: &Engine) -> Result<String, StoreError> {
    let file = project_file(engine, Utc::now());
    let json = serde_json::to_string_pretty(&file)?;
    tracing::debug!(
        features = file.features.len(),
        bytes = json.len(),
        "project serialized"
    );
    Ok(json)
}
