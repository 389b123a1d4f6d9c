use std::path::PathBuf;

use feature_engine::{Engine, EngineConfig, EngineError};
use file_format::{
    load_project, save_project, FileStore, MemoryStore, ProjectStore, StoreError,
};

/// The engine plus where its project is saved.
///
/// Persistence calls report success as a flag. A failed load leaves the
/// engine untouched.
pub struct SessionState {
    /// The parametric modeling engine.
    pub engine: Engine,
    store: Box<dyn ProjectStore>,
}

impl SessionState {
    pub fn new(store: Box<dyn ProjectStore>) -> Self {
        Self::with_config(EngineConfig::default(), store)
    }

    pub fn with_config(config: EngineConfig, store: Box<dyn ProjectStore>) -> Self {
        Self {
            engine: Engine::with_config(config),
            store,
        }
    }

    /// A session saving to memory only.
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }

    /// A session saving to a JSON file at `path`.
    pub fn with_project_file(path: impl Into<PathBuf>) -> Self {
        Self::new(Box::new(FileStore::new(path)))
    }

    /// Save the project to the store.
    pub fn save(&mut self) -> bool {
        let result = save_project(&self.engine).and_then(|json| self.store.write(&json));
        match result {
            Ok(()) => {
                tracing::info!(features = self.engine.features().len(), "project saved");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "project save failed");
                false
            }
        }
    }

    /// Replace the model with the stored project.
    pub fn load(&mut self) -> bool {
        let payload = match self.store.read() {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                tracing::info!("no saved project");
                return false;
            }
            Err(e) => {
                tracing::warn!(error = %e, "project store unreadable");
                return false;
            }
        };
        self.import(&payload)
    }

    /// Replace the model with a serialized project.
    pub fn import(&mut self, payload: &str) -> bool {
        let max_snapshots = self.engine.config().max_snapshots;
        match load_project(payload, max_snapshots) {
            Ok(project) => {
                project.restore_into(&mut self.engine);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "project load failed");
                false
            }
        }
    }

    /// The project as it would be saved.
    pub fn export(&self) -> Result<String, BridgeError> {
        Ok(save_project(&self.engine)?)
    }

    /// Remove the stored project.
    pub fn clear_saved(&mut self) -> bool {
        match self.store.clear() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "failed to clear saved project");
                false
            }
        }
    }

    pub fn has_saved(&self) -> bool {
        self.store.exists()
    }

    /// Empty the model and its history. The stored project is kept.
    pub fn new_project(&mut self) {
        self.engine.clear();
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// Errors from the bridge layer.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("{0}")]
    Engine(#[from] EngineError),

    #[error("failed to parse message: {reason}")]
    Parse { reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}
