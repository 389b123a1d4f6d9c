use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::errors::StoreError;

/// Where a single saved project lives.
pub trait ProjectStore: Send {
    /// The stored payload, or `None` if nothing has been saved.
    fn read(&self) -> Result<Option<String>, StoreError>;
    fn write(&mut self, payload: &str) -> Result<(), StoreError>;
    fn clear(&mut self) -> Result<(), StoreError>;

    fn exists(&self) -> bool {
        matches!(self.read(), Ok(Some(_)))
    }
}

/// In-process store, for tests and hosts without durable storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    payload: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_payload(payload: impl Into<String>) -> Self {
        Self {
            payload: Some(payload.into()),
        }
    }
}

impl ProjectStore for MemoryStore {
    fn read(&self) -> Result<Option<String>, StoreError> {
        Ok(self.payload.clone())
    }

    fn write(&mut self, payload: &str) -> Result<(), StoreError> {
        self.payload = Some(payload.to_string());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.payload = None;
        Ok(())
    }

    fn exists(&self) -> bool {
        self.payload.is_some()
    }
}

/// Project saved as one JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ProjectStore for FileStore {
    fn read(&self) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(payload) => Ok(Some(payload)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, payload: &str) -> Result<(), StoreError> {
        // Write then rename; the previous file survives a failed write.
        let staging = self.path.with_extension("tmp");
        fs::write(&staging, payload)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }
}
