/// Errors during project loading.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoadError {
    #[error("failed to parse file: {0}")]
    ParseError(String),

    #[error("missing format version")]
    MissingVersion,

    #[error("`features` is not a list")]
    FeaturesNotSequence,

    #[error("file version {file_version} is newer than supported version {supported_version}")]
    FutureVersion {
        file_version: u64,
        supported_version: u32,
    },

    #[error("migration failed from version {from} to {to}: {reason}")]
    MigrationFailed { from: u64, to: u32, reason: String },

    #[error("invalid history: {0}")]
    InvalidHistory(String),
}

/// Errors reading or writing the stored project.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to serialize project: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("storage unavailable: {0}")]
    Io(#[from] std::io::Error),
}
