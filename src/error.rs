use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolStreamError {
    #[error("File is too large: blob {chunk_id} would reach {size} bytes (limit {limit})")]
    BlobTooLarge {
        chunk_id: String,
        size: usize,
        limit: usize,
    },

    #[error("File chunk is too large: {size} bytes for blob {chunk_id} (limit {limit})")]
    ChunkTooLarge {
        chunk_id: String,
        size: usize,
        limit: usize,
    },

    #[error("Invalid tool message: {0}")]
    InvalidMessage(String),

    #[error("Invalid tool provider id: {0}")]
    InvalidProviderId(String),

    #[error("Plugin daemon error {code}: {error_type}: {message}")]
    DaemonError {
        code: i64,
        error_type: String,
        message: String,
    },

    #[error("Got empty data from plugin daemon")]
    EmptyData,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Upstream error: {0}")]
    UpstreamError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ToolStreamError {
    /// Whether this error was raised by a blob size guard
    pub fn is_size_limit(&self) -> bool {
        matches!(
            self,
            ToolStreamError::BlobTooLarge { .. } | ToolStreamError::ChunkTooLarge { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ToolStreamError>;
