//! Size limits enforced while reassembling chunked blobs.

use serde::Deserialize;

use crate::error::{Result, ToolStreamError};

/// Maximum bytes accumulated for a single blob (30 MiB).
pub const MAX_BLOB_BYTES: usize = 30 * 1024 * 1024;

/// Maximum payload of a single blob chunk (8 KiB).
pub const MAX_CHUNK_BYTES: usize = 8 * 1024;

/// Ceilings applied by [`crate::streaming::BlobReassembler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReassemblyLimits {
    /// Running total allowed per chunk id
    pub max_blob_bytes: usize,
    /// Allowed payload per chunk
    pub max_chunk_bytes: usize,
}

impl Default for ReassemblyLimits {
    fn default() -> Self {
        Self {
            max_blob_bytes: MAX_BLOB_BYTES,
            max_chunk_bytes: MAX_CHUNK_BYTES,
        }
    }
}

impl ReassemblyLimits {
    /// Both ceilings must be non-zero and a chunk may not exceed a blob
    pub fn validate(&self) -> Result<()> {
        if self.max_blob_bytes == 0
            || self.max_chunk_bytes == 0
            || self.max_chunk_bytes > self.max_blob_bytes
        {
            return Err(ToolStreamError::ConfigError(format!(
                "Invalid limits: chunk {} / blob {}",
                self.max_chunk_bytes, self.max_blob_bytes
            )));
        }
        Ok(())
    }
}
