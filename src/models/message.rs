use bytes::Bytes;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::error::ToolStreamError;

/// Discriminator of a chunk fragment on the wire
pub const BLOB_CHUNK: &str = "blob_chunk";

/// Discriminator of a whole binary payload on the wire
pub const BLOB: &str = "blob";

/// One event of a tool invocation stream
///
/// Wire form: `{"type": "...", "message": {...}, "meta": ...}`. Only
/// `blob_chunk` is decoded; everything else, upstream `blob` included, is
/// kept as raw JSON so it can be forwarded untouched. `meta` is `None` only
/// when the field was absent; an explicit `null` is kept as `Value::Null`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawMessage")]
pub struct ToolInvokeMessage {
    pub payload: MessagePayload,
    pub meta: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessagePayload {
    BlobChunk(BlobChunk),
    Blob(BlobMessage),
    /// Any other message type, forwarded verbatim
    Other { kind: String, message: Value },
}

/// Fragment of a binary payload
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BlobChunk {
    /// Groups the chunks of one logical blob
    pub id: String,
    /// Declared final size of the blob
    pub total_length: usize,
    #[serde(with = "base64_bytes")]
    pub blob: Bytes,
    /// Marks the terminal chunk
    #[serde(default)]
    pub end: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BlobMessage {
    #[serde(with = "base64_bytes")]
    pub blob: Bytes,
}

#[derive(Deserialize)]
struct RawMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    message: Value,
    #[serde(default, deserialize_with = "present_value")]
    meta: Option<Value>,
}

/// Keeps an explicit `null` distinct from a missing field
fn present_value<'de, D: serde::Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl TryFrom<RawMessage> for ToolInvokeMessage {
    type Error = ToolStreamError;

    fn try_from(raw: RawMessage) -> Result<Self, Self::Error> {
        let payload = match raw.kind.as_str() {
            BLOB_CHUNK => MessagePayload::BlobChunk(
                serde_json::from_value(raw.message)
                    .map_err(|e| ToolStreamError::InvalidMessage(format!("blob_chunk: {}", e)))?,
            ),
            _ => MessagePayload::Other {
                kind: raw.kind,
                message: raw.message,
            },
        };

        Ok(Self {
            payload,
            meta: raw.meta,
        })
    }
}

impl Serialize for ToolInvokeMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = if self.meta.is_some() { 3 } else { 2 };
        let mut state = serializer.serialize_struct("ToolInvokeMessage", fields)?;
        state.serialize_field("type", self.kind())?;
        match &self.payload {
            MessagePayload::BlobChunk(chunk) => state.serialize_field("message", chunk)?,
            MessagePayload::Blob(blob) => state.serialize_field("message", blob)?,
            MessagePayload::Other { message, .. } => state.serialize_field("message", message)?,
        }
        if let Some(meta) = &self.meta {
            state.serialize_field("meta", meta)?;
        }
        state.end()
    }
}

impl ToolInvokeMessage {
    pub fn blob_chunk(
        id: impl Into<String>,
        total_length: usize,
        blob: impl Into<Bytes>,
        end: bool,
    ) -> Self {
        Self {
            payload: MessagePayload::BlobChunk(BlobChunk {
                id: id.into(),
                total_length,
                blob: blob.into(),
                end,
            }),
            meta: None,
        }
    }

    pub fn blob(blob: impl Into<Bytes>) -> Self {
        Self {
            payload: MessagePayload::Blob(BlobMessage { blob: blob.into() }),
            meta: None,
        }
    }

    pub fn other(kind: impl Into<String>, message: Value) -> Self {
        Self {
            payload: MessagePayload::Other {
                kind: kind.into(),
                message,
            },
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Wire discriminator of this message
    pub fn kind(&self) -> &str {
        match &self.payload {
            MessagePayload::BlobChunk(_) => BLOB_CHUNK,
            MessagePayload::Blob(_) => BLOB,
            MessagePayload::Other { kind, .. } => kind,
        }
    }

    pub fn is_blob_chunk(&self) -> bool {
        matches!(self.payload, MessagePayload::BlobChunk(_))
    }

    /// Assembled bytes if this is a whole blob
    pub fn as_blob(&self) -> Option<&Bytes> {
        match &self.payload {
            MessagePayload::Blob(b) => Some(&b.blob),
            _ => None,
        }
    }
}

mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map(Bytes::from)
            .map_err(D::Error::custom)
    }
}
