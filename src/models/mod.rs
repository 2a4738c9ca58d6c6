pub mod invoke;
pub mod message;
pub mod provider_id;

pub use invoke::{CredentialType, ToolInvokeRequest};
pub use message::{BlobChunk, BlobMessage, MessagePayload, ToolInvokeMessage};
pub use provider_id::ToolProviderId;
