use bytes::Bytes;
use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use tracing::{Instrument, info, info_span};

use crate::error::Result;
use crate::limits::ReassemblyLimits;
use crate::models::{ToolInvokeMessage, ToolInvokeRequest};
use crate::streaming::{decode_stream, reassemble_stream};

/// Type alias for the raw response body of an invocation
pub type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

/// Type alias for the future returned by [`ToolInvoker::invoke`]
pub type InvokeFuture = Pin<Box<dyn Future<Output = Result<ByteStream>> + Send>>;

/// Type alias for a decoded, reassembled message stream
pub type MessageStream = Pin<Box<dyn Stream<Item = Result<ToolInvokeMessage>> + Send>>;

/// Transport that dispatches a tool invocation and returns the raw stream
pub trait ToolInvoker: Send + Sync {
    /// Send the request and return the response body as it arrives
    fn invoke(&self, request: &ToolInvokeRequest) -> InvokeFuture;

    /// Get the transport name for logging
    fn name(&self) -> &str;
}

/// Invoke a tool and return its messages with chunked blobs reassembled
pub async fn invoke_tool(
    invoker: &dyn ToolInvoker,
    request: &ToolInvokeRequest,
    limits: ReassemblyLimits,
) -> Result<MessageStream> {
    let invocation_id = uuid::Uuid::new_v4();
    let span = info_span!(
        "invoke_tool",
        %invocation_id,
        transport = invoker.name(),
        provider = %request.provider,
        tool = %request.tool_name,
    );

    let body = invoker.invoke(request).instrument(span.clone()).await?;
    span.in_scope(|| info!("Streaming tool messages"));

    Ok(Box::pin(reassemble_stream(decode_stream(body), limits)))
}
