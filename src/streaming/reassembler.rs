use bytes::Bytes;
use futures::{Stream, StreamExt, stream};
use std::collections::HashMap;
use std::iter::FusedIterator;
use tracing::{debug, info, warn};

use crate::error::{Result, ToolStreamError};
use crate::limits::ReassemblyLimits;
use crate::metrics::REASSEMBLY_METRICS;
use crate::models::message::{BlobChunk, MessagePayload, ToolInvokeMessage};

/// Partially received blob for one chunk id
#[derive(Debug)]
struct PendingBlob {
    /// Bytes written so far, also the next write offset
    written: usize,
    /// Declared size, fixed by the first chunk
    total_length: usize,
    buffer: Vec<u8>,
}

impl PendingBlob {
    fn new(total_length: usize, max_blob_bytes: usize) -> Self {
        // the declared length comes from upstream, never allocate past the ceiling
        Self {
            written: 0,
            total_length,
            buffer: vec![0; total_length.min(max_blob_bytes)],
        }
    }

    /// Write `data` at the current offset and advance it
    fn write_at_offset(&mut self, data: &[u8]) {
        let end = self.written + data.len();
        if end > self.buffer.len() {
            self.buffer.resize(end, 0);
        }
        self.buffer[self.written..end].copy_from_slice(data);
        self.written = end;
    }

    /// Written bytes only, without the unused part of the declared size
    fn into_vec(mut self) -> Vec<u8> {
        self.buffer.truncate(self.written);
        if self.buffer.capacity() > self.written {
            self.buffer.shrink_to_fit();
        }
        self.buffer
    }

    fn into_bytes(self) -> Bytes {
        Bytes::from(self.into_vec())
    }
}

/// Stateful reassembler for chunked blobs in a tool invocation stream
///
/// Non-chunk messages pass straight through. Chunks are accumulated per
/// chunk id and replaced by a single `blob` message once the terminal chunk
/// arrives, carrying that chunk's `meta`.
#[derive(Debug)]
pub struct BlobReassembler {
    pending: HashMap<String, PendingBlob>,
    limits: ReassemblyLimits,
}

impl BlobReassembler {
    pub fn new() -> Self {
        Self::with_limits(ReassemblyLimits::default())
    }

    pub fn with_limits(limits: ReassemblyLimits) -> Self {
        Self {
            pending: HashMap::new(),
            limits,
        }
    }

    pub fn limits(&self) -> ReassemblyLimits {
        self.limits
    }

    /// Feed one message.
    ///
    /// Returns the message to emit, if any. A non-final chunk yields
    /// `Ok(None)`. Size violations drop the blob's state and return an error;
    /// callers must stop feeding after an error.
    pub fn push(&mut self, message: ToolInvokeMessage) -> Result<Option<ToolInvokeMessage>> {
        let ToolInvokeMessage { payload, meta } = message;
        let chunk = match payload {
            MessagePayload::BlobChunk(chunk) => chunk,
            payload => {
                REASSEMBLY_METRICS.record_passthrough();
                return Ok(Some(ToolInvokeMessage { payload, meta }));
            }
        };

        REASSEMBLY_METRICS.record_chunk(chunk.blob.len());
        let BlobChunk {
            id,
            total_length,
            blob,
            end,
        } = chunk;

        let max_blob_bytes = self.limits.max_blob_bytes;
        let entry = self
            .pending
            .entry(id.clone())
            .or_insert_with(|| PendingBlob::new(total_length, max_blob_bytes));

        let size = entry.written + blob.len();
        if size > max_blob_bytes {
            self.pending.remove(&id);
            REASSEMBLY_METRICS.record_limit_violation();
            warn!(chunk_id = %id, size, limit = max_blob_bytes, "Blob exceeds size limit");
            return Err(ToolStreamError::BlobTooLarge {
                chunk_id: id,
                size,
                limit: max_blob_bytes,
            });
        }

        if blob.len() > self.limits.max_chunk_bytes {
            self.pending.remove(&id);
            REASSEMBLY_METRICS.record_limit_violation();
            warn!(
                chunk_id = %id,
                size = blob.len(),
                limit = self.limits.max_chunk_bytes,
                "Blob chunk exceeds size limit"
            );
            return Err(ToolStreamError::ChunkTooLarge {
                chunk_id: id,
                size: blob.len(),
                limit: self.limits.max_chunk_bytes,
            });
        }

        entry.write_at_offset(&blob);
        debug!(chunk_id = %id, written = entry.written, end, "Buffered blob chunk");

        if !end {
            return Ok(None);
        }

        let Some(pending) = self.pending.remove(&id) else {
            return Err(ToolStreamError::InternalError(format!(
                "pending blob {} vanished before completion",
                id
            )));
        };
        if pending.written != pending.total_length {
            debug!(
                chunk_id = %id,
                written = pending.written,
                declared = pending.total_length,
                "Blob length differs from declared total"
            );
        }

        let blob = pending.into_bytes();
        REASSEMBLY_METRICS.record_blob(blob.len());
        info!(chunk_id = %id, size = blob.len(), "Reassembled blob");

        let mut message = ToolInvokeMessage::blob(blob);
        message.meta = meta;
        Ok(Some(message))
    }

    /// Number of blobs still waiting for their terminal chunk
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Bytes buffered so far for a chunk id
    pub fn pending_bytes(&self, chunk_id: &str) -> Option<usize> {
        self.pending.get(chunk_id).map(|p| p.written)
    }
}

impl Default for BlobReassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BlobReassembler {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            debug!(count = self.pending.len(), "Discarding unfinished blobs");
            REASSEMBLY_METRICS.record_abandoned(self.pending.len());
        }
    }
}

/// Iterator adapter returned by [`reassemble_iter`]
pub struct BlobReassembly<I> {
    input: I,
    reassembler: BlobReassembler,
    done: bool,
}

impl<I> Iterator for BlobReassembly<I>
where
    I: Iterator<Item = Result<ToolInvokeMessage>>,
{
    type Item = Result<ToolInvokeMessage>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        for item in self.input.by_ref() {
            let result = item.and_then(|msg| self.reassembler.push(msg));
            match result {
                Ok(Some(out)) => return Some(Ok(out)),
                Ok(None) => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }

        self.done = true;
        None
    }
}

impl<I> FusedIterator for BlobReassembly<I> where I: Iterator<Item = Result<ToolInvokeMessage>> {}

/// Reassemble blobs over a blocking message sequence.
///
/// The first error (upstream or size limit) is yielded once and ends the
/// sequence.
pub fn reassemble_iter<I>(input: I, limits: ReassemblyLimits) -> BlobReassembly<I::IntoIter>
where
    I: IntoIterator<Item = Result<ToolInvokeMessage>>,
{
    BlobReassembly {
        input: input.into_iter(),
        reassembler: BlobReassembler::with_limits(limits),
        done: false,
    }
}

/// Reassemble blobs over an async message stream.
///
/// Pull driven: upstream is only polled when the consumer asks for the next
/// item. The first error ends the stream; pending blobs are dropped with it.
pub fn reassemble_stream<S>(
    input: S,
    limits: ReassemblyLimits,
) -> impl Stream<Item = Result<ToolInvokeMessage>>
where
    S: Stream<Item = Result<ToolInvokeMessage>>,
{
    let state = Some((Box::pin(input), BlobReassembler::with_limits(limits)));

    stream::unfold(state, |state| async move {
        let (mut input, mut reassembler) = state?;
        loop {
            match input.next().await {
                Some(Ok(msg)) => match reassembler.push(msg) {
                    Ok(Some(out)) => return Some((Ok(out), Some((input, reassembler)))),
                    Ok(None) => continue,
                    Err(e) => return Some((Err(e), None)),
                },
                Some(Err(e)) => return Some((Err(e), None)),
                None => return None,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::{MAX_BLOB_BYTES, MAX_CHUNK_BYTES};
    use serde_json::json;

    fn text(s: &str) -> ToolInvokeMessage {
        ToolInvokeMessage::other("text", json!({ "text": s }))
    }

    fn chunk(id: &str, data: &[u8], end: bool) -> ToolInvokeMessage {
        ToolInvokeMessage::blob_chunk(id, 4, data.to_vec(), end)
    }

    fn run(input: Vec<ToolInvokeMessage>) -> Vec<Result<ToolInvokeMessage>> {
        reassemble_iter(input.into_iter().map(Ok), ReassemblyLimits::default()).collect()
    }

    #[test]
    fn test_passthrough_preserves_order() {
        let input = vec![
            text("one"),
            ToolInvokeMessage::other("json", json!({"json_object": {"a": 1}})),
            text("two").with_meta(json!({"x": true})),
        ];
        let out: Vec<_> = run(input.clone()).into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(out, input);
    }

    #[test]
    fn test_single_chunk_blob() {
        let mut reassembler = BlobReassembler::new();
        let out = reassembler
            .push(ToolInvokeMessage::blob_chunk("a", 3, b"xyz".to_vec(), true))
            .unwrap()
            .unwrap();

        assert_eq!(out.kind(), "blob");
        assert_eq!(out.as_blob().unwrap().as_ref(), b"xyz");
        assert_eq!(reassembler.pending_count(), 0);
    }

    #[test]
    fn test_multi_chunk_reassembly() {
        let out = run(vec![
            chunk("x", b"AB", false),
            text("between"),
            chunk("x", b"CD", true),
        ]);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].as_ref().unwrap().kind(), "text");
        assert_eq!(out[1].as_ref().unwrap().as_blob().unwrap().as_ref(), b"ABCD");
    }

    #[test]
    fn test_interleaved_chunk_ids() {
        let out = run(vec![
            chunk("x", b"x1", false),
            chunk("y", b"y1", false),
            chunk("x", b"x2", true),
            chunk("y", b"y2", true),
        ]);

        let blobs: Vec<_> = out
            .into_iter()
            .map(|r| r.unwrap().as_blob().unwrap().clone())
            .collect();
        assert_eq!(blobs, vec![Bytes::from("x1x2"), Bytes::from("y1y2")]);
    }

    #[test]
    fn test_oversized_chunk_aborts() {
        let big = vec![0u8; MAX_CHUNK_BYTES + 1];
        let out = run(vec![
            text("before"),
            ToolInvokeMessage::blob_chunk("big", big.len(), big, false),
            text("after"),
        ]);

        assert_eq!(out.len(), 2);
        assert!(out[0].is_ok());
        match &out[1] {
            Err(ToolStreamError::ChunkTooLarge { size, .. }) => assert_eq!(*size, 8193),
            other => panic!("expected ChunkTooLarge, got {:?}", other),
        }
    }

    #[test]
    fn test_chunk_at_limit_accepted() {
        let exact = vec![7u8; MAX_CHUNK_BYTES];
        let out = run(vec![ToolInvokeMessage::blob_chunk(
            "ok",
            exact.len(),
            exact,
            true,
        )]);
        assert_eq!(out[0].as_ref().unwrap().as_blob().unwrap().len(), 8192);
    }

    #[test]
    fn test_cumulative_limit_at_crossing_chunk() {
        let mut reassembler = BlobReassembler::new();
        let piece = vec![1u8; MAX_CHUNK_BYTES];
        let full_chunks = MAX_BLOB_BYTES / MAX_CHUNK_BYTES;

        for _ in 0..full_chunks {
            let msg = ToolInvokeMessage::blob_chunk("huge", MAX_BLOB_BYTES, piece.clone(), false);
            assert!(reassembler.push(msg).unwrap().is_none());
        }
        assert_eq!(reassembler.pending_bytes("huge"), Some(MAX_BLOB_BYTES));

        let err = reassembler
            .push(ToolInvokeMessage::blob_chunk("huge", MAX_BLOB_BYTES, vec![1u8], false))
            .unwrap_err();
        assert!(matches!(err, ToolStreamError::BlobTooLarge { size, .. } if size == MAX_BLOB_BYTES + 1));
        assert!(err.is_size_limit());
        assert_eq!(reassembler.pending_count(), 0);
    }

    #[test]
    fn test_custom_limits() {
        let limits = ReassemblyLimits {
            max_blob_bytes: 5,
            max_chunk_bytes: 4,
        };
        let input = vec![chunk("x", b"abc", false), chunk("x", b"def", true)];
        let out: Vec<_> = reassemble_iter(input.into_iter().map(Ok), limits).collect();

        assert_eq!(out.len(), 1);
        assert!(matches!(out[0], Err(ToolStreamError::BlobTooLarge { .. })));
    }

    #[test]
    fn test_abandoned_partial_blob() {
        let out = run(vec![chunk("x", b"AB", false), text("done")]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_ref().unwrap().kind(), "text");
    }

    #[test]
    fn test_meta_from_terminal_chunk() {
        let out = run(vec![
            chunk("x", b"AB", false).with_meta(json!({"mime_type": "text/plain"})),
            chunk("x", b"CD", true).with_meta(json!({"mime_type": "image/png"})),
        ]);
        let blob = out[0].as_ref().unwrap();
        assert_eq!(blob.meta, Some(json!({"mime_type": "image/png"})));
    }

    #[test]
    fn test_total_length_fixed_by_first_chunk() {
        let mut reassembler = BlobReassembler::new();
        reassembler
            .push(ToolInvokeMessage::blob_chunk("x", 2, b"AB".to_vec(), false))
            .unwrap();
        // a later chunk declaring a different size does not resize the record
        let out = reassembler
            .push(ToolInvokeMessage::blob_chunk("x", 100, b"CDE".to_vec(), true))
            .unwrap()
            .unwrap();
        assert_eq!(out.as_blob().unwrap().as_ref(), b"ABCDE");
    }

    #[test]
    fn test_short_blob_not_padded() {
        let out = run(vec![ToolInvokeMessage::blob_chunk(
            "x",
            10,
            b"abc".to_vec(),
            true,
        )]);
        assert_eq!(out[0].as_ref().unwrap().as_blob().unwrap().as_ref(), b"abc");
    }

    #[test]
    fn test_short_blob_releases_declared_capacity() {
        let mut pending = PendingBlob::new(1024 * 1024, MAX_BLOB_BYTES);
        pending.write_at_offset(b"tiny");
        assert!(pending.buffer.capacity() >= 1024 * 1024);

        let data = pending.into_vec();
        assert_eq!(data, b"tiny");
        assert!(data.capacity() < 1024);
    }

    #[test]
    fn test_chunk_after_completion_starts_new_blob() {
        let out = run(vec![
            chunk("x", b"AB", true),
            chunk("x", b"CD", true),
        ]);
        let blobs: Vec<_> = out
            .into_iter()
            .map(|r| r.unwrap().as_blob().unwrap().clone())
            .collect();
        assert_eq!(blobs, vec![Bytes::from("AB"), Bytes::from("CD")]);
    }

    #[test]
    fn test_upstream_error_ends_iteration() {
        let input = vec![
            Ok(text("a")),
            Err(ToolStreamError::EmptyData),
            Ok(text("b")),
        ];
        let mut iter = reassemble_iter(input, ReassemblyLimits::default());
        assert!(iter.next().unwrap().is_ok());
        assert!(matches!(iter.next(), Some(Err(ToolStreamError::EmptyData))));
        assert!(iter.next().is_none());
        assert!(iter.next().is_none());
    }

    #[tokio::test]
    async fn test_stream_adapter_fails_fast() {
        let big = vec![0u8; MAX_CHUNK_BYTES + 1];
        let input = stream::iter(vec![
            Ok(chunk("x", b"AB", false)),
            Ok(chunk("x", b"CD", true)),
            Ok(ToolInvokeMessage::blob_chunk("y", big.len(), big, true)),
            Ok(text("never")),
        ]);

        let out: Vec<_> = reassemble_stream(input, ReassemblyLimits::default())
            .collect()
            .await;

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].as_ref().unwrap().as_blob().unwrap().as_ref(), b"ABCD");
        assert!(matches!(out[1], Err(ToolStreamError::ChunkTooLarge { .. })));
    }
}
