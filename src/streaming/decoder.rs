use bytes::{Buf, Bytes, BytesMut};
use futures::{Stream, StreamExt, stream};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::fmt::Display;
use std::marker::PhantomData;
use std::pin::Pin;

use crate::error::{Result, ToolStreamError};
use crate::models::ToolInvokeMessage;

/// Envelope wrapping every line of a plugin daemon response
#[derive(Debug, Deserialize)]
pub struct DaemonResponse<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

/// Structured error the daemon may encode inside `message`
#[derive(Debug, Deserialize)]
struct DaemonErrorBody {
    error_type: String,
    #[serde(default)]
    message: String,
}

impl<T> DaemonResponse<T> {
    /// Unwrap the payload, turning daemon failures into errors
    pub fn into_data(self) -> Result<T> {
        if self.code != 0 {
            let (error_type, message) = match serde_json::from_str::<DaemonErrorBody>(&self.message)
            {
                Ok(body) => (body.error_type, body.message),
                Err(_) => ("PluginDaemonError".to_string(), self.message),
            };
            return Err(ToolStreamError::DaemonError {
                code: self.code,
                error_type,
                message,
            });
        }

        self.data.ok_or(ToolStreamError::EmptyData)
    }
}

/// Stateful decoder for the daemon's line-delimited streaming response
///
/// Each line is an optional `data:` prefix followed by a JSON
/// [`DaemonResponse`]. Lines may be split across network reads.
pub struct EventStreamDecoder<T = ToolInvokeMessage> {
    buffer: BytesMut,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> EventStreamDecoder<T> {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
            _marker: PhantomData,
        }
    }

    /// Feed new data and decode every complete line, in order.
    ///
    /// Decoding stops at the first failing line: its error is the last
    /// element and items decoded before it are kept. Later lines stay
    /// buffered.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Result<T>> {
        self.buffer.extend_from_slice(chunk);

        let mut results = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line = self.buffer.split_to(pos);
            self.buffer.advance(1);
            match Self::decode_line(&line) {
                Ok(Some(item)) => results.push(Ok(item)),
                Ok(None) => {}
                Err(e) => {
                    results.push(Err(e));
                    break;
                }
            }
        }

        results
    }

    /// Decode whatever is left once the input is exhausted
    pub fn finish(&mut self) -> Result<Option<T>> {
        let line = self.buffer.split();
        Self::decode_line(&line)
    }

    /// Bytes waiting for a line terminator
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    fn decode_line(line: &[u8]) -> Result<Option<T>> {
        let line = line.trim_ascii();
        let line = line.strip_prefix(b"data:").unwrap_or(line).trim_ascii();
        if line.is_empty() {
            return Ok(None);
        }

        let response: DaemonResponse<T> = serde_json::from_slice(line)?;
        response.into_data().map(Some)
    }
}

impl<T: DeserializeOwned> Default for EventStreamDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

struct DecodeState<S> {
    input: Pin<Box<S>>,
    decoder: EventStreamDecoder<ToolInvokeMessage>,
    ready: VecDeque<Result<ToolInvokeMessage>>,
    finished: bool,
}

/// Decode a raw byte stream into tool messages.
///
/// Messages decoded before a failure are yielded first; the first transport
/// or decode error is then yielded once and ends the stream.
pub fn decode_stream<S, E>(input: S) -> impl Stream<Item = Result<ToolInvokeMessage>>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: Display,
{
    let state = DecodeState {
        input: Box::pin(input),
        decoder: EventStreamDecoder::new(),
        ready: VecDeque::new(),
        finished: false,
    };

    stream::unfold(Some(state), |state| async move {
        let mut state = state?;
        loop {
            match state.ready.pop_front() {
                Some(Ok(msg)) => return Some((Ok(msg), Some(state))),
                Some(Err(e)) => return Some((Err(e), None)),
                None => {}
            }
            if state.finished {
                return None;
            }

            match state.input.next().await {
                Some(Ok(chunk)) => state.ready.extend(state.decoder.feed(&chunk)),
                Some(Err(e)) => {
                    return Some((Err(ToolStreamError::UpstreamError(e.to_string())), None));
                }
                None => {
                    state.finished = true;
                    match state.decoder.finish() {
                        Ok(Some(item)) => state.ready.push_back(Ok(item)),
                        Ok(None) => {}
                        Err(e) => state.ready.push_back(Err(e)),
                    }
                }
            }
        }
    })
}
