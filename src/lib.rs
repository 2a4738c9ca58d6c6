//! # Plugin Tool Stream
//!
//! Client-side handling of streamed plugin tool invocations.
//!
//! ## Overview
//!
//! A tool invocation answers with a line-delimited stream of typed JSON
//! messages. Binary payloads may be split by the daemon into small
//! `blob_chunk` messages; this crate puts them back together:
//!
//! - Every non-chunk message is forwarded immediately and in order
//! - Chunks are buffered per chunk id and replaced by a single `blob`
//!   message when the terminal chunk arrives
//! - Oversized chunks (> 8 KiB) or blobs (> 30 MiB) abort the stream
//!
//! ## Quick Start
//!
//! ```rust
//! use plugin_tool_stream::limits::ReassemblyLimits;
//! use plugin_tool_stream::models::ToolInvokeMessage;
//! use plugin_tool_stream::streaming::reassemble_iter;
//!
//! let input = vec![
//!     Ok(ToolInvokeMessage::blob_chunk("img", 4, b"AB".to_vec(), false)),
//!     Ok(ToolInvokeMessage::blob_chunk("img", 4, b"CD".to_vec(), true)),
//! ];
//!
//! let out: Vec<_> = reassemble_iter(input, ReassemblyLimits::default()).collect();
//! assert_eq!(out[0].as_ref().unwrap().as_blob().unwrap().as_ref(), b"ABCD");
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Configuration loading and validation
//! - [`error`] - Error types and handling
//! - [`models`] - Message envelope and invocation request
//! - [`streaming`] - Daemon stream decoder and blob reassembler
//! - [`invoker`] - Transport seam and end-to-end invocation
//! - [`client`] - HTTP client for the plugin daemon

pub mod client;
pub mod config;
pub mod error;
pub mod invoker;
pub mod limits;
pub mod metrics;
pub mod models;
pub mod streaming;

pub use config::ClientConfig;
pub use error::{Result, ToolStreamError};
