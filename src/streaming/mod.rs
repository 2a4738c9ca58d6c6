pub mod decoder;
pub mod reassembler;

pub use decoder::{DaemonResponse, EventStreamDecoder, decode_stream};
pub use reassembler::{BlobReassembler, BlobReassembly, reassemble_iter, reassemble_stream};
