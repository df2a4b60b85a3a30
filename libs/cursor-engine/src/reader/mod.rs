//! Concrete backend readers. Only the resolver constructs them.

mod chunked;
mod inline;
mod volume;

pub use chunked::{ChannelChunkProvider, ChunkSender, ChunkedReader, InlineChunkProvider, chunk_channel};
pub use inline::InlineReader;
pub use volume::VolumeStatusReader;
