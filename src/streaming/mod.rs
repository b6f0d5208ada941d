pub mod assembler;
pub mod body;
pub mod content;
pub mod line;
pub mod sse;

pub use assembler::{
    AssemblerOptions, Generable, PartiallyGenerated, StreamingChunkAssembler, decode_partial,
};
pub use body::{SseStreamExt, sse_events};
pub use content::{ContentBlock, ContentBlockManager, ContentBlockType};
pub use line::LineBuffer;
pub use sse::{SseDecoder, SseEvent, SseEventParser};
