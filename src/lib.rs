//! # LLM Stream Parser
//!
//! Incremental parsing for streaming LLM responses: raw, arbitrarily chunked
//! bytes in; Server-Sent Events and continuously updated partial values out.
//!
//! ## Overview
//!
//! ```text
//! bytes -> LineBuffer -> SseEventParser -> SseEvent.data
//!       -> json::repair / json::complete -> StreamingChunkAssembler -> T::Partial ... T
//! ```
//!
//! Every component is synchronous and owned by the task reading the stream.
//! Malformed input never panics: unusable SSE fields are skipped, and JSON is
//! truncated back to its last salvageable point. The only caller-visible
//! failures are an exhausted output bound and the final strict decode.
//!
//! ## Quick Start
//!
//! ```rust
//! use llm_stream_parser::streaming::{SseDecoder, StreamingChunkAssembler};
//! use serde_json::{Value, json};
//!
//! let mut decoder = SseDecoder::new();
//! let mut assembler = StreamingChunkAssembler::<Value>::new();
//!
//! for chunk in [&b"data: {\"name\":\"Al"[..], &b"\n\ndata: ice\",\"age\":30}\n\n"[..]] {
//!     for event in decoder.feed(chunk) {
//!         assembler.push(&event.data);
//!     }
//! }
//! assert_eq!(assembler.finish().unwrap(), json!({"name": "Alice", "age": 30}));
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Limits and assembler settings from TOML or environment
//! - [`error`] - Error types and handling
//! - [`json`] - JSON repair and completion
//! - [`metrics`] - Counters for conditions handled inside the parser
//! - [`streaming`] - Line buffering, SSE events, partial decoding

pub mod config;
pub mod error;
pub mod json;
pub mod metrics;
pub mod streaming;

pub use config::ParserConfig;
pub use error::{Result, StreamError};
