//! Adapting a streaming HTTP body into SSE events.
//!
//! Works with any fallible byte stream, e.g. `reqwest::Response::bytes_stream()`:
//!
//! ```ignore
//! use llm_stream_parser::streaming::SseStreamExt;
//!
//! let mut events = response.bytes_stream().sse_events();
//! while let Some(event) = events.next().await {
//!     let event = event?;
//!     println!("{}: {}", event.event_type(), event.data);
//! }
//! ```

use super::sse::{SseDecoder, SseEvent};
use futures::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;

/// Convert a stream of byte chunks into a stream of SSE events.
///
/// Transport errors are passed through in order; the stream ends after the
/// body ends and any trailing event has been flushed.
pub fn sse_events<S, B, E>(body: S) -> impl Stream<Item = Result<SseEvent, E>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    stream::unfold(
        (
            Box::pin(body),
            SseDecoder::new(),
            VecDeque::new(),
            false,
        ),
        |(mut body, mut decoder, mut ready, mut ended)| async move {
            loop {
                if let Some(event) = ready.pop_front() {
                    return Some((Ok(event), (body, decoder, ready, ended)));
                }
                if ended {
                    return None;
                }

                match body.next().await {
                    Some(Ok(chunk)) => ready.extend(decoder.feed(chunk.as_ref())),
                    Some(Err(e)) => return Some((Err(e), (body, decoder, ready, ended))),
                    None => {
                        // Body ended - flush the unterminated tail
                        ended = true;
                        ready.extend(decoder.finish());
                        tracing::trace!(
                            events = decoder.stats().events_dispatched,
                            "SSE body ended"
                        );
                    }
                }
            }
        },
    )
}

/// Extension trait for byte streams to enable SSE parsing
pub trait SseStreamExt<B, E>: Stream<Item = Result<B, E>> + Sized
where
    B: AsRef<[u8]>,
{
    fn sse_events(self) -> impl Stream<Item = Result<SseEvent, E>> {
        sse_events(self)
    }
}

impl<S, B, E> SseStreamExt<B, E> for S
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
}
