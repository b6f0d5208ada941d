use crate::error::{Result, StreamError};
use crate::json::{self, FixMode, Limits, PendingScalars};
use crate::metrics::ParseStats;
use serde::de::DeserializeOwned;

/// A type that can be decoded from a stream of partial JSON.
///
/// `Partial` is the shadow of the type with every field optional, so that it
/// decodes from whatever prefix of the document has been repaired so far.
pub trait Generable: DeserializeOwned {
    type Partial: DeserializeOwned;
}

/// The partially generated form of `T`
pub type PartiallyGenerated<T> = <T as Generable>::Partial;

impl Generable for serde_json::Value {
    type Partial = serde_json::Value;
}

/// How a fragment is turned into decodable text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblerOptions {
    pub mode: FixMode,
    pub pending: PendingScalars,
    pub limits: Limits,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        Self {
            mode: FixMode::Repair,
            pending: PendingScalars::Omit,
            limits: Limits::default(),
        }
    }
}

/// Repair `fragment` and decode it into `T::Partial`.
///
/// Stateless: the same fragment always yields the same value.
pub fn decode_partial<T: Generable>(
    fragment: &str,
    options: &AssemblerOptions,
) -> Result<PartiallyGenerated<T>> {
    let fixed = json::fix(fragment, options.mode, options.pending, &options.limits)?;
    serde_json::from_str(&fixed.text).map_err(StreamError::DecodeMismatch)
}

/// Accumulates one content block's JSON fragment and keeps the latest
/// successfully decoded partial value.
pub struct StreamingChunkAssembler<T: Generable> {
    /// Accumulated fragment; only grows until reset
    fragment: String,
    /// Repaired text behind `latest`
    repaired: Option<String>,
    latest: Option<T::Partial>,
    options: AssemblerOptions,
    stats: ParseStats,
}

impl<T: Generable> StreamingChunkAssembler<T> {
    pub fn new() -> Self {
        Self::with_options(AssemblerOptions::default())
    }

    pub fn with_options(options: AssemblerOptions) -> Self {
        Self {
            fragment: String::new(),
            repaired: None,
            latest: None,
            options,
            stats: ParseStats::new(),
        }
    }

    /// Append a chunk and re-decode.
    ///
    /// Returns the latest partial value. A chunk that does not decode leaves
    /// the previous value in place.
    pub fn push(&mut self, chunk: &str) -> Option<&T::Partial> {
        self.fragment.push_str(chunk);
        self.refresh();
        self.latest.as_ref()
    }

    fn refresh(&mut self) {
        self.stats.repairs += 1;
        let fixed = match json::fix(
            &self.fragment,
            self.options.mode,
            self.options.pending,
            &self.options.limits,
        ) {
            Ok(fixed) => fixed,
            Err(e) => {
                tracing::debug!(error = %e, size = self.fragment.len(), "Repair skipped");
                return;
            }
        };
        if fixed.depth_exceeded {
            self.stats.record(&StreamError::DepthExceeded {
                max_depth: self.options.limits.max_depth,
            });
        }

        // Unchanged text decodes to the same value
        if self.repaired.as_deref() == Some(fixed.text.as_ref()) {
            return;
        }

        match serde_json::from_str::<T::Partial>(&fixed.text) {
            Ok(value) => {
                self.stats.partial_decodes += 1;
                self.latest = Some(value);
                self.repaired = Some(fixed.text.into_owned());
                tracing::debug!(size = self.fragment.len(), "Decoded partial value");
            }
            Err(e) => {
                let err = StreamError::DecodeMismatch(e);
                tracing::debug!(error = %err, size = self.fragment.len(), "Keeping previous partial value");
                self.stats.record(&err);
            }
        }
    }

    /// Latest successfully decoded partial value
    pub fn latest(&self) -> Option<&T::Partial> {
        self.latest.as_ref()
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// Get the current size of buffered data
    pub fn size(&self) -> usize {
        self.fragment.len()
    }

    pub fn stats(&self) -> &ParseStats {
        &self.stats
    }

    /// Strict decode of the whole fragment once the provider signals completion.
    ///
    /// This is the only failure surfaced as a generation error.
    pub fn finish(&self) -> Result<T> {
        serde_json::from_str(&self.fragment).map_err(|source| {
            tracing::warn!(
                size = self.fragment.len(),
                error = %source,
                "Final decode of streamed JSON failed"
            );
            StreamError::TerminalDecodeFailure {
                source,
                fragment_len: self.fragment.len(),
            }
        })
    }

    /// Start a new content block
    pub fn reset(&mut self) {
        self.fragment.clear();
        self.repaired = None;
        self.latest = None;
    }
}

impl<T: Generable> Default for StreamingChunkAssembler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Generable> std::fmt::Debug for StreamingChunkAssembler<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingChunkAssembler")
            .field("size", &self.fragment.len())
            .field("has_value", &self.latest.is_some())
            .field("options", &self.options)
            .finish()
    }
}
