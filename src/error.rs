use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamError {
    /// The caller-provided output bound cannot hold the result.
    #[error("Output buffer exhausted: need {needed} bytes, capacity is {capacity}")]
    BufferExhausted { needed: usize, capacity: usize },

    /// An SSE field whose value could not be interpreted. Never returned, only logged and counted.
    #[error("Malformed event field `{field}`: {value:?}")]
    MalformedEventField { field: String, value: String },

    /// JSON nesting went past the configured limit; deeper content was truncated.
    #[error("JSON nesting exceeds max depth {max_depth}")]
    DepthExceeded { max_depth: usize },

    #[error("Partial value does not match target shape: {0}")]
    DecodeMismatch(#[source] serde_json::Error),

    #[error("Final decode failed after {fragment_len} bytes: {source}")]
    TerminalDecodeFailure {
        #[source]
        source: serde_json::Error,
        fragment_len: usize,
    },

    #[error("Unknown content block: {0}")]
    UnknownBlock(usize),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl StreamError {
    /// Whether the condition is handled inside the parser rather than surfaced to the caller.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StreamError::BufferExhausted { .. }
                | StreamError::MalformedEventField { .. }
                | StreamError::DepthExceeded { .. }
                | StreamError::DecodeMismatch(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, StreamError>;
