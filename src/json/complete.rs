use super::Limits;
use super::scan::{self, Mode};
use crate::error::Result;

/// Outcome of [`complete`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The input already is a document; use it untouched
    NotNeeded,
    /// A truncated copy of the input with closing characters appended
    Completed(String),
}

impl Completion {
    /// The text to decode: the completion, or `original` when none was needed
    pub fn apply<'a>(&'a self, original: &'a str) -> &'a str {
        match self {
            Completion::NotNeeded => original,
            Completion::Completed(text) => text,
        }
    }

    /// Length of the completion; zero means no completion was needed
    pub fn len(&self) -> usize {
        match self {
            Completion::NotNeeded => 0,
            Completion::Completed(text) => text.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Complete a JSON prefix with minimal disturbance.
///
/// The input is cut back to the last point where appending only closing
/// quotes and brackets yields a document. Interior content is never rewritten.
pub fn complete(input: &str, limits: &Limits) -> Result<Completion> {
    let plan = scan::scan(input, Mode::Complete, limits.max_depth);
    if plan.complete {
        return Ok(Completion::NotNeeded);
    }
    if plan.depth_exceeded {
        tracing::warn!(
            max_depth = limits.max_depth,
            "JSON nesting limit reached while completing"
        );
    }
    plan.render(input, limits.output_capacity)
        .map(Completion::Completed)
}

/// Complete into a caller-allocated buffer.
///
/// Returns the number of bytes written. Zero means the input is already a
/// document and the caller should use it as-is.
pub fn complete_into(input: &[u8], max_depth: usize, out: &mut [u8]) -> Result<usize> {
    let text = scan::utf8_prefix(input);
    let plan = scan::scan(text, Mode::Complete, max_depth);
    if plan.complete && text.len() == input.len() {
        return Ok(0);
    }
    if plan.depth_exceeded {
        tracing::warn!(max_depth, "JSON nesting limit reached while completing");
    }
    plan.write_into(text.as_bytes(), out)
}
