//! Making truncated JSON parseable.
//!
//! Two contracts share one scanner:
//! - [`repair`] forward-closes the text, dropping dangling keys, trailing
//!   commas and (depending on [`PendingScalars`]) in-progress scalars.
//! - [`complete`] truncates at the last safe point and only appends closing
//!   quotes and brackets, reporting [`Completion::NotNeeded`] for text that is
//!   already a document.
//!
//! Both are pure and bounded by [`Limits`]. Empty or unsalvageable input
//! yields the document `null`.

mod complete;
mod repair;
mod scan;

pub use complete::{Completion, complete, complete_into};
pub use repair::{RepairOutcome, Repaired, repair, repair_into, repair_with};

use crate::config::{DEFAULT_MAX_DEPTH, DEFAULT_OUTPUT_CAPACITY};
use crate::error::{Result, StreamError};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Document produced when nothing in the input can be salvaged
pub const TRIVIAL_DOCUMENT: &str = "null";

/// Resource bounds for one repair or completion call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Containers deeper than this are truncated
    pub max_depth: usize,
    /// Maximum length of the produced document in bytes
    pub output_capacity: usize,
}

impl Limits {
    pub fn new(max_depth: usize, output_capacity: usize) -> Self {
        Self {
            max_depth,
            output_capacity,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH, DEFAULT_OUTPUT_CAPACITY)
    }
}

/// What to do with a string, number or literal still being transmitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingScalars {
    /// Close strings, keep the valid prefix of numbers, finish literals
    Close,
    /// Drop the scalar along with its key
    Omit,
}

/// Which contract the streaming assembler applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixMode {
    Repair,
    /// Minimal disturbance: truncate and append closers only
    Complete,
}

impl FromStr for PendingScalars {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "close" => Ok(PendingScalars::Close),
            "omit" => Ok(PendingScalars::Omit),
            other => Err(format!("unknown pending policy `{}` (use close|omit)", other)),
        }
    }
}

impl FromStr for FixMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "repair" => Ok(FixMode::Repair),
            "complete" => Ok(FixMode::Complete),
            other => Err(format!("unknown mode `{}` (use repair|complete)", other)),
        }
    }
}

impl fmt::Display for PendingScalars {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PendingScalars::Close => "close",
            PendingScalars::Omit => "omit",
        })
    }
}

impl fmt::Display for FixMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FixMode::Repair => "repair",
            FixMode::Complete => "complete",
        })
    }
}

/// Parseable text derived from a fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixed<'a> {
    /// Borrowed when the fragment was already a document
    pub text: Cow<'a, str>,
    /// Nesting went past `max_depth` and deeper content was dropped
    pub depth_exceeded: bool,
    /// Some non-whitespace input did not make it into `text`
    pub truncated: bool,
}

/// Run either contract and return text ready for decoding.
///
/// In [`FixMode::Complete`] a fragment that is already a document is
/// borrowed unchanged. `pending` only applies to [`FixMode::Repair`].
pub fn fix<'a>(
    input: &'a str,
    mode: FixMode,
    pending: PendingScalars,
    limits: &Limits,
) -> Result<Fixed<'a>> {
    match mode {
        FixMode::Repair => {
            let repaired = repair_with(input, pending, limits)?;
            Ok(Fixed {
                text: Cow::Owned(repaired.text),
                depth_exceeded: repaired.depth_exceeded,
                truncated: repaired.truncated,
            })
        }
        FixMode::Complete => {
            let plan = scan::scan(input, scan::Mode::Complete, limits.max_depth);
            let text = if plan.complete {
                if input.len() > limits.output_capacity {
                    return Err(StreamError::BufferExhausted {
                        needed: input.len(),
                        capacity: limits.output_capacity,
                    });
                }
                Cow::Borrowed(input)
            } else {
                Cow::Owned(plan.render(input, limits.output_capacity)?)
            };
            Ok(Fixed {
                text,
                depth_exceeded: plan.depth_exceeded,
                truncated: plan.truncated,
            })
        }
    }
}
