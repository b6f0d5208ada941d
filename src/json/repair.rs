use super::scan::{self, Mode, Plan};
use super::{Limits, PendingScalars};
use crate::error::Result;

/// Result of [`repair_into`]: bytes written plus what the repair had to give up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepairOutcome {
    pub len: usize,
    pub depth_exceeded: bool,
    pub truncated: bool,
}

/// An owned repaired document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repaired {
    pub text: String,
    /// Nesting went past `max_depth` and deeper content was dropped
    pub depth_exceeded: bool,
    /// Some non-whitespace input did not make it into `text`
    pub truncated: bool,
}

/// Repair a JSON prefix, closing any string value left open.
///
/// ```
/// use llm_stream_parser::json::{Limits, repair};
///
/// let repaired = repair(r#"{"a":1,"b":"#, &Limits::default()).unwrap();
/// assert_eq!(repaired.text, r#"{"a":1}"#);
/// ```
pub fn repair(input: &str, limits: &Limits) -> Result<Repaired> {
    repair_with(input, PendingScalars::Close, limits)
}

/// Repair a JSON prefix with an explicit policy for in-progress scalars
pub fn repair_with(input: &str, pending: PendingScalars, limits: &Limits) -> Result<Repaired> {
    let plan = scan::scan(input, Mode::Repair(pending), limits.max_depth);
    log_plan(&plan, limits);
    let text = plan.render(input, limits.output_capacity)?;
    Ok(Repaired {
        text,
        depth_exceeded: plan.depth_exceeded,
        truncated: plan.truncated,
    })
}

/// Repair into a caller-allocated buffer.
///
/// Nothing is retained after the call returns. When `out` is too small the
/// call fails with `BufferExhausted` carrying the required length, and the
/// caller may retry with a larger buffer.
pub fn repair_into(input: &[u8], max_depth: usize, out: &mut [u8]) -> Result<RepairOutcome> {
    let text = scan::utf8_prefix(input);
    let plan = scan::scan(text, Mode::Repair(PendingScalars::Close), max_depth);
    log_plan(&plan, &Limits::new(max_depth, out.len()));
    let len = plan.write_into(text.as_bytes(), out)?;
    Ok(RepairOutcome {
        len,
        depth_exceeded: plan.depth_exceeded,
        truncated: plan.truncated || text.len() < input.len(),
    })
}

fn log_plan(plan: &Plan, limits: &Limits) {
    if plan.depth_exceeded {
        tracing::warn!(
            max_depth = limits.max_depth,
            "JSON nesting limit reached, truncating deeper content"
        );
    } else if plan.truncated {
        tracing::debug!(
            kept = plan.cut.map_or(0, |c| c.pos),
            "Dropped unparseable tail while repairing JSON"
        );
    }
}
