use crate::error::StreamError;

/// Counters for the conditions the parser handles internally.
///
/// Owned by a single parser instance and updated through `&mut self`; the
/// owning task reads them with [`ParseStats::snapshot`].
#[derive(Debug, Default, Clone)]
pub struct ParseStats {
    /// Events handed to the caller
    pub events_dispatched: u64,

    /// Comment lines skipped
    pub comments: u64,

    /// Recognized fields whose value was unusable (bad `retry`, NUL in `id`)
    pub malformed_fields: u64,

    /// Field names outside the SSE vocabulary
    pub unknown_fields: u64,

    /// Repair or completion passes run
    pub repairs: u64,

    /// Repairs that hit the nesting limit
    pub depth_exceeded: u64,

    /// Intermediate decodes that produced a value
    pub partial_decodes: u64,

    /// Intermediate decodes rejected by the target shape
    pub decode_mismatches: u64,
}

impl ParseStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a condition that was handled locally
    pub fn record(&mut self, error: &StreamError) {
        match error {
            StreamError::MalformedEventField { .. } => self.malformed_fields += 1,
            StreamError::DepthExceeded { .. } => self.depth_exceeded += 1,
            StreamError::DecodeMismatch(_) => self.decode_mismatches += 1,
            _ => {}
        }
    }

    /// Share of intermediate decodes that succeeded, as a percentage
    pub fn decode_success_rate(&self) -> f64 {
        let total = self.partial_decodes + self.decode_mismatches;
        if total > 0 {
            (self.partial_decodes as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Get snapshot of current counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            events_dispatched: self.events_dispatched,
            comments: self.comments,
            malformed_fields: self.malformed_fields,
            unknown_fields: self.unknown_fields,
            repairs: self.repairs,
            depth_exceeded: self.depth_exceeded,
            partial_decodes: self.partial_decodes,
            decode_mismatches: self.decode_mismatches,
            decode_success_rate: self.decode_success_rate(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Immutable snapshot of counters at a point in time
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub events_dispatched: u64,
    pub comments: u64,
    pub malformed_fields: u64,
    pub unknown_fields: u64,
    pub repairs: u64,
    pub depth_exceeded: u64,
    pub partial_decodes: u64,
    pub decode_mismatches: u64,
    pub decode_success_rate: f64,
}

impl std::fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Parse Stats: {} events ({} comments, {} malformed, {} unknown fields), \
             {} repairs ({} depth-limited), {} partial decodes ({:.1}% success)",
            self.events_dispatched,
            self.comments,
            self.malformed_fields,
            self.unknown_fields,
            self.repairs,
            self.depth_exceeded,
            self.partial_decodes + self.decode_mismatches,
            self.decode_success_rate,
        )
    }
}
