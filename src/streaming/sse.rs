use super::line::LineBuffer;
use crate::error::StreamError;
use crate::metrics::ParseStats;
use serde::Serialize;

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// One dispatched Server-Sent Event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SseEvent {
    /// Last event ID seen on the stream; persists across events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    /// `data` lines joined with `\n`
    pub data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<u64>,
}

impl SseEvent {
    /// Event type, defaulting to `message`
    pub fn event_type(&self) -> &str {
        self.event.as_deref().unwrap_or("message")
    }
}

/// Accumulates SSE fields line by line and dispatches events on blank lines
#[derive(Debug, Default)]
pub struct SseEventParser {
    last_event_id: Option<String>,
    event: Option<String>,
    data: Vec<String>,
    retry: Option<u64>,
    /// A field has been accumulated since the last dispatch
    dirty: bool,
    stats: ParseStats,
}

impl SseEventParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line (delimiter already stripped)
    pub fn ingest_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }

        if line.starts_with(':') {
            self.stats.comments += 1;
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        tracing::trace!(field, len = value.len(), "SSE field");

        match field {
            "data" => {
                self.data.push(value.to_string());
                self.dirty = true;
            }
            "event" => {
                self.event = Some(value.to_string());
                self.dirty = true;
            }
            "id" => {
                if value.contains('\0') {
                    self.malformed(field, value);
                } else {
                    self.last_event_id = (!value.is_empty()).then(|| value.to_string());
                    self.dirty = true;
                }
            }
            "retry" => match parse_retry(value) {
                Some(retry) => {
                    self.retry = Some(retry);
                    self.dirty = true;
                }
                None => self.malformed(field, value),
            },
            _ => {
                self.stats.unknown_fields += 1;
                tracing::debug!(field, "Ignoring unknown SSE field");
            }
        }

        None
    }

    /// Flush pending fields as a final event when the stream ends without a blank line
    pub fn finish(&mut self) -> Option<SseEvent> {
        self.dispatch()
    }

    /// ID that will be attached to the next event
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    pub fn has_pending(&self) -> bool {
        self.dirty
    }

    pub fn stats(&self) -> &ParseStats {
        &self.stats
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;

        let event = SseEvent {
            id: self.last_event_id.clone(),
            event: self.event.take(),
            data: std::mem::take(&mut self.data).join("\n"),
            retry: self.retry.take(),
        };
        self.stats.events_dispatched += 1;
        tracing::trace!(
            event_type = event.event_type(),
            data_len = event.data.len(),
            "Dispatched SSE event"
        );
        Some(event)
    }

    fn malformed(&mut self, field: &str, value: &str) {
        let err = StreamError::MalformedEventField {
            field: field.to_string(),
            value: value.to_string(),
        };
        tracing::debug!(error = %err, "Ignoring SSE field");
        self.stats.record(&err);
    }
}

fn parse_retry(value: &str) -> Option<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

/// Byte-level SSE decoder: a [`LineBuffer`] feeding an [`SseEventParser`].
///
/// One instance per streaming response, owned by the task reading it.
#[derive(Debug, Default)]
pub struct SseDecoder {
    lines: LineBuffer,
    parser: SseEventParser,
    started: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self {
            lines: LineBuffer::new(),
            parser: SseEventParser::new(),
            started: false,
        }
    }

    /// Feed new data and extract complete events
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.lines.append(chunk);
        let mut events = Vec::new();
        while let Some(line) = self.lines.next_line() {
            if let Some(event) = self.ingest(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush the final unterminated line and any pending event at end of stream
    pub fn finish(&mut self) -> Vec<SseEvent> {
        let mut events = Vec::new();
        while let Some(line) = self.lines.next_line() {
            if let Some(event) = self.ingest(&line) {
                events.push(event);
            }
        }
        if let Some(rest) = self.lines.drain()
            && let Some(event) = self.ingest(&rest)
        {
            events.push(event);
        }
        if let Some(event) = self.parser.finish() {
            events.push(event);
        }
        events
    }

    /// Bytes buffered but not yet parsed into lines
    pub fn pending(&self) -> usize {
        self.lines.pending()
    }

    pub fn parser(&self) -> &SseEventParser {
        &self.parser
    }

    pub fn stats(&self) -> &ParseStats {
        self.parser.stats()
    }

    fn ingest(&mut self, line: &[u8]) -> Option<SseEvent> {
        let line = if self.started {
            line
        } else {
            self.started = true;
            line.strip_prefix(BOM).unwrap_or(line)
        };
        self.parser.ingest_line(&String::from_utf8_lossy(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ingest_all(parser: &mut SseEventParser, lines: &[&str]) -> Vec<SseEvent> {
        lines
            .iter()
            .filter_map(|line| parser.ingest_line(line))
            .collect()
    }

    #[test]
    fn test_round_trip_fields() {
        let mut parser = SseEventParser::new();
        let events = ingest_all(&mut parser, &["id: 1", "event: ping", "data: hello", ""]);
        assert_eq!(
            events,
            vec![SseEvent {
                id: Some("1".to_string()),
                event: Some("ping".to_string()),
                data: "hello".to_string(),
                retry: None,
            }]
        );
    }

    #[test]
    fn test_multi_line_data_join() {
        let mut parser = SseEventParser::new();
        let events = ingest_all(&mut parser, &["data: foo", "data: bar", ""]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "foo\nbar");
        assert_eq!(events[0].event_type(), "message");
    }

    #[test]
    fn test_id_persists_other_fields_reset() {
        let mut parser = SseEventParser::new();
        let events = ingest_all(
            &mut parser,
            &["id: 7", "event: a", "retry: 100", "data: x", "", "data: y", ""],
        );
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].id.as_deref(), Some("7"));
        assert_eq!(events[1].event, None);
        assert_eq!(events[1].retry, None);
        assert_eq!(events[1].data, "y");
    }

    #[test]
    fn test_empty_id_clears_last_event_id() {
        let mut parser = SseEventParser::new();
        ingest_all(&mut parser, &["id: 7", "data: x", ""]);
        let events = ingest_all(&mut parser, &["id", "data: y", ""]);
        assert_eq!(events[0].id, None);
        assert_eq!(parser.last_event_id(), None);
    }

    #[test]
    fn test_id_with_nul_is_ignored() {
        let mut decoder = SseDecoder::new();
        decoder.feed(b"id: 7\ndata: x\n\n");
        let events = decoder.feed(b"id: a\0b\ndata: y\n\n");

        assert_eq!(events[0].id.as_deref(), Some("7"));
        assert_eq!(decoder.parser().last_event_id(), Some("7"));
        assert_eq!(decoder.stats().malformed_fields, 1);
    }

    #[test]
    fn test_stray_blank_lines_ignored() {
        let mut parser = SseEventParser::new();
        assert!(ingest_all(&mut parser, &["", "", ": keepalive", ""]).is_empty());
        assert_eq!(parser.stats().comments, 1);
        assert_eq!(parser.stats().events_dispatched, 0);
    }

    #[test]
    fn test_colon_spacing() {
        let mut parser = SseEventParser::new();
        let events = ingest_all(&mut parser, &["data:tight", "data:  two", "data", ""]);
        assert_eq!(events[0].data, "tight\n two\n");
    }

    #[test]
    fn test_bad_retry_and_unknown_fields_ignored() {
        let mut parser = SseEventParser::new();
        let events = ingest_all(
            &mut parser,
            &["retry: soon", "retry: -5", "foo: bar", "data: ok", ""],
        );
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].retry, None);
        assert_eq!(parser.stats().malformed_fields, 2);
        assert_eq!(parser.stats().unknown_fields, 1);
    }

    #[test]
    fn test_retry_only_block_dispatches() {
        let mut parser = SseEventParser::new();
        let events = ingest_all(&mut parser, &["retry: 3000", ""]);
        assert_eq!(events[0].retry, Some(3000));
        assert_eq!(events[0].data, "");
    }

    #[test]
    fn test_finish_flushes_pending_event() {
        let mut parser = SseEventParser::new();
        assert!(parser.ingest_line("data: last").is_none());
        assert!(parser.has_pending());
        assert_eq!(parser.finish().unwrap().data, "last");
        assert!(parser.finish().is_none());
    }

    #[test]
    fn test_decoder_across_chunks() {
        let mut decoder = SseDecoder::new();
        let mut events = decoder.feed(b"event: message_start\r\ndata: {\"a\":");
        assert!(events.is_empty());
        events.extend(decoder.feed(b"1}\r"));
        assert!(events.is_empty());
        events.extend(decoder.feed(b"\n\r\n"));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.as_deref(), Some("message_start"));
        assert_eq!(events[0].data, r#"{"a":1}"#);
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn test_decoder_finish_without_blank_line() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: [DONE]").is_empty());
        let events = decoder.finish();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "[DONE]");
    }

    #[test]
    fn test_decoder_trailing_cr_dispatches() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: x\r\r").is_empty());
        let events = decoder.finish();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "x");
    }

    #[test]
    fn test_decoder_strips_bom() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"\xEF\xBB\xBFdata: hi\n\n");
        assert_eq!(events[0].data, "hi");
    }
}
