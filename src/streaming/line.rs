use bytes::{Buf, Bytes, BytesMut};

/// Splits an arbitrarily chunked byte stream into lines.
///
/// Lines end at `\n`, `\r` or `\r\n`; the delimiter is stripped. A `\r` that
/// is the last buffered byte is not treated as a terminator until the next
/// byte arrives (a following `\n` belongs to the same delimiter) or
/// [`LineBuffer::drain`] is called at end of stream.
const INITIAL_CAPACITY: usize = 8192;
/// Buffers that grew past this are reallocated on reset
const RETAINED_CAPACITY: usize = 64 * 1024;

#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: BytesMut,
    /// Bytes before this offset contain no delimiter
    scanned: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_CAPACITY),
            scanned: 0,
        }
    }

    /// Append a chunk of bytes. The chunk is copied; nothing borrows it after the call.
    pub fn append(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Return the next complete line, if one is buffered
    pub fn next_line(&mut self) -> Option<Bytes> {
        let offset = self.buffer[self.scanned..]
            .iter()
            .position(|&b| b == b'\n' || b == b'\r');

        let Some(offset) = offset else {
            self.scanned = self.buffer.len();
            return None;
        };

        let pos = self.scanned + offset;
        let delimiter_len = if self.buffer[pos] == b'\r' {
            match self.buffer.get(pos + 1) {
                // lone CR at the end: wait for the next byte
                None => {
                    self.scanned = pos;
                    return None;
                }
                Some(b'\n') => 2,
                Some(_) => 1,
            }
        } else {
            1
        };

        let line = self.buffer.split_to(pos).freeze();
        self.buffer.advance(delimiter_len);
        self.scanned = 0;
        Some(line)
    }

    /// Flush whatever is left as a final line at end of stream.
    ///
    /// A deferred trailing `\r` is resolved as a terminator and stripped.
    /// Returns `None` when nothing is buffered. Callers should exhaust
    /// [`LineBuffer::next_line`] first; the buffer is empty afterwards and a
    /// later [`LineBuffer::append`] starts fresh.
    pub fn drain(&mut self) -> Option<Bytes> {
        if self.buffer.is_empty() {
            return None;
        }

        let mut rest = self.buffer.split().freeze();
        self.scanned = 0;
        if rest.last() == Some(&b'\r') {
            rest.truncate(rest.len() - 1);
        }
        Some(rest)
    }

    /// Number of buffered bytes not yet delivered as lines
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drop buffered bytes, releasing oversized allocations
    pub fn reset(&mut self) {
        self.buffer.clear();
        if self.buffer.capacity() > RETAINED_CAPACITY {
            self.buffer = BytesMut::with_capacity(INITIAL_CAPACITY);
        }
        self.scanned = 0;
    }
}
