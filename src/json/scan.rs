//! Single-pass JSON prefix scanner.
//!
//! The scanner walks a (possibly truncated, possibly malformed) JSON text and
//! records the latest *cut*: a byte offset at which the text can be truncated
//! and then made valid by appending only a short tail (a closing quote or the
//! rest of a literal) plus the closers of the containers still open at that
//! offset. Anything the grammar cannot accept ends the scan as if the input
//! stopped there.

use super::{PendingScalars, TRIVIAL_DOCUMENT};
use crate::error::{Result, StreamError};

/// How the scanner treats a scalar that is still in progress at end of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Repair(PendingScalars),
    Complete,
}

impl Mode {
    fn keeps_open_strings(self) -> bool {
        !matches!(self, Mode::Repair(PendingScalars::Omit))
    }

    fn keeps_numbers(self) -> bool {
        !matches!(self, Mode::Repair(PendingScalars::Omit))
    }

    fn completes_literals(self) -> bool {
        matches!(self, Mode::Repair(PendingScalars::Close))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tail {
    Empty,
    Quote,
    Literal(&'static [u8]),
}

impl Tail {
    fn bytes(self) -> &'static [u8] {
        match self {
            Tail::Empty => b"",
            Tail::Quote => b"\"",
            Tail::Literal(rest) => rest,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Cut {
    /// Bytes of the input kept verbatim
    pub pos: usize,
    /// Containers open at `pos`; always a prefix of the final stack
    pub depth: usize,
    pub tail: Tail,
}

/// What the scanner expects next outside of a lexeme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Value,
    ValueOrClose,
    KeyOrClose,
    Key,
    Colon,
    CommaOrClose,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NumState {
    Minus,
    Zero,
    Int,
    Dot,
    Frac,
    Exp,
    ExpSign,
    ExpInt,
}

impl NumState {
    fn start(b: u8) -> Option<Self> {
        match b {
            b'-' => Some(NumState::Minus),
            b'0' => Some(NumState::Zero),
            b'1'..=b'9' => Some(NumState::Int),
            _ => None,
        }
    }

    fn next(self, b: u8) -> Option<Self> {
        use NumState::*;
        match (self, b) {
            (Minus, b'0') => Some(Zero),
            (Minus, b'1'..=b'9') => Some(Int),
            (Int, b'0'..=b'9') => Some(Int),
            (Zero | Int, b'.') => Some(Dot),
            (Zero | Int | Frac, b'e' | b'E') => Some(Exp),
            (Dot | Frac, b'0'..=b'9') => Some(Frac),
            (Exp, b'+' | b'-') => Some(ExpSign),
            (Exp | ExpSign | ExpInt, b'0'..=b'9') => Some(ExpInt),
            _ => None,
        }
    }

    fn accepting(self) -> bool {
        matches!(
            self,
            NumState::Zero | NumState::Int | NumState::Frac | NumState::ExpInt
        )
    }
}

/// A token in progress. `hold` marks a high surrogate escape still waiting
/// for its low half; cutting must happen before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lexeme {
    None,
    Str {
        key: bool,
        hold: Option<usize>,
    },
    Escape {
        key: bool,
        at: usize,
        hold: Option<usize>,
    },
    Unicode {
        key: bool,
        at: usize,
        hold: Option<usize>,
        remaining: u8,
        code: u16,
    },
    Number {
        start: usize,
        state: NumState,
        accepted_end: usize,
    },
    Literal {
        word: &'static [u8],
        matched: usize,
    },
}

enum Step {
    Next,
    Reprocess,
    Stop,
}

/// Result of scanning one input.
#[derive(Debug, Clone)]
pub(crate) struct Plan {
    pub cut: Option<Cut>,
    stack: Vec<u8>,
    /// The input is a complete JSON document as-is
    pub complete: bool,
    pub depth_exceeded: bool,
    /// Non-whitespace input past the cut was dropped
    pub truncated: bool,
}

struct Scanner {
    mode: Mode,
    max_depth: usize,
    stack: Vec<u8>,
    expect: Expect,
    lexeme: Lexeme,
    safe: Option<Cut>,
    depth_exceeded: bool,
}

pub(crate) fn scan(input: &str, mode: Mode, max_depth: usize) -> Plan {
    let bytes = input.as_bytes();
    let mut scanner = Scanner {
        mode,
        max_depth,
        stack: Vec::new(),
        expect: Expect::Value,
        lexeme: Lexeme::None,
        safe: None,
        depth_exceeded: false,
    };

    let mut end = bytes.len();
    let mut stopped = false;
    let mut i = 0;
    while i < bytes.len() {
        match scanner.step(bytes[i], i) {
            Step::Next => i += 1,
            Step::Reprocess => {}
            Step::Stop => {
                end = i;
                stopped = true;
                break;
            }
        }
    }

    scanner.finish(input, end, stopped)
}

impl Scanner {
    fn step(&mut self, b: u8, i: usize) -> Step {
        match self.lexeme {
            Lexeme::None => self.structural(b, i),
            Lexeme::Str { key, hold } => match (b, hold) {
                (b'\\', _) => {
                    self.lexeme = Lexeme::Escape { key, at: i, hold };
                    Step::Next
                }
                // a high surrogate must be followed directly by its low half
                (_, Some(_)) => Step::Stop,
                (b'"', None) => {
                    self.lexeme = Lexeme::None;
                    if key {
                        self.expect = Expect::Colon;
                    } else {
                        self.value_done(i + 1);
                    }
                    Step::Next
                }
                (0x00..=0x1f, None) => Step::Stop,
                _ => Step::Next,
            },
            Lexeme::Escape { key, at, hold } => match b {
                b'u' => {
                    self.lexeme = Lexeme::Unicode {
                        key,
                        at,
                        hold,
                        remaining: 4,
                        code: 0,
                    };
                    Step::Next
                }
                b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't' if hold.is_none() => {
                    self.lexeme = Lexeme::Str { key, hold: None };
                    Step::Next
                }
                _ => Step::Stop,
            },
            Lexeme::Unicode {
                key,
                at,
                hold,
                remaining,
                code,
            } => {
                let Some(digit) = (b as char).to_digit(16) else {
                    return Step::Stop;
                };
                let code = (code << 4) | digit as u16;
                if remaining > 1 {
                    self.lexeme = Lexeme::Unicode {
                        key,
                        at,
                        hold,
                        remaining: remaining - 1,
                        code,
                    };
                    return Step::Next;
                }
                let high = (0xD800..=0xDBFF).contains(&code);
                let low = (0xDC00..=0xDFFF).contains(&code);
                self.lexeme = match (hold, high, low) {
                    (Some(_), _, true) => Lexeme::Str { key, hold: None },
                    (None, true, _) => Lexeme::Str {
                        key,
                        hold: Some(at),
                    },
                    (None, false, false) => Lexeme::Str { key, hold: None },
                    _ => return Step::Stop,
                };
                Step::Next
            }
            Lexeme::Number {
                start,
                state,
                accepted_end,
            } => match state.next(b) {
                Some(next) => {
                    self.lexeme = Lexeme::Number {
                        start,
                        state: next,
                        accepted_end: if next.accepting() { i + 1 } else { accepted_end },
                    };
                    Step::Next
                }
                None if state.accepting() => {
                    self.lexeme = Lexeme::None;
                    self.value_done(i);
                    Step::Reprocess
                }
                None => Step::Stop,
            },
            Lexeme::Literal { word, matched } => {
                if word[matched] != b {
                    return Step::Stop;
                }
                if matched + 1 == word.len() {
                    self.lexeme = Lexeme::None;
                    self.value_done(i + 1);
                } else {
                    self.lexeme = Lexeme::Literal {
                        word,
                        matched: matched + 1,
                    };
                }
                Step::Next
            }
        }
    }

    fn structural(&mut self, b: u8, i: usize) -> Step {
        if matches!(b, b' ' | b'\t' | b'\n' | b'\r') {
            // Only whitespace has followed the last cut in these states
            if matches!(
                self.expect,
                Expect::CommaOrClose | Expect::End | Expect::KeyOrClose | Expect::ValueOrClose
            ) && let Some(safe) = self.safe.as_mut()
            {
                safe.pos = i + 1;
            }
            return Step::Next;
        }

        match self.expect {
            Expect::ValueOrClose if b == b']' => self.close(b'[', i),
            Expect::Value | Expect::ValueOrClose => self.begin_value(b, i),
            Expect::KeyOrClose if b == b'}' => self.close(b'{', i),
            Expect::KeyOrClose | Expect::Key if b == b'"' => {
                self.lexeme = Lexeme::Str {
                    key: true,
                    hold: None,
                };
                Step::Next
            }
            Expect::Colon if b == b':' => {
                self.expect = Expect::Value;
                Step::Next
            }
            Expect::CommaOrClose => match b {
                b',' => {
                    self.expect = if self.stack.last() == Some(&b'{') {
                        Expect::Key
                    } else {
                        Expect::Value
                    };
                    Step::Next
                }
                b'}' => self.close(b'{', i),
                b']' => self.close(b'[', i),
                _ => Step::Stop,
            },
            _ => Step::Stop,
        }
    }

    fn begin_value(&mut self, b: u8, i: usize) -> Step {
        match b {
            b'{' | b'[' => {
                if self.stack.len() >= self.max_depth {
                    self.depth_exceeded = true;
                    return Step::Stop;
                }
                self.stack.push(b);
                self.expect = if b == b'{' {
                    Expect::KeyOrClose
                } else {
                    Expect::ValueOrClose
                };
                self.safe = Some(Cut {
                    pos: i + 1,
                    depth: self.stack.len(),
                    tail: Tail::Empty,
                });
            }
            b'"' => {
                self.lexeme = Lexeme::Str {
                    key: false,
                    hold: None,
                };
            }
            b't' | b'f' | b'n' => {
                let word: &'static [u8] = match b {
                    b't' => b"true",
                    b'f' => b"false",
                    _ => b"null",
                };
                self.lexeme = Lexeme::Literal { word, matched: 1 };
            }
            _ => {
                let Some(state) = NumState::start(b) else {
                    return Step::Stop;
                };
                self.lexeme = Lexeme::Number {
                    start: i,
                    state,
                    accepted_end: if state.accepting() { i + 1 } else { i },
                };
            }
        }
        Step::Next
    }

    fn close(&mut self, open: u8, i: usize) -> Step {
        if self.stack.last() != Some(&open) {
            return Step::Stop;
        }
        self.stack.pop();
        self.value_done(i + 1);
        Step::Next
    }

    fn value_done(&mut self, pos: usize) {
        self.expect = if self.stack.is_empty() {
            Expect::End
        } else {
            Expect::CommaOrClose
        };
        self.safe = Some(Cut {
            pos,
            depth: self.stack.len(),
            tail: Tail::Empty,
        });
    }

    fn finish(self, input: &str, end: usize, stopped: bool) -> Plan {
        let depth = self.stack.len();
        let mode = self.mode;

        let pending = match self.lexeme {
            Lexeme::Str { key: false, hold } if mode.keeps_open_strings() => Some(Cut {
                pos: hold.unwrap_or(end),
                depth,
                tail: Tail::Quote,
            }),
            Lexeme::Escape {
                key: false,
                at,
                hold,
            }
            | Lexeme::Unicode {
                key: false,
                at,
                hold,
                ..
            } if mode.keeps_open_strings() => Some(Cut {
                pos: hold.unwrap_or(at),
                depth,
                tail: Tail::Quote,
            }),
            Lexeme::Number {
                start,
                accepted_end,
                ..
            } if accepted_end > start && (depth == 0 || mode.keeps_numbers()) => Some(Cut {
                pos: accepted_end,
                depth,
                tail: Tail::Empty,
            }),
            Lexeme::Literal { word, matched } if mode.completes_literals() => Some(Cut {
                pos: end,
                depth,
                tail: Tail::Literal(&word[matched..]),
            }),
            _ => None,
        };

        let top_level_number = matches!(
            self.lexeme,
            Lexeme::Number { state, accepted_end, .. } if state.accepting() && accepted_end == end
        ) && depth == 0;
        let complete = !stopped
            && ((self.expect == Expect::End && self.lexeme == Lexeme::None) || top_level_number);

        let cut = pending.or(self.safe);
        let kept = cut.map_or(0, |c| c.pos);
        let truncated = input.as_bytes()[kept..]
            .iter()
            .any(|b| !b.is_ascii_whitespace());

        Plan {
            cut,
            stack: self.stack,
            complete,
            depth_exceeded: self.depth_exceeded,
            truncated,
        }
    }
}

fn closer(open: u8) -> u8 {
    if open == b'{' { b'}' } else { b']' }
}

impl Plan {
    /// Length of the document this plan renders to
    pub fn needed_len(&self) -> usize {
        match self.cut {
            Some(cut) => cut.pos + cut.tail.bytes().len() + cut.depth,
            None => TRIVIAL_DOCUMENT.len(),
        }
    }

    /// Write the repaired document into a caller-owned buffer
    pub fn write_into(&self, input: &[u8], out: &mut [u8]) -> Result<usize> {
        let needed = self.needed_len();
        if needed > out.len() {
            return Err(StreamError::BufferExhausted {
                needed,
                capacity: out.len(),
            });
        }

        let Some(cut) = self.cut else {
            out[..needed].copy_from_slice(TRIVIAL_DOCUMENT.as_bytes());
            return Ok(needed);
        };

        let tail = cut.tail.bytes();
        out[..cut.pos].copy_from_slice(&input[..cut.pos]);
        let mut len = cut.pos;
        out[len..len + tail.len()].copy_from_slice(tail);
        len += tail.len();
        for &open in self.stack[..cut.depth].iter().rev() {
            out[len] = closer(open);
            len += 1;
        }
        Ok(len)
    }

    /// Render the repaired document as an owned string, bounded by `capacity`
    pub fn render(&self, input: &str, capacity: usize) -> Result<String> {
        let needed = self.needed_len();
        if needed > capacity {
            return Err(StreamError::BufferExhausted { needed, capacity });
        }

        let Some(cut) = self.cut else {
            return Ok(TRIVIAL_DOCUMENT.to_string());
        };

        let mut text = String::with_capacity(needed);
        text.push_str(&input[..cut.pos]);
        match cut.tail {
            Tail::Empty => {}
            Tail::Quote => text.push('"'),
            Tail::Literal(rest) => text.extend(rest.iter().map(|&b| b as char)),
        }
        text.extend(
            self.stack[..cut.depth]
                .iter()
                .rev()
                .map(|&open| closer(open) as char),
        );
        Ok(text)
    }
}

/// Longest valid UTF-8 prefix of `input`.
///
/// A multi-byte character split at the end of a chunk is held back; invalid
/// bytes in the middle end the usable input.
pub(crate) fn utf8_prefix(input: &[u8]) -> &str {
    match std::str::from_utf8(input) {
        Ok(text) => text,
        Err(e) => std::str::from_utf8(&input[..e.valid_up_to()]).unwrap_or(""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLOSE: Mode = Mode::Repair(PendingScalars::Close);
    const OMIT: Mode = Mode::Repair(PendingScalars::Omit);

    fn run(input: &str, mode: Mode) -> String {
        scan(input, mode, 32).render(input, usize::MAX).unwrap()
    }

    #[test]
    fn test_complete_documents_pass_through() {
        for doc in [r#"{"a":[1,2,{"b":null}]}"#, "30", r#""x""#, "[]", " true "] {
            let plan = scan(doc, CLOSE, 32);
            assert!(plan.complete, "{doc} should be complete");
            assert!(!plan.truncated);
        }
    }

    #[test]
    fn test_cut_after_open_bracket() {
        assert_eq!(run("[", CLOSE), "[]");
        assert_eq!(run(r#"{"a":["#, CLOSE), r#"{"a":[]}"#);
        assert_eq!(run(r#"{"a":{"#, OMIT), r#"{"a":{}}"#);
    }

    #[test]
    fn test_number_prefixes() {
        assert_eq!(run("[1.", CLOSE), "[1]");
        assert_eq!(run("[1e+", CLOSE), "[1]");
        assert_eq!(run("[-", CLOSE), "[]");
        assert_eq!(run("[12", OMIT), "[]");
        assert_eq!(run("[12", Mode::Complete), "[12]");
        assert_eq!(run("12", OMIT), "12");
    }

    #[test]
    fn test_literal_handling() {
        assert_eq!(run("[tr", CLOSE), "[true]");
        assert_eq!(run(r#"{"a":nu"#, CLOSE), r#"{"a":null}"#);
        assert_eq!(run("[1,fal", Mode::Complete), "[1]");
        assert_eq!(run("[1,fal", OMIT), "[1]");
        assert_eq!(run("[false", OMIT), "[false]");
    }

    #[test]
    fn test_escape_boundaries() {
        assert_eq!(run(r#"["ab\"#, CLOSE), r#"["ab"]"#);
        assert_eq!(run(r#"["ab\u00"#, CLOSE), r#"["ab"]"#);
        assert_eq!(run(r#"["ab\n"#, CLOSE), r#"["ab\n"]"#);
        assert_eq!(run(r#"["a\"b"#, CLOSE), r#"["a\"b"]"#);
    }

    #[test]
    fn test_surrogate_pairs_are_not_split() {
        assert_eq!(run(r#"["x\ud83d"#, CLOSE), r#"["x"]"#);
        assert_eq!(run(r#"["x\ud83d\ude"#, CLOSE), r#"["x"]"#);
        assert_eq!(run(r#"["x😀"#, CLOSE), r#"["x😀"]"#);
        assert_eq!(run(r#"["x\ude00"#, CLOSE), r#"["x"]"#);
    }

    #[test]
    fn test_garbage_ends_input() {
        assert_eq!(run(r#"{"a":1}}"#, CLOSE), r#"{"a":1}"#);
        assert_eq!(run("hello", CLOSE), TRIVIAL_DOCUMENT);
        assert_eq!(run(r#"{"a" 1}"#, CLOSE), "{}");
        assert!(scan(r#"[1]x"#, CLOSE, 32).truncated);
    }

    #[test]
    fn test_control_character_in_string() {
        assert_eq!(run("[\"ab\u{1}cd\"]", CLOSE), r#"["ab"]"#);
    }

    #[test]
    fn test_whitespace_after_value_is_kept() {
        assert_eq!(run("[1 ", Mode::Complete), "[1 ]");
        assert_eq!(run("[1, ", Mode::Complete), "[1]");
    }

    #[test]
    fn test_depth_limit() {
        let plan = scan("[[[[1]]]]", CLOSE, 2);
        assert!(plan.depth_exceeded);
        assert_eq!(plan.render("[[[[1]]]]", usize::MAX).unwrap(), "[[]]");
    }

    #[test]
    fn test_write_into_matches_render() {
        let input = r#"{"k":["v","w"#;
        let plan = scan(input, CLOSE, 8);
        let mut out = [0u8; 64];
        let len = plan.write_into(input.as_bytes(), &mut out).unwrap();
        assert_eq!(
            &out[..len],
            plan.render(input, usize::MAX).unwrap().as_bytes()
        );

        let mut small = [0u8; 4];
        assert!(matches!(
            plan.write_into(input.as_bytes(), &mut small),
            Err(StreamError::BufferExhausted { .. })
        ));
    }

    #[test]
    fn test_utf8_prefix() {
        let snowman = "☃".as_bytes();
        assert_eq!(utf8_prefix(&snowman[..2]), "");
        assert_eq!(utf8_prefix(b"ab\xffcd"), "ab");
        assert_eq!(utf8_prefix("a☃".as_bytes()), "a☃");
    }
}
