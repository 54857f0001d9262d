#![forbid(unsafe_code)]

//! Key decoder.
//!
//! Turns raw terminal bytes into [`Key`] events by matching them, one byte
//! at a time, against a table of known sequences built once at startup:
//!
//! - single control bytes (`^A`, `^K`, …),
//! - the interrupt and suspend bytes reported by the live termios table,
//!   so `stty intr`/`susp` remapping is honored,
//! - multi-byte sequences, either literal (`ESC O D`, `ESC v`, …) or
//!   resolved through the capability table (arrow keys and friends).
//!
//! Matching is incremental: after every byte, entries whose prefix no
//! longer matches fall away; an entry is accepted once the accumulated
//! bytes equal its sequence exactly. When the accumulated bytes form an
//! escape introducer (`ESC [` or `ESC O`) that matches nothing, the rest
//! of the sequence is drained up to its final byte (`'@'..='~'`) and
//! reported as [`Key::Unknown`], keeping the stream synchronized. A lead
//! byte that is neither an escape nor a known control code is a printable
//! ASCII byte, or a UTF-8 lead byte whose continuation bytes are read
//! before the whole codepoint is reported as one [`Key::Printable`].

use std::io::{self, Read};

use crate::caps::{CapTable, Capability};
use crate::event::Key;

/// Longest recognizable sequence, including assembled UTF-8 codepoints.
const MAX_SEQUENCE: usize = 8;

/// How a table entry matches incoming bytes.
#[derive(Debug, Clone)]
enum Pattern {
    /// A fixed byte sequence.
    Literal(Vec<u8>),
    /// A single byte read from the termios control-character table.
    ControlChar(u8),
}

#[derive(Debug, Clone)]
struct Binding {
    key: Key,
    pattern: Pattern,
}

/// Incremental byte-at-a-time key decoder.
#[derive(Debug)]
pub struct KeyDecoder {
    bindings: Vec<Binding>,
}

impl KeyDecoder {
    /// Build the binding table.
    ///
    /// `interrupt` and `suspend` are the live termios `VINTR`/`VSUSP`
    /// bytes; `None` means the character is disabled and gets no entry.
    #[must_use]
    pub fn new(caps: &CapTable, interrupt: Option<u8>, suspend: Option<u8>) -> Self {
        let mut bindings = Vec::new();

        let lit = |key: Key, seq: &[u8]| Binding {
            key,
            pattern: Pattern::Literal(seq.to_vec()),
        };
        let cap = |key: Key, c: Capability| Binding {
            key,
            pattern: Pattern::Literal(caps.seq(c).to_vec()),
        };

        bindings.push(lit(Key::AcceptRaw, b"\x1b\n"));
        bindings.push(lit(Key::DeletePrevChar, b"\x7f"));
        bindings.push(lit(Key::DeletePrevChar, b"\x08"));
        bindings.push(lit(Key::CursorStart, b"\x01"));
        if let Some(c) = interrupt {
            bindings.push(Binding {
                key: Key::Abort,
                pattern: Pattern::ControlChar(c),
            });
        }
        bindings.push(lit(Key::CursorEnd, b"\x05"));
        bindings.push(lit(Key::DeleteToEnd, b"\x0b"));
        bindings.push(lit(Key::Redraw, b"\x0c"));
        bindings.push(lit(Key::ToggleSort, b"\x0f"));
        bindings.push(lit(Key::DeleteToStart, b"\x15"));
        bindings.push(lit(Key::DeletePrevWord, b"\x17"));
        bindings.push(lit(Key::DeletePrevWord, b"\x1b\x7f"));
        bindings.push(lit(Key::DeletePrevWord, b"\x1b\x08"));
        if let Some(c) = suspend {
            bindings.push(Binding {
                key: Key::Suspend,
                pattern: Pattern::ControlChar(c),
            });
        }
        bindings.push(cap(Key::DeleteNextChar, Capability::KeyDelete));
        bindings.push(lit(Key::DeleteNextChar, b"\x04"));
        bindings.push(cap(Key::SelectLast, Capability::KeyEnd));
        bindings.push(lit(Key::SelectLast, b"\x1bOF"));
        bindings.push(lit(Key::SelectLast, b"\x1b>"));
        bindings.push(lit(Key::Accept, b"\n"));
        bindings.push(cap(Key::SelectFirst, Capability::KeyHome));
        bindings.push(lit(Key::SelectFirst, b"\x1bOH"));
        bindings.push(lit(Key::SelectFirst, b"\x1b<"));
        bindings.push(cap(Key::CursorLeft, Capability::KeyLeft));
        bindings.push(lit(Key::CursorLeft, b"\x02"));
        bindings.push(lit(Key::CursorLeft, b"\x1bOD"));
        bindings.push(cap(Key::SelectDown, Capability::KeyDown));
        bindings.push(lit(Key::SelectDown, b"\x0e"));
        bindings.push(lit(Key::SelectDown, b"\x1bOB"));
        bindings.push(cap(Key::SelectUp, Capability::KeyUp));
        bindings.push(lit(Key::SelectUp, b"\x10"));
        bindings.push(lit(Key::SelectUp, b"\x1bOA"));
        bindings.push(cap(Key::PageDown, Capability::KeyPageDown));
        bindings.push(lit(Key::PageDown, b"\x16"));
        bindings.push(lit(Key::PageDown, b"\x1b "));
        bindings.push(cap(Key::PageUp, Capability::KeyPageUp));
        bindings.push(lit(Key::PageUp, b"\x1bv"));
        bindings.push(cap(Key::CursorRight, Capability::KeyRight));
        bindings.push(lit(Key::CursorRight, b"\x06"));
        bindings.push(lit(Key::CursorRight, b"\x1bOC"));

        Self { bindings }
    }

    /// Decode exactly one key event, blocking on `input` for bytes.
    ///
    /// End of input mid-sequence decodes as [`Key::Unknown`] so a dying
    /// terminal drains instead of erroring.
    ///
    /// # Errors
    ///
    /// Propagates read failures.
    pub fn read_key<R: Read>(&self, input: &mut R) -> io::Result<Key> {
        let mut buf = [0u8; MAX_SEQUENCE];
        let mut len: usize;

        match read_byte(input)? {
            Some(b) => {
                buf[0] = b;
                len = 1;
            }
            None => return Ok(Key::Unknown),
        }

        loop {
            let mut partial = false;
            let mut accepted = None;
            for binding in &self.bindings {
                match &binding.pattern {
                    Pattern::ControlChar(c) => {
                        if len == 1 && buf[0] == *c {
                            accepted = Some(binding.key);
                            break;
                        }
                    }
                    Pattern::Literal(seq) => {
                        if seq.len() >= len && seq[..len] == buf[..len] {
                            if seq.len() == len {
                                accepted = Some(binding.key);
                            } else {
                                // Partial match: read another byte before
                                // consulting the rest of the table.
                                partial = true;
                            }
                            break;
                        }
                    }
                }
            }
            if let Some(key) = accepted {
                return Ok(key);
            }
            if !partial || len == MAX_SEQUENCE - 1 {
                break;
            }
            match read_byte(input)? {
                Some(b) => {
                    buf[len] = b;
                    len += 1;
                }
                None => return Ok(Key::Unknown),
            }
        }

        if len > 1 && buf[0] == 0x1b && (buf[1] == b'[' || buf[1] == b'O') {
            // An escape sequence which is not a bound key. Drain up to its
            // final byte so the stream stays synchronized.
            let mut c = buf[len - 1];
            while !(b'@'..=b'~').contains(&c) {
                match read_byte(input)? {
                    Some(b) => c = b,
                    None => break,
                }
            }
            return Ok(Key::Unknown);
        }

        if !is_utf8_lead(buf[0]) {
            if buf[0].is_ascii_graphic() || buf[0] == b' ' {
                return Ok(Key::Printable(buf[0] as char));
            }
            return Ok(Key::Unknown);
        }

        // The number of leading one bits in the first octet is the total
        // octet count; keep reading continuation bytes until it is
        // satisfied.
        while (buf[0] << len) & 0x80 != 0 {
            if len == MAX_SEQUENCE - 1 {
                return Ok(Key::Unknown);
            }
            match read_byte(input)? {
                Some(b) => {
                    buf[len] = b;
                    len += 1;
                }
                None => return Ok(Key::Unknown),
            }
        }

        match std::str::from_utf8(&buf[..len]) {
            Ok(s) => match s.chars().next() {
                Some(c) => Ok(Key::Printable(c)),
                None => Ok(Key::Unknown),
            },
            Err(_) => Ok(Key::Unknown),
        }
    }
}

/// Read one byte; `None` on end of input.
fn read_byte<R: Read>(input: &mut R) -> io::Result<Option<u8>> {
    let mut byte = [0u8; 1];
    loop {
        match input.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// UTF-8 lead byte: `11xxxxxx`.
fn is_utf8_lead(b: u8) -> bool {
    b & 0xc0 == 0xc0
}
