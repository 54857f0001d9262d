#![forbid(unsafe_code)]

//! Byte-level text helpers shared by the matcher and the renderer.
//!
//! Choice text is kept as raw bytes: records read from a pipe are not
//! required to be valid UTF-8, and may carry embedded escape sequences.
//! Both consumers walk the bytes the same way - decode one codepoint at a
//! time, treat an undecodable byte as a single opaque unit, and step over
//! escape sequences as a block.

/// Decode the codepoint at the start of `bytes`.
///
/// Returns the scalar value and its encoded length, or `None` when the
/// leading byte does not begin a valid sequence (the caller then advances
/// one byte and carries on).
#[must_use]
pub fn decode_char(bytes: &[u8]) -> Option<(char, usize)> {
    let first = *bytes.first()?;
    let len = match first {
        0x00..=0x7f => 1,
        0xc2..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf4 => 4,
        _ => return None,
    };
    if bytes.len() < len {
        return None;
    }
    let s = std::str::from_utf8(&bytes[..len]).ok()?;
    s.chars().next().map(|c| (c, len))
}

/// Length of the CSI or OSC escape sequence at the start of `bytes`, or 0
/// if none starts here.
///
/// CSI sequences run to the first final byte in `'@'..='~'`; OSC
/// sequences run to a BEL. An unterminated sequence consumes the rest of
/// the slice.
#[must_use]
pub fn skip_escape(bytes: &[u8]) -> usize {
    if bytes.len() < 2 || bytes[0] != 0x1b {
        return 0;
    }
    match bytes[1] {
        b'[' => {
            for (i, &b) in bytes.iter().enumerate().skip(2) {
                if (b'@'..=b'~').contains(&b) {
                    return i + 1;
                }
            }
            bytes.len()
        }
        b']' => {
            for (i, &b) in bytes.iter().enumerate().skip(2) {
                if b == 0x07 {
                    return i + 1;
                }
            }
            bytes.len()
        }
        _ => 0,
    }
}
