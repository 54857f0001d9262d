#![forbid(unsafe_code)]

//! Screen renderer.
//!
//! Paints one frame into a byte buffer: the query line, horizontally
//! scrolled so the cursor stays on screen, followed by the visible
//! window of ranked choices. The frame is presented with a single write.
//!
//! # Column rules
//!
//! - Tabs advance to the next multiple of 8 columns.
//! - Escape sequences and undecodable bytes are emitted but consume no
//!   columns.
//! - Wide codepoints consume their reported display width; zero-width
//!   codepoints consume none.
//! - Content stops at the terminal width; every line is padded with
//!   spaces to exactly the width, so consecutive lines advance by the
//!   terminal's automatic margin wrap rather than by newlines.
//! - The selected row is painted in standout; the match span is
//!   underlined, opened and closed at its exact byte boundaries; all
//!   attributes are reset at end of line so nothing spills.
//!
//! After the rows, a trailing clear removes lines a previous frame
//! painted below the current ones, and the cursor returns to the query
//! line at the column found by stepping codepoints, not bytes.

use std::ops::Range;

use unicode_width::UnicodeWidthChar;

use fpick_core::caps::{CapTable, Capability, ParamCapability};
use fpick_engine::store::ChoiceStore;
use fpick_engine::text::{decode_char, skip_escape};

/// Everything one frame needs from the session state.
#[derive(Debug)]
pub struct View<'a> {
    /// Query text.
    pub query: &'a str,
    /// Query cursor in bytes.
    pub cursor: usize,
    /// Query cursor in codepoints (the repositioning column walk).
    pub cursor_chars: usize,
    /// The store, in its current order.
    pub store: &'a ChoiceStore,
    /// Whether the last filter pass completed; when false only the query
    /// line is repainted.
    pub show_choices: bool,
    /// Selected index within the visible window.
    pub selection: usize,
    /// First visible choice index.
    pub yscroll: usize,
    /// Visible (matched) choice count.
    pub count: usize,
}

/// One display line: selectable text plus an optional description,
/// separated on screen by a single blank column.
struct Line<'a> {
    text: &'a [u8],
    description: Option<&'a [u8]>,
}

/// Render a complete frame.
#[must_use]
pub fn frame(caps: &CapTable, width: usize, height: usize, view: &View<'_>) -> Vec<u8> {
    let mut out = Vec::with_capacity(width * height.max(1));
    let rows = height.saturating_sub(1);

    out.extend_from_slice(caps.seq(Capability::CursorInvisible));
    out.extend_from_slice(caps.seq(Capability::CarriageReturn));

    let xscroll = if view.cursor >= width {
        view.cursor - width + 1
    } else {
        0
    };
    print_line(
        &mut out,
        caps,
        width,
        &Line {
            text: &view.query.as_bytes()[xscroll..],
            description: None,
        },
        false,
        None,
    );

    if view.show_choices {
        print_choices(&mut out, caps, width, rows, view);
    }

    out.extend_from_slice(caps.seq(Capability::CarriageReturn));
    if view.cursor_chars > 0 {
        out.extend_from_slice(&caps.param1(ParamCapability::CursorRight, view.cursor_chars));
    }
    out.extend_from_slice(caps.seq(Capability::CursorNormal));
    out
}

/// Paint the visible choice window and clean up below it.
fn print_choices(out: &mut Vec<u8>, caps: &CapTable, width: usize, rows: usize, view: &View<'_>) {
    let mut i = view.yscroll;
    while i < view.count {
        if i - view.yscroll >= rows {
            break;
        }
        let choice = view.store.choice(i);
        print_line(
            out,
            caps,
            width,
            &Line {
                text: view.store.text(i),
                description: view.store.description(i),
            },
            i == view.selection,
            choice.matched.as_ref(),
        );
        i += 1;
    }

    let printed = i - view.yscroll;
    if printed < view.store.len() && printed < rows {
        // Rows below may still hold a previous frame's choices. Drop one
        // line before clearing so the last row's standout is not cut
        // mid-cell, then come back up.
        out.push(b'\n');
        out.extend_from_slice(caps.seq(Capability::ClearToEnd));
        out.extend_from_slice(&caps.param1(ParamCapability::CursorUp, printed + 1));
    } else if i > 0 {
        // A zero parameter means one; only move when rows were painted.
        out.extend_from_slice(&caps.param1(
            ParamCapability::CursorUp,
            if i < rows { i } else { rows },
        ));
    }
}

/// Paint one line: content up to the width, padding to exactly the
/// width, attributes fully reset at the end.
fn print_line(
    out: &mut Vec<u8>,
    caps: &CapTable,
    width: usize,
    line: &Line<'_>,
    standout: bool,
    matched: Option<&Range<usize>>,
) {
    if standout {
        out.extend_from_slice(caps.seq(Capability::EnterStandout));
    }
    let (enter_at, exit_at) = matched.map_or((usize::MAX, usize::MAX), |m| (m.start, m.end));

    let text = line.text;
    let mut col = 0usize;
    let mut i = 0usize;
    let mut truncated = false;
    while col < width {
        if i == enter_at {
            out.extend_from_slice(caps.seq(Capability::EnterUnderline));
        } else if i == exit_at {
            out.extend_from_slice(caps.seq(Capability::ExitUnderline));
        }
        if i == text.len() {
            break;
        }

        if text[i] == b'\t' {
            // Advance to the next multiple of 8 columns.
            let step = 8 - (col & 7);
            if col + step > width {
                truncated = true;
                break;
            }
            col += step;
            for _ in 0..step {
                out.push(b' ');
            }
            i += 1;
            continue;
        }

        let (nbytes, glyph_width) = glyph(text, i);
        if col + glyph_width > width {
            truncated = true;
            break;
        }
        col += glyph_width;
        out.extend_from_slice(&text[i..i + nbytes]);
        i += nbytes;
    }

    if let Some(desc) = line.description {
        if !truncated && col < width {
            out.push(b' ');
            col += 1;
            let mut j = 0usize;
            while col < width && j < desc.len() {
                let (nbytes, glyph_width) = glyph(desc, j);
                if col + glyph_width > width {
                    break;
                }
                col += glyph_width;
                out.extend_from_slice(&desc[j..j + nbytes]);
                j += nbytes;
            }
        }
    }

    while col < width {
        out.push(b' ');
        col += 1;
    }
    // A match span reaching past the truncation point would otherwise
    // leave underline spilling onto the next line.
    out.extend_from_slice(caps.seq(Capability::ExitAttributes));
}

/// Byte length and display width of the unit starting at `bytes[i]`:
/// a whole escape sequence (zero width), one codepoint (its reported
/// width, zero for control codepoints), or one opaque invalid byte
/// (zero width).
fn glyph(bytes: &[u8], i: usize) -> (usize, usize) {
    let esc = skip_escape(&bytes[i..]);
    if esc > 0 {
        return (esc, 0);
    }
    match decode_char(&bytes[i..]) {
        Some((c, nbytes)) => (nbytes, UnicodeWidthChar::width(c).unwrap_or(0)),
        None => (1, 0),
    }
}
