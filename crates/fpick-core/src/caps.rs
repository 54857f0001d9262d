#![forbid(unsafe_code)]

//! Terminal capability table.
//!
//! One resolution pass at startup maps symbolic capability names to the
//! control sequences this terminal understands; everything painted later
//! goes through the table without further lookups or I/O.
//!
//! Detection is environment-driven (`TERM`), split into a pure
//! [`CapTable::detect`] core so tests can exercise profiles without
//! touching the process environment.
//!
//! # Degradation
//!
//! | Condition              | Behavior                                      |
//! |------------------------|-----------------------------------------------|
//! | `TERM` unset or `dumb` | Fatal: no cursor addressing, nothing to do    |
//! | `vt52`                 | Standout/underline omitted (empty sequences)  |
//! | Anything else          | Full ANSI table                               |
//!
//! Optional visual effects degrade to an empty sequence, which callers may
//! write unconditionally; cursor positioning has no fallback, hence the
//! fatal case.

use std::env;
use std::fmt;

// ── Control sequences ────────────────────────────────────────────────────

const CURSOR_HIDE: &[u8] = b"\x1b[?25l";
const CURSOR_SHOW: &[u8] = b"\x1b[?25h";
const CARRIAGE_RETURN: &[u8] = b"\r";
const CLEAR_TO_END: &[u8] = b"\x1b[J";

const ENTER_STANDOUT: &[u8] = b"\x1b[7m";
const ENTER_UNDERLINE: &[u8] = b"\x1b[4m";
const EXIT_UNDERLINE: &[u8] = b"\x1b[24m";
const EXIT_ATTRIBUTES: &[u8] = b"\x1b[0m";

const KEYPAD_XMIT: &[u8] = b"\x1b[?1h\x1b=";
const KEYPAD_LOCAL: &[u8] = b"\x1b[?1l\x1b>";
const ALT_SCREEN_ENTER: &[u8] = b"\x1b[?1049h";
const ALT_SCREEN_LEAVE: &[u8] = b"\x1b[?1049l";

const KEY_UP: &[u8] = b"\x1b[A";
const KEY_DOWN: &[u8] = b"\x1b[B";
const KEY_RIGHT: &[u8] = b"\x1b[C";
const KEY_LEFT: &[u8] = b"\x1b[D";
const KEY_HOME: &[u8] = b"\x1b[H";
const KEY_END: &[u8] = b"\x1b[F";
const KEY_PAGE_UP: &[u8] = b"\x1b[5~";
const KEY_PAGE_DOWN: &[u8] = b"\x1b[6~";
const KEY_DELETE: &[u8] = b"\x1b[3~";

/// Symbolic name of a fixed control sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    CursorInvisible,
    CursorNormal,
    CarriageReturn,
    ClearToEnd,
    EnterStandout,
    EnterUnderline,
    ExitUnderline,
    ExitAttributes,
    KeypadTransmit,
    KeypadLocal,
    EnterAltScreen,
    ExitAltScreen,
    KeyUp,
    KeyDown,
    KeyLeft,
    KeyRight,
    KeyHome,
    KeyEnd,
    KeyPageUp,
    KeyPageDown,
    KeyDelete,
}

/// Symbolic name of a sequence parameterized by one integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamCapability {
    /// Move the cursor right by N columns. N must be non-zero: terminals
    /// interpret a zero parameter as one.
    CursorRight,
    /// Move the cursor up by N rows. Same non-zero constraint.
    CursorUp,
}

/// The terminal reported by `TERM` cannot run an interactive screen.
#[derive(Debug, Clone)]
pub struct CapsError {
    term: String,
}

impl fmt::Display for CapsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.term.is_empty() {
            write!(f, "TERM is not set; cannot address the cursor")
        } else {
            write!(f, "terminal type {:?} lacks cursor addressing", self.term)
        }
    }
}

impl std::error::Error for CapsError {}

/// Resolved capability table for one terminal session.
#[derive(Debug, Clone)]
pub struct CapTable {
    term: String,
    standout: &'static [u8],
    underline: &'static [u8],
    underline_off: &'static [u8],
}

impl CapTable {
    /// Resolve the table from the process environment (`TERM`).
    ///
    /// # Errors
    ///
    /// Fails for a terminal with no cursor addressing (`TERM` unset, empty,
    /// or `dumb`).
    pub fn from_env() -> Result<Self, CapsError> {
        Self::detect(&env::var("TERM").unwrap_or_default())
    }

    /// Resolve the table for a given terminal type.
    ///
    /// # Errors
    ///
    /// Fails for a terminal with no cursor addressing.
    pub fn detect(term: &str) -> Result<Self, CapsError> {
        if term.is_empty() || term == "dumb" {
            return Err(CapsError {
                term: term.to_owned(),
            });
        }

        // vt52 has cursor motion but no display attributes; the effects
        // degrade to nothing rather than aborting.
        let attributes = term != "vt52";

        Ok(Self {
            term: term.to_owned(),
            standout: if attributes { ENTER_STANDOUT } else { b"" },
            underline: if attributes { ENTER_UNDERLINE } else { b"" },
            underline_off: if attributes { EXIT_UNDERLINE } else { b"" },
        })
    }

    /// The terminal type this table was resolved for.
    #[must_use]
    pub fn term(&self) -> &str {
        &self.term
    }

    /// The control sequence for a fixed capability.
    ///
    /// Degraded optional effects resolve to an empty slice, safe to write
    /// unconditionally.
    #[must_use]
    pub fn seq(&self, cap: Capability) -> &[u8] {
        match cap {
            Capability::CursorInvisible => CURSOR_HIDE,
            Capability::CursorNormal => CURSOR_SHOW,
            Capability::CarriageReturn => CARRIAGE_RETURN,
            Capability::ClearToEnd => CLEAR_TO_END,
            Capability::EnterStandout => self.standout,
            Capability::EnterUnderline => self.underline,
            Capability::ExitUnderline => self.underline_off,
            Capability::ExitAttributes => EXIT_ATTRIBUTES,
            Capability::KeypadTransmit => KEYPAD_XMIT,
            Capability::KeypadLocal => KEYPAD_LOCAL,
            Capability::EnterAltScreen => ALT_SCREEN_ENTER,
            Capability::ExitAltScreen => ALT_SCREEN_LEAVE,
            Capability::KeyUp => KEY_UP,
            Capability::KeyDown => KEY_DOWN,
            Capability::KeyLeft => KEY_LEFT,
            Capability::KeyRight => KEY_RIGHT,
            Capability::KeyHome => KEY_HOME,
            Capability::KeyEnd => KEY_END,
            Capability::KeyPageUp => KEY_PAGE_UP,
            Capability::KeyPageDown => KEY_PAGE_DOWN,
            Capability::KeyDelete => KEY_DELETE,
        }
    }

    /// The control sequence for a parameterized capability.
    #[must_use]
    pub fn param1(&self, cap: ParamCapability, n: usize) -> Vec<u8> {
        let suffix = match cap {
            ParamCapability::CursorRight => 'C',
            ParamCapability::CursorUp => 'A',
        };
        format!("\x1b[{n}{suffix}").into_bytes()
    }
}
