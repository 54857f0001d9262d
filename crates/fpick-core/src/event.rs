#![forbid(unsafe_code)]

//! Semantic key events.
//!
//! The decoder collapses raw terminal byte sequences into these events.
//! They are named for what the controller does with them, not for the bytes
//! that produced them: several distinct sequences map to the same event
//! (e.g. `^B`, `ESC O D`, and the left-arrow capability all decode to
//! [`Key::CursorLeft`]).

/// One decoded key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// A byte or sequence the decoder could not classify. Dispatch ignores it.
    Unknown,
    /// Accept the currently selected choice.
    Accept,
    /// Accept the raw query text itself as the selection.
    AcceptRaw,
    /// Abort without a selection (the terminal's interrupt byte).
    Abort,
    /// Suspend the process (the terminal's suspend byte).
    Suspend,
    /// Delete the codepoint before the cursor.
    DeletePrevChar,
    /// Delete the codepoint under the cursor.
    DeleteNextChar,
    /// Delete from the start of the query to the cursor.
    DeleteToStart,
    /// Delete from the cursor to the end of the query.
    DeleteToEnd,
    /// Delete the word before the cursor.
    DeletePrevWord,
    /// Move the cursor to the start of the query.
    CursorStart,
    /// Move the cursor to the end of the query.
    CursorEnd,
    /// Move the cursor one codepoint left.
    CursorLeft,
    /// Move the cursor one codepoint right.
    CursorRight,
    /// Move the selection up one line.
    SelectUp,
    /// Move the selection down one line.
    SelectDown,
    /// Move the selection up one screenful.
    PageUp,
    /// Move the selection down one screenful.
    PageDown,
    /// Jump the selection to the first choice.
    SelectFirst,
    /// Jump the selection to the last choice.
    SelectLast,
    /// Toggle score-based sorting at runtime.
    ToggleSort,
    /// Re-read the terminal size and repaint.
    Redraw,
    /// One printable codepoint to insert into the query.
    Printable(char),
}

impl Key {
    /// Whether this key edits the query text (as opposed to moving the
    /// cursor or the selection).
    #[must_use]
    pub fn is_edit(&self) -> bool {
        matches!(
            self,
            Key::DeletePrevChar
                | Key::DeleteNextChar
                | Key::DeleteToStart
                | Key::DeleteToEnd
                | Key::DeletePrevWord
                | Key::Printable(_)
        )
    }
}
