#![forbid(unsafe_code)]

//! Query line editor.
//!
//! Owns the query text and cursor. The buffer is a `String`, so every
//! boundary is a codepoint boundary by construction; the cursor is a byte
//! offset kept on a boundary by only ever stepping whole codepoints.
//!
//! Mutating operations report whether they changed the text, which is
//! what the controller uses to schedule a re-filter. Pure cursor motion
//! never reports a change.

/// The editable query line.
#[derive(Debug, Clone, Default)]
pub struct QueryBuffer {
    text: String,
    cursor: usize,
}

impl QueryBuffer {
    /// Create an empty query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a query seeded with initial text, cursor at the end.
    #[must_use]
    pub fn seeded(text: String) -> Self {
        let cursor = text.len();
        Self { text, cursor }
    }

    /// The query text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Byte length of the query.
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Whether the query is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Cursor position in bytes. Always a codepoint boundary.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of codepoints before the cursor (the renderer's cursor
    /// column walk).
    #[must_use]
    pub fn cursor_chars(&self) -> usize {
        self.text[..self.cursor].chars().count()
    }

    /// Insert one codepoint at the cursor.
    pub fn insert(&mut self, ch: char) -> bool {
        self.text.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
        true
    }

    /// Delete the codepoint before the cursor.
    pub fn delete_prev(&mut self) -> bool {
        let Some(prev) = self.text[..self.cursor].chars().next_back() else {
            return false;
        };
        let start = self.cursor - prev.len_utf8();
        self.text.remove(start);
        self.cursor = start;
        true
    }

    /// Delete the codepoint under the cursor.
    pub fn delete_next(&mut self) -> bool {
        if self.cursor >= self.text.len() {
            return false;
        }
        self.text.remove(self.cursor);
        true
    }

    /// Delete everything before the cursor.
    pub fn delete_to_start(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.text.drain(..self.cursor);
        self.cursor = 0;
        true
    }

    /// Delete everything from the cursor on.
    pub fn delete_to_end(&mut self) -> bool {
        if self.cursor >= self.text.len() {
            return false;
        }
        self.text.truncate(self.cursor);
        true
    }

    /// Delete the word before the cursor: any run of non-word codepoints
    /// directly before it, then the word run (alphanumeric or `_`) that
    /// precedes those. The cursor lands at the word's start.
    pub fn delete_prev_word(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }

        // Walk back over trailing non-word codepoints to the last word
        // codepoint.
        let mut at = self.cursor;
        while let Some(c) = self.text[..at].chars().next_back() {
            at -= c.len_utf8();
            if is_word(c) {
                break;
            }
        }
        // Extend to the start of the word run.
        while let Some(c) = self.text[..at].chars().next_back() {
            if !is_word(c) {
                break;
            }
            at -= c.len_utf8();
        }

        self.text.drain(at..self.cursor);
        self.cursor = at;
        true
    }

    /// Move the cursor one codepoint left.
    pub fn move_left(&mut self) {
        if let Some(prev) = self.text[..self.cursor].chars().next_back() {
            self.cursor -= prev.len_utf8();
        }
    }

    /// Move the cursor one codepoint right.
    pub fn move_right(&mut self) {
        if let Some(next) = self.text[self.cursor..].chars().next() {
            self.cursor += next.len_utf8();
        }
    }

    /// Move the cursor to the start of the query.
    pub fn move_to_start(&mut self) {
        self.cursor = 0;
    }

    /// Move the cursor to the end of the query.
    pub fn move_to_end(&mut self) {
        self.cursor = self.text.len();
    }
}

/// A word codepoint: alphanumeric or underscore.
fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(text: &str) -> QueryBuffer {
        QueryBuffer::seeded(text.to_owned())
    }

    #[test]
    fn seeded_places_cursor_at_end() {
        let q = buffer("abc");
        assert_eq!(q.as_str(), "abc");
        assert_eq!(q.cursor(), 3);
        assert_eq!(q.cursor_chars(), 3);
    }

    #[test]
    fn insert_at_cursor_shifts_the_tail() {
        let mut q = buffer("ac");
        q.move_left();
        assert!(q.insert('b'));
        assert_eq!(q.as_str(), "abc");
        assert_eq!(q.cursor(), 2);
    }

    #[test]
    fn insert_multibyte_keeps_boundaries() {
        let mut q = QueryBuffer::new();
        q.insert('ü');
        q.insert('x');
        q.move_left();
        q.insert('文');
        assert_eq!(q.as_str(), "ü文x");
        assert_eq!(q.cursor(), 5);
        assert!(q.as_str().is_char_boundary(q.cursor()));
    }

    #[test]
    fn delete_prev_removes_one_codepoint() {
        let mut q = buffer("aü文");
        assert!(q.delete_prev());
        assert_eq!(q.as_str(), "aü");
        assert!(q.delete_prev());
        assert_eq!(q.as_str(), "a");
        assert!(q.delete_prev());
        assert_eq!(q.as_str(), "");
        assert!(!q.delete_prev());
    }

    #[test]
    fn delete_next_removes_under_cursor() {
        let mut q = buffer("aüb");
        q.move_to_start();
        assert!(q.delete_next());
        assert_eq!(q.as_str(), "üb");
        assert!(q.delete_next());
        assert_eq!(q.as_str(), "b");
        q.move_to_end();
        assert!(!q.delete_next());
    }

    #[test]
    fn delete_to_start_and_end() {
        let mut q = buffer("hello");
        q.move_left();
        q.move_left();
        assert!(q.delete_to_start());
        assert_eq!(q.as_str(), "lo");
        assert_eq!(q.cursor(), 0);
        assert!(!q.delete_to_start());

        let mut q = buffer("hello");
        q.move_left();
        q.move_left();
        assert!(q.delete_to_end());
        assert_eq!(q.as_str(), "hel");
        assert!(!q.delete_to_end());
    }

    #[test]
    fn delete_prev_word_takes_word_run() {
        let mut q = buffer("one two");
        assert!(q.delete_prev_word());
        assert_eq!(q.as_str(), "one ");
        assert_eq!(q.cursor(), 4);
    }

    #[test]
    fn delete_prev_word_skips_trailing_separators() {
        let mut q = buffer("one two  ");
        assert!(q.delete_prev_word());
        assert_eq!(q.as_str(), "one ");

        let mut q = buffer("path/to/file.rs");
        assert!(q.delete_prev_word());
        assert_eq!(q.as_str(), "path/to/file.");
        assert!(q.delete_prev_word());
        assert_eq!(q.as_str(), "path/to/");
    }

    #[test]
    fn delete_prev_word_treats_underscore_as_word() {
        let mut q = buffer("fn some_name");
        assert!(q.delete_prev_word());
        assert_eq!(q.as_str(), "fn ");
    }

    #[test]
    fn delete_prev_word_with_no_word_clears_to_start() {
        let mut q = buffer("   ");
        assert!(q.delete_prev_word());
        assert_eq!(q.as_str(), "");
        assert!(!q.delete_prev_word());
    }

    #[test]
    fn delete_prev_word_mid_buffer() {
        let mut q = buffer("one two three");
        for _ in 0..6 {
            q.move_left();
        }
        // Cursor sits after "one two".
        assert!(q.delete_prev_word());
        assert_eq!(q.as_str(), "one  three");
        assert_eq!(q.cursor(), 4);
    }

    #[test]
    fn cursor_motion_clamps_at_edges() {
        let mut q = buffer("ab");
        q.move_right();
        assert_eq!(q.cursor(), 2);
        q.move_to_start();
        q.move_left();
        assert_eq!(q.cursor(), 0);
    }

    #[test]
    fn motion_steps_whole_codepoints() {
        let mut q = buffer("aü文b");
        q.move_to_start();
        q.move_right();
        assert_eq!(q.cursor(), 1);
        q.move_right();
        assert_eq!(q.cursor(), 3);
        q.move_right();
        assert_eq!(q.cursor(), 6);
        q.move_left();
        assert_eq!(q.cursor(), 3);
        assert!(q.as_str().is_char_boundary(q.cursor()));
    }
}
