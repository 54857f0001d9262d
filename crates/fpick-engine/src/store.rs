#![forbid(unsafe_code)]

//! Choice arena and store.
//!
//! All record bytes live in one append-only arena; a [`Choice`] is a pair
//! of spans into it plus mutable match state. The arena is also the read
//! buffer: each ingest call appends one chunk and then splits off any
//! lines completed by it. Spans are resolved against the arena on every
//! access, so arena reallocation can never dangle them.
//!
//! Choices are never deleted. Sorting reorders them in place; the text
//! span's arena offset is strictly increasing in arrival order and serves
//! as the insertion index for tie-breaking.
//!
//! # Streaming reinsertion
//!
//! When records arrive after a query has already filtered the list, the
//! new choices are rotated to sit immediately after the ranked prefix,
//! preserving their mutual arrival order, so the part of the screen the
//! user is looking at does not jump.

use std::io::{self, Read};
use std::ops::Range;

use memchr::memchr;
use tracing::trace;

/// Bytes requested from the input stream per ingest call.
const READ_CHUNK: usize = 64 * 1024;

/// One selectable record.
#[derive(Debug, Clone)]
pub struct Choice {
    /// Selectable text span in the arena.
    pub(crate) text: Range<usize>,
    /// Description span in the arena, if the record had one.
    pub(crate) description: Option<Range<usize>>,
    /// Current match span, in bytes relative to the text start.
    pub matched: Option<Range<usize>>,
    /// Current score. Meaningful only after a filter pass.
    pub score: f64,
}

impl Choice {
    /// Arena offset of the text span; doubles as the insertion index.
    #[must_use]
    pub fn index(&self) -> usize {
        self.text.start
    }

    /// Byte length of the whole record: text plus separator plus
    /// description when present. This is the length the score formula
    /// divides by.
    #[must_use]
    pub fn record_len(&self) -> usize {
        self.text.len() + self.description.as_ref().map_or(0, |d| d.len() + 1)
    }
}

/// Append-only arena plus the ordered choice collection.
#[derive(Debug)]
pub struct ChoiceStore {
    arena: Vec<u8>,
    /// Arena offset where line scanning resumes (start of a pending,
    /// not-yet-terminated line).
    parsed: usize,
    choices: Vec<Choice>,
    separators: Vec<u8>,
    descriptions: bool,
}

impl ChoiceStore {
    /// Create an empty store.
    ///
    /// `separators` is the byte set used to split a record into text and
    /// description; it only applies when `descriptions` is enabled.
    #[must_use]
    pub fn new(descriptions: bool, separators: Vec<u8>) -> Self {
        Self {
            arena: Vec::new(),
            parsed: 0,
            choices: Vec::new(),
            separators,
            descriptions,
        }
    }

    /// Number of choices ingested so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.choices.len()
    }

    /// Whether the store holds no choices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    /// The choice at `index` in the current order.
    #[must_use]
    pub fn choice(&self, index: usize) -> &Choice {
        &self.choices[index]
    }

    /// The selectable text of the choice at `index`.
    #[must_use]
    pub fn text(&self, index: usize) -> &[u8] {
        &self.arena[self.choices[index].text.clone()]
    }

    /// The description of the choice at `index`, if it has one.
    #[must_use]
    pub fn description(&self, index: usize) -> Option<&[u8]> {
        self.choices[index]
            .description
            .clone()
            .map(|d| &self.arena[d])
    }

    pub(crate) fn parts_mut(&mut self) -> (&[u8], &mut [Choice]) {
        (&self.arena, &mut self.choices)
    }

    /// Read one chunk from `input`, append it to the arena, and split off
    /// completed lines. Returns the byte count read; 0 means end of
    /// input. A final line with no trailing newline stays pending and
    /// produces no choice.
    ///
    /// `splice_after` is the length of the already-filtered prefix; when
    /// given (non-empty query mid-session), choices created by this call
    /// are moved to sit right after it.
    ///
    /// # Errors
    ///
    /// Propagates read failures.
    pub fn ingest<R: Read>(
        &mut self,
        input: &mut R,
        splice_after: Option<usize>,
    ) -> io::Result<usize> {
        let mut chunk = [0u8; READ_CHUNK];
        let n = loop {
            match input.read(&mut chunk) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };
        if n == 0 {
            return Ok(0);
        }
        self.arena.extend_from_slice(&chunk[..n]);

        let before = self.choices.len();
        while let Some(at) = memchr(b'\n', &self.arena[self.parsed..]) {
            let stop = self.parsed + at;
            self.push_line(self.parsed, stop);
            self.parsed = stop + 1;
        }
        let fresh = self.choices.len() - before;
        trace!(bytes = n, choices = fresh, "ingested");

        if fresh > 0 && before > 0 {
            if let Some(at) = splice_after {
                if at < before {
                    self.choices[at..].rotate_right(fresh);
                }
            }
        }
        Ok(n)
    }

    fn push_line(&mut self, start: usize, stop: usize) {
        let mut text_end = stop;
        let mut description = None;
        if self.descriptions {
            let line = &self.arena[start..stop];
            if let Some(at) = line.iter().rposition(|b| self.separators.contains(b)) {
                text_end = start + at;
                description = Some(start + at + 1..stop);
            }
        }
        self.choices.push(Choice {
            text: start..text_end,
            description,
            matched: None,
            score: 0.0,
        });
    }
}
