#![forbid(unsafe_code)]

//! The event loop.
//!
//! Single-threaded and cooperative: the only suspension point is one
//! blocking multiplexed wait over the terminal, the choice input stream
//! (until it hits end of input), and the resize notification pipe. Each
//! iteration handles at most one decoded key, ingests at most one chunk
//! of choices, runs at most one filter pass, and repaints.
//!
//! # Dirty bookkeeping
//!
//! Two flags, tracked exactly like the session state they shadow:
//!
//! - `refilter` - the store must be re-scored against the query.
//! - `reset` - the scan window must first widen back to the whole store
//!   (edits that can make previously excluded choices match again).
//!
//! Typing into a non-empty query narrows the candidate set, so only the
//! current visible prefix is rescanned; every other edit resets. Choices
//! that stream in while a non-empty query is active are spliced after
//! the ranked prefix and only that tail is scanned.
//!
//! # Filter abandonment
//!
//! A filter pass checks for pending terminal bytes every 50 choices and
//! abandons itself so typing never stalls behind a large candidate set.
//! An abandoned pass leaves `refilter` set and suppresses the choice
//! area repaint (the ordering is mid-rewrite); the next iteration
//! retries from scratch.

use std::fs::File;
use std::io;
use std::os::fd::AsFd;

use tracing::debug;

use fpick_core::decoder::KeyDecoder;
use fpick_core::event::Key;
use fpick_core::term::TermSession;
use fpick_engine::query::QueryBuffer;
use fpick_engine::store::ChoiceStore;

use crate::render::{self, View};

/// What the session ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// The user accepted a choice.
    Choice {
        text: Vec<u8>,
        description: Option<Vec<u8>>,
    },
    /// The user accepted the raw query text (Alt-Enter).
    Query(String),
    /// The user aborted without selecting.
    Aborted,
}

/// The interactive session driver.
pub struct Controller {
    session: TermSession,
    decoder: KeyDecoder,
    store: ChoiceStore,
    query: QueryBuffer,
    sort: bool,
    /// Choice input; dropped from the poll set at end of input.
    input: Option<File>,
    selection: usize,
    yscroll: usize,
    /// Visible (matched) choice count.
    count: usize,
    /// Whether the last attempted filter pass completed.
    filtered: bool,
    refilter: bool,
    reset: bool,
}

impl Controller {
    /// Build a controller over an opened session and input stream.
    #[must_use]
    pub fn new(
        session: TermSession,
        store: ChoiceStore,
        query: QueryBuffer,
        sort: bool,
        input: File,
    ) -> Self {
        let (interrupt, suspend) = session.control_chars();
        let decoder = KeyDecoder::new(session.caps(), interrupt, suspend);
        Self {
            session,
            decoder,
            store,
            query,
            sort,
            input: Some(input),
            selection: 0,
            yscroll: 0,
            count: 0,
            filtered: false,
            refilter: true,
            reset: true,
        }
    }

    /// Run until the user accepts or aborts.
    ///
    /// # Errors
    ///
    /// I/O failures on the terminal or the input stream are fatal; the
    /// session guard restores the terminal when the controller drops.
    pub fn run(&mut self) -> io::Result<Selection> {
        // Zero timeout on the very first wait so the UI paints before
        // any input arrives.
        let mut immediate = true;
        loop {
            let mut splice_offset = 0usize;
            let ready = self
                .session
                .wait(self.input.as_ref().map(AsFd::as_fd), immediate)?;
            immediate = false;

            if ready.resized {
                self.session.refresh_size();
            }
            if ready.input {
                self.ingest(&mut splice_offset)?;
            }
            if ready.key {
                if let Some(selection) = self.dispatch_key()? {
                    debug!(?selection, "session finished");
                    return Ok(selection);
                }
            }

            self.filter(splice_offset)?;
            self.draw()?;
        }
    }

    /// Pull one chunk from the input stream into the store.
    fn ingest(&mut self, splice_offset: &mut usize) -> io::Result<()> {
        let splice_after = (!self.query.is_empty()).then_some(self.count);
        let before = self.store.len();
        let Some(input) = self.input.as_mut() else {
            return Ok(());
        };
        let n = self.store.ingest(input, splice_after)?;
        if n == 0 {
            // End of input: stop polling the stream.
            self.input = None;
            return Ok(());
        }
        if self.query.is_empty() {
            // Everything is visible anyway; widen on the next pass.
            self.reset = true;
        } else {
            // Score only the spliced-in tail, leaving the ranked prefix
            // the user is looking at undisturbed.
            self.refilter = true;
            *splice_offset = self.count;
            self.count += self.store.len() - before;
        }
        Ok(())
    }

    /// Decode and dispatch exactly one key event.
    fn dispatch_key(&mut self) -> io::Result<Option<Selection>> {
        let key = self.decoder.read_key(self.session.reader())?;
        match key {
            Key::Accept => {
                if self.count > 0 {
                    return Ok(Some(self.selected()));
                }
            }
            Key::AcceptRaw => {
                return Ok(Some(Selection::Query(self.query.as_str().to_owned())));
            }
            Key::Abort => return Ok(Some(Selection::Aborted)),
            Key::Suspend => self.session.suspend()?,
            Key::Redraw => self.session.refresh_size(),
            Key::ToggleSort => {
                self.sort = !self.sort;
                self.refilter = true;
                self.reset = true;
            }
            Key::Printable(c) => {
                if self.query.is_empty() {
                    self.reset = true;
                }
                self.query.insert(c);
                self.refilter = true;
                self.reset_view();
            }
            Key::DeletePrevChar => {
                if self.query.delete_prev() {
                    self.edit_dirty();
                }
            }
            Key::DeleteNextChar => {
                if self.query.delete_next() {
                    self.edit_dirty();
                }
            }
            Key::DeleteToStart => {
                if self.query.delete_to_start() {
                    self.edit_dirty();
                }
            }
            Key::DeleteToEnd => {
                if self.query.delete_to_end() {
                    self.edit_dirty();
                }
            }
            Key::DeletePrevWord => {
                if self.query.delete_prev_word() {
                    self.edit_dirty();
                }
            }
            Key::CursorStart => self.query.move_to_start(),
            Key::CursorEnd => self.query.move_to_end(),
            Key::CursorLeft => self.query.move_left(),
            Key::CursorRight => self.query.move_right(),
            Key::SelectDown => {
                if self.count > 0 && self.selection + 1 < self.count {
                    self.selection += 1;
                    if self.selection - self.yscroll == self.rows() {
                        self.yscroll += 1;
                    }
                }
            }
            Key::SelectUp => {
                if self.selection > 0 {
                    self.selection -= 1;
                    if self.yscroll > self.selection {
                        self.yscroll -= 1;
                    }
                }
            }
            Key::PageDown => {
                if self.selection + self.rows() < self.count {
                    self.selection += self.rows();
                    self.yscroll = self.selection;
                } else if self.count > 0 {
                    self.selection = self.count - 1;
                }
            }
            Key::PageUp => {
                if self.selection > self.rows() {
                    self.selection -= self.rows();
                    self.yscroll = self.selection;
                } else {
                    self.selection = 0;
                    self.yscroll = 0;
                }
            }
            Key::SelectFirst => {
                self.selection = 0;
                self.yscroll = 0;
            }
            Key::SelectLast => {
                if self.count > 0 {
                    self.selection = self.count - 1;
                }
            }
            Key::Unknown => {}
        }
        Ok(None)
    }

    /// Run a filter pass if one is owed, tolerating abandonment.
    fn filter(&mut self, mut splice_offset: usize) -> io::Result<()> {
        if self.reset {
            self.count = self.store.len();
            splice_offset = 0;
        }
        self.reset = false;

        if self.refilter {
            let (query, sort, count) = (&self.query, self.sort, self.count);
            let session = &self.session;
            let outcome = self.store.filter_pass(
                query.as_str(),
                sort,
                splice_offset,
                count,
                || session.key_pending(),
            )?;
            match outcome {
                Some(visible) => {
                    self.count = visible;
                    self.filtered = true;
                    self.refilter = false;
                }
                None => self.filtered = false,
            }
        }
        Ok(())
    }

    /// Repaint. The choice window is clamped so it always contains the
    /// selection, then the frame is written in one piece.
    fn draw(&mut self) -> io::Result<()> {
        let (width, height) = self.session.size();
        if self.filtered {
            if self.selection >= self.count {
                self.reset_view();
            }
            // yscroll <= selection holds everywhere, so the subtraction
            // is safe; a zero-row window has nothing to keep in view.
            let rows = height.saturating_sub(1);
            if rows > 0 && self.selection - self.yscroll >= rows {
                self.yscroll = self.selection - rows + 1;
            }
        }
        let view = View {
            query: self.query.as_str(),
            cursor: self.query.cursor(),
            cursor_chars: self.query.cursor_chars(),
            store: &self.store,
            show_choices: self.filtered,
            selection: self.selection,
            yscroll: self.yscroll,
            count: self.count,
        };
        let frame = render::frame(self.session.caps(), width, height, &view);
        self.session.present(&frame)
    }

    fn selected(&self) -> Selection {
        Selection::Choice {
            text: self.store.text(self.selection).to_vec(),
            description: self.store.description(self.selection).map(<[u8]>::to_vec),
        }
    }

    /// An edit changed the query: rescore everything and put the
    /// selection back on top.
    fn edit_dirty(&mut self) {
        self.refilter = true;
        self.reset = true;
        self.reset_view();
    }

    fn reset_view(&mut self) {
        self.selection = 0;
        self.yscroll = 0;
    }

    fn rows(&self) -> usize {
        self.session.size().1.saturating_sub(1)
    }
}
