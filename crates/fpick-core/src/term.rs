#![forbid(unsafe_code)]

//! Terminal session lifecycle.
//!
//! Owns the `/dev/tty` handles and every piece of terminal state the
//! process changes, and guarantees restoration on all exit paths:
//!
//! 1. **All state changes are tracked** - raw mode, keypad transmit mode,
//!    and the alternate screen each have a corresponding flag.
//! 2. **Drop restores previous state** - enabled modes are disabled in
//!    reverse order and the saved termios attributes are reapplied.
//! 3. **Panic safety** - a process panic hook performs a best-effort
//!    restore even with `panic = "abort"`, where `Drop` does not run.
//! 4. **Suspend/resume** - `^Z` restores the terminal, delivers `SIGTSTP`,
//!    and reinitializes raw mode and screen state on resume.
//!
//! # Raw mode
//!
//! Unlike `cfmakeraw`, only what the key decoder needs is changed: `ICRNL`
//! stays on (carriage return arrives as `\n`), `ECHO`/`ICANON`/`IEXTEN`/
//! `ISIG` go off (interrupt and suspend arrive as plain bytes and are
//! matched against the saved control-character table), `VMIN=1`/`VTIME=0`
//! for byte-at-a-time blocking reads.
//!
//! # Resize notifications
//!
//! `SIGWINCH` is registered as a `signal-hook` self-pipe: the handler
//! writes one byte into a pipe whose read end participates in the
//! session's `poll(2)` set, so a resize interrupts the blocking wait
//! without the handler doing anything beyond that single write. Draining
//! the pipe coalesces bursts; the authoritative size is re-queried via
//! `tcgetwinsize` when the notification is handled.
//!
//! # Headless mode
//!
//! [`TermSession::from_pair`] builds a session over arbitrary file
//! handles with no termios, signal, or size plumbing, for driving the
//! controller from tests.

use std::env;
use std::fs::{File, OpenOptions};
use std::io::{self, PipeReader, Read, Write};
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::sync::OnceLock;

use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use nix::sys::termios::{
    self, InputFlags, LocalFlags, SetArg, SpecialCharacterIndices, Termios,
};
use signal_hook::SigId;
use signal_hook::consts::signal::SIGWINCH;
use tracing::debug;

use crate::caps::{CapTable, Capability};

/// Terminal modes toggled for the session's lifetime.
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// Put the keypad into transmit (application) mode.
    pub keypad: bool,
    /// Switch to the alternate screen buffer.
    pub alternate_screen: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            keypad: true,
            alternate_screen: true,
        }
    }
}

/// What the multiplexed wait reported ready.
#[derive(Debug, Clone, Copy, Default)]
pub struct Readiness {
    /// Terminal bytes are available.
    pub key: bool,
    /// The extra (choice input) descriptor is readable.
    pub input: bool,
    /// A resize notification arrived.
    pub resized: bool,
}

/// A terminal session over `/dev/tty` with guaranteed restore.
#[derive(Debug)]
pub struct TermSession {
    input: File,
    output: File,
    caps: CapTable,
    options: SessionOptions,
    saved_termios: Option<Termios>,
    raw_active: bool,
    keypad_enabled: bool,
    alt_screen_enabled: bool,
    resize_rx: Option<PipeReader>,
    sig_id: Option<SigId>,
    width: u16,
    height: u16,
    live: bool,
}

impl TermSession {
    /// Open `/dev/tty`, enter raw mode, and enable the requested modes.
    ///
    /// # Errors
    ///
    /// Fails if the capability table cannot be resolved, `/dev/tty` cannot
    /// be opened, or the termios attributes cannot be changed.
    pub fn open(options: SessionOptions) -> io::Result<Self> {
        let caps = CapTable::from_env().map_err(io::Error::other)?;
        let input = File::open("/dev/tty")?;
        let output = OpenOptions::new().write(true).open("/dev/tty")?;

        install_panic_hook();

        let mut session = Self {
            input,
            output,
            caps,
            options,
            saved_termios: None,
            raw_active: false,
            keypad_enabled: false,
            alt_screen_enabled: false,
            resize_rx: None,
            sig_id: None,
            width: 0,
            height: 0,
            live: true,
        };

        session.save_and_raw()?;
        session.init_screen()?;

        let (rx, tx) = io::pipe()?;
        let sig_id = signal_hook::low_level::pipe::register(SIGWINCH, OwnedFd::from(tx))?;
        session.resize_rx = Some(rx);
        session.sig_id = Some(sig_id);

        session.refresh_size();
        debug!(
            term = session.caps.term(),
            width = session.width,
            height = session.height,
            "terminal session opened"
        );
        Ok(session)
    }

    /// Build a headless session over arbitrary handles (tests).
    ///
    /// No termios, signal, or winsize plumbing is attached; the size is
    /// fixed and the control characters default to `^C`/`^Z`.
    #[must_use]
    pub fn from_pair(
        input: File,
        output: File,
        caps: CapTable,
        width: u16,
        height: u16,
    ) -> Self {
        Self {
            input,
            output,
            caps,
            options: SessionOptions::default(),
            saved_termios: None,
            raw_active: false,
            keypad_enabled: false,
            alt_screen_enabled: false,
            resize_rx: None,
            sig_id: None,
            width,
            height,
            live: false,
        }
    }

    /// The resolved capability table.
    #[must_use]
    pub fn caps(&self) -> &CapTable {
        &self.caps
    }

    /// Current size as (columns, rows).
    #[must_use]
    pub fn size(&self) -> (usize, usize) {
        (usize::from(self.width), usize::from(self.height))
    }

    /// The interrupt and suspend bytes from the saved termios table.
    ///
    /// Characters set to `_POSIX_VDISABLE` report `None`. Headless
    /// sessions report the conventional `^C`/`^Z`.
    #[must_use]
    pub fn control_chars(&self) -> (Option<u8>, Option<u8>) {
        match &self.saved_termios {
            Some(t) => {
                let cc = |index: SpecialCharacterIndices| {
                    let byte = t.control_chars[index as usize];
                    (byte != nix::libc::_POSIX_VDISABLE).then_some(byte)
                };
                (
                    cc(SpecialCharacterIndices::VINTR),
                    cc(SpecialCharacterIndices::VSUSP),
                )
            }
            None => (Some(0x03), Some(0x1a)),
        }
    }

    /// The handle the key decoder reads from.
    pub fn reader(&mut self) -> &mut File {
        &mut self.input
    }

    /// Write one rendered frame and flush it.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn present(&mut self, frame: &[u8]) -> io::Result<()> {
        self.output.write_all(frame)?;
        self.output.flush()
    }

    /// Block until the terminal, the extra descriptor, or a resize
    /// notification is ready. With `immediate`, poll without blocking
    /// (used for the first iteration so the UI paints before any input).
    ///
    /// # Errors
    ///
    /// Propagates `poll(2)` failures other than `EINTR`, which reports
    /// nothing ready.
    pub fn wait(&mut self, extra: Option<BorrowedFd<'_>>, immediate: bool) -> io::Result<Readiness> {
        let mut ready = Readiness::default();
        {
            let mut fds = Vec::with_capacity(3);
            fds.push(PollFd::new(self.input.as_fd(), PollFlags::POLLIN));
            let resize_at = self.resize_rx.as_ref().map(|rx| {
                fds.push(PollFd::new(rx.as_fd(), PollFlags::POLLIN));
                fds.len() - 1
            });
            let extra_at = extra.map(|fd| {
                fds.push(PollFd::new(fd, PollFlags::POLLIN));
                fds.len() - 1
            });

            let timeout = if immediate {
                PollTimeout::ZERO
            } else {
                PollTimeout::NONE
            };
            match poll(&mut fds, timeout) {
                Ok(_) => {}
                Err(nix::errno::Errno::EINTR) => return Ok(ready),
                Err(e) => return Err(io::Error::from(e)),
            }

            let readable = |at: usize| -> io::Result<bool> {
                let revents = fds[at].revents().unwrap_or(PollFlags::empty());
                if revents.intersects(PollFlags::POLLERR | PollFlags::POLLNVAL) {
                    return Err(io::Error::other("poll: invalid descriptor"));
                }
                Ok(revents.intersects(PollFlags::POLLIN | PollFlags::POLLHUP))
            };

            ready.key = readable(0)?;
            if let Some(at) = resize_at {
                ready.resized = readable(at)?;
            }
            if let Some(at) = extra_at {
                ready.input = readable(at)?;
            }
        }

        if ready.resized {
            self.drain_resize_pipe();
        }
        Ok(ready)
    }

    /// Non-blocking check for pending terminal bytes; used to abandon a
    /// filter pass mid-scan.
    ///
    /// # Errors
    ///
    /// Propagates `poll(2)` failures other than `EINTR`.
    pub fn key_pending(&self) -> io::Result<bool> {
        let mut fds = [PollFd::new(self.input.as_fd(), PollFlags::POLLIN)];
        match poll(&mut fds, PollTimeout::ZERO) {
            Ok(_) => {}
            Err(nix::errno::Errno::EINTR) => return Ok(false),
            Err(e) => return Err(io::Error::from(e)),
        }
        let revents = fds[0].revents().unwrap_or(PollFlags::empty());
        Ok(revents.intersects(PollFlags::POLLIN | PollFlags::POLLHUP))
    }

    /// Re-query the terminal size, honoring `COLUMNS`/`LINES` overrides.
    pub fn refresh_size(&mut self) {
        if !self.live {
            return;
        }
        if let Ok(ws) = rustix::termios::tcgetwinsize(&self.input) {
            if ws.ws_col > 0 && ws.ws_row > 0 {
                self.width = ws.ws_col;
                self.height = ws.ws_row;
            }
        }
        if let Some(cols) = dimension_override("COLUMNS") {
            self.width = cols;
        }
        if let Some(lines) = dimension_override("LINES") {
            self.height = lines;
        }
        if self.width == 0 {
            self.width = 80;
        }
        if self.height == 0 {
            self.height = 24;
        }
    }

    /// Restore the terminal, deliver `SIGTSTP`, and reinitialize on
    /// resume. Headless sessions ignore this.
    ///
    /// # Errors
    ///
    /// Propagates termios and write failures around the suspension.
    pub fn suspend(&mut self) -> io::Result<()> {
        if !self.live {
            return Ok(());
        }
        debug!("suspending");
        self.restore_attrs()?;
        self.restore_screen()?;
        nix::sys::signal::kill(nix::unistd::Pid::this(), nix::sys::signal::Signal::SIGTSTP)
            .map_err(io::Error::from)?;
        // Resumed: the shell may have changed the attributes in between,
        // so save them afresh before re-entering raw mode.
        self.save_and_raw()?;
        self.init_screen()?;
        self.refresh_size();
        debug!("resumed");
        Ok(())
    }

    /// Restore the saved attributes and undo all screen modes.
    pub fn restore(&mut self) {
        if let Some(id) = self.sig_id.take() {
            signal_hook::low_level::unregister(id);
        }
        self.resize_rx = None;
        let _ = self.restore_attrs();
        let _ = self.restore_screen();
    }

    fn save_and_raw(&mut self) -> io::Result<()> {
        if !self.live {
            return Ok(());
        }
        let saved = termios::tcgetattr(&self.input).map_err(io::Error::from)?;
        let mut raw = saved.clone();
        raw.input_flags |= InputFlags::ICRNL;
        raw.local_flags &= !(LocalFlags::ECHO
            | LocalFlags::ICANON
            | LocalFlags::IEXTEN
            | LocalFlags::ISIG);
        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
        raw.control_chars[SpecialCharacterIndices::VDISCARD as usize] =
            nix::libc::_POSIX_VDISABLE;
        termios::tcsetattr(&self.input, SetArg::TCSANOW, &raw).map_err(io::Error::from)?;
        self.saved_termios = Some(saved);
        self.raw_active = true;
        Ok(())
    }

    fn restore_attrs(&mut self) -> io::Result<()> {
        if !self.raw_active {
            return Ok(());
        }
        if let Some(saved) = &self.saved_termios {
            termios::tcsetattr(&self.input, SetArg::TCSANOW, saved).map_err(io::Error::from)?;
        }
        self.raw_active = false;
        Ok(())
    }

    fn init_screen(&mut self) -> io::Result<()> {
        if self.options.keypad {
            self.output.write_all(self.caps.seq(Capability::KeypadTransmit))?;
            self.keypad_enabled = true;
        }
        if self.options.alternate_screen {
            self.output.write_all(self.caps.seq(Capability::EnterAltScreen))?;
            self.alt_screen_enabled = true;
        }
        self.output.flush()
    }

    fn restore_screen(&mut self) -> io::Result<()> {
        self.output.write_all(self.caps.seq(Capability::CarriageReturn))?;
        self.output.write_all(self.caps.seq(Capability::ClearToEnd))?;
        if self.keypad_enabled {
            self.output.write_all(self.caps.seq(Capability::KeypadLocal))?;
            self.keypad_enabled = false;
        }
        if self.alt_screen_enabled {
            self.output.write_all(self.caps.seq(Capability::ExitAltScreen))?;
            self.alt_screen_enabled = false;
        }
        self.output.write_all(self.caps.seq(Capability::CursorNormal))?;
        self.output.flush()
    }

    fn drain_resize_pipe(&mut self) {
        if let Some(rx) = &mut self.resize_rx {
            let mut sink = [0u8; 64];
            let _ = rx.read(&mut sink);
        }
    }
}

impl Drop for TermSession {
    fn drop(&mut self) {
        if self.live {
            self.restore();
            debug!("terminal session restored");
        }
    }
}

/// Parse a positive dimension override from the environment.
fn dimension_override(name: &str) -> Option<u16> {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .filter(|&n| n > 0)
}

fn install_panic_hook() {
    static HOOK: OnceLock<()> = OnceLock::new();
    HOOK.get_or_init(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            best_effort_cleanup();
            previous(info);
        }));
    });
}

/// Stateless terminal restore for the panic path. The original attributes
/// are unknown here, so a sane interactive mode is reinstated instead.
fn best_effort_cleanup() {
    let Ok(mut tty) = OpenOptions::new().write(true).open("/dev/tty") else {
        return;
    };
    let _ = tty.write_all(b"\x1b[?25h\x1b[?1l\x1b>\x1b[?1049l");
    let _ = tty.flush();
    if let Ok(read_side) = File::open("/dev/tty") {
        if let Ok(mut attrs) = termios::tcgetattr(&read_side) {
            attrs.input_flags |= InputFlags::ICRNL;
            attrs.local_flags |= LocalFlags::ECHO
                | LocalFlags::ICANON
                | LocalFlags::IEXTEN
                | LocalFlags::ISIG;
            let _ = termios::tcsetattr(&read_side, SetArg::TCSANOW, &attrs);
        }
    }
}
