//! End-to-end controller tests over pipe-backed fake terminals.
//!
//! The session runs headless: terminal bytes come from a pipe, frames go
//! to a scratch file, and the choice stream is a second pipe. Every
//! scenario ends with a key that terminates the session (accept or
//! abort), since a drained key pipe only yields unknown keys.

use std::fs::File;
use std::io::{self, Write};
use std::os::fd::OwnedFd;

use fpick::controller::{Controller, Selection};
use fpick_core::caps::CapTable;
use fpick_core::term::TermSession;
use fpick_engine::query::QueryBuffer;
use fpick_engine::store::ChoiceStore;

fn run_session(
    choices: &[u8],
    keys: &[u8],
    seed: &str,
    sort: bool,
    descriptions: bool,
) -> Selection {
    let caps = CapTable::detect("xterm").unwrap();
    let (tty_rx, mut tty_tx) = io::pipe().unwrap();
    let frames = tempfile::tempfile().unwrap();
    let session = TermSession::from_pair(File::from(OwnedFd::from(tty_rx)), frames, caps, 40, 10);

    let (in_rx, mut in_tx) = io::pipe().unwrap();
    in_tx.write_all(choices).unwrap();
    drop(in_tx);
    tty_tx.write_all(keys).unwrap();
    drop(tty_tx);

    let store = ChoiceStore::new(descriptions, b" ".to_vec());
    let query = QueryBuffer::seeded(seed.to_owned());
    let mut controller = Controller::new(session, store, query, sort, File::from(OwnedFd::from(in_rx)));
    controller.run().unwrap()
}

fn choice(text: &[u8]) -> Selection {
    Selection::Choice {
        text: text.to_vec(),
        description: None,
    }
}

#[test]
fn typing_narrows_and_accept_returns_the_match() {
    let got = run_session(b"apple\nbanana\ncherry\n", b"an\n", "", true, false);
    assert_eq!(got, choice(b"banana"));
}

#[test]
fn interrupt_aborts_with_no_selection() {
    let got = run_session(b"apple\nbanana\ncherry\n", b"an\x03", "", true, false);
    assert_eq!(got, Selection::Aborted);
}

#[test]
fn alt_enter_returns_the_raw_query() {
    let got = run_session(b"apple\n", b"xx\x1b\n", "", true, false);
    assert_eq!(got, Selection::Query("xx".to_owned()));
}

// Scenarios whose first meaningful key is Enter lead with a no-op cursor
// key (^F at the end of the query): the scripted bytes all arrive in the
// same wakeup as the choices, and accepting is only valid once a filter
// pass has ranked them.

#[test]
fn seed_query_filters_before_any_key() {
    let got = run_session(b"apple\nbanana\ncherry\n", b"\x06\n", "an", true, false);
    assert_eq!(got, choice(b"banana"));
}

#[test]
fn accept_with_empty_query_takes_the_first_choice() {
    let got = run_session(b"first\nsecond\n", b"\x06\n", "", true, false);
    assert_eq!(got, choice(b"first"));
}

#[test]
fn selection_moves_over_the_ranked_order() {
    // Scores for "a": "a" = 1, "ab" = 1/2, "abc" = 1/3.
    let got = run_session(b"abc\na\nab\n", b"a\x1b[B\n", "", true, false);
    assert_eq!(got, choice(b"ab"));

    // Down then back up lands on the best match again.
    let got = run_session(b"abc\na\nab\n", b"a\x1b[B\x1b[A\n", "", true, false);
    assert_eq!(got, choice(b"a"));
}

#[test]
fn select_last_jumps_to_the_bottom() {
    let got = run_session(b"a\nab\nabc\n", b"a\x1b[F\n", "", true, false);
    assert_eq!(got, choice(b"abc"));
}

#[test]
fn sort_disabled_keeps_arrival_order() {
    let got = run_session(b"abc\na\nab\n", b"a\n", "", false, false);
    assert_eq!(got, choice(b"abc"));
}

#[test]
fn accept_without_matches_is_ignored() {
    // Enter with an unmatched query must not select; abort ends it.
    let got = run_session(b"aaa\n", b"zz\n\x03", "", true, false);
    assert_eq!(got, Selection::Aborted);
}

#[test]
fn delete_to_start_restores_the_full_set() {
    let got = run_session(b"aaa\n", b"zz\x15\n", "", true, false);
    assert_eq!(got, choice(b"aaa"));
}

#[test]
fn backspace_rewidens_the_match_set() {
    // "az" matches nothing, deleting the z matches again.
    let got = run_session(b"apple\nbanana\n", b"az\x7f\n", "", true, false);
    assert_eq!(got, choice(b"apple"));
}

#[test]
fn unknown_sequences_are_swallowed() {
    // An unbound CSI sequence between keystrokes changes nothing.
    let got = run_session(b"apple\nbanana\n", b"an\x1b[1;5R\n", "", true, false);
    assert_eq!(got, choice(b"banana"));
}

#[test]
fn descriptions_ride_along_with_the_selection() {
    let got = run_session(b"build compile it all\n", b"\x06\n", "", true, true);
    assert_eq!(
        got,
        Selection::Choice {
            text: b"build compile it".to_vec(),
            description: Some(b"all".to_vec()),
        }
    );
}
