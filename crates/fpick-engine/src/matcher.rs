#![forbid(unsafe_code)]

//! Fuzzy matcher and the filter pass.
//!
//! A query matches a choice when its codepoints occur in order, not
//! necessarily contiguously, within the choice text, compared
//! case-insensitively. Among all spans admitting a full match the
//! matcher reports the shortest, and among equally short spans the
//! leftmost. Embedded CSI/OSC escape sequences are stepped over and never
//! matched into; invalid UTF-8 is an opaque byte that matches nothing.
//!
//! # Scoring
//!
//! With sorting enabled:
//!
//! ```text
//! score = query_bytes / span_bytes / record_bytes
//! ```
//!
//! Two real divisions over byte lengths. The formula rewards a compact
//! span relative to the whole record, and queries that cover more of the
//! span; its lack of normalization bounds is part of the ranking
//! contract and is deliberately left as is. With sorting disabled every
//! match scores 1.0, collapsing the ranking to arrival order.
//!
//! # Invariants
//!
//! 1. A reported span always satisfies `0 <= start <= end <= text.len()`
//!    with both ends on codepoint boundaries.
//! 2. The query's codepoints occur as a case-insensitive ordered
//!    subsequence of the span.
//! 3. No shorter span admits a full match; no equal-length span starts
//!    earlier.
//! 4. Determinism: identical input produces identical spans and scores.

use std::io;
use std::ops::Range;

use tracing::trace;

use crate::store::ChoiceStore;
use crate::text::{decode_char, skip_escape};

/// Choices scanned between checks for pending terminal input.
const INTERRUPT_BATCH: usize = 50;

/// Find the leftmost-shortest match span for `query` in `text`.
///
/// Returns `None` when the query is empty or does not match. The span is
/// in bytes relative to the start of `text`.
#[must_use]
pub fn min_match(text: &[u8], query: &str) -> Option<Range<usize>> {
    let qchars: Vec<char> = query.chars().collect();
    min_match_chars(text, &qchars, query.len())
}

/// As [`min_match`], over a pre-split query (the filter pass splits once
/// per pass, not once per choice).
fn min_match_chars(text: &[u8], qchars: &[char], qlen: usize) -> Option<Range<usize>> {
    let (&first, rest) = qchars.split_first()?;
    let mut best: Option<Range<usize>> = None;
    let mut from = 0;

    // Anchors are scanned left to right and replace the incumbent only
    // with a strictly shorter span, which keeps the leftmost among equals.
    while let Some((start, first_len)) = find_fold(text, from, first) {
        let mut end = start + first_len;
        let mut complete = true;
        for &qc in rest {
            match find_fold(text, end, qc) {
                Some((at, len)) => end = at + len,
                None => {
                    complete = false;
                    break;
                }
            }
        }
        if !complete {
            // The greedy scan takes the earliest position for every
            // codepoint; if it cannot complete from this anchor, no later
            // anchor can complete either.
            break;
        }
        let span_len = end - start;
        if best.as_ref().is_none_or(|b| span_len < b.len()) {
            best = Some(start..end);
            if span_len == qlen {
                break;
            }
        }
        from = start + 1;
    }
    best
}

/// Find the next codepoint in `text` at or after `from` equal to `target`
/// under case folding. Escape sequences are stepped over; undecodable
/// bytes are skipped one at a time.
fn find_fold(text: &[u8], from: usize, target: char) -> Option<(usize, usize)> {
    let mut i = from;
    while i < text.len() {
        let esc = skip_escape(&text[i..]);
        if esc > 0 {
            i += esc;
            continue;
        }
        match decode_char(&text[i..]) {
            Some((c, len)) => {
                if fold_eq(c, target) {
                    return Some((i, len));
                }
                i += len;
            }
            None => i += 1,
        }
    }
    None
}

/// Case-insensitive codepoint equality (full Unicode lowercase folding).
fn fold_eq(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

impl ChoiceStore {
    /// Re-score and re-sort the store against `query`.
    ///
    /// Scans choices in `[offset, count)`, writes each one's match span
    /// and score, then sorts `[0, count)` by descending score with
    /// ascending insertion index as the tie-break. Returns the new
    /// visible count (`offset` plus the survivors of the scan), or `None`
    /// when the pass was abandoned because `pending_input` reported
    /// terminal bytes waiting; partial scores written by an abandoned
    /// pass are simply overwritten by the next one.
    ///
    /// An empty query matches everything with no span and score 0.
    ///
    /// # Errors
    ///
    /// Propagates failures from the `pending_input` check.
    pub fn filter_pass<F>(
        &mut self,
        query: &str,
        sort: bool,
        offset: usize,
        count: usize,
        mut pending_input: F,
    ) -> io::Result<Option<usize>>
    where
        F: FnMut() -> io::Result<bool>,
    {
        let qchars: Vec<char> = query.chars().collect();
        let qlen = query.len();
        let (arena, choices) = self.parts_mut();

        let mut survivors = 0usize;
        for i in offset..count {
            let choice = &mut choices[i];
            if qchars.is_empty() {
                choice.matched = None;
                choice.score = 0.0;
                survivors += 1;
            } else {
                let text = &arena[choice.text.clone()];
                match min_match_chars(text, &qchars, qlen) {
                    Some(span) => {
                        choice.score = if sort {
                            qlen as f64 / span.len() as f64 / choice.record_len() as f64
                        } else {
                            1.0
                        };
                        choice.matched = Some(span);
                        survivors += 1;
                    }
                    None => {
                        choice.matched = None;
                        choice.score = 0.0;
                    }
                }
            }

            if i > 0 && i % INTERRUPT_BATCH == 0 && pending_input()? {
                trace!(scanned = i + 1 - offset, "filter pass abandoned");
                return Ok(None);
            }
        }

        choices[..count].sort_unstable_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.text.start.cmp(&b.text.start))
        });
        Ok(Some(offset + survivors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn store_from(lines: &[u8], descriptions: bool) -> ChoiceStore {
        let mut store = ChoiceStore::new(descriptions, b" ".to_vec());
        let mut input = Cursor::new(lines.to_vec());
        while store.ingest(&mut input, None).unwrap() > 0 {}
        store
    }

    fn no_input() -> impl FnMut() -> io::Result<bool> {
        || Ok(false)
    }

    #[test]
    fn shortest_span_wins() {
        assert_eq!(min_match(b"foobar", "ob"), Some(2..4));
    }

    #[test]
    fn leftmost_among_equal_spans() {
        assert_eq!(min_match(b"ababab", "ab"), Some(0..2));
    }

    #[test]
    fn single_codepoint_query() {
        assert_eq!(min_match(b"banana", "n"), Some(2..3));
    }

    #[test]
    fn match_is_case_insensitive() {
        assert_eq!(min_match(b"FooBar", "ob"), Some(2..4));
        assert_eq!(min_match(b"README", "read"), Some(0..4));
        assert_eq!(min_match("Ärger".as_bytes(), "ä"), Some(0..2));
    }

    #[test]
    fn subsequence_with_gaps() {
        // s..e covers "an" through "banana"'s first 'a' to first 'n'.
        assert_eq!(min_match(b"banana", "an"), Some(1..3));
        assert_eq!(min_match(b"controller", "ctr"), Some(0..5));
    }

    #[test]
    fn no_match_reports_none() {
        assert_eq!(min_match(b"cherry", "an"), None);
        assert_eq!(min_match(b"", "a"), None);
        assert_eq!(min_match(b"abc", ""), None);
    }

    #[test]
    fn later_shorter_span_replaces_earlier_longer_one() {
        // Anchor at 0 spans a..z (whole string); anchor at 4 is tight.
        assert_eq!(min_match(b"axxxaz", "az"), Some(4..6));
    }

    #[test]
    fn escape_sequences_are_never_matched_into() {
        assert_eq!(min_match(b"\x1b[31mred\x1b[0m", "red"), Some(5..8));
        // The 'm' exists only inside the escape sequences.
        assert_eq!(min_match(b"\x1b[31mred\x1b[0m", "m"), None);
        assert_eq!(min_match(b"\x1b]0;title\x07body", "body"), Some(10..14));
    }

    #[test]
    fn invalid_bytes_are_opaque() {
        assert_eq!(min_match(b"a\xffb", "ab"), Some(0..3));
        assert_eq!(min_match(b"\xff\xfe", "a"), None);
    }

    #[test]
    fn multibyte_span_boundaries() {
        let text = "xü文y".as_bytes();
        assert_eq!(min_match(text, "ü文"), Some(1..6));
        assert_eq!(min_match(text, "xy"), Some(0..7));
    }

    #[test]
    fn filter_scores_by_span_and_record_length() {
        let mut store = store_from(b"banana\n", false);
        let count = store.len();
        let visible = store
            .filter_pass("an", true, 0, count, no_input())
            .unwrap()
            .unwrap();
        assert_eq!(visible, 1);
        let c = store.choice(0);
        assert_eq!(c.matched, Some(1..3));
        // 2 query bytes / 2 span bytes / 6 record bytes.
        assert!((c.score - 2.0 / 2.0 / 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn filter_orders_by_descending_score() {
        let mut store = store_from(b"xaxb\nab\nnope\n", true);
        let count = store.len();
        let visible = store
            .filter_pass("ab", true, 0, count, no_input())
            .unwrap()
            .unwrap();
        assert_eq!(visible, 2);
        // "ab" scores 2/2/2, "xaxb" scores 2/3/4.
        assert_eq!(store.text(0), b"ab");
        assert_eq!(store.text(1), b"xaxb");
        assert_eq!(store.text(2), b"nope");
    }

    #[test]
    fn sort_disabled_scores_one_and_keeps_arrival_order() {
        let mut store = store_from(b"xaxb\nab\naxxb\n", false);
        let count = store.len();
        let visible = store
            .filter_pass("ab", false, 0, count, no_input())
            .unwrap()
            .unwrap();
        assert_eq!(visible, 3);
        assert_eq!(store.text(0), b"xaxb");
        assert_eq!(store.text(1), b"ab");
        assert_eq!(store.text(2), b"axxb");
        for i in 0..3 {
            assert!((store.choice(i).score - 1.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn equal_scores_tie_break_on_insertion_index() {
        let mut store = store_from(b"dup\ndup\ndup\n", false);
        let count = store.len();
        store
            .filter_pass("dup", true, 0, count, no_input())
            .unwrap()
            .unwrap();
        assert!(store.choice(0).index() < store.choice(1).index());
        assert!(store.choice(1).index() < store.choice(2).index());
    }

    #[test]
    fn empty_query_matches_everything_without_spans() {
        let mut store = store_from(b"b\na\nc\n", false);
        let count = store.len();
        let visible = store
            .filter_pass("", true, 0, count, no_input())
            .unwrap()
            .unwrap();
        assert_eq!(visible, 3);
        assert_eq!(store.text(0), b"b");
        assert_eq!(store.choice(0).matched, None);
        assert!((store.choice(0).score).abs() < f64::EPSILON);
    }

    #[test]
    fn non_matches_sink_below_matches() {
        let mut store = store_from(b"zzz\nabc\n", false);
        let count = store.len();
        let visible = store
            .filter_pass("abc", true, 0, count, no_input())
            .unwrap()
            .unwrap();
        assert_eq!(visible, 1);
        assert_eq!(store.text(0), b"abc");
        assert_eq!(store.text(1), b"zzz");
        assert_eq!(store.choice(1).matched, None);
    }

    #[test]
    fn description_length_dilutes_the_score() {
        // Identical text, one with a long description: the bare one must
        // rank first because the record length divides the score.
        let mut store = store_from(b"item with a long description\nitem\n", true);
        let count = store.len();
        store
            .filter_pass("item", true, 0, count, no_input())
            .unwrap()
            .unwrap();
        assert_eq!(store.description(0), None);
        assert!(store.description(1).is_some());
        assert!(store.choice(0).score > store.choice(1).score);
    }

    #[test]
    fn pending_input_abandons_the_pass() {
        let lines: Vec<u8> = (0..120)
            .flat_map(|i| format!("choice-{i}\n").into_bytes())
            .collect();
        let mut store = store_from(&lines, false);
        let count = store.len();
        let mut checks = 0usize;
        let result = store
            .filter_pass("choice", true, 0, count, || {
                checks += 1;
                Ok(true)
            })
            .unwrap();
        assert_eq!(result, None);
        // The first batch boundary is choice 50; exactly one check ran.
        assert_eq!(checks, 1);
    }

    #[test]
    fn splice_window_rescans_only_the_tail() {
        let mut store = store_from(b"ab\nzz\n", false);
        let count = store.len();
        let visible = store
            .filter_pass("ab", true, 0, count, no_input())
            .unwrap()
            .unwrap();
        assert_eq!(visible, 1);

        // Two more records arrive mid-session, spliced after the prefix.
        let mut more = Cursor::new(b"aab\nqq\n".to_vec());
        store.ingest(&mut more, Some(visible)).unwrap();
        let count = visible + 2;
        let visible = store
            .filter_pass("ab", true, visible, count, no_input())
            .unwrap()
            .unwrap();
        assert_eq!(visible, 2);
        assert_eq!(store.text(0), b"ab");
        assert_eq!(store.text(1), b"aab");
    }
}
