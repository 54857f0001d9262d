//! Property tests for the matcher and the query editor.
//!
//! The matcher is checked against a brute-force oracle: every reported
//! span must contain the query as a case-insensitive ordered subsequence,
//! no shorter window anywhere in the text may qualify, and among windows
//! of the winning length none may start earlier. The query editor must
//! keep its cursor on a codepoint boundary under arbitrary operation
//! sequences.

use fpick_engine::matcher::min_match;
use fpick_engine::query::QueryBuffer;
use proptest::prelude::*;

/// Case-insensitive ordered-subsequence check, the slow obvious way.
fn is_subsequence(window: &str, query: &str) -> bool {
    let mut rest = window.chars();
    'query: for qc in query.chars() {
        for c in rest.by_ref() {
            if c == qc || c.to_lowercase().eq(qc.to_lowercase()) {
                continue 'query;
            }
        }
        return false;
    }
    true
}

/// All codepoint-boundary window offsets of `text`.
fn boundaries(text: &str) -> Vec<usize> {
    let mut at: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    at.push(text.len());
    at
}

fn small_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            Just('a'),
            Just('b'),
            Just('c'),
            Just('A'),
            Just('à'),
            Just('文'),
        ],
        0..12,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

fn small_query() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![Just('a'), Just('b'), Just('c'), Just('à')],
        1..4,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

proptest! {
    #[test]
    fn match_span_is_shortest_and_leftmost(text in small_text(), query in small_query()) {
        let found = min_match(text.as_bytes(), &query);
        let bounds = boundaries(&text);

        match found {
            Some(span) => {
                prop_assert!(text.is_char_boundary(span.start));
                prop_assert!(text.is_char_boundary(span.end));
                prop_assert!(span.end <= text.len());
                // The span itself qualifies.
                prop_assert!(is_subsequence(&text[span.clone()], &query));
                // Nothing shorter qualifies anywhere, and nothing of equal
                // length qualifies further left.
                for &s in &bounds {
                    for &e in &bounds {
                        if e <= s || !is_subsequence(&text[s..e], &query) {
                            continue;
                        }
                        prop_assert!(e - s >= span.len());
                        if e - s == span.len() {
                            prop_assert!(s >= span.start);
                        }
                    }
                }
            }
            None => {
                // The matcher may only refuse when no window qualifies.
                prop_assert!(!is_subsequence(&text, &query));
            }
        }
    }

    #[test]
    fn editor_cursor_stays_on_codepoint_boundaries(
        seed in small_text(),
        ops in proptest::collection::vec(0u8..10, 0..40),
        inserts in proptest::collection::vec(
            prop_oneof![Just('x'), Just('ü'), Just('文'), Just('_'), Just(' ')],
            40,
        ),
    ) {
        let mut q = QueryBuffer::seeded(seed);
        for (&op, &ch) in ops.iter().zip(inserts.iter()) {
            match op {
                0 => {
                    q.insert(ch);
                }
                1 => {
                    q.delete_prev();
                }
                2 => {
                    q.delete_next();
                }
                3 => {
                    q.delete_to_start();
                }
                4 => {
                    q.delete_to_end();
                }
                5 => {
                    q.delete_prev_word();
                }
                6 => q.move_left(),
                7 => q.move_right(),
                8 => q.move_to_start(),
                _ => q.move_to_end(),
            }
            prop_assert!(q.cursor() <= q.len());
            prop_assert!(q.as_str().is_char_boundary(q.cursor()));
        }
    }
}
