#![forbid(unsafe_code)]

//! fpick: interactive fuzzy selection over stdin lines.
//!
//! The binary wires three layers together: `fpick-core` owns the
//! terminal (session lifecycle, capabilities, key decoding),
//! `fpick-engine` owns the data (choice store, matcher, query editor),
//! and this crate owns the policy (CLI, the controller event loop, and
//! the renderer).

pub mod cli;
pub mod controller;
pub mod render;
