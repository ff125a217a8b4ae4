// Test code uses unwrap/expect for clarity - panics provide good test failure messages
#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Phase-based host tests.
//!
//! Organized by what the host exercises rather than by language feature;
//! per-construct semantics are covered by the unit tests of each crate.
//!
//! # Organization
//!
//! - `parse/` - command-line options, tokens and compile diagnostics
//! - `eval/` - ticking programs through a session, host natives
//! - `persist/` - stopping, saving and resuming through state files
//! - `common/` - shared helpers
//!
//! ```bash
//! cargo test -p cbotc --test phases
//! cargo test -p cbotc --test phases persist
//! ```

#[path = "phases/common/mod.rs"]
mod common;

#[path = "phases/parse/mod.rs"]
mod parse;

#[path = "phases/eval/mod.rs"]
mod eval;

#[path = "phases/persist/mod.rs"]
mod persist;
