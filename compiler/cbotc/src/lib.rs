//! CBot command-line host.
//!
//! Plays the part a game engine plays for embedded scripts: it owns the
//! [`Environment`](cbot_value::Environment), registers a few host natives,
//! and ticks a [`Program`](cbot_eval::Program) with a step budget until it
//! finishes, optionally saving or restoring its state in between.

pub mod commands;
pub mod host;
pub mod options;
pub mod session;

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install a tracing subscriber when `RUST_LOG` is set.
///
/// `CBOT_TRACE_TREE=1` switches to an indented span tree, handy for
/// following the executor through nested calls.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_err() {
            return;
        }
        let filter = EnvFilter::from_default_env();
        if std::env::var_os("CBOT_TRACE_TREE").is_some() {
            tracing_subscriber::registry()
                .with(tracing_tree::HierarchicalLayer::new(2).with_targets(true))
                .with(filter)
                .init();
        } else {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
