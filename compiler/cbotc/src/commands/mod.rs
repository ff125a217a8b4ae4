//! Command handlers for the `cbot` binary.

use std::io::IsTerminal;

use cbot_diagnostic::emitter::{ColorMode, Reportable, TerminalEmitter};

mod check;
mod debug;
mod run;

pub use check::check_file;
pub use debug::lex_file;
pub use run::run_file;

/// Read a source file or exit with a message.
pub(crate) fn read_file(path: &str) -> String {
    match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            eprintln!("error: cannot read '{path}': {err}");
            std::process::exit(1);
        }
    }
}

/// Render `err` against `source` on stderr.
pub(crate) fn report(err: &dyn Reportable, source: &str, path: &str) {
    let stderr = std::io::stderr();
    let is_tty = stderr.is_terminal();
    let mut emitter = TerminalEmitter::with_color_mode(stderr, ColorMode::Auto, is_tty);
    if emitter.emit(err, source, path).and_then(|()| emitter.flush()).is_err() {
        eprintln!("error[{}]: {}", err.code(), err.message());
    }
}
