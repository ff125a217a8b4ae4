//! Drive one program the way a game host would: compile, start (or
//! restore), then call `run` tick after tick.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::rc::Rc;

use cbot_eval::{Program, ProgramError, StateError};
use cbot_value::Environment;
use thiserror::Error;

use crate::options::RunOptions;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Compile(ProgramError),
    #[error("no extern function `{0}` that takes no arguments")]
    NoEntry(String),
    #[error("state file: {0}")]
    State(#[from] StateError),
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

/// A program after the host stopped ticking it.
#[derive(Debug)]
pub struct Session {
    pub program: Program,
    /// `run` calls made.
    pub ticks: u64,
    /// The entry function returned or failed; otherwise the tick limit hit.
    pub finished: bool,
}

/// Compile `source` into a fresh program on `env` and tick it.
#[tracing::instrument(level = "debug", skip_all, fields(entry = %options.entry))]
pub fn execute(
    env: &Rc<Environment>,
    source: &str,
    options: &RunOptions,
) -> Result<Session, SessionError> {
    for (name, value) in &options.defines {
        if !env.define_num(name, *value) {
            tracing::warn!(name, "reserved word cannot be defined");
        }
    }

    let mut program = Program::new(env);
    if !program.compile(source, &mut ()) {
        if let Some(err) = program.error_info() {
            return Err(SessionError::Compile(err.clone()));
        }
    }

    if let Some(path) = &options.restore_state {
        let mut input = BufReader::new(File::open(path)?);
        program.restore_state(&mut input)?;
        tracing::debug!(path = %path.display(), "state restored");
    } else if !program.start(&options.entry) {
        return Err(SessionError::NoEntry(options.entry.clone()));
    }

    let mut ticks = 0;
    let finished = loop {
        if !program.is_running() {
            break true;
        }
        if options.max_ticks.is_some_and(|max| ticks >= max) {
            break false;
        }
        ticks += 1;
        if program.run(&mut (), options.budget) {
            break true;
        }
    };
    tracing::debug!(ticks, finished, "session over");

    if let Some(path) = &options.save_state {
        let mut out = BufWriter::new(File::create(path)?);
        program.save_state(&mut out)?;
        out.flush()?;
    }

    Ok(Session {
        program,
        ticks,
        finished,
    })
}
