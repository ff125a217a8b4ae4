//! The `run` command: compile a file and tick its entry function.

use cbot_eval::{default_environment, ProgramError};

use super::{read_file, report};
use crate::options::RunOptions;
use crate::session::{execute, SessionError};

/// Run a CBot file. Exits with status 1 on compile or runtime errors and
/// with status 2 when `--max-ticks` stopped an unfinished program.
pub fn run_file(options: &RunOptions) {
    let path = options.path.display().to_string();
    let source = read_file(&path);
    let env = default_environment();
    crate::host::install(&env, &crate::host::stdout());

    let session = match execute(&env, &source, options) {
        Ok(session) => session,
        Err(SessionError::Compile(ProgramError::Compile(err))) => {
            report(&err, &source, &path);
            std::process::exit(1);
        }
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    if let Some(ProgramError::Runtime(err)) = session.program.error_info() {
        report(err, &source, &path);
        std::process::exit(1);
    }

    if !session.finished {
        if let Some((function, span)) = session.program.run_pos() {
            eprintln!("stopped after {} ticks in {function} at {span}", session.ticks);
        }
        std::process::exit(2);
    }

    if let Some(result) = session.program.result() {
        println!("{result}");
    }
}
