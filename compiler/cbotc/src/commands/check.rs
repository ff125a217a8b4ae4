//! The `check` command: compile a file without running it.

use cbot_eval::{default_environment, Program, ProgramError};

use super::{read_file, report};

/// Compile `path` and list its entry points, or report the first error.
pub fn check_file(path: &str) {
    let source = read_file(path);
    let env = default_environment();
    crate::host::install(&env, &crate::host::stdout());

    let mut program = Program::new(&env);
    if !program.compile(&source, &mut ()) {
        match program.error_info() {
            Some(ProgramError::Compile(err)) => report(err, &source, path),
            Some(ProgramError::Runtime(err)) => report(err, &source, path),
            None => eprintln!("error: compilation failed"),
        }
        std::process::exit(1);
    }

    let names = program.extern_names();
    println!("{path}: ok");
    if !names.is_empty() {
        println!("entry points: {}", names.join(", "));
    }
}
