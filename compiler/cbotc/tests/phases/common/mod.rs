//! Shared helpers for phase tests.

use std::cell::RefCell;
use std::rc::Rc;

use cbot_eval::default_environment;
use cbot_value::Environment;
use cbotc::options::{parse_run_options, RunOptions};
use cbotc::session::{execute, Session, SessionError};

/// An environment whose `print`/`println` write into the returned buffer.
pub fn captured_env() -> (Rc<Environment>, Rc<RefCell<Vec<u8>>>) {
    let env = default_environment();
    let buffer = Rc::new(RefCell::new(Vec::new()));
    let out: cbotc::host::Output = buffer.clone();
    cbotc::host::install(&env, &out);
    (env, buffer)
}

pub fn text(buffer: &Rc<RefCell<Vec<u8>>>) -> String {
    String::from_utf8(buffer.borrow().clone()).unwrap()
}

/// Options as if typed after `cbot run script.cbot`.
pub fn options(args: &[&str]) -> RunOptions {
    let mut argv: Vec<String> = vec!["script.cbot".to_owned()];
    argv.extend(args.iter().map(|a| (*a).to_owned()));
    parse_run_options(&argv).unwrap()
}

/// Run `source` in a fresh captured environment.
pub fn run(source: &str, args: &[&str]) -> (Result<Session, SessionError>, String) {
    let (env, buffer) = captured_env();
    let session = execute(&env, source, &options(args));
    (session, text(&buffer))
}
