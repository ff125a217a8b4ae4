//! Command-line options for `cbot run`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionError {
    #[error("invalid value `{value}` for {flag}")]
    BadValue { flag: &'static str, value: String },
    #[error("`-D` expects NAME=VALUE, got `{0}`")]
    BadDefine(String),
    #[error("unknown option `{0}`")]
    Unknown(String),
    #[error("missing file path")]
    MissingPath,
}

/// How `cbot run` drives a program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunOptions {
    /// Source file.
    pub path: PathBuf,
    /// `extern` function to start.
    pub entry: String,
    /// Steps per `run` call.
    pub budget: i32,
    /// Give up (and save, if asked) after this many `run` calls.
    pub max_ticks: Option<u64>,
    pub save_state: Option<PathBuf>,
    pub restore_state: Option<PathBuf>,
    /// Host constants visible to the script as plain identifiers.
    pub defines: Vec<(String, i64)>,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            path: PathBuf::new(),
            entry: "main".to_owned(),
            budget: 1000,
            max_ticks: None,
            save_state: None,
            restore_state: None,
            defines: Vec::new(),
        }
    }
}

/// Parse the arguments following `run`.
pub fn parse_run_options(args: &[String]) -> Result<RunOptions, OptionError> {
    let mut options = RunOptions::default();
    let mut path = None;

    for arg in args {
        if let Some(entry) = arg.strip_prefix("--entry=") {
            entry.clone_into(&mut options.entry);
        } else if let Some(budget) = arg.strip_prefix("--budget=") {
            options.budget = parse_number("--budget", budget)?;
        } else if let Some(ticks) = arg.strip_prefix("--max-ticks=") {
            options.max_ticks = Some(parse_number("--max-ticks", ticks)?);
        } else if let Some(file) = arg.strip_prefix("--save=") {
            options.save_state = Some(PathBuf::from(file));
        } else if let Some(file) = arg.strip_prefix("--restore=") {
            options.restore_state = Some(PathBuf::from(file));
        } else if let Some(define) = arg.strip_prefix("-D") {
            options.defines.push(parse_define(define)?);
        } else if arg.starts_with('-') {
            return Err(OptionError::Unknown(arg.clone()));
        } else if path.is_none() {
            path = Some(PathBuf::from(arg));
        } else {
            return Err(OptionError::Unknown(arg.clone()));
        }
    }

    options.path = path.ok_or(OptionError::MissingPath)?;
    Ok(options)
}

fn parse_number<T: std::str::FromStr>(flag: &'static str, value: &str) -> Result<T, OptionError> {
    value.parse().map_err(|_| OptionError::BadValue {
        flag,
        value: value.to_owned(),
    })
}

fn parse_define(define: &str) -> Result<(String, i64), OptionError> {
    let bad = || OptionError::BadDefine(define.to_owned());
    let (name, value) = define.split_once('=').ok_or_else(bad)?;
    let valid_name = name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid_name {
        return Err(bad());
    }
    let value = value.parse().map_err(|_| bad())?;
    Ok((name.to_owned(), value))
}
