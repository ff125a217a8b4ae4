//! Natives the command-line host adds on top of the built-ins.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use cbot_diagnostic::CompileErrorKind;
use cbot_ir::TypeDesc;
use cbot_value::{expect_args, CallStatus, Environment, NativeFunction};

/// Where `print` writes.
pub type Output = Rc<RefCell<dyn Write>>;

pub fn stdout() -> Output {
    Rc::new(RefCell::new(std::io::stdout()))
}

/// Register `print(value)` and `println(value)`.
pub fn install(env: &Environment, out: &Output) {
    for (name, newline) in [("print", false), ("println", true)] {
        let out = Rc::clone(out);
        env.add_function(NativeFunction::new(
            name,
            move |args, _ret, _user| {
                let mut out = out.borrow_mut();
                let written = match args.first() {
                    Some(value) if newline => writeln!(out, "{value}"),
                    Some(value) => write!(out, "{value}"),
                    None if newline => writeln!(out),
                    None => Ok(()),
                };
                if let Err(err) = written {
                    tracing::warn!(%err, "script output lost");
                }
                Ok(CallStatus::Done)
            },
            move |args, _user| {
                if args.len() > 1 {
                    return Err(CompileErrorKind::OverParam);
                }
                if !newline {
                    expect_args(args, 1)?;
                }
                if args.iter().any(TypeDesc::is_void) {
                    return Err(CompileErrorKind::BadParam);
                }
                Ok(TypeDesc::VOID)
            },
        ));
    }
}
