//! Statement nodes and signal interception.
//!
//! Loop states:
//!
//! | node      | 0            | 1            | 2              | 3          |
//! |-----------|--------------|--------------|----------------|------------|
//! | `while`   | test         | branch       | body done      |            |
//! | `do`      | run body     | test         | branch         |            |
//! | `for`     | init         | test         | branch         | step       |
//! | `repeat`  | count        | latch count  | next iteration |            |
//!
//! `try` with `n` catch clauses: state 1 runs the body, states `2 + 2i` and
//! `3 + 2i` evaluate and test catch condition `i`, state `2 + 2n` runs
//! `finally` and `3 + 2n` re-raises whatever signal was parked.

use cbot_diagnostic::{RuntimeError, RuntimeErrorKind};
use cbot_ir::{CaseValue, CatchClause, NodeId, NodeKind, Span, SwitchCase};
use cbot_value::{Value, Variable};

use super::expr::{integer, truth};
use super::{fail, Exec, Outcome};
use crate::stack::{BlockKind, Frame, Signal};

pub(crate) fn block(frame: &mut Frame, stmts: &[NodeId], span: Span) -> Outcome {
    let index = usize::try_from(frame.state).unwrap_or(usize::MAX);
    if let Some(&stmt) = stmts.get(index) {
        frame.state += 1;
        return Outcome::Push(stmt);
    }
    if frame.block == BlockKind::Function && !frame.code.ret.is_void() {
        return fail(RuntimeErrorKind::NoRetVal, span);
    }
    Outcome::Done(None)
}

/// Pop the condition just evaluated by a child.
fn condition(frame: &mut Frame) -> Result<bool, RuntimeErrorKind> {
    frame
        .temps
        .pop()
        .ok_or(RuntimeErrorKind::NotInit)
        .and_then(|v| truth(&v))
}

pub(crate) fn if_else(
    frame: &mut Frame,
    cond: NodeId,
    then: NodeId,
    otherwise: Option<NodeId>,
    span: Span,
) -> Outcome {
    match frame.state {
        0 => {
            frame.state = 1;
            Outcome::Push(cond)
        }
        1 => match condition(frame) {
            Ok(true) => {
                frame.state = 2;
                Outcome::Push(then)
            }
            Ok(false) => match otherwise {
                Some(otherwise) => {
                    frame.state = 2;
                    Outcome::Push(otherwise)
                }
                None => Outcome::Done(None),
            },
            Err(kind) => fail(kind, span),
        },
        _ => Outcome::Done(None),
    }
}

pub(crate) fn while_loop(frame: &mut Frame, cond: NodeId, body: NodeId, span: Span) -> Outcome {
    match frame.state {
        1 => match condition(frame) {
            Ok(true) => {
                frame.state = 2;
                Outcome::Push(body)
            }
            Ok(false) => Outcome::Done(None),
            Err(kind) => fail(kind, span),
        },
        _ => {
            frame.state = 1;
            Outcome::Push(cond)
        }
    }
}

pub(crate) fn do_while(frame: &mut Frame, body: NodeId, cond: NodeId, span: Span) -> Outcome {
    match frame.state {
        0 => {
            frame.state = 1;
            Outcome::Push(body)
        }
        1 => {
            frame.state = 2;
            Outcome::Push(cond)
        }
        _ => match condition(frame) {
            Ok(true) => {
                frame.state = 1;
                Outcome::Push(body)
            }
            Ok(false) => Outcome::Done(None),
            Err(kind) => fail(kind, span),
        },
    }
}

pub(crate) fn for_loop(
    frame: &mut Frame,
    init: Option<NodeId>,
    cond: Option<NodeId>,
    step: Option<NodeId>,
    body: NodeId,
    span: Span,
) -> Outcome {
    match frame.state {
        0 => {
            frame.state = 1;
            init.map_or(Outcome::Continue, Outcome::Push)
        }
        1 => {
            frame.state = 2;
            cond.map_or(Outcome::Continue, Outcome::Push)
        }
        2 => {
            let go = if cond.is_some() { condition(frame) } else { Ok(true) };
            match go {
                Ok(true) => {
                    frame.state = 3;
                    Outcome::Push(body)
                }
                Ok(false) => Outcome::Done(None),
                Err(kind) => fail(kind, span),
            }
        }
        _ => {
            frame.temps.clear();
            frame.state = 1;
            step.map_or(Outcome::Continue, Outcome::Push)
        }
    }
}

pub(crate) fn repeat(frame: &mut Frame, count: NodeId, body: NodeId, span: Span) -> Outcome {
    match frame.state {
        0 => {
            frame.state = 1;
            Outcome::Push(count)
        }
        1 => {
            let n = frame
                .temps
                .pop()
                .ok_or(RuntimeErrorKind::NotInit)
                .and_then(|v| integer(&v));
            match n {
                Ok(n) => {
                    frame.step = i32::try_from(n.max(0)).unwrap_or(i32::MAX);
                    frame.state = 2;
                    Outcome::Continue
                }
                Err(kind) => fail(kind, span),
            }
        }
        _ => {
            if frame.step <= 0 {
                return Outcome::Done(None);
            }
            frame.step -= 1;
            Outcome::Push(body)
        }
    }
}

fn case_matches(case: &CaseValue, value: &Variable) -> bool {
    match (case, &value.value) {
        (CaseValue::Int(n), Value::Number(v)) => v.as_i64() == *n,
        (CaseValue::Str(s), Value::Str(v)) => s == v,
        _ => false,
    }
}

pub(crate) fn switch(
    frame: &mut Frame,
    value: NodeId,
    cases: &[SwitchCase],
    default: Option<usize>,
    body: &[NodeId],
    span: Span,
) -> Outcome {
    match frame.state {
        0 => {
            frame.state = 1;
            Outcome::Push(value)
        }
        1 => {
            let Some(v) = frame.temps.pop() else {
                return fail(RuntimeErrorKind::NotInit, span);
            };
            if !v.is_defined() {
                return fail(RuntimeErrorKind::NotInit, span);
            }
            let target = cases
                .iter()
                .find(|c| case_matches(&c.value, &v))
                .map(|c| c.target)
                .or(default);
            match target {
                Some(target) => {
                    frame.state = 2 + target as i32;
                    Outcome::Continue
                }
                None => Outcome::Done(None),
            }
        }
        state => {
            let index = usize::try_from(state - 2).unwrap_or(usize::MAX);
            match body.get(index) {
                Some(&stmt) => {
                    frame.state += 1;
                    Outcome::Push(stmt)
                }
                None => Outcome::Done(None),
            }
        }
    }
}

pub(crate) fn ret(frame: &mut Frame, value: Option<NodeId>) -> Outcome {
    match value {
        Some(value) if frame.state == 0 => {
            frame.state = 1;
            Outcome::Push(value)
        }
        Some(_) => Outcome::Signal(Signal::Return(frame.temps.pop())),
        None => Outcome::Signal(Signal::Return(None)),
    }
}

pub(crate) fn throw(frame: &mut Frame, value: NodeId, span: Span) -> Outcome {
    if frame.state == 0 {
        frame.state = 1;
        return Outcome::Push(value);
    }
    let code = frame
        .temps
        .pop()
        .ok_or(RuntimeErrorKind::NotInit)
        .and_then(|v| integer(&v));
    match code {
        Ok(code) if code > 0 => {
            let code = i32::try_from(code).unwrap_or(i32::MAX);
            fail(RuntimeErrorKind::UserThrow(code), span)
        }
        Ok(_) => fail(RuntimeErrorKind::BadThrow, span),
        Err(kind) => fail(kind, span),
    }
}

/// Whether a `catch` condition value selects `error`.
fn catches(cond: &Variable, error: &RuntimeError) -> bool {
    match cond.value {
        Value::Bool(b) => cond.is_defined() && b,
        _ => integer(cond).is_ok_and(|code| code == i64::from(error.code())),
    }
}

pub(crate) fn try_catch(
    frame: &mut Frame,
    body: NodeId,
    clauses: &[CatchClause],
    finally: Option<NodeId>,
) -> Outcome {
    let last = 2 + 2 * clauses.len() as i32;
    match frame.state {
        0 => {
            frame.state = 1;
            Outcome::Push(body)
        }
        1 => {
            frame.state = last;
            Outcome::Continue
        }
        s if s < last && s % 2 == 0 => {
            let clause = &clauses[((s - 2) / 2) as usize];
            frame.state = s + 1;
            Outcome::PushSecondary(clause.cond)
        }
        s if s < last => {
            let clause = &clauses[((s - 3) / 2) as usize];
            let cond = frame.temps.pop();
            let selected = match (&cond, &frame.pending) {
                (Some(cond), Some(Signal::Error(err))) => catches(cond, err),
                _ => false,
            };
            if selected {
                frame.pending = None;
                frame.state = last;
                Outcome::Push(clause.body)
            } else {
                frame.state = s + 1;
                Outcome::Continue
            }
        }
        s if s == last => {
            frame.state = last + 1;
            finally.map_or(Outcome::Continue, Outcome::Push)
        }
        _ => match frame.pending.take() {
            Some(signal) => Outcome::Signal(signal),
            None => Outcome::Done(None),
        },
    }
}

/// Whether a `break`/`continue` with `label` targets a statement labelled
/// `own`.
fn targets(label: Option<&str>, own: Option<&str>) -> bool {
    label.map_or(true, |l| own == Some(l))
}

impl Exec<'_> {
    /// Offer `signal` to `frame`. `Ok` means the frame absorbed it and
    /// continues with the returned outcome.
    pub(super) fn intercept(&mut self, frame: &mut Frame, signal: Signal) -> Result<Outcome, Signal> {
        if frame.block == BlockKind::Function {
            return match signal {
                Signal::Return(value) => Ok(self.function_return(frame, value)),
                other => Err(other),
            };
        }
        let code = std::rc::Rc::clone(&frame.code);
        let kind = &code.node(frame.node).kind;

        if let Some(own) = kind.loop_label() {
            let resume = match kind {
                NodeKind::While { .. } => 0,
                NodeKind::DoWhile { .. } => 1,
                NodeKind::For { .. } => 3,
                _ => 2,
            };
            return match &signal {
                Signal::Break(label) if targets(label.as_deref(), own) => Ok(Outcome::Done(None)),
                Signal::Continue(label) if targets(label.as_deref(), own) => {
                    frame.temps.clear();
                    frame.state = resume;
                    Ok(Outcome::Continue)
                }
                _ => Err(signal),
            };
        }

        match kind {
            NodeKind::Switch { label, .. } => match &signal {
                Signal::Break(l) if targets(l.as_deref(), label.as_deref()) => {
                    Ok(Outcome::Done(None))
                }
                _ => Err(signal),
            },
            NodeKind::Try { catches, .. } => {
                let last = 2 + 2 * catches.len() as i32;
                match frame.state {
                    1 => {
                        let catchable = matches!(signal, Signal::Error(_)) && !catches.is_empty();
                        frame.state = if catchable { 2 } else { last };
                        frame.pending = Some(signal);
                        Ok(Outcome::Continue)
                    }
                    s if (2..=last).contains(&s) => {
                        frame.temps.clear();
                        frame.state = last;
                        frame.pending = Some(signal);
                        Ok(Outcome::Continue)
                    }
                    _ => Err(signal),
                }
            }
            _ => Err(signal),
        }
    }

    fn function_return(&self, frame: &Frame, value: Option<Variable>) -> Outcome {
        let ret = &frame.code.ret;
        let value = match value {
            Some(v) if !ret.is_void() => {
                let mut out = self.env.classes().create_variable("", ret);
                out.assign_owned(v);
                Some(out)
            }
            other => other,
        };
        Outcome::Done(value)
    }
}
