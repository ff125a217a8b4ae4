//! Saving and restoring a suspended program.
//!
//! The state is written against the program's *compiled* form: frames name
//! their code by key and their node by index, classes by name. Restoring
//! therefore needs the same source compiled into the target program first.
//!
//! Layout, all integers LEB128 (signed ones zigzag):
//!
//! ```text
//! state    := VERSION entry:opt_str result:opt_var budget:svar
//!             statics running:u8 [timer:svar frame* 0 result:opt_var]
//! statics  := count (class:str index:uvar var)*
//! frame    := marker(1 primary | 2 catch path) block:u8 locked:u8
//!             state:svar step:svar code:str node:uvar
//!             locals:vars temps:vars result:opt_var signal
//! var      := header name:str ident:uvar type-tail init:u8 value
//! header   := (kind + 1) | static << 5 | protection << 6
//! ```
//!
//! Heap references carry a state-local id; the body follows the first time
//! an id is written, so objects shared between variables are shared again
//! after restore (cycles included).

mod codec;

use std::rc::Rc;

use cbot_compile::Unit;
use cbot_diagnostic::{RuntimeError, RuntimeErrorKind};
use cbot_ir::{ClassId, Code, NodeId, Protection, Span, TypeDesc, TypeKind};
use cbot_value::{
    ArrayBody, ArrayRef, ClassBody, Environment, InitState, InstanceRef, MethodBody, Number,
    Value, Variable,
};
use rustc_hash::FxHashMap;

use crate::errors::{StateError, StateResult};
use crate::program::Program;
use crate::stack::{BlockKind, ExecStack, Frame, Signal};
use codec::{Decoder, Encoder};

/// Format version written first; anything else is rejected on restore.
pub const VERSION: u64 = 1;

const FRAME_END: u8 = 0;
const FRAME_PRIMARY: u8 = 1;
const FRAME_SECONDARY: u8 = 2;

/// Value tags.
const V_VOID: u8 = 0;
const V_NUMBER: u8 = 1;
const V_BOOL: u8 = 2;
const V_STR: u8 = 3;
const V_POINTER: u8 = 4;
const V_ARRAY: u8 = 5;
const V_INSTANCE: u8 = 6;

/// Signal tags.
const S_NONE: u8 = 0;
const S_BREAK: u8 = 1;
const S_CONTINUE: u8 = 2;
const S_RETURN: u8 = 3;
const S_ERROR: u8 = 4;

/// Error-kind tags inside `S_ERROR`.
const E_BUILTIN: u8 = 0;
const E_THROW: u8 = 1;
const E_NATIVE: u8 = 2;

pub(crate) fn save(program: &Program) -> StateResult<Vec<u8>> {
    let unit = program.unit.as_ref().ok_or(StateError::NotCompiled)?;
    let mut saver = Saver::new(&program.env);
    saver.enc.uvar(VERSION);
    saver.enc.opt_str(program.entry.as_deref());
    saver.opt_var(program.result.as_ref())?;
    saver.enc.svar(i64::from(program.budget));
    saver.statics(unit)?;

    match &program.stack {
        Some(stack) => {
            saver.enc.bool(true);
            saver.enc.svar(i64::from(stack.timer));
            for frame in &stack.frames {
                saver.frame(frame)?;
            }
            saver.enc.u8(FRAME_END);
            saver.opt_var(stack.result.as_ref())?;
        }
        None => saver.enc.bool(false),
    }
    tracing::debug!(program = %program.id, "state saved");
    Ok(saver.enc.into_bytes())
}

pub(crate) fn restore(program: &mut Program, bytes: &[u8]) -> StateResult<()> {
    let unit = program.unit.as_ref().ok_or(StateError::NotCompiled)?;
    let mut loader = Loader::new(&program.env, unit, bytes);
    let state = loader.state()?;

    {
        let mut classes = program.env.classes_mut();
        for (class, index, var) in state.statics {
            classes.set_static(class, index, var);
        }
    }
    program.entry = state.entry;
    program.result = state.result;
    program.budget = state.budget;
    program.error = None;
    if let Some(stack) = &state.stack {
        relock(program, stack);
    }
    program.stack = state.stack;
    tracing::debug!(program = %program.id, running = program.stack.is_some(), "state restored");
    Ok(())
}

/// Take again the class locks the saved frames held.
fn relock(program: &Program, stack: &ExecStack) {
    let queue = program.env.config().lock_queue_len;
    let mut classes = program.env.classes_mut();
    for frame in stack.frames.iter().filter(|f| f.locked) {
        let Some(def) = frame.code.class.and_then(|c| classes.get_mut(c)) else {
            continue;
        };
        if !def.lock.lock(program.id, queue) {
            tracing::warn!(program = %program.id, class = %def.name, "lock not available after restore");
        }
    }
}

struct Saver<'a> {
    env: &'a Environment,
    enc: Encoder,
    instances: FxHashMap<*const (), u64>,
    arrays: FxHashMap<*const (), u64>,
}

impl<'a> Saver<'a> {
    fn new(env: &'a Environment) -> Self {
        Saver {
            env,
            enc: Encoder::default(),
            instances: FxHashMap::default(),
            arrays: FxHashMap::default(),
        }
    }

    fn class_name(&self, class: ClassId) -> StateResult<Rc<str>> {
        self.env
            .classes()
            .name(class)
            .ok_or_else(|| StateError::UnknownClass(format!("{class:?}")))
    }

    fn statics(&mut self, unit: &Unit) -> StateResult<()> {
        let mut entries = Vec::new();
        {
            let classes = self.env.classes();
            for class in &unit.classes {
                let Some(def) = classes.get(*class) else {
                    continue;
                };
                let mut slots: Vec<_> = def.statics.iter().collect();
                slots.sort_by_key(|(index, _)| **index);
                for (index, cell) in slots {
                    entries.push((Rc::clone(&def.name), *index, cell.borrow().clone()));
                }
            }
        }
        self.enc.usize(entries.len());
        for (name, index, var) in &entries {
            self.enc.str(name);
            self.enc.usize(*index);
            self.var(var)?;
        }
        Ok(())
    }

    fn frame(&mut self, frame: &Frame) -> StateResult<()> {
        self.enc.u8(if frame.secondary { FRAME_SECONDARY } else { FRAME_PRIMARY });
        self.enc.u8(frame.block as u8);
        self.enc.bool(frame.locked);
        self.enc.svar(i64::from(frame.state));
        self.enc.svar(i64::from(frame.step));
        self.enc.str(&frame.code.key);
        self.enc.usize(frame.node.index());
        self.vars(&frame.locals)?;
        self.vars(&frame.temps)?;
        self.opt_var(frame.result.as_ref())?;
        self.signal(frame.pending.as_ref())
    }

    fn signal(&mut self, signal: Option<&Signal>) -> StateResult<()> {
        match signal {
            None => self.enc.u8(S_NONE),
            Some(Signal::Break(label)) => {
                self.enc.u8(S_BREAK);
                self.enc.opt_str(label.as_deref());
            }
            Some(Signal::Continue(label)) => {
                self.enc.u8(S_CONTINUE);
                self.enc.opt_str(label.as_deref());
            }
            Some(Signal::Return(value)) => {
                self.enc.u8(S_RETURN);
                self.opt_var(value.as_ref())?;
            }
            Some(Signal::Error(err)) => {
                self.enc.u8(S_ERROR);
                let tag = match err.kind {
                    RuntimeErrorKind::UserThrow(_) => E_THROW,
                    RuntimeErrorKind::Native(_) => E_NATIVE,
                    _ => E_BUILTIN,
                };
                self.enc.u8(tag);
                self.enc.svar(i64::from(err.code()));
                self.enc.uvar(u64::from(err.span.start));
                self.enc.uvar(u64::from(err.span.end));
            }
        }
        Ok(())
    }

    fn vars(&mut self, vars: &[Variable]) -> StateResult<()> {
        self.enc.usize(vars.len());
        vars.iter().try_for_each(|v| self.var(v))
    }

    fn opt_var(&mut self, var: Option<&Variable>) -> StateResult<()> {
        match var {
            Some(var) => {
                self.enc.u8(1);
                self.var(var)
            }
            None => {
                self.enc.u8(0);
                Ok(())
            }
        }
    }

    fn var(&mut self, var: &Variable) -> StateResult<()> {
        let header = (var.ty.kind() as u8 + 1)
            | (u8::from(var.is_static) << 5)
            | ((var.protection as u8) << 6);
        self.enc.u8(header);
        self.enc.str(&var.name);
        self.enc.uvar(var.ident);
        self.type_tail(&var.ty)?;
        self.enc.u8(var.init as u8);
        cbot_stack::ensure_sufficient_stack(|| self.value(&var.value))
    }

    fn ty(&mut self, ty: &TypeDesc) -> StateResult<()> {
        self.enc.u8(ty.kind() as u8);
        self.type_tail(ty)
    }

    /// What a type adds beyond its kind.
    fn type_tail(&mut self, ty: &TypeDesc) -> StateResult<()> {
        match ty.kind() {
            TypeKind::Pointer | TypeKind::Class | TypeKind::Intrinsic => {
                let class = ty
                    .class_id()
                    .ok_or(StateError::Corrupt("class type without class"))?;
                let name = self.class_name(class)?;
                self.enc.str(&name);
            }
            TypeKind::ArrayPointer | TypeKind::ArrayBody => {
                match ty.elem() {
                    Some(elem) => self.ty(elem)?,
                    None => self.ty(&TypeDesc::VOID)?,
                }
                self.enc.svar(i64::from(ty.limit()));
            }
            _ => {}
        }
        Ok(())
    }

    fn value(&mut self, value: &Value) -> StateResult<()> {
        match value {
            Value::Void => self.enc.u8(V_VOID),
            Value::Number(n) => {
                self.enc.u8(V_NUMBER);
                self.number(*n);
            }
            Value::Bool(b) => {
                self.enc.u8(V_BOOL);
                self.enc.bool(*b);
            }
            Value::Str(s) => {
                self.enc.u8(V_STR);
                self.enc.str(s);
            }
            Value::Pointer(p) => {
                self.enc.u8(V_POINTER);
                self.instance(p.as_ref())?;
            }
            Value::Array(a) => {
                self.enc.u8(V_ARRAY);
                self.array(a.as_ref())?;
            }
            Value::Instance(body) => {
                self.enc.u8(V_INSTANCE);
                self.body(body)?;
            }
        }
        Ok(())
    }

    fn number(&mut self, n: Number) {
        self.enc.u8(n.kind() as u8);
        match n {
            Number::Byte(v) => self.enc.svar(i64::from(v)),
            Number::Short(v) => self.enc.svar(i64::from(v)),
            Number::Char(c) => self.enc.uvar(u64::from(u32::from(c))),
            Number::Int(v) => self.enc.svar(i64::from(v)),
            Number::Long(v) => self.enc.svar(v),
            Number::Float(v) => self.enc.f32(v),
            Number::Double(v) => self.enc.f64(v),
        }
    }

    fn instance(&mut self, instance: Option<&InstanceRef>) -> StateResult<()> {
        let Some(instance) = instance else {
            self.enc.uvar(0);
            return Ok(());
        };
        let key = Rc::as_ptr(instance).cast::<()>();
        if let Some(id) = self.instances.get(&key) {
            self.enc.uvar(*id);
            return Ok(());
        }
        let id = self.instances.len() as u64 + 1;
        self.instances.insert(key, id);
        self.enc.uvar(id);
        let inst = instance.borrow();
        self.enc.u8(u8::from(inst.constructed) | (u8::from(inst.deleted) << 1));
        self.body(&inst.body)
    }

    fn array(&mut self, array: Option<&ArrayRef>) -> StateResult<()> {
        let Some(array) = array else {
            self.enc.uvar(0);
            return Ok(());
        };
        let key = Rc::as_ptr(array).cast::<()>();
        if let Some(id) = self.arrays.get(&key) {
            self.enc.uvar(*id);
            return Ok(());
        }
        let id = self.arrays.len() as u64 + 1;
        self.arrays.insert(key, id);
        self.enc.uvar(id);
        let body = array.borrow();
        self.ty(&body.elem)?;
        self.enc.svar(i64::from(body.limit));
        self.vars(&body.items)
    }

    fn body(&mut self, body: &ClassBody) -> StateResult<()> {
        self.enc.bool(body.class.is_some());
        self.enc.str(&body.name);
        self.vars(&body.members)
    }
}

/// Everything a state holds, decoded before any of it is applied.
struct State {
    entry: Option<String>,
    result: Option<Variable>,
    budget: i32,
    statics: Vec<(ClassId, usize, Variable)>,
    stack: Option<ExecStack>,
}

struct Loader<'a> {
    env: &'a Environment,
    dec: Decoder<'a>,
    codes: FxHashMap<String, Rc<Code>>,
    instances: FxHashMap<u64, InstanceRef>,
    arrays: FxHashMap<u64, ArrayRef>,
}

/// Every body the unit can have frames in, by key.
fn code_index(env: &Environment, unit: &Unit) -> FxHashMap<String, Rc<Code>> {
    let mut index = FxHashMap::default();
    let mut add = |code: Option<Rc<Code>>| {
        if let Some(code) = code {
            index.insert(code.key.clone(), code);
        }
    };
    for function in &unit.functions {
        add(function.code());
    }
    for def in env.classes().iter() {
        for method in &def.methods {
            if let MethodBody::Script(entry) = &method.body {
                add(entry.code());
            }
        }
        for member in &def.members {
            add(member.init.clone());
        }
    }
    index
}

impl<'a> Loader<'a> {
    fn new(env: &'a Environment, unit: &Unit, bytes: &'a [u8]) -> Self {
        Loader {
            env,
            dec: Decoder::new(bytes),
            codes: code_index(env, unit),
            instances: FxHashMap::default(),
            arrays: FxHashMap::default(),
        }
    }

    fn state(&mut self) -> StateResult<State> {
        let version = self.dec.uvar()?;
        if version != VERSION {
            return Err(StateError::BadVersion {
                found: version,
                expected: VERSION,
            });
        }
        let entry = self.dec.opt_str()?;
        let result = self.opt_var()?;
        let budget = self.dec.i32()?;

        let count = self.dec.count()?;
        let mut statics = Vec::with_capacity(count);
        for _ in 0..count {
            let name = self.dec.str()?;
            let class = self.class(&name)?;
            let index = self.dec.usize()?;
            statics.push((class, index, self.var()?));
        }

        let stack = if self.dec.bool()? {
            let timer = self.dec.i32()?;
            let mut frames = Vec::new();
            loop {
                let secondary = match self.dec.u8()? {
                    FRAME_END => break,
                    FRAME_PRIMARY => false,
                    FRAME_SECONDARY => true,
                    _ => return Err(StateError::Corrupt("bad frame marker")),
                };
                frames.push(self.frame(secondary)?);
            }
            let result = self.opt_var()?;
            Some(ExecStack {
                frames,
                timer,
                timed: true,
                result,
                error: None,
            })
        } else {
            None
        };

        if !self.dec.is_empty() {
            return Err(StateError::Corrupt("trailing bytes"));
        }
        Ok(State {
            entry,
            result,
            budget,
            statics,
            stack,
        })
    }

    fn code(&self, key: &str) -> StateResult<Rc<Code>> {
        self.codes
            .get(key)
            .cloned()
            .or_else(|| self.env.public_by_key(key).and_then(|entry| entry.code()))
            .ok_or_else(|| StateError::UnknownCode(key.to_owned()))
    }

    fn class(&self, name: &str) -> StateResult<ClassId> {
        self.env
            .classes()
            .by_name(name)
            .ok_or_else(|| StateError::UnknownClass(name.to_owned()))
    }

    fn frame(&mut self, secondary: bool) -> StateResult<Frame> {
        let block = BlockKind::from_u8(self.dec.u8()?).ok_or(StateError::Corrupt("bad block kind"))?;
        let locked = self.dec.bool()?;
        let state = self.dec.i32()?;
        let step = self.dec.i32()?;
        let key = self.dec.str()?;
        let code = self.code(&key)?;
        let node = u32::try_from(self.dec.usize()?)
            .map(NodeId::new)
            .map_err(|_| StateError::Corrupt("node index out of range"))?;
        if code.get(node).is_none() {
            return Err(StateError::Corrupt("node index out of range"));
        }
        let locals = self.vars()?;
        let temps = self.vars()?;
        let result = self.opt_var()?;
        let pending = self.signal()?;
        Ok(Frame {
            code,
            node,
            block,
            secondary,
            state,
            step,
            locals,
            temps,
            result,
            locked,
            pending,
        })
    }

    fn signal(&mut self) -> StateResult<Option<Signal>> {
        let signal = match self.dec.u8()? {
            S_NONE => return Ok(None),
            S_BREAK => Signal::Break(self.dec.opt_str()?),
            S_CONTINUE => Signal::Continue(self.dec.opt_str()?),
            S_RETURN => Signal::Return(self.opt_var()?),
            S_ERROR => {
                let tag = self.dec.u8()?;
                let code = self.dec.i32()?;
                let kind = match tag {
                    E_THROW => RuntimeErrorKind::UserThrow(code),
                    E_NATIVE => RuntimeErrorKind::Native(code),
                    E_BUILTIN => RuntimeErrorKind::builtin(code)
                        .ok_or(StateError::Corrupt("unknown error code"))?,
                    _ => return Err(StateError::Corrupt("bad error tag")),
                };
                let start = self.span_offset()?;
                let end = self.span_offset()?;
                Signal::Error(RuntimeError::new(kind, Span::new(start, end)))
            }
            _ => return Err(StateError::Corrupt("bad signal tag")),
        };
        Ok(Some(signal))
    }

    fn span_offset(&mut self) -> StateResult<u32> {
        u32::try_from(self.dec.uvar()?).map_err(|_| StateError::Corrupt("span out of range"))
    }

    fn vars(&mut self) -> StateResult<Vec<Variable>> {
        let count = self.dec.count()?;
        let mut vars = Vec::with_capacity(count);
        for _ in 0..count {
            vars.push(self.var()?);
        }
        Ok(vars)
    }

    fn opt_var(&mut self) -> StateResult<Option<Variable>> {
        if self.dec.bool()? {
            self.var().map(Some)
        } else {
            Ok(None)
        }
    }

    fn var(&mut self) -> StateResult<Variable> {
        let header = self.dec.u8()?;
        let kind = (header & 0x1f)
            .checked_sub(1)
            .and_then(TypeKind::from_u8)
            .ok_or(StateError::Corrupt("bad type kind"))?;
        let is_static = header & 0x20 != 0;
        let protection =
            Protection::from_u8(header >> 6).ok_or(StateError::Corrupt("bad protection"))?;
        let name = self.dec.str()?;
        let ident = self.dec.uvar()?;
        let ty = self.type_tail(kind)?;
        let init = InitState::from_u8(self.dec.u8()?).ok_or(StateError::Corrupt("bad init state"))?;
        let value = cbot_stack::ensure_sufficient_stack(|| self.value())?;
        Ok(Variable {
            name,
            ident,
            ty,
            init,
            is_static,
            protection,
            value,
        })
    }

    fn ty(&mut self) -> StateResult<TypeDesc> {
        let kind = TypeKind::from_u8(self.dec.u8()?).ok_or(StateError::Corrupt("bad type kind"))?;
        self.type_tail(kind)
    }

    fn type_tail(&mut self, kind: TypeKind) -> StateResult<TypeDesc> {
        Ok(match kind {
            TypeKind::Pointer | TypeKind::Class | TypeKind::Intrinsic => {
                let name = self.dec.str()?;
                let class = self.class(&name)?;
                match kind {
                    TypeKind::Pointer => TypeDesc::pointer(class),
                    TypeKind::Class => TypeDesc::class(class),
                    _ => TypeDesc::intrinsic(class),
                }
            }
            TypeKind::ArrayPointer | TypeKind::ArrayBody => {
                let elem = self.ty()?;
                let limit = self.dec.i32()?;
                TypeDesc::array(elem, limit)
            }
            kind => TypeDesc::simple(kind),
        })
    }

    fn value(&mut self) -> StateResult<Value> {
        Ok(match self.dec.u8()? {
            V_VOID => Value::Void,
            V_NUMBER => Value::Number(self.number()?),
            V_BOOL => Value::Bool(self.dec.bool()?),
            V_STR => Value::Str(self.dec.str()?),
            V_POINTER => Value::Pointer(self.instance()?),
            V_ARRAY => Value::Array(self.array()?),
            V_INSTANCE => {
                let (class, name) = self.body_head()?;
                let members = self.vars()?;
                Value::Instance(Box::new(ClassBody {
                    class,
                    name,
                    members,
                }))
            }
            _ => return Err(StateError::Corrupt("bad value tag")),
        })
    }

    fn number(&mut self) -> StateResult<Number> {
        let kind = TypeKind::from_u8(self.dec.u8()?).ok_or(StateError::Corrupt("bad number kind"))?;
        Ok(match kind {
            TypeKind::Byte => Number::Byte(
                i8::try_from(self.dec.svar()?).map_err(|_| StateError::Corrupt("byte"))?,
            ),
            TypeKind::Short => Number::Short(
                i16::try_from(self.dec.svar()?).map_err(|_| StateError::Corrupt("short"))?,
            ),
            TypeKind::Char => {
                let raw = u32::try_from(self.dec.uvar()?).map_err(|_| StateError::Corrupt("char"))?;
                Number::Char(char::from_u32(raw).ok_or(StateError::Corrupt("char"))?)
            }
            TypeKind::Int => Number::Int(self.dec.i32()?),
            TypeKind::Long => Number::Long(self.dec.svar()?),
            TypeKind::Float => Number::Float(self.dec.f32()?),
            TypeKind::Double => Number::Double(self.dec.f64()?),
            _ => return Err(StateError::Corrupt("bad number kind")),
        })
    }

    /// Class and name of a serialized class body.
    fn body_head(&mut self) -> StateResult<(Option<ClassId>, Rc<str>)> {
        let has_class = self.dec.bool()?;
        let name = self.dec.str()?;
        let class = if has_class { Some(self.class(&name)?) } else { None };
        Ok((class, Rc::from(name)))
    }

    fn instance(&mut self) -> StateResult<Option<InstanceRef>> {
        let id = self.dec.uvar()?;
        if id == 0 {
            return Ok(None);
        }
        if let Some(instance) = self.instances.get(&id) {
            return Ok(Some(Rc::clone(instance)));
        }
        let flags = self.dec.u8()?;
        let (class, name) = self.body_head()?;
        let class = class.ok_or(StateError::Corrupt("heap instance without class"))?;
        let instance = self.env.heap().allocate(ClassBody::new(class, name, Vec::new()));
        self.instances.insert(id, Rc::clone(&instance));
        let members = self.vars()?;
        {
            let mut inst = instance.borrow_mut();
            inst.body.members = members;
            inst.constructed = flags & 1 != 0;
            inst.deleted = flags & 2 != 0;
        }
        Ok(Some(instance))
    }

    fn array(&mut self) -> StateResult<Option<ArrayRef>> {
        let id = self.dec.uvar()?;
        if id == 0 {
            return Ok(None);
        }
        if let Some(array) = self.arrays.get(&id) {
            return Ok(Some(Rc::clone(array)));
        }
        let elem = self.ty()?;
        let limit = self.dec.i32()?;
        let array = ArrayBody::new(elem, limit).shared();
        self.arrays.insert(id, Rc::clone(&array));
        let items = self.vars()?;
        array.borrow_mut().items = items;
        Ok(Some(array))
    }
}

#[cfg(test)]
mod tests;
