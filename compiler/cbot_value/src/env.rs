//! The interpreter environment.
//!
//! Everything that programs share lives here instead of in process-wide
//! statics: defined numeric constants, native functions, classes, public
//! functions, the instance heap. Programs that should see each other's
//! public classes and functions are created from the same `Rc<Environment>`.
//!
//! The environment is single-threaded (`!Send`); hosts running interpreters
//! on several threads give each thread its own environment.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use cbot_diagnostic::CompileErrorKind;
use cbot_ir::{ClassId, FunctionEntry, Protection, TypeDesc};
use rustc_hash::FxHashMap;

use crate::{ClassRegistry, Heap, MemberDecl, NativeFunction, NativeMethod, UpdateFn};

/// Maximum depth of an execution stack.
pub const MAX_STACK_DEPTH: usize = 1000;
/// Maximum number of programs queued on one class lock.
pub const LOCK_QUEUE_LEN: usize = 5;
/// Steps per `run` when the host never set a budget.
pub const DEFAULT_BUDGET: i32 = 10_000;

/// Identifies a program within its environment.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(u32);

impl ProgramId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        ProgramId(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "program#{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EnvConfig {
    pub max_stack_depth: usize,
    pub lock_queue_len: usize,
    pub default_budget: i32,
}

impl Default for EnvConfig {
    fn default() -> Self {
        EnvConfig {
            max_stack_depth: MAX_STACK_DEPTH,
            lock_queue_len: LOCK_QUEUE_LEN,
            default_budget: DEFAULT_BUDGET,
        }
    }
}

pub struct Environment {
    config: EnvConfig,
    heap: Rc<Heap>,
    defines: RefCell<FxHashMap<String, i64>>,
    natives: RefCell<FxHashMap<String, NativeFunction>>,
    classes: RefCell<ClassRegistry>,
    publics: RefCell<Vec<Rc<FunctionEntry>>>,
    next_program: Cell<u32>,
}

impl Environment {
    /// An empty environment: no natives, no classes.
    pub fn new() -> Rc<Environment> {
        Environment::with_config(EnvConfig::default())
    }

    pub fn with_config(config: EnvConfig) -> Rc<Environment> {
        Rc::new(Environment {
            config,
            heap: Heap::new(),
            defines: RefCell::default(),
            natives: RefCell::default(),
            classes: RefCell::default(),
            publics: RefCell::default(),
            next_program: Cell::new(0),
        })
    }

    #[inline]
    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    #[inline]
    pub fn heap(&self) -> &Rc<Heap> {
        &self.heap
    }

    pub fn next_program_id(&self) -> ProgramId {
        let id = self.next_program.get() + 1;
        self.next_program.set(id);
        ProgramId::new(id)
    }

    // Defined constants

    /// Make `name` a numeric constant for programs compiled from now on.
    pub fn define_num(&self, name: &str, value: i64) -> bool {
        if cbot_ir::Kw::keyword(name).is_some() {
            return false;
        }
        self.defines.borrow_mut().insert(name.to_owned(), value);
        true
    }

    pub fn clear_define_num(&self) {
        self.defines.borrow_mut().clear();
    }

    pub fn defined(&self, name: &str) -> Option<i64> {
        self.defines.borrow().get(name).copied()
    }

    // Natives

    /// Register a free native; a later registration under the same name
    /// replaces the earlier one.
    pub fn add_function(&self, native: NativeFunction) {
        tracing::debug!(name = %native.name, "register native");
        self.natives.borrow_mut().insert(native.name.clone(), native);
    }

    pub fn native(&self, name: &str) -> Option<NativeFunction> {
        self.natives.borrow().get(name).cloned()
    }

    // Classes

    pub fn classes(&self) -> Ref<'_, ClassRegistry> {
        self.classes.borrow()
    }

    pub fn classes_mut(&self) -> RefMut<'_, ClassRegistry> {
        self.classes.borrow_mut()
    }

    /// Register a host class.
    pub fn add_class(
        &self,
        name: &str,
        parent: Option<ClassId>,
        intrinsic: bool,
    ) -> Result<ClassId, CompileErrorKind> {
        self.classes.borrow_mut().define(name, parent, intrinsic, true, None)
    }

    /// Add a member variable to a host class.
    pub fn add_item(
        &self,
        class: ClassId,
        name: &str,
        ty: TypeDesc,
        protection: Protection,
    ) -> Result<u64, CompileErrorKind> {
        self.classes.borrow_mut().add_item(
            class,
            MemberDecl {
                name: name.to_owned(),
                ident: 0,
                ty,
                protection,
                is_static: false,
                init: None,
            },
        )
    }

    /// Add a native method to a host class.
    pub fn add_method(&self, class: ClassId, name: &str, method: NativeMethod) -> Result<(), CompileErrorKind> {
        self.classes.borrow_mut().add_function(class, name, method)
    }

    pub fn set_update(&self, class: ClassId, update: UpdateFn) -> bool {
        match self.classes.borrow_mut().get_mut(class) {
            Some(def) => {
                def.update = Some(update);
                true
            }
            None => false,
        }
    }

    // Public functions

    /// Publish a function to every program of this environment.
    pub fn add_public(&self, entry: Rc<FunctionEntry>) -> Result<(), CompileErrorKind> {
        let mut publics = self.publics.borrow_mut();
        if publics.iter().any(|p| p.key == entry.key) {
            return Err(CompileErrorKind::RedefFunc);
        }
        publics.push(entry);
        Ok(())
    }

    pub fn publics_named(&self, name: &str) -> Vec<Rc<FunctionEntry>> {
        self.publics
            .borrow()
            .iter()
            .filter(|p| p.sig.name == name)
            .cloned()
            .collect()
    }

    pub fn public_by_key(&self, key: &str) -> Option<Rc<FunctionEntry>> {
        self.publics.borrow().iter().find(|p| p.key == key).cloned()
    }

    /// Withdraw everything `program` published and release its locks.
    pub fn unregister_program(&self, program: ProgramId) {
        self.publics
            .borrow_mut()
            .retain(|p| p.owner != program.raw());
        let mut classes = self.classes.borrow_mut();
        classes.free_locks(program);
        let removed = classes.remove_owned(program);
        drop(classes);
        if !removed.is_empty() {
            tracing::debug!(%program, count = removed.len(), "unregistered classes");
        }
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("config", &self.config)
            .field("natives", &self.natives.borrow().len())
            .field("publics", &self.publics.borrow().len())
            .finish_non_exhaustive()
    }
}
