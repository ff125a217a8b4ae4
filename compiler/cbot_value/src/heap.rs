//! Heap objects: class instances and arrays.
//!
//! Both are shared through `Rc<RefCell<_>>`; the `Rc` strong count is the
//! reference count. When the last reference to a class instance goes away
//! and a constructor ran on it, the instance is not simply freed: its
//! members move into an [`Orphan`] on the [`Heap`]'s finalizer queue, and the
//! executor later resurrects it to run the `~Name` destructor exactly once.
//!
//! Reference cycles are not collected.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use cbot_diagnostic::RuntimeErrorKind;
use cbot_ir::{ClassId, TypeDesc};
use rustc_hash::FxHashMap;

use crate::Variable;

pub type InstanceRef = Rc<RefCell<ClassInstance>>;
pub type ArrayRef = Rc<RefCell<ArrayBody>>;

/// Class name used for bodies whose class is unknown.
const NO_CLASS: &str = "?";

/// Members of one class instance, parent members first.
#[derive(Clone, Debug)]
pub struct ClassBody {
    pub class: Option<ClassId>,
    pub name: Rc<str>,
    pub members: Vec<Variable>,
}

impl ClassBody {
    pub fn new(class: ClassId, name: Rc<str>, members: Vec<Variable>) -> Self {
        ClassBody {
            class: Some(class),
            name,
            members,
        }
    }

    pub(crate) fn empty(class: Option<ClassId>) -> Self {
        ClassBody {
            class,
            name: Rc::from(NO_CLASS),
            members: Vec::new(),
        }
    }

    pub fn member(&self, name: &str) -> Option<&Variable> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn member_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.members.iter_mut().find(|m| m.name == name)
    }
}

impl fmt::Display for ClassBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, m) in self.members.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={m}", m.name)?;
        }
        f.write_str(")")
    }
}

/// Backing store of an array variable.
#[derive(Clone, Debug)]
pub struct ArrayBody {
    pub elem: TypeDesc,
    /// Maximum length, or `NO_LIMIT`.
    pub limit: i32,
    pub items: Vec<Variable>,
}

impl ArrayBody {
    pub fn new(elem: TypeDesc, limit: i32) -> Self {
        ArrayBody {
            elem,
            limit,
            items: Vec::new(),
        }
    }

    pub fn shared(self) -> ArrayRef {
        Rc::new(RefCell::new(self))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn in_limit(&self, index: usize) -> bool {
        usize::try_from(self.limit).map_or(true, |limit| index < limit)
    }

    /// Element for reading; out of range is `OutArray`.
    pub fn get(&self, index: i64) -> Result<&Variable, RuntimeErrorKind> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.items.get(i))
            .ok_or(RuntimeErrorKind::OutArray)
    }

    /// Element for writing. Writing past the end grows the array up to its
    /// limit, filling the gap with uninitialized elements.
    pub fn get_mut_or_grow(&mut self, index: i64) -> Result<&mut Variable, RuntimeErrorKind> {
        let i = usize::try_from(index).map_err(|_| RuntimeErrorKind::OutArray)?;
        if !self.in_limit(i) {
            return Err(RuntimeErrorKind::OutArray);
        }
        while self.items.len() <= i {
            let elem = Variable::create(format!("[{}]", self.items.len()), self.elem.clone());
            self.items.push(elem);
        }
        Ok(&mut self.items[i])
    }

    /// Append an element; fails past the limit.
    pub fn push(&mut self, item: Variable) -> Result<(), RuntimeErrorKind> {
        if !self.in_limit(self.items.len()) {
            return Err(RuntimeErrorKind::OutArray);
        }
        self.items.push(item);
        Ok(())
    }
}

/// A heap class instance.
pub struct ClassInstance {
    pub body: ClassBody,
    id: u64,
    /// A constructor ran, so a destructor is owed.
    pub constructed: bool,
    /// The destructor has been scheduled or has run.
    pub destructed: bool,
    /// The host destroyed the underlying entity; access is `DeletedPtr`.
    pub deleted: bool,
    heap: Weak<Heap>,
}

impl ClassInstance {
    /// Process-unique instance id.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn class(&self) -> Option<ClassId> {
        self.body.class
    }
}

impl fmt::Debug for ClassInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.body.name, self.id)
    }
}

impl Drop for ClassInstance {
    fn drop(&mut self) {
        let Some(heap) = self.heap.upgrade() else {
            return;
        };
        heap.forget(self.id);
        if self.constructed && !self.destructed {
            let body = ClassBody {
                class: self.body.class,
                name: Rc::clone(&self.body.name),
                members: std::mem::take(&mut self.body.members),
            };
            heap.enqueue(Orphan { id: self.id, body });
        }
    }
}

/// An unreachable instance still owed a destructor call.
#[derive(Debug)]
pub struct Orphan {
    pub id: u64,
    pub body: ClassBody,
}

/// Instance allocator, live-instance registry and finalizer queue.
#[derive(Default)]
pub struct Heap {
    next_id: Cell<u64>,
    live: RefCell<FxHashMap<u64, Weak<RefCell<ClassInstance>>>>,
    orphans: RefCell<VecDeque<Orphan>>,
}

impl Heap {
    pub fn new() -> Rc<Heap> {
        Rc::new(Heap::default())
    }

    fn fresh_id(&self) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }

    fn register(self: &Rc<Self>, id: u64, instance: ClassInstance) -> InstanceRef {
        let shared = Rc::new(RefCell::new(instance));
        self.live.borrow_mut().insert(id, Rc::downgrade(&shared));
        shared
    }

    /// Allocate a new instance with a fresh id.
    pub fn allocate(self: &Rc<Self>, body: ClassBody) -> InstanceRef {
        let id = self.fresh_id();
        tracing::trace!(id, class = %body.name, "allocate instance");
        self.register(
            id,
            ClassInstance {
                body,
                id,
                constructed: false,
                destructed: false,
                deleted: false,
                heap: Rc::downgrade(self),
            },
        )
    }

    /// Bring an orphan back to life so its destructor can run. The result
    /// will not be queued again.
    pub fn resurrect(self: &Rc<Self>, orphan: Orphan) -> InstanceRef {
        self.register(
            orphan.id,
            ClassInstance {
                body: orphan.body,
                id: orphan.id,
                constructed: true,
                destructed: true,
                deleted: false,
                heap: Rc::downgrade(self),
            },
        )
    }

    fn forget(&self, id: u64) {
        if let Ok(mut live) = self.live.try_borrow_mut() {
            live.remove(&id);
        }
    }

    fn enqueue(&self, orphan: Orphan) {
        if let Ok(mut orphans) = self.orphans.try_borrow_mut() {
            orphans.push_back(orphan);
        } else {
            tracing::warn!(id = orphan.id, "finalizer queue busy, destructor skipped");
        }
    }

    /// Live instance by id.
    pub fn find(&self, id: u64) -> Option<InstanceRef> {
        self.live.borrow().get(&id).and_then(Weak::upgrade)
    }

    /// Mark an instance as destroyed by the host.
    pub fn delete(&self, id: u64) -> bool {
        let Some(instance) = self.find(id) else {
            return false;
        };
        let Ok(mut instance) = instance.try_borrow_mut() else {
            return false;
        };
        instance.deleted = true;
        true
    }

    pub fn live_count(&self) -> usize {
        self.live.borrow().len()
    }

    pub fn has_orphans(&self) -> bool {
        !self.orphans.borrow().is_empty()
    }

    pub fn take_orphan(&self) -> Option<Orphan> {
        self.orphans.borrow_mut().pop_front()
    }

    /// Drop queued orphans without running their destructors.
    pub fn discard_orphans(&self) -> usize {
        let drained: Vec<Orphan> = self.orphans.borrow_mut().drain(..).collect();
        drained.len()
    }
}
