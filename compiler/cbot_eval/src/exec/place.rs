//! Resolving assignable locations.
//!
//! A [`Place`] is resolved one access step at a time. Every hop into a heap
//! object clones its `Rc` and releases the previous borrow, so a path may
//! pass through the same instance twice (`a.next.x` with `a.next == a`).
//! Intrinsic bodies have no handle of their own; hops into them are kept as
//! an inline member path under the last handle.

use std::cell::RefCell;
use std::rc::Rc;

use cbot_diagnostic::RuntimeErrorKind;
use cbot_ir::{Access, AccessRoot, AccessStep, ClassId, TypeDesc, NO_LIMIT};
use cbot_value::{ArrayBody, ArrayRef, InstanceRef, Value, Variable};
use smallvec::SmallVec;

use super::{next_child, Exec, Outcome};
use crate::stack::{BlockKind, Frame};

type PlaceResult<T> = Result<T, RuntimeErrorKind>;

#[derive(Debug)]
enum Slot {
    /// Local of the running frame.
    Current(usize),
    /// Local of frame `.0` below it.
    Below(usize, usize),
    Static(Rc<RefCell<Variable>>),
    /// A computed value; writes through it are lost.
    Temp(Variable),
    Member(InstanceRef, usize),
    Element(ArrayRef, usize),
}

#[derive(Debug)]
pub(crate) struct Place {
    slot: Slot,
    inline: SmallVec<[usize; 2]>,
}

enum Hop {
    Instance(InstanceRef),
    Inline,
}

/// Find local `ident`, searching down to the enclosing function frame.
fn find_local(frame: &Frame, below: &[Frame], ident: u64) -> Option<Slot> {
    if let Some(pos) = frame.local(ident) {
        return Some(Slot::Current(pos));
    }
    if frame.block == BlockKind::Function {
        return None;
    }
    for (depth, f) in below.iter().enumerate().rev() {
        if let Some(pos) = f.local(ident) {
            return Some(Slot::Below(depth, pos));
        }
        if f.block == BlockKind::Function {
            break;
        }
    }
    None
}

fn descend<R>(
    mut var: &mut Variable,
    inline: &[usize],
    f: impl FnOnce(&mut Variable) -> R,
) -> PlaceResult<R> {
    for &index in inline {
        var = match &mut var.value {
            Value::Instance(body) => body
                .members
                .get_mut(index)
                .ok_or(RuntimeErrorKind::NotClass)?,
            _ => return Err(RuntimeErrorKind::NotClass),
        };
    }
    Ok(f(var))
}

/// Run `f` on the variable at `place`.
pub(crate) fn with_var<R>(
    frame: &mut Frame,
    below: &mut [Frame],
    place: &mut Place,
    f: impl FnOnce(&mut Variable) -> R,
) -> PlaceResult<R> {
    let inline = &place.inline;
    match &mut place.slot {
        Slot::Current(pos) => {
            let var = frame.locals.get_mut(*pos).ok_or(RuntimeErrorKind::NotInit)?;
            descend(var, inline, f)
        }
        Slot::Below(depth, pos) => {
            let var = below
                .get_mut(*depth)
                .and_then(|fr| fr.locals.get_mut(*pos))
                .ok_or(RuntimeErrorKind::NotInit)?;
            descend(var, inline, f)
        }
        Slot::Static(cell) => descend(&mut cell.borrow_mut(), inline, f),
        Slot::Temp(var) => descend(var, inline, f),
        Slot::Member(instance, index) => {
            let mut instance = instance.borrow_mut();
            let var = instance
                .body
                .members
                .get_mut(*index)
                .ok_or(RuntimeErrorKind::NotClass)?;
            descend(var, inline, f)
        }
        Slot::Element(array, index) => {
            let mut array = array.borrow_mut();
            let var = array
                .items
                .get_mut(*index)
                .ok_or(RuntimeErrorKind::OutArray)?;
            descend(var, inline, f)
        }
    }
}

impl Exec<'_> {
    /// Evaluate the operands of `access` (root value, indices) in order.
    pub(crate) fn access_operands(frame: &mut Frame, access: &Access) -> Option<Outcome> {
        let operands = access.operands();
        next_child(frame, &operands, 0)
    }

    /// Resolve `access` using the operand values in `operands`. With
    /// `write`, array indices past the end grow the array.
    pub(crate) fn resolve(
        &mut self,
        frame: &mut Frame,
        below: &mut [Frame],
        access: &Access,
        operands: &[Variable],
        write: bool,
    ) -> PlaceResult<Place> {
        let mut values = operands.iter();
        let slot = match access.root {
            AccessRoot::Local(ident) => {
                find_local(frame, below, ident).ok_or(RuntimeErrorKind::NotInit)?
            }
            AccessRoot::This => find_local(frame, below, 0).ok_or(RuntimeErrorKind::Null)?,
            AccessRoot::Static { class, index } => Slot::Static(self.static_cell(class, index)?),
            AccessRoot::Value(_) => {
                Slot::Temp(values.next().cloned().ok_or(RuntimeErrorKind::NotInit)?)
            }
        };
        let mut place = Place {
            slot,
            inline: SmallVec::new(),
        };

        let last = access.steps.len();
        for (i, step) in access.steps.iter().enumerate() {
            match step {
                AccessStep::Field { index, .. } => {
                    let hop = with_var(frame, below, &mut place, |v| match &v.value {
                        Value::Pointer(Some(instance)) => Ok(Hop::Instance(Rc::clone(instance))),
                        Value::Pointer(None) => Err(RuntimeErrorKind::Null),
                        Value::Instance(_) => Ok(Hop::Inline),
                        _ => Err(RuntimeErrorKind::NotClass),
                    })??;
                    match hop {
                        Hop::Instance(instance) => {
                            self.touch(&instance)?;
                            place = Place {
                                slot: Slot::Member(instance, *index),
                                inline: SmallVec::new(),
                            };
                        }
                        Hop::Inline => place.inline.push(*index),
                    }
                }
                AccessStep::Index(_) => {
                    let index = values.next().ok_or(RuntimeErrorKind::NotInit)?;
                    if !index.is_defined() {
                        return Err(RuntimeErrorKind::NotInit);
                    }
                    let index = index.as_i64().ok_or(RuntimeErrorKind::NotInit)?;
                    let array = with_var(frame, below, &mut place, |v| match &v.value {
                        Value::Array(Some(array)) => Ok(Rc::clone(array)),
                        Value::Array(None) => Err(RuntimeErrorKind::Null),
                        _ => Err(RuntimeErrorKind::OutArray),
                    })??;
                    let pos = element(&array, index, write, i + 1 < last)?;
                    place = Place {
                        slot: Slot::Element(array, pos),
                        inline: SmallVec::new(),
                    };
                }
            }
        }
        Ok(place)
    }

    /// Read the value at `access`.
    pub(crate) fn read(
        &mut self,
        frame: &mut Frame,
        below: &mut [Frame],
        access: &Access,
        operands: &[Variable],
    ) -> PlaceResult<Variable> {
        let mut place = self.resolve(frame, below, access, operands, false)?;
        with_var(frame, below, &mut place, |v| v.clone())
    }

    /// Host checks before a member of `instance` is used: deleted objects
    /// fail, and the class's update callback refreshes the body.
    pub(crate) fn touch(&mut self, instance: &InstanceRef) -> PlaceResult<()> {
        let (class, deleted) = {
            let inst = instance.borrow();
            (inst.class(), inst.deleted)
        };
        if deleted {
            return Err(RuntimeErrorKind::DeletedPtr);
        }
        let Some(class) = class else {
            return Ok(());
        };
        let update = {
            let classes = self.env.classes();
            classes
                .ancestors(class)
                .into_iter()
                .find_map(|c| classes.get(c).and_then(|d| d.update.clone()))
        };
        if let Some(update) = update {
            update(&mut instance.borrow_mut().body, &mut *self.user);
        }
        Ok(())
    }

    /// Storage of static member `index` of `class`, created and initialized
    /// on first use.
    pub(crate) fn static_cell(
        &mut self,
        class: ClassId,
        index: usize,
    ) -> PlaceResult<Rc<RefCell<Variable>>> {
        if let Some(cell) = self.env.classes().static_slot(class, index) {
            return Ok(cell);
        }
        let decl = self
            .env
            .classes()
            .get(class)
            .and_then(|def| def.members.get(index).cloned())
            .ok_or(RuntimeErrorKind::NotClass)?;
        let mut var = self.default_var(&decl.name, &decl.ty);
        var.ident = decl.ident;
        var.protection = decl.protection;
        var.is_static = true;
        // Claim the slot first so a self-referencing initializer terminates.
        self.env.classes_mut().set_static(class, index, var.clone());
        if let Some(code) = decl.init {
            match self.run_isolated(code, Vec::new()) {
                Ok(Some(value)) => var.assign_owned(value),
                Ok(None) => {}
                Err(err) => return Err(err.kind),
            }
        }
        self.env
            .classes_mut()
            .set_static(class, index, var)
            .ok_or(RuntimeErrorKind::NotClass)
    }
}

/// Position of element `index`, growing the array for writes. An
/// intermediate element of array type is created on the way.
fn element(array: &ArrayRef, index: i64, write: bool, more: bool) -> PlaceResult<usize> {
    let mut body = array.borrow_mut();
    if !write {
        body.get(index)?;
        return usize::try_from(index).map_err(|_| RuntimeErrorKind::OutArray);
    }
    let elem = body.get_mut_or_grow(index)?;
    if more {
        if let (Value::Array(None), Some(inner)) = (&elem.value, elem.ty.elem()) {
            let inner = ArrayBody::new(inner.clone(), NO_LIMIT).shared();
            elem.set_array(Some(inner));
        }
    }
    usize::try_from(index).map_err(|_| RuntimeErrorKind::OutArray)
}

/// Element type of an array type, `void` otherwise.
pub(crate) fn elem_type(ty: &TypeDesc) -> TypeDesc {
    ty.elem().cloned().unwrap_or_default()
}
