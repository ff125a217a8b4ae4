//! Class definitions and the class registry.
//!
//! A class is registered in two steps. The compiler's first pass defines it
//! (name, parent, member layout, method signatures) so that any function or
//! class can refer to it regardless of declaration order; the second pass
//! fills in member initializers and method bodies.
//!
//! Instance layout is the flattened list of non-static members along the
//! inheritance chain, parent members first. A member's index in that list is
//! therefore valid for every subclass, which is what lets the compiler bind
//! member accesses to plain indices.

use std::cell::RefCell;
use std::rc::Rc;

use cbot_diagnostic::CompileErrorKind;
use cbot_ir::{ClassId, Code, FunctionEntry, Protection, Signature, TypeDesc, TypeKind};
use rustc_hash::FxHashMap;

use crate::{ClassBody, ClassLock, NativeMethod, ProgramId, UpdateFn, Value, Variable};

/// A member variable declaration.
#[derive(Clone, Debug)]
pub struct MemberDecl {
    pub name: String,
    /// Registry-unique identifier, carried by every instance's copy.
    pub ident: u64,
    pub ty: TypeDesc,
    pub protection: Protection,
    pub is_static: bool,
    /// Declarator evaluated at construction time (default value, array
    /// sizes, nested construction). `None` means the type's default.
    pub init: Option<Rc<Code>>,
}

/// Body of a method: compiled script or host native.
#[derive(Clone, Debug)]
pub enum MethodBody {
    Script(Rc<FunctionEntry>),
    Native(NativeMethod),
}

#[derive(Clone, Debug)]
pub struct MethodEntry {
    pub name: String,
    /// Key unique within the class (`Name::f(int)`); natives use their name.
    pub key: String,
    pub body: MethodBody,
}

impl MethodEntry {
    /// Script signature, `None` for natives (their checker decides).
    pub fn signature(&self) -> Option<&Signature> {
        match &self.body {
            MethodBody::Script(entry) => Some(&entry.sig),
            MethodBody::Native(_) => None,
        }
    }
}

pub struct ClassDef {
    pub id: ClassId,
    pub name: Rc<str>,
    pub parent: Option<ClassId>,
    pub intrinsic: bool,
    pub public: bool,
    /// Program that declared it; `None` for host classes.
    pub owner: Option<ProgramId>,
    /// Own members in declaration order, statics included.
    pub members: Vec<MemberDecl>,
    pub methods: Vec<MethodEntry>,
    /// Static member storage, created lazily on first access.
    pub statics: FxHashMap<usize, Rc<RefCell<Variable>>>,
    pub update: Option<UpdateFn>,
    pub lock: ClassLock,
    /// Bodies compiled (second pass done).
    pub compiled: bool,
}

impl ClassDef {
    pub fn own_member(&self, name: &str) -> Option<(usize, &MemberDecl)> {
        self.members.iter().enumerate().find(|(_, m)| m.name == name)
    }

    pub fn methods_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MethodEntry> {
        self.methods.iter().filter(move |m| m.name == name)
    }

    pub fn method(&self, key: &str) -> Option<&MethodEntry> {
        self.methods.iter().find(|m| m.key == key)
    }

    /// Destructor declared by this class (`~Name`).
    pub fn destructor(&self) -> Option<&MethodEntry> {
        let name = format!("~{}", self.name);
        self.methods.iter().find(|m| m.name == name)
    }
}

impl std::fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassDef")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("members", &self.members.len())
            .field("methods", &self.methods.len())
            .finish_non_exhaustive()
    }
}

/// A member found through the layout of a class.
#[derive(Clone, Debug)]
pub struct FieldRef {
    /// Index in the flattened instance layout.
    pub index: usize,
    /// Class that declares the member.
    pub owner: ClassId,
    pub decl: MemberDecl,
}

/// All classes of one environment.
#[derive(Default)]
pub struct ClassRegistry {
    classes: Vec<Option<ClassDef>>,
    by_name: FxHashMap<Rc<str>, ClassId>,
    next_member_ident: u64,
}

impl ClassRegistry {
    pub fn new() -> Self {
        ClassRegistry::default()
    }

    /// Register a class name. Names are unique per environment.
    pub fn define(
        &mut self,
        name: &str,
        parent: Option<ClassId>,
        intrinsic: bool,
        public: bool,
        owner: Option<ProgramId>,
    ) -> Result<ClassId, CompileErrorKind> {
        if self.by_name.contains_key(name) {
            return Err(CompileErrorKind::RedefClass);
        }
        let id = ClassId::new(self.classes.len() as u32);
        let name: Rc<str> = Rc::from(name);
        tracing::debug!(class = %name, id = id.raw(), "define class");
        self.classes.push(Some(ClassDef {
            id,
            name: Rc::clone(&name),
            parent,
            intrinsic,
            public,
            owner,
            members: Vec::new(),
            methods: Vec::new(),
            statics: FxHashMap::default(),
            update: None,
            lock: ClassLock::new(),
            compiled: false,
        }));
        self.by_name.insert(name, id);
        Ok(id)
    }

    pub fn get(&self, id: ClassId) -> Option<&ClassDef> {
        self.classes.get(id.index()).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: ClassId) -> Option<&mut ClassDef> {
        self.classes.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub fn by_name(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, id: ClassId) -> Option<Rc<str>> {
        self.get(id).map(|c| Rc::clone(&c.name))
    }

    pub fn remove(&mut self, id: ClassId) -> Option<ClassDef> {
        let def = self.classes.get_mut(id.index())?.take()?;
        self.by_name.remove(&def.name);
        tracing::debug!(class = %def.name, "remove class");
        Some(def)
    }

    /// Remove every class declared by `program`.
    pub fn remove_owned(&mut self, program: ProgramId) -> Vec<ClassDef> {
        let ids: Vec<ClassId> = self
            .iter()
            .filter(|c| c.owner == Some(program))
            .map(|c| c.id)
            .collect();
        ids.into_iter().filter_map(|id| self.remove(id)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassDef> {
        self.classes.iter().flatten()
    }

    /// The class followed by its ancestors, nearest first.
    pub fn ancestors(&self, id: ClassId) -> Vec<ClassId> {
        let mut chain = Vec::new();
        let mut cur = Some(id);
        while let Some(c) = cur {
            // A broken or cyclic chain stops at the first repeat.
            if chain.contains(&c) {
                break;
            }
            let Some(def) = self.get(c) else { break };
            chain.push(c);
            cur = def.parent;
        }
        chain
    }

    pub fn is_child_of(&self, child: ClassId, ancestor: ClassId) -> bool {
        self.ancestors(child).contains(&ancestor)
    }

    /// Register a member on a class.
    pub fn add_item(&mut self, class: ClassId, mut decl: MemberDecl) -> Result<u64, CompileErrorKind> {
        self.next_member_ident += 1;
        let ident = self.next_member_ident;
        let def = self.get_mut(class).ok_or(CompileErrorKind::UndefClass)?;
        if def.own_member(&decl.name).is_some() {
            return Err(CompileErrorKind::RedefVar);
        }
        decl.ident = ident;
        def.members.push(decl);
        Ok(ident)
    }

    /// Register a native method on a class.
    pub fn add_function(
        &mut self,
        class: ClassId,
        name: &str,
        method: NativeMethod,
    ) -> Result<(), CompileErrorKind> {
        let def = self.get_mut(class).ok_or(CompileErrorKind::UndefClass)?;
        def.methods.push(MethodEntry {
            name: name.to_owned(),
            key: name.to_owned(),
            body: MethodBody::Native(method),
        });
        Ok(())
    }

    /// Instance members parent-first, with the declaring class.
    pub fn layout(&self, id: ClassId) -> Vec<(ClassId, &MemberDecl)> {
        let mut chain = self.ancestors(id);
        chain.reverse();
        chain
            .into_iter()
            .filter_map(|c| self.get(c))
            .flat_map(|def| {
                def.members
                    .iter()
                    .filter(|m| !m.is_static)
                    .map(move |m| (def.id, m))
            })
            .collect()
    }

    /// Instance member by name; the nearest declaration wins.
    pub fn field(&self, id: ClassId, name: &str) -> Option<FieldRef> {
        self.layout(id)
            .into_iter()
            .enumerate()
            .rev()
            .find(|(_, (_, m))| m.name == name)
            .map(|(index, (owner, decl))| FieldRef {
                index,
                owner,
                decl: decl.clone(),
            })
    }

    /// Static member by name along the chain: `(declaring class, own index)`.
    pub fn static_member(&self, id: ClassId, name: &str) -> Option<(ClassId, usize, MemberDecl)> {
        self.ancestors(id).into_iter().find_map(|c| {
            let def = self.get(c)?;
            let (index, decl) = def.own_member(name)?;
            decl.is_static.then(|| (c, index, decl.clone()))
        })
    }

    /// Storage cell of a static member, if already initialized.
    pub fn static_slot(&self, class: ClassId, index: usize) -> Option<Rc<RefCell<Variable>>> {
        self.get(class)?.statics.get(&index).cloned()
    }

    pub fn set_static(&mut self, class: ClassId, index: usize, value: Variable) -> Option<Rc<RefCell<Variable>>> {
        let def = self.get_mut(class)?;
        let cell = Rc::new(RefCell::new(value));
        def.statics.insert(index, Rc::clone(&cell));
        Some(cell)
    }

    /// Nearest destructor along the chain.
    pub fn destructor(&self, id: ClassId) -> Option<(ClassId, MethodEntry)> {
        self.ancestors(id)
            .into_iter()
            .find_map(|c| Some((c, self.get(c)?.destructor()?.clone())))
    }

    /// Method by key in exactly `class`.
    pub fn method(&self, class: ClassId, key: &str) -> Option<MethodEntry> {
        self.get(class)?.method(key).cloned()
    }

    /// A variable of type `ty` with its default value. Intrinsic bodies get
    /// their members (default values only) recursively.
    pub fn create_variable(&self, name: &str, ty: &TypeDesc) -> Variable {
        let mut var = Variable::create(name, ty.clone());
        if ty.kind() == TypeKind::Intrinsic {
            if let Some(class) = ty.class_id() {
                var.value = Value::Instance(Box::new(self.default_body(class, 0)));
            }
        }
        var
    }

    fn default_body(&self, class: ClassId, depth: usize) -> ClassBody {
        let name = self.name(class).unwrap_or_else(|| Rc::from("?"));
        let members = self
            .layout(class)
            .into_iter()
            .map(|(_, decl)| {
                let mut var = if depth < MAX_INTRINSIC_DEPTH && decl.ty.kind() == TypeKind::Intrinsic {
                    let mut var = Variable::create(decl.name.clone(), decl.ty.clone());
                    if let Some(c) = decl.ty.class_id() {
                        var.value = Value::Instance(Box::new(self.default_body(c, depth + 1)));
                    }
                    var
                } else {
                    Variable::create(decl.name.clone(), decl.ty.clone())
                };
                var.ident = decl.ident;
                var.protection = decl.protection;
                var
            })
            .collect();
        ClassBody::new(class, name, members)
    }

    /// Release every lock held or awaited by `program`.
    pub fn free_locks(&mut self, program: ProgramId) {
        for def in self.classes.iter_mut().flatten() {
            def.lock.free(program);
        }
    }
}

/// Guard against self-embedding intrinsic classes.
const MAX_INTRINSIC_DEPTH: usize = 16;

#[cfg(test)]
mod tests;
