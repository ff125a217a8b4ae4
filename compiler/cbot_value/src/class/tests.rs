use super::*;
use pretty_assertions::assert_eq;

fn member(name: &str, ty: TypeDesc) -> MemberDecl {
    MemberDecl {
        name: name.to_owned(),
        ident: 0,
        ty,
        protection: Protection::Public,
        is_static: false,
        init: None,
    }
}

fn registry_with_chain() -> (ClassRegistry, ClassId, ClassId) {
    let mut reg = ClassRegistry::new();
    let a = reg.define("A", None, false, false, None).unwrap_or_else(|e| panic!("{e}"));
    let b = reg.define("B", Some(a), false, false, None).unwrap_or_else(|e| panic!("{e}"));
    for (class, decl) in [
        (a, member("x", TypeDesc::INT)),
        (a, member("y", TypeDesc::INT)),
        (b, member("z", TypeDesc::STRING)),
    ] {
        assert!(reg.add_item(class, decl).is_ok());
    }
    (reg, a, b)
}

#[test]
fn names_are_unique() {
    let mut reg = ClassRegistry::new();
    assert!(reg.define("A", None, false, false, None).is_ok());
    assert_eq!(
        reg.define("A", None, false, false, None).err(),
        Some(CompileErrorKind::RedefClass)
    );
}

#[test]
fn inheritance_queries() {
    let (reg, a, b) = registry_with_chain();
    assert!(reg.is_child_of(b, a));
    assert!(reg.is_child_of(a, a));
    assert!(!reg.is_child_of(a, b));
    assert_eq!(reg.ancestors(b), vec![b, a]);
}

#[test]
fn layout_is_parent_first() {
    let (reg, _, b) = registry_with_chain();
    let names: Vec<&str> = reg.layout(b).iter().map(|(_, m)| m.name.as_str()).collect();
    assert_eq!(names, vec!["x", "y", "z"]);
    let z = reg.field(b, "z").map(|f| f.index);
    assert_eq!(z, Some(2));
    let y = reg.field(b, "y").map(|f| (f.index, f.owner));
    assert_eq!(y.map(|(i, _)| i), Some(1));
}

#[test]
fn member_idents_are_distinct() {
    let (reg, _, b) = registry_with_chain();
    let mut idents: Vec<u64> = reg.layout(b).iter().map(|(_, m)| m.ident).collect();
    idents.dedup();
    assert_eq!(idents.len(), 3);
}

#[test]
fn redefined_member() {
    let (mut reg, a, _) = registry_with_chain();
    assert_eq!(
        reg.add_item(a, member("x", TypeDesc::INT)).err(),
        Some(CompileErrorKind::RedefVar)
    );
}

#[test]
fn statics_are_found_along_the_chain() {
    let (mut reg, a, b) = registry_with_chain();
    let mut counter = member("count", TypeDesc::INT);
    counter.is_static = true;
    assert!(reg.add_item(a, counter).is_ok());
    let found = reg.static_member(b, "count").map(|(c, i, _)| (c, i));
    assert_eq!(found, Some((a, 2)));
    assert!(reg.static_slot(a, 2).is_none());
    assert!(reg.set_static(a, 2, Variable::int(0)).is_some());
    assert!(reg.static_slot(a, 2).is_some());
    // Statics are not part of the instance layout.
    assert_eq!(reg.layout(b).len(), 3);
}

#[test]
fn intrinsic_variables_get_default_members() {
    let mut reg = ClassRegistry::new();
    let point = reg.define("point", None, true, false, None).unwrap_or_else(|e| panic!("{e}"));
    assert!(reg.add_item(point, member("x", TypeDesc::FLOAT)).is_ok());
    assert!(reg.add_item(point, member("y", TypeDesc::FLOAT)).is_ok());

    let var = reg.create_variable("p", &TypeDesc::intrinsic(point));
    let Value::Instance(body) = &var.value else {
        panic!("expected an embedded body");
    };
    assert_eq!(&*body.name, "point");
    assert_eq!(body.members.len(), 2);
    assert_eq!(var.to_string(), "point(x=undefined, y=undefined)");
}

#[test]
fn remove_owned_classes() {
    let mut reg = ClassRegistry::new();
    let p = ProgramId::new(7);
    assert!(reg.define("Mine", None, false, false, Some(p)).is_ok());
    assert!(reg.define("Host", None, false, false, None).is_ok());
    let removed: Vec<String> = reg.remove_owned(p).iter().map(|c| c.name.to_string()).collect();
    assert_eq!(removed, vec!["Mine".to_owned()]);
    assert!(reg.by_name("Mine").is_none());
    assert!(reg.by_name("Host").is_some());
    // The name can be reused.
    assert!(reg.define("Mine", None, false, false, Some(p)).is_ok());
}

#[test]
fn free_locks_across_classes() {
    let (mut reg, a, b) = registry_with_chain();
    let p = ProgramId::new(1);
    for class in [a, b] {
        if let Some(def) = reg.get_mut(class) {
            assert!(def.lock.lock(p, 5));
        }
    }
    reg.free_locks(p);
    assert!(reg.iter().all(|c| c.lock.holder().is_none()));
}
