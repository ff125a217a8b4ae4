use super::*;
use pretty_assertions::assert_eq;

use crate::heap::{ArrayBody, Heap};
use cbot_ir::ClassId;

#[test]
fn scalars_start_undefined() {
    let v = Variable::create("a", TypeDesc::INT);
    assert_eq!(v.init, InitState::Undef);
    assert_eq!(v.number(), Some(Number::Int(0)));
    assert_eq!(v.to_string(), "undefined");
}

#[test]
fn references_start_as_defined_null() {
    let p = Variable::create("p", TypeDesc::pointer(ClassId::new(1)));
    assert!(p.is_defined());
    assert!(p.pointer().is_none());
    assert_eq!(p.to_string(), "null");

    let a = Variable::create("a", TypeDesc::array(TypeDesc::INT, 3));
    assert!(a.array().is_none());
}

#[test]
fn assign_converts_numbers() {
    let mut target = Variable::create("x", TypeDesc::INT);
    target.assign(&Variable::double(3.9));
    assert_eq!(target.number(), Some(Number::Int(3)));

    let mut f = Variable::create("f", TypeDesc::FLOAT);
    f.assign(&Variable::int(2));
    assert_eq!(f.number(), Some(Number::Float(2.0)));
    assert!(f.is_defined());
}

#[test]
fn assign_to_string_stringifies() {
    let mut s = Variable::create("s", TypeDesc::STRING);
    s.assign(&Variable::int(12));
    assert_eq!(s.as_str(), Some("12"));

    s.assign(&Variable::boolean(true));
    assert_eq!(s.as_str(), Some("true"));
}

#[test]
fn assign_keeps_nan_state() {
    let mut x = Variable::create("x", TypeDesc::FLOAT);
    x.assign(&Variable::nan(TypeKind::Float));
    assert!(x.is_nan());
    assert_eq!(x.to_string(), "nan");
}

#[test]
fn arrays_are_shared_on_clone() {
    let heap_array = ArrayBody::new(TypeDesc::INT, 2).shared();
    let mut a = Variable::create("a", TypeDesc::array(TypeDesc::INT, 2));
    a.set_array(Some(heap_array));
    let b = a.copy_named("b");

    if let Some(arr) = a.array() {
        let slot = arr.borrow_mut().get_mut_or_grow(0).map(|v| v.set_i64(7));
        assert_eq!(slot, Ok(()));
    }
    let seen = b.array().map(|arr| arr.borrow().items[0].as_i64());
    assert_eq!(seen, Some(Some(7)));
    assert_eq!(b.to_string(), "{7}");
}

#[test]
fn pointer_display_shows_members() {
    let heap = Heap::new();
    let body = ClassBody::new(
        ClassId::new(0),
        "Point".into(),
        vec![
            {
                let mut x = Variable::create("x", TypeDesc::INT);
                x.set_i64(1);
                x
            },
            Variable::create("y", TypeDesc::INT),
        ],
    );
    let inst = heap.allocate(body);
    let mut p = Variable::create("p", TypeDesc::pointer(ClassId::new(0)));
    p.set_pointer(Some(inst));
    assert_eq!(p.to_string(), "Point(x=1, y=undefined)");
}

#[test]
fn assign_owned_adopts_type_of_void_target() {
    let mut slot = Variable::create("r", TypeDesc::VOID);
    slot.assign_owned(Variable::string("hi"));
    assert_eq!(slot.kind(), TypeKind::String);
    assert_eq!(slot.as_str(), Some("hi"));
}
