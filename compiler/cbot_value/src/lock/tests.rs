use super::*;
use pretty_assertions::assert_eq;

const P1: ProgramId = ProgramId::new(1);
const P2: ProgramId = ProgramId::new(2);
const P3: ProgramId = ProgramId::new(3);

#[test]
fn reentrant_for_the_holder() {
    let mut lock = ClassLock::new();
    assert!(lock.lock(P1, 5));
    assert!(lock.lock(P1, 5));
    assert_eq!(lock.count(), 2);

    assert!(!lock.lock(P2, 5));
    assert!(lock.unlock(P1));
    assert!(!lock.lock(P2, 5));
    assert!(lock.unlock(P1));
    assert!(lock.lock(P2, 5));
    assert_eq!(lock.holder(), Some(P2));
}

#[test]
fn waiters_are_served_in_order() {
    let mut lock = ClassLock::new();
    assert!(lock.lock(P1, 5));
    assert!(!lock.lock(P2, 5));
    assert!(!lock.lock(P3, 5));
    assert!(lock.unlock(P1));

    // P3 asked later and must wait for P2.
    assert!(!lock.lock(P3, 5));
    assert!(lock.lock(P2, 5));
}

#[test]
fn unlock_by_non_holder_is_refused() {
    let mut lock = ClassLock::new();
    assert!(!lock.unlock(P1));
    assert!(lock.lock(P1, 5));
    assert!(!lock.unlock(P2));
}

#[test]
fn free_releases_everything() {
    let mut lock = ClassLock::new();
    assert!(lock.lock(P1, 5));
    assert!(lock.lock(P1, 5));
    assert!(!lock.lock(P2, 5));
    lock.free(P1);
    assert_eq!(lock.holder(), None);
    assert!(lock.lock(P2, 5));

    // A freed waiter leaves the queue.
    assert!(!lock.lock(P3, 5));
    lock.free(P3);
    assert!(lock.unlock(P2));
    assert!(lock.lock(P1, 5));
}

#[test]
fn bounded_queue() {
    let mut lock = ClassLock::new();
    assert!(lock.lock(P1, 1));
    assert!(!lock.lock(P2, 1));
    assert!(!lock.lock(P3, 1));
    assert!(lock.unlock(P1));
    assert!(!lock.lock(P3, 1));
    assert!(lock.lock(P2, 1));
}
