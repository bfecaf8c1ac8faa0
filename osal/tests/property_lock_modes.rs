//! Lock-mode and refcount properties.
//!
//! EXCLUSIVE lookups fail exactly when the object is referenced, releases
//! detect double release and deletion, shutdown gates every mode except
//! REFCOUNT, and concurrent REFCOUNT holders balance out.

use std::sync::Arc;
use std::thread;

use osal::{IdMap, LockMode, ObjectId, ObjectToken, ObjectType, OsalError, SpinBackend};
use proptest::prelude::*;

fn new_map() -> IdMap<SpinBackend> {
    let map = IdMap::new(SpinBackend::new());
    map.init().unwrap();
    map
}

fn create(map: &IdMap<SpinBackend>, obj_type: ObjectType, name: &str) -> ObjectId {
    map.allocate_new(obj_type, Some(name)).unwrap().commit().unwrap()
}

fn refcount_of(map: &IdMap<SpinBackend>, obj_type: ObjectType, id: ObjectId) -> u16 {
    let handle = map.get_by_id(LockMode::Global, obj_type, id).unwrap();
    let refcount = handle.record().unwrap().refcount();
    handle.release().unwrap();
    refcount
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// EXCLUSIVE fails with ObjectInUse if and only if refcount > 0.
    #[test]
    fn exclusive_iff_unreferenced(holders in 0usize..6, released in 0usize..6) {
        let map = new_map();
        let id = create(&map, ObjectType::Mutex, "m");
        let tokens: Vec<ObjectToken> = (0..holders)
            .map(|_| map.get_by_id(LockMode::Refcount, ObjectType::Mutex, id).unwrap().token())
            .collect();
        let released = released.min(holders);
        for token in &tokens[..released] {
            map.refcount_decr(token).unwrap();
        }

        let outstanding = holders - released;
        prop_assert_eq!(refcount_of(&map, ObjectType::Mutex, id) as usize, outstanding);
        let result = map.get_by_id(LockMode::Exclusive, ObjectType::Mutex, id);
        if outstanding > 0 {
            prop_assert_eq!(result.err(), Some(OsalError::ObjectInUse));
        } else {
            let handle = result.unwrap();
            prop_assert_eq!(handle.mode(), LockMode::Exclusive);
            handle.release().unwrap();
        }
    }

    /// One release per acquisition succeeds; the next is a double release.
    #[test]
    fn release_balance(holders in 1usize..8) {
        let map = new_map();
        let id = create(&map, ObjectType::BinSem, "b");
        let token = (0..holders)
            .map(|_| map.get_by_id(LockMode::Refcount, ObjectType::BinSem, id).unwrap().token())
            .last()
            .unwrap();
        for _ in 0..holders {
            prop_assert_eq!(map.refcount_decr(&token), Ok(()));
        }
        prop_assert_eq!(map.refcount_decr(&token), Err(OsalError::IncorrectObjState));
    }

    /// A reference held across a delete fails with InvalidId, even after the
    /// slot has been reused by a new object.
    #[test]
    fn release_after_delete_is_invalid_id(reuse in any::<bool>()) {
        let map = new_map();
        let id = create(&map, ObjectType::Console, "con");
        let token = map.get_by_id(LockMode::Refcount, ObjectType::Console, id).unwrap().token();
        map.get_by_id(LockMode::Global, ObjectType::Console, id)
            .unwrap()
            .delete()
            .unwrap();
        if reuse {
            let new_id = create(&map, ObjectType::Console, "con");
            prop_assert_ne!(new_id, id);
        }
        prop_assert_eq!(map.refcount_decr(&token), Err(OsalError::InvalidId));
    }

    /// While the shutdown sentinel is set, only REFCOUNT lookups succeed.
    #[test]
    fn shutdown_gates_non_refcount_modes(by_name in any::<bool>()) {
        let map = new_map();
        let id = create(&map, ObjectType::TimeBase, "tb");
        map.application_shutdown(true);
        for mode in [LockMode::None, LockMode::Global, LockMode::Exclusive, LockMode::Refcount] {
            let result = if by_name {
                map.get_by_name(mode, ObjectType::TimeBase, "tb")
            } else {
                map.get_by_id(mode, ObjectType::TimeBase, id)
            };
            if mode == LockMode::Refcount {
                result.unwrap().release().unwrap();
            } else {
                prop_assert_eq!(result.err(), Some(OsalError::IncorrectObjState));
            }
        }
        map.application_shutdown(false);
        map.get_by_id(LockMode::None, ObjectType::TimeBase, id).unwrap().release().unwrap();
    }
}

/// Allocate "UT", walk it through every lock mode, delete it, and check
/// that the stale ID is rejected.
#[test]
fn task_scenario() {
    let map = new_map();
    let id = create(&map, ObjectType::Task, "UT");

    map.get_by_id(LockMode::None, ObjectType::Task, id)
        .unwrap()
        .release()
        .unwrap();
    // NONE left the table unlocked, so EXCLUSIVE can take it.
    let handle = map.get_by_id(LockMode::Exclusive, ObjectType::Task, id).unwrap();
    assert_eq!(handle.record().unwrap().refcount(), 0);
    handle.release().unwrap();

    let held = map.get_by_id(LockMode::Refcount, ObjectType::Task, id).unwrap();
    assert_eq!(refcount_of(&map, ObjectType::Task, id), 1);
    held.release().unwrap();
    assert_eq!(refcount_of(&map, ObjectType::Task, id), 0);

    map.get_by_id(LockMode::Exclusive, ObjectType::Task, id)
        .unwrap()
        .delete()
        .unwrap();
    assert_eq!(
        map.get_by_id(LockMode::None, ObjectType::Task, id).err(),
        Some(OsalError::InvalidId)
    );
}

/// REFCOUNT acquisitions and releases from many threads balance out.
#[test]
fn concurrent_refcount_holders() {
    let map = Arc::new(new_map());
    let id = create(&map, ObjectType::Queue, "shared");

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                for _ in 0..200 {
                    let token = map
                        .get_by_id(LockMode::Refcount, ObjectType::Queue, id)
                        .unwrap()
                        .token();
                    map.refcount_decr(&token).unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(refcount_of(&map, ObjectType::Queue, id), 0);
    map.get_by_id(LockMode::Exclusive, ObjectType::Queue, id)
        .unwrap()
        .delete()
        .unwrap();
}

/// Objects created on different threads do not collide.
#[test]
fn concurrent_allocation_yields_distinct_ids() {
    let map = Arc::new(new_map());
    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                (0..10)
                    .map(|n| {
                        let name = format!("w{}-{}", worker, n);
                        map.allocate_new(ObjectType::Stream, Some(name.as_str()))
                            .unwrap()
                            .commit()
                            .unwrap()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids: Vec<ObjectId> = workers
        .into_iter()
        .flat_map(|worker| worker.join().unwrap())
        .collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 40);
}
