//! Iteration over live objects, and name introspection

use core::slice;

use osal_types::config::{DELETE_ALL_MAX_PASSES, DELETE_ALL_RETRY_DELAY};
use osal_types::{identify_object, ObjectId, ObjectName, ObjectType, OsalError, Result};

use crate::backend::OsBackend;
use crate::idmap::IdMap;
use crate::lookup::LockMode;

impl<B: OsBackend> IdMap<B> {
    /// Call `callback` with the ID of every live object.
    ///
    /// `creator` restricts the walk to objects created by one task, and
    /// `obj_type` to one table. Each table is locked only while it is being
    /// scanned and is unlocked around every callback, so the callback may
    /// create or delete objects. Objects created or deleted concurrently may
    /// or may not be visited.
    pub fn for_each<F>(&self, creator: Option<ObjectId>, obj_type: Option<ObjectType>, mut callback: F) -> Result<()>
    where
        F: FnMut(ObjectId),
    {
        if !self.is_initialized() {
            return Err(OsalError::Error);
        }
        let types: &[ObjectType] = match &obj_type {
            Some(obj_type) => slice::from_ref(obj_type),
            None => &ObjectType::ALL,
        };

        for &obj_type in types.iter().filter(|obj_type| obj_type.has_table()) {
            let capacity = self.table(obj_type).capacity();
            let mut guard = self.lock_table(obj_type)?;
            for index in 0..capacity {
                let matched = guard.record(index).and_then(|record| {
                    let wanted = !record.is_free() && creator.map_or(true, |task| record.creator() == task);
                    wanted.then(|| record.active_id())
                });
                if let Some(id) = matched {
                    guard.unlock()?;
                    callback(id);
                    guard = self.lock_table(obj_type)?;
                }
            }
            guard.unlock()?;
        }
        Ok(())
    }

    /// Run `cleanup` on every live object until none are left.
    ///
    /// Makes up to `DELETE_ALL_MAX_PASSES` passes, delaying between them so
    /// that objects held by other tasks can be released. Fails with
    /// `ObjectInUse` if the last pass still found objects.
    pub fn delete_all_objects<F>(&self, mut cleanup: F) -> Result<()>
    where
        F: FnMut(ObjectId),
    {
        for pass in 1..=DELETE_ALL_MAX_PASSES {
            let mut visited = 0u32;
            self.for_each(None, None, |id| {
                visited += 1;
                cleanup(id);
            })?;
            if visited == 0 {
                return Ok(());
            }
            log::debug!("[OSAL IdMap] delete-all pass {} visited {} objects", pass, visited);
            if pass < DELETE_ALL_MAX_PASSES {
                self.backend().task_delay(DELETE_ALL_RETRY_DELAY);
            }
        }
        log::warn!(
            "[OSAL IdMap] objects remain after {} delete-all passes",
            DELETE_ALL_MAX_PASSES
        );
        Err(OsalError::ObjectInUse)
    }

    /// Copy the name of `id` into `buf` as a NUL-terminated string.
    ///
    /// Returns the name length without the terminator; anonymous objects
    /// yield an empty string. Fails with `InvalidPointer` for an empty
    /// buffer and `NameTooLong` if name and terminator do not fit. On any
    /// error `buf` is left untouched; no truncated name is written.
    pub fn get_resource_name(&self, id: ObjectId, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Err(OsalError::InvalidPointer);
        }
        let name = self.resource_name(id)?;
        let len = name.len();
        if len >= buf.len() {
            return Err(OsalError::NameTooLong);
        }
        buf[..len].copy_from_slice(name.as_bytes());
        buf[len] = 0;
        Ok(len)
    }

    /// Name of `id`, empty for anonymous objects.
    pub fn resource_name(&self, id: ObjectId) -> Result<ObjectName> {
        let obj_type = identify_object(id);
        if !obj_type.has_table() {
            return Err(OsalError::InvalidId);
        }
        let handle = self.get_by_id(LockMode::Global, obj_type, id)?;
        let name = handle
            .record()
            .and_then(|record| record.name.clone())
            .unwrap_or_default();
        handle.release()?;
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SpinBackend;
    use alloc::vec::Vec;
    use osal_types::id::compose;

    fn new_map() -> IdMap<SpinBackend> {
        let map = IdMap::new(SpinBackend::new());
        map.init().unwrap();
        map
    }

    fn create(map: &IdMap<SpinBackend>, obj_type: ObjectType, name: Option<&str>) -> ObjectId {
        map.allocate_new(obj_type, name).unwrap().commit().unwrap()
    }

    fn delete(map: &IdMap<SpinBackend>, id: ObjectId) {
        map.get_by_id(LockMode::Exclusive, id.object_type(), id)
            .unwrap()
            .delete()
            .unwrap();
    }

    #[test]
    fn test_for_each_filters() {
        let map = new_map();
        let owner = compose(ObjectType::Task, 3).unwrap();
        let queue = create(&map, ObjectType::Queue, Some("q"));
        map.backend().set_current_task(owner);
        let sem = create(&map, ObjectType::BinSem, Some("s"));
        let mutex = create(&map, ObjectType::Mutex, None);

        let mut all = Vec::new();
        map.for_each(None, None, |id| all.push(id)).unwrap();
        assert_eq!(all, [queue, sem, mutex]);

        let mut owned = Vec::new();
        map.for_each(Some(owner), None, |id| owned.push(id)).unwrap();
        assert_eq!(owned, [sem, mutex]);

        let mut queues = Vec::new();
        map.for_each(None, Some(ObjectType::Queue), |id| queues.push(id)).unwrap();
        assert_eq!(queues, [queue]);

        let mut none = Vec::new();
        map.for_each(None, Some(ObjectType::User), |id| none.push(id)).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_for_each_callback_may_delete() {
        let map = new_map();
        for name in ["a", "b", "c"] {
            create(&map, ObjectType::Stream, Some(name));
        }
        map.for_each(None, Some(ObjectType::Stream), |id| delete(&map, id)).unwrap();
        let mut left = 0;
        map.for_each(None, None, |_| left += 1).unwrap();
        assert_eq!(left, 0);
    }

    #[test]
    fn test_delete_all_objects() {
        let map = new_map();
        create(&map, ObjectType::Task, Some("t"));
        create(&map, ObjectType::Console, None);
        map.delete_all_objects(|id| delete(&map, id)).unwrap();
        map.for_each(None, None, |id| panic!("{} survived", id)).unwrap();
    }

    #[test]
    fn test_delete_all_gives_up() {
        let map = new_map();
        let id = create(&map, ObjectType::Task, Some("stuck"));
        let mut calls = 0;
        assert_eq!(
            map.delete_all_objects(|_| calls += 1),
            Err(OsalError::ObjectInUse)
        );
        assert_eq!(calls, DELETE_ALL_MAX_PASSES);
        assert!(map.get_by_id(LockMode::None, ObjectType::Task, id).is_ok());
    }

    #[test]
    fn test_get_resource_name() {
        let map = new_map();
        let id = create(&map, ObjectType::Queue, Some("telemetry"));
        let mut buf = [0xFFu8; 16];
        assert_eq!(map.get_resource_name(id, &mut buf), Ok(9));
        assert_eq!(&buf[..10], b"telemetry\0");

        let mut exact = [0xAAu8; 9];
        assert_eq!(map.get_resource_name(id, &mut exact), Err(OsalError::NameTooLong));
        assert_eq!(exact, [0xAAu8; 9]);
        assert_eq!(map.get_resource_name(id, &mut []), Err(OsalError::InvalidPointer));
    }

    #[test]
    fn test_resource_name_of_anonymous_and_stale() {
        let map = new_map();
        let id = create(&map, ObjectType::Module, None);
        assert_eq!(map.resource_name(id).unwrap().as_str(), "");
        let mut buf = [0xFFu8; 1];
        assert_eq!(map.get_resource_name(id, &mut buf), Ok(0));
        assert_eq!(buf[0], 0);

        delete(&map, id);
        assert_eq!(map.resource_name(id), Err(OsalError::InvalidId));
        assert_eq!(map.resource_name(ObjectId::UNDEFINED), Err(OsalError::InvalidId));
    }
}
