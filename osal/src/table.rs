//! Per-type record tables and their lock guards

use alloc::vec::Vec;
use core::cell::UnsafeCell;
use core::marker::PhantomData;

use osal_types::{max_for_type, ObjectId, ObjectType, Result};

use crate::backend::OsBackend;
use crate::idmap::IdMap;
use crate::record::ObjectRecord;

pub(crate) struct TableState {
    /// Most recently committed ID; allocation scans forward from here.
    pub(crate) last_id_issued: ObjectId,
    pub(crate) records: Vec<ObjectRecord>,
}

/// Fixed-capacity record array for one object type.
///
/// The contents are only reachable through a [`TableGuard`], which exists
/// only while the backend lock for this type is held.
pub(crate) struct ObjectTable {
    obj_type: ObjectType,
    state: UnsafeCell<TableState>,
}

// All access to `state` goes through `TableGuard`.
unsafe impl Sync for ObjectTable {}

impl ObjectTable {
    pub(crate) fn new(obj_type: ObjectType) -> Self {
        let capacity = max_for_type(obj_type) as usize;
        let mut records = Vec::with_capacity(capacity);
        records.resize_with(capacity, ObjectRecord::default);
        ObjectTable {
            obj_type,
            state: UnsafeCell::new(TableState {
                last_id_issued: ObjectId::UNDEFINED,
                records,
            }),
        }
    }

    pub(crate) fn obj_type(&self) -> ObjectType {
        self.obj_type
    }

    pub(crate) fn capacity(&self) -> usize {
        max_for_type(self.obj_type) as usize
    }
}

/// Proof that one type's table lock is held.
///
/// Dropping the guard releases the lock. Use [`TableGuard::unlock`] to see
/// the backend's unlock status instead of having it logged.
pub struct TableGuard<'a, B: OsBackend> {
    map: &'a IdMap<B>,
    obj_type: ObjectType,
    // Backends may tie the lock to the locking thread.
    _not_send: PhantomData<*const ()>,
}

impl<'a, B: OsBackend> TableGuard<'a, B> {
    pub(crate) fn lock(map: &'a IdMap<B>, obj_type: ObjectType) -> Result<Self> {
        // SAFETY: the guard built here unlocks exactly once, on `unlock` or drop.
        unsafe { map.backend().lock_global(obj_type)? };
        #[cfg(feature = "trace-idmap")]
        log::trace!("[OSAL IdMap] locked {} table", obj_type);
        Ok(TableGuard {
            map,
            obj_type,
            _not_send: PhantomData,
        })
    }

    pub fn obj_type(&self) -> ObjectType {
        self.obj_type
    }

    fn state(&self) -> &TableState {
        // SAFETY: the table lock is held for the guard's lifetime.
        unsafe { &*self.map.table(self.obj_type).state.get() }
    }

    pub(crate) fn state_mut(&mut self) -> &mut TableState {
        // SAFETY: the table lock is held and `&mut self` is unique.
        unsafe { &mut *self.map.table(self.obj_type).state.get() }
    }

    /// All records of this type, free slots included.
    pub fn records(&self) -> &[ObjectRecord] {
        &self.state().records
    }

    pub fn record(&self, index: usize) -> Option<&ObjectRecord> {
        self.state().records.get(index)
    }

    /// Record at a validated index.
    pub(crate) fn record_mut(&mut self, index: usize) -> &mut ObjectRecord {
        &mut self.state_mut().records[index]
    }

    pub(crate) fn last_id_issued(&self) -> ObjectId {
        self.state().last_id_issued
    }

    /// Release the lock and report the backend's status.
    pub fn unlock(self) -> Result<()> {
        let map = self.map;
        let obj_type = self.obj_type;
        core::mem::forget(self);
        #[cfg(feature = "trace-idmap")]
        log::trace!("[OSAL IdMap] unlocking {} table", obj_type);
        // SAFETY: this guard held the lock and was consumed, so no record
        // borrow outlives it.
        unsafe { map.backend().unlock_global(obj_type) }
    }
}

impl<B: OsBackend> Drop for TableGuard<'_, B> {
    fn drop(&mut self) {
        // SAFETY: as in `unlock`.
        if let Err(err) = unsafe { self.map.backend().unlock_global(self.obj_type) } {
            log::error!("[OSAL IdMap] unlock of {} table failed: {}", self.obj_type, err);
        }
    }
}
