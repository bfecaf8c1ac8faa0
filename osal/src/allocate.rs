//! Two-phase object allocation
//!
//! [`IdMap::allocate_new`] reserves a slot and returns it still locked as a
//! [`PendingObject`]. The caller sets up its type-specific state and then
//! calls [`PendingObject::finalize`] to publish the ID, or drops the pending
//! object to roll the reservation back. Either way the table is unlocked
//! exactly once.

use osal_types::config::OBJECT_INDEX_MASK;
use osal_types::id::compose;
use osal_types::{max_for_type, object_name, ObjectId, ObjectType, OsalError, Result};

use crate::backend::OsBackend;
use crate::idmap::IdMap;
use crate::record::ObjectRecord;
use crate::table::TableGuard;

/// A reserved slot whose ID is not yet visible to other lookups.
#[must_use = "dropping a pending object rolls the allocation back"]
pub struct PendingObject<'a, B: OsBackend> {
    guard: Option<TableGuard<'a, B>>,
    index: usize,
    id: ObjectId,
}

impl<'a, B: OsBackend> PendingObject<'a, B> {
    pub fn obj_type(&self) -> ObjectType {
        self.id.object_type()
    }

    /// Table index of the reserved slot.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The ID this object will have once finalized.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn record(&self) -> Option<&ObjectRecord> {
        self.guard.as_ref().and_then(|guard| guard.record(self.index))
    }

    /// Commit on `Ok`, roll back and return the error on `Err`.
    ///
    /// The table is unlocked in both cases.
    pub fn finalize(mut self, status: Result<()>) -> Result<ObjectId> {
        let Some(mut guard) = self.guard.take() else {
            return Err(OsalError::InvalidId);
        };
        let index = self.index;
        let outcome = match status {
            Err(err) => {
                guard.record_mut(index).clear();
                Err(err)
            }
            Ok(()) => {
                let active_id = guard.record(index).map_or(ObjectId::UNDEFINED, ObjectRecord::active_id);
                if active_id.is_defined() {
                    guard.state_mut().last_id_issued = active_id;
                    Ok(active_id)
                } else {
                    Err(OsalError::InvalidId)
                }
            }
        };
        let unlocked = guard.unlock();
        let id = outcome?;
        unlocked?;
        Ok(id)
    }

    /// Shorthand for `finalize(Ok(()))`.
    pub fn commit(self) -> Result<ObjectId> {
        self.finalize(Ok(()))
    }
}

impl<B: OsBackend> Drop for PendingObject<'_, B> {
    fn drop(&mut self) {
        if let Some(mut guard) = self.guard.take() {
            log::debug!("[OSAL IdMap] rolling back unfinished allocation {}", self.id);
            guard.record_mut(self.index).clear();
        }
    }
}

/// Claim the next free slot after the last issued serial.
///
/// Runs with the table locked; the lock stays held on success.
fn find_next<B: OsBackend>(
    guard: &mut TableGuard<'_, B>,
    creator: ObjectId,
) -> Result<(usize, ObjectId)> {
    let obj_type = guard.obj_type();
    let max = max_for_type(obj_type);
    if max == 0 {
        return Err(OsalError::NotImplemented);
    }

    let mut serial = guard.last_id_issued().serial();
    let mut found = None;
    for _ in 0..max {
        serial += 1;
        let index = serial % max;
        if serial >= OBJECT_INDEX_MASK {
            serial = index;
        }
        if guard.record(index as usize).is_some_and(ObjectRecord::is_free) {
            found = Some(index as usize);
            break;
        }
    }

    let Some(index) = found else {
        log::warn!("[OSAL IdMap] {} table full ({} slots)", obj_type, max);
        return Err(OsalError::NoFreeIds);
    };
    let id = compose(obj_type, serial)?;
    guard.record_mut(index).claim(id, creator);
    Ok((index, id))
}

impl<B: OsBackend> IdMap<B> {
    /// Reserve a slot for a new object of `obj_type`.
    ///
    /// A non-empty `name` must be unique among live objects of the type. The
    /// returned [`PendingObject`] keeps the table locked until it is
    /// finalized or dropped.
    pub fn allocate_new(&self, obj_type: ObjectType, name: Option<&str>) -> Result<PendingObject<'_, B>> {
        if !self.is_initialized() || self.is_shutdown() {
            return Err(OsalError::Error);
        }
        if !obj_type.has_table() {
            return Err(OsalError::IncorrectObjType);
        }
        let name = match name {
            Some(name) if !name.is_empty() => Some(object_name(name)?),
            _ => None,
        };

        let mut guard = self.lock_table(obj_type)?;
        if let Some(name) = &name {
            let taken = guard
                .records()
                .iter()
                .any(|record| !record.is_free() && record.name() == Some(name.as_str()));
            if taken {
                return Err(OsalError::NameTaken);
            }
        }

        let (index, id) = find_next(&mut guard, self.backend().current_task_id())?;
        guard.record_mut(index).name = name;

        #[cfg(feature = "trace-idmap")]
        log::trace!("[OSAL IdMap] reserved {} at {}[{}]", id, obj_type, index);

        Ok(PendingObject {
            guard: Some(guard),
            index,
            id,
        })
    }
}
