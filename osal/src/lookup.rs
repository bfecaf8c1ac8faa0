//! Object lookup and reference counting
//!
//! Every lookup ends in the same lock-mode state machine: with the table
//! locked and a candidate record in hand, check that the record still holds
//! the expected ID and then leave the lock and refcount the way the caller's
//! [`LockMode`] asks for.

use osal_types::id::to_array_index;
use osal_types::name::name_fits;
use osal_types::{ObjectId, ObjectType, OsalError, Result};

use crate::backend::OsBackend;
use crate::idmap::IdMap;
use crate::record::{ObjectRecord, RecordFlags};
use crate::table::TableGuard;

/// What a successful lookup leaves held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    /// Nothing: table unlocked, refcount untouched.
    None,
    /// Table stays locked.
    Global,
    /// Table stays locked, and the object has no REFCOUNT holders.
    Exclusive,
    /// Refcount incremented, table unlocked.
    Refcount,
}

/// Reference to a live object: its type, slot and ID.
///
/// Tokens stay meaningful after the table is unlocked; the ID comparison in
/// every operation that takes one catches a slot that has since been reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectToken {
    obj_type: ObjectType,
    index: usize,
    id: ObjectId,
}

impl ObjectToken {
    pub fn obj_type(&self) -> ObjectType {
        self.obj_type
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }
}

/// Result of a successful lookup.
///
/// In GLOBAL and EXCLUSIVE mode the handle owns the table lock and releases
/// it when dropped. In REFCOUNT mode the reference outlives the handle; give
/// it back with [`ObjectHandle::release`] or [`IdMap::refcount_decr`].
#[must_use]
pub struct ObjectHandle<'a, B: OsBackend> {
    map: &'a IdMap<B>,
    token: ObjectToken,
    mode: LockMode,
    guard: Option<TableGuard<'a, B>>,
}

impl<'a, B: OsBackend> ObjectHandle<'a, B> {
    pub fn token(&self) -> ObjectToken {
        self.token
    }

    pub fn id(&self) -> ObjectId {
        self.token.id
    }

    pub fn index(&self) -> usize {
        self.token.index
    }

    pub fn obj_type(&self) -> ObjectType {
        self.token.obj_type
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }

    /// The record, while the handle holds the table lock.
    pub fn record(&self) -> Option<&ObjectRecord> {
        self.guard.as_ref().and_then(|guard| guard.record(self.token.index))
    }

    /// Give back whatever the lookup acquired.
    pub fn release(mut self) -> Result<()> {
        match self.guard.take() {
            Some(guard) => guard.unlock(),
            None if self.mode == LockMode::Refcount => self.map.refcount_decr(&self.token),
            None => Ok(()),
        }
    }

    /// Free the object's slot and unlock the table.
    ///
    /// Needs a GLOBAL or EXCLUSIVE handle. Outstanding REFCOUNT holders see
    /// `InvalidId` on their next release.
    pub fn delete(mut self) -> Result<()> {
        let Some(mut guard) = self.guard.take() else {
            log::warn!("[OSAL IdMap] delete of {} without the table lock", self.token.id);
            return Err(OsalError::IncorrectObjState);
        };
        let record = guard.record_mut(self.token.index);
        if record.active_id != self.token.id {
            return Err(OsalError::InvalidId);
        }
        record.clear();
        #[cfg(feature = "trace-idmap")]
        log::trace!("[OSAL IdMap] deleted {}", self.token.id);
        guard.unlock()
    }
}

enum Conversion {
    Ready,
    Contended,
}

/// One pass of the lock-mode state machine over a locked record.
fn convert_step(record: &mut ObjectRecord, mode: LockMode, id: ObjectId) -> Result<Conversion> {
    if record.active_id != id {
        return Err(OsalError::InvalidId);
    }
    match mode {
        LockMode::None | LockMode::Global => Ok(Conversion::Ready),
        LockMode::Exclusive if record.refcount == 0 => Ok(Conversion::Ready),
        LockMode::Exclusive => Ok(Conversion::Contended),
        LockMode::Refcount if record.flags.contains(RecordFlags::EXCLUSIVE_REQUEST) => {
            Ok(Conversion::Contended)
        }
        LockMode::Refcount => {
            record.refcount = record
                .refcount
                .checked_add(1)
                .ok_or(OsalError::IncorrectObjState)?;
            Ok(Conversion::Ready)
        }
    }
}

impl<B: OsBackend> IdMap<B> {
    /// Finish a lookup on a locked table.
    fn convert_lock<'a>(
        &'a self,
        guard: TableGuard<'a, B>,
        mode: LockMode,
        token: ObjectToken,
    ) -> Result<ObjectHandle<'a, B>> {
        let mut held = Some(guard);
        let mut flagged = false;
        let outcome = self.convert_with_retry(&mut held, mode, token, &mut flagged);

        if flagged {
            if held.is_none() {
                held = self.lock_table(token.obj_type).ok();
            }
            match held.as_mut() {
                Some(guard) => {
                    let record = guard.record_mut(token.index);
                    if record.active_id == token.id {
                        record.flags.remove(RecordFlags::EXCLUSIVE_REQUEST);
                    }
                }
                None => log::error!(
                    "[OSAL IdMap] exclusive request on {} left set: relock failed",
                    token.id
                ),
            }
        }

        outcome?;
        let guard = held.ok_or(OsalError::Error)?;
        let guard = match mode {
            LockMode::Global | LockMode::Exclusive => Some(guard),
            LockMode::None | LockMode::Refcount => {
                guard.unlock()?;
                None
            }
        };
        Ok(ObjectHandle {
            map: self,
            token,
            mode,
            guard,
        })
    }

    /// Run the state machine, backing off while the record is contended.
    ///
    /// `held` is `None` on return only if unlocking or relocking the table
    /// failed. Shutdown is rechecked every time the table is relocked.
    fn convert_with_retry<'a>(
        &'a self,
        held: &mut Option<TableGuard<'a, B>>,
        mode: LockMode,
        token: ObjectToken,
        flagged: &mut bool,
    ) -> Result<()> {
        let mut attempts = 1;
        loop {
            let guard = held.as_mut().ok_or(OsalError::Error)?;
            match convert_step(guard.record_mut(token.index), mode, token.id)? {
                Conversion::Ready => return Ok(()),
                Conversion::Contended if attempts >= self.config().lock_attempts => {
                    return Err(OsalError::ObjectInUse)
                }
                Conversion::Contended => {
                    if mode == LockMode::Exclusive && !*flagged {
                        guard
                            .record_mut(token.index)
                            .flags
                            .insert(RecordFlags::EXCLUSIVE_REQUEST);
                        *flagged = true;
                    }
                    if let Some(guard) = held.take() {
                        guard.unlock()?;
                    }
                    self.backend().task_delay(attempts);
                    attempts += 1;
                    *held = Some(self.lock_table(token.obj_type)?);
                    if mode != LockMode::Refcount && self.is_shutdown() {
                        return Err(OsalError::IncorrectObjState);
                    }
                }
            }
        }
    }

    /// Look up an object by ID.
    ///
    /// During shutdown every mode except REFCOUNT fails with
    /// `IncorrectObjState`.
    pub fn get_by_id(&self, mode: LockMode, obj_type: ObjectType, id: ObjectId) -> Result<ObjectHandle<'_, B>> {
        self.check_ready(obj_type)?;
        let index = to_array_index(obj_type, id)?;
        let guard = self.lock_table(obj_type)?;
        if mode != LockMode::Refcount && self.is_shutdown() {
            return Err(OsalError::IncorrectObjState);
        }
        self.convert_lock(guard, mode, ObjectToken { obj_type, index, id })
    }

    /// Look up the first live object of `obj_type` accepted by `predicate`.
    pub fn get_by_search<F>(&self, mode: LockMode, obj_type: ObjectType, mut predicate: F) -> Result<ObjectHandle<'_, B>>
    where
        F: FnMut(usize, &ObjectRecord) -> bool,
    {
        self.check_ready(obj_type)?;
        let guard = self.lock_table(obj_type)?;
        if mode != LockMode::Refcount && self.is_shutdown() {
            return Err(OsalError::IncorrectObjState);
        }
        let (index, id) = guard
            .records()
            .iter()
            .enumerate()
            .find(|(index, record)| !record.is_free() && predicate(*index, *record))
            .map(|(index, record)| (index, record.active_id))
            .ok_or(OsalError::NameNotFound)?;
        self.convert_lock(guard, mode, ObjectToken { obj_type, index, id })
    }

    /// Look up a live object of `obj_type` by name.
    pub fn get_by_name(&self, mode: LockMode, obj_type: ObjectType, name: &str) -> Result<ObjectHandle<'_, B>> {
        if !name_fits(name) {
            return Err(OsalError::NameTooLong);
        }
        self.get_by_search(mode, obj_type, |_, record| record.name() == Some(name))
    }

    /// ID of the live object of `obj_type` called `name`.
    pub fn find_by_name(&self, obj_type: ObjectType, name: &str) -> Result<ObjectId> {
        let handle = self.get_by_name(LockMode::Global, obj_type, name)?;
        let id = handle.id();
        handle.release()?;
        Ok(id)
    }

    /// Drop a REFCOUNT reference.
    ///
    /// Fails with `InvalidId` if the object was deleted (or its slot reused)
    /// while the reference was held, and with `IncorrectObjState` on a
    /// double release. Takes the table lock only for the decrement itself.
    pub fn refcount_decr(&self, token: &ObjectToken) -> Result<()> {
        if !token.id.is_defined() {
            return Err(OsalError::InvalidId);
        }
        let mut guard = self.lock_table(token.obj_type)?;
        let record = guard.record_mut(token.index);
        let outcome = if record.active_id != token.id {
            Err(OsalError::InvalidId)
        } else if record.refcount == 0 {
            Err(OsalError::IncorrectObjState)
        } else {
            record.refcount -= 1;
            Ok(())
        };
        let unlocked = guard.unlock();
        outcome.and(unlocked)
    }
}
