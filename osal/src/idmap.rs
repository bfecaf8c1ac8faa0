//! The object ID map
//!
//! One [`IdMap`] owns a record table per object type plus the process-wide
//! `initialized` and shutdown state. Allocation, lookup and iteration are
//! implemented in their own modules as further `impl` blocks.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use osal_types::config::SHUTDOWN_MAGIC_NUMBER;
use osal_types::{ObjectId, ObjectType, OsalError, Result};

use crate::backend::OsBackend;
use crate::table::{ObjectTable, TableGuard};

/// Runtime tuning for an [`IdMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdMapConfig {
    /// Tries for an EXCLUSIVE or REFCOUNT lookup that finds the record
    /// contended. With 1, contention fails immediately with `ObjectInUse`.
    /// With more, the lookup flags its exclusive request, backs off through
    /// the backend's `task_delay` and retries.
    pub lock_attempts: u32,
}

impl Default for IdMapConfig {
    fn default() -> Self {
        IdMapConfig { lock_attempts: 1 }
    }
}

impl IdMapConfig {
    pub const fn with_lock_attempts(lock_attempts: u32) -> Self {
        IdMapConfig { lock_attempts }
    }
}

/// Object ID map over backend `B`.
pub struct IdMap<B: OsBackend> {
    backend: B,
    config: IdMapConfig,
    initialized: AtomicBool,
    shutdown: AtomicU32,
    /// Serializes `init` and `teardown`.
    lifecycle: spin::Mutex<()>,
    tables: [ObjectTable; ObjectType::TABLE_COUNT],
}

impl<B: OsBackend> IdMap<B> {
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, IdMapConfig::default())
    }

    pub fn with_config(backend: B, config: IdMapConfig) -> Self {
        IdMap {
            backend,
            config: IdMapConfig {
                lock_attempts: config.lock_attempts.max(1),
            },
            initialized: AtomicBool::new(false),
            shutdown: AtomicU32::new(0),
            lifecycle: spin::Mutex::new(()),
            tables: core::array::from_fn(|index| {
                ObjectTable::new(ObjectType::from_raw(index as u32).unwrap_or(ObjectType::Undefined))
            }),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> IdMapConfig {
        self.config
    }

    pub(crate) fn table(&self, obj_type: ObjectType) -> &ObjectTable {
        &self.tables[obj_type.as_index()]
    }

    pub(crate) fn lock_table(&self, obj_type: ObjectType) -> Result<TableGuard<'_, B>> {
        TableGuard::lock(self, obj_type)
    }

    /// Lock `obj_type`'s table for a multi-step read.
    pub fn lock_type(&self, obj_type: ObjectType) -> Result<TableGuard<'_, B>> {
        if !obj_type.has_table() {
            return Err(OsalError::IncorrectObjType);
        }
        self.lock_table(obj_type)
    }

    /// Set up every table lock and empty every table.
    ///
    /// Fails with `Error` if the map is already initialized.
    pub fn init(&self) -> Result<()> {
        let _lifecycle = self.lifecycle.lock();
        if self.initialized.load(Ordering::Acquire) {
            log::warn!("[OSAL IdMap] init called on an initialized map");
            return Err(OsalError::Error);
        }

        for obj_type in ObjectType::ALL {
            self.backend.table_mutex_init(obj_type).map_err(|err| {
                log::error!("[OSAL IdMap] lock init for {} table failed: {}", obj_type, err);
                err
            })?;
        }
        self.clear_tables()?;

        self.shutdown.store(0, Ordering::Release);
        self.initialized.store(true, Ordering::Release);
        log::debug!(
            "[OSAL IdMap] initialized {} tables",
            ObjectType::ALL.len()
        );
        Ok(())
    }

    /// Forget every object and return to the uninitialized state.
    ///
    /// Does not run any per-object cleanup; see `delete_all_objects`.
    pub fn teardown(&self) -> Result<()> {
        let _lifecycle = self.lifecycle.lock();
        self.initialized.store(false, Ordering::Release);
        self.clear_tables()?;
        self.shutdown.store(0, Ordering::Release);
        log::debug!("[OSAL IdMap] torn down");
        Ok(())
    }

    fn clear_tables(&self) -> Result<()> {
        for obj_type in ObjectType::ALL {
            let mut guard = self.lock_table(obj_type)?;
            let state = guard.state_mut();
            state.last_id_issued = ObjectId::UNDEFINED;
            state.records.iter_mut().for_each(|record| record.clear());
            guard.unlock()?;
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Raise (`true`) or clear (`false`) the shutdown sentinel.
    ///
    /// While raised, allocation and every non-REFCOUNT lookup fail fast so
    /// that REFCOUNT holders already in flight can drain.
    pub fn application_shutdown(&self, flag: bool) {
        if flag {
            log::info!("[OSAL IdMap] shutdown requested");
            self.shutdown.store(SHUTDOWN_MAGIC_NUMBER, Ordering::Release);
        } else {
            self.shutdown.store(0, Ordering::Release);
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire) == SHUTDOWN_MAGIC_NUMBER
    }

    /// Common entry checks for allocation and lookup.
    pub(crate) fn check_ready(&self, obj_type: ObjectType) -> Result<()> {
        if !self.is_initialized() {
            return Err(OsalError::Error);
        }
        if !obj_type.has_table() {
            return Err(OsalError::IncorrectObjType);
        }
        Ok(())
    }
}
