//! OS backends
//!
//! The ID map never touches a native lock primitive. Everything it needs
//! from the host OS goes through [`OsBackend`], implemented once per target
//! and selected at build time.
//!
//! # Backends
//!
//! - `SpinBackend`: atomic per-type locks with interrupts masked while held.
//!   Works anywhere `critical-section` has an implementation.
//! - `PosixBackend` (feature `posix`): blocking per-type mutexes with all
//!   signals blocked while held.

use osal_types::{ObjectId, ObjectType, Result};

mod spinlock;

#[cfg(all(feature = "posix", unix))]
mod posix;

pub use spinlock::SpinBackend;

#[cfg(all(feature = "posix", unix))]
pub use posix::PosixBackend;

/// Backend used by the process-wide ID map.
#[cfg(all(feature = "posix", unix))]
pub type DefaultBackend = PosixBackend;

/// Backend used by the process-wide ID map.
#[cfg(not(all(feature = "posix", unix)))]
pub type DefaultBackend = SpinBackend;

/// Services an OS implementation provides to the ID map.
///
/// Locks are per object type and are not recursive. While a type's lock is
/// held, the backend must keep asynchronous signals or interrupts from
/// re-entering the ID map on the same thread.
///
/// Only the ID map calls the lock pair. Applications reach a backend through
/// [`IdMap::backend`](crate::IdMap::backend) for the task hooks, and cannot
/// release a table out from under a live guard:
///
/// ```compile_fail
/// use osal::{IdMap, ObjectType, OsBackend, SpinBackend};
///
/// let map = IdMap::new(SpinBackend::new());
/// let _guard = map.lock_type(ObjectType::Task).unwrap();
/// map.backend().unlock_global(ObjectType::Task).unwrap();
/// ```
///
/// # Safety
///
/// Implementations must provide mutual exclusion per type: after
/// `lock_global(t)` returns `Ok`, no other call to `lock_global(t)` may
/// return `Ok` until the matching `unlock_global(t)`. `table_mutex_init`
/// must never release or reset a lock that is currently held. The record
/// tables rely on this for exclusive access.
pub unsafe trait OsBackend: Send + Sync {
    /// One-time setup of the lock guarding `obj_type`'s table.
    fn table_mutex_init(&self, obj_type: ObjectType) -> Result<()>;

    /// Acquire the lock guarding `obj_type`'s table, blocking if contended.
    ///
    /// # Safety
    ///
    /// Every successful call must be paired with exactly one
    /// `unlock_global` from the same thread.
    unsafe fn lock_global(&self, obj_type: ObjectType) -> Result<()>;

    /// Release the lock guarding `obj_type`'s table.
    ///
    /// # Safety
    ///
    /// The calling thread must hold the lock, and nothing may still borrow
    /// the table it guards.
    unsafe fn unlock_global(&self, obj_type: ObjectType) -> Result<()>;

    /// ID of the calling task, recorded as the creator of new objects.
    fn current_task_id(&self) -> ObjectId {
        ObjectId::UNDEFINED
    }

    /// Give other tasks a chance to run before a retry.
    fn task_delay(&self, _ticks: u32) {}
}
