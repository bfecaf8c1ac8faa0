//! POSIX backend
//!
//! Each table lock is a `parking_lot` raw mutex. All signals are blocked
//! before the first table is locked on a thread, so a signal handler can
//! never re-enter a table the interrupted thread already holds. The mask
//! from before that first lock is restored once the thread's last table is
//! unlocked, whatever order the tables are released in.

use core::cell::Cell;
use core::mem::MaybeUninit;
use std::time::Duration;

use parking_lot::lock_api::RawMutex as _;
use parking_lot::RawMutex;

use osal_types::{ObjectId, ObjectType, OsalError, Result};

use super::OsBackend;

std::thread_local! {
    static CURRENT_TASK: Cell<ObjectId> = const { Cell::new(ObjectId::UNDEFINED) };
    /// Table locks held by this thread.
    static HELD_LOCKS: Cell<u32> = const { Cell::new(0) };
    /// Signal mask from before the first held lock.
    static SAVED_MASK: Cell<Option<libc::sigset_t>> = const { Cell::new(None) };
}

/// Blocking per-type locks for POSIX hosts.
pub struct PosixBackend {
    locks: [RawMutex; ObjectType::TABLE_COUNT],
}

impl PosixBackend {
    pub const fn new() -> Self {
        const UNLOCKED: RawMutex = RawMutex::INIT;
        PosixBackend {
            locks: [UNLOCKED; ObjectType::TABLE_COUNT],
        }
    }

    /// Tag the calling thread with a task ID.
    pub fn set_current_task(&self, task: ObjectId) {
        CURRENT_TASK.with(|current| current.set(task));
    }

    /// Number of table locks held by the calling thread.
    pub fn held_locks(&self) -> u32 {
        HELD_LOCKS.with(Cell::get)
    }

    fn lock_for(&self, obj_type: ObjectType) -> Result<&RawMutex> {
        self.locks
            .get(obj_type.as_index())
            .ok_or(OsalError::IncorrectObjType)
    }
}

impl Default for PosixBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Block every signal on this thread and return the previous mask.
fn block_all_signals() -> Result<libc::sigset_t> {
    // SAFETY: both sets are initialized by sigfillset / pthread_sigmask.
    unsafe {
        let mut all = MaybeUninit::<libc::sigset_t>::uninit();
        let mut previous = MaybeUninit::<libc::sigset_t>::uninit();
        libc::sigfillset(all.as_mut_ptr());
        let rc = libc::pthread_sigmask(libc::SIG_SETMASK, all.as_ptr(), previous.as_mut_ptr());
        if rc != 0 {
            log::error!("[OSAL Posix] pthread_sigmask failed: {}", rc);
            return Err(OsalError::Error);
        }
        Ok(previous.assume_init())
    }
}

fn restore_signals(mask: &libc::sigset_t) -> Result<()> {
    // SAFETY: `mask` is a valid set saved by `block_all_signals`.
    let rc = unsafe { libc::pthread_sigmask(libc::SIG_SETMASK, mask, core::ptr::null_mut()) };
    if rc != 0 {
        log::error!("[OSAL Posix] pthread_sigmask restore failed: {}", rc);
        return Err(OsalError::Error);
    }
    Ok(())
}

// SAFETY: each table lock is a raw mutex only unlocked by its holder;
// `table_mutex_init` never touches it.
unsafe impl OsBackend for PosixBackend {
    fn table_mutex_init(&self, obj_type: ObjectType) -> Result<()> {
        let mutex = self.lock_for(obj_type)?;
        if mutex.is_locked() {
            log::warn!("[OSAL Posix] {} table locked during init", obj_type);
            return Err(OsalError::Error);
        }
        Ok(())
    }

    unsafe fn lock_global(&self, obj_type: ObjectType) -> Result<()> {
        let mutex = self.lock_for(obj_type)?;
        let depth = HELD_LOCKS.with(Cell::get);
        if depth == 0 {
            let previous = block_all_signals()?;
            mutex.lock();
            SAVED_MASK.with(|saved| saved.set(Some(previous)));
        } else {
            mutex.lock();
        }
        HELD_LOCKS.with(|held| held.set(depth + 1));
        Ok(())
    }

    unsafe fn unlock_global(&self, obj_type: ObjectType) -> Result<()> {
        let mutex = self.lock_for(obj_type)?;
        let depth = HELD_LOCKS.with(Cell::get);
        if depth == 0 || !mutex.is_locked() {
            return Err(OsalError::Error);
        }
        // SAFETY: the caller holds this mutex.
        unsafe { mutex.unlock() };
        HELD_LOCKS.with(|held| held.set(depth - 1));
        if depth == 1 {
            if let Some(previous) = SAVED_MASK.with(Cell::take) {
                restore_signals(&previous)?;
            }
        }
        Ok(())
    }

    fn current_task_id(&self) -> ObjectId {
        CURRENT_TASK.with(Cell::get)
    }

    fn task_delay(&self, ticks: u32) {
        std::thread::sleep(Duration::from_millis(u64::from(ticks)));
    }
}
