//! Spinning backend for bare-metal and RTOS targets

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use critical_section::RestoreState;
use osal_types::{ObjectId, ObjectType, OsalError, Result};

use super::OsBackend;

/// Spin iterations per delay tick.
const SPINS_PER_TICK: u32 = 1_000;

/// Critical section shared by every table lock the current context holds.
struct HeldSection {
    /// Number of table locks held.
    depth: u32,
    /// Interrupt state from before the first lock, restored after the last.
    restore: Option<RestoreState>,
}

/// Atomic per-type locks, interrupts masked while any of them is held.
///
/// The critical section is entered before each lock attempt and left again
/// while spinning, so a contended lock never spins with interrupts off.
/// Once a table is locked the section stays entered until the last held
/// table is unlocked, whatever order the tables are released in.
pub struct SpinBackend {
    locks: [AtomicBool; ObjectType::TABLE_COUNT],
    held: UnsafeCell<HeldSection>,
    current_task: AtomicU32,
}

// `held` is only touched from inside the critical section.
unsafe impl Sync for SpinBackend {}
unsafe impl Send for SpinBackend {}

impl SpinBackend {
    pub const fn new() -> Self {
        const UNLOCKED: AtomicBool = AtomicBool::new(false);
        SpinBackend {
            locks: [UNLOCKED; ObjectType::TABLE_COUNT],
            held: UnsafeCell::new(HeldSection {
                depth: 0,
                restore: None,
            }),
            current_task: AtomicU32::new(0),
        }
    }

    /// Scheduler hook: record the task now running.
    pub fn set_current_task(&self, task: ObjectId) {
        self.current_task.store(task.as_raw(), Ordering::Release);
    }

    /// Number of table locks currently held.
    pub fn held_locks(&self) -> u32 {
        critical_section::with(|_| {
            // SAFETY: inside the critical section.
            unsafe { (*self.held.get()).depth }
        })
    }

    fn lock_for(&self, obj_type: ObjectType) -> Result<&AtomicBool> {
        self.locks
            .get(obj_type.as_index())
            .ok_or(OsalError::IncorrectObjType)
    }
}

impl Default for SpinBackend {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: `locks[t]` is taken by compare-exchange and only cleared by the
// holder; `table_mutex_init` never touches it.
unsafe impl OsBackend for SpinBackend {
    fn table_mutex_init(&self, obj_type: ObjectType) -> Result<()> {
        let lock = self.lock_for(obj_type)?;
        if lock.load(Ordering::Acquire) {
            log::warn!("[OSAL Spin] {} table locked during init", obj_type);
            return Err(OsalError::Error);
        }
        Ok(())
    }

    unsafe fn lock_global(&self, obj_type: ObjectType) -> Result<()> {
        let lock = self.lock_for(obj_type)?;
        loop {
            // SAFETY: released below, or kept as the outermost section until
            // the last table is unlocked.
            let restore = unsafe { critical_section::acquire() };
            if lock
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                // SAFETY: inside the critical section.
                let held = unsafe { &mut *self.held.get() };
                if held.depth == 0 {
                    held.restore = Some(restore);
                } else {
                    // Already inside the outer section; close the nested one.
                    // SAFETY: pairs with the acquire above, innermost first.
                    unsafe { critical_section::release(restore) };
                }
                held.depth += 1;
                return Ok(());
            }
            // SAFETY: pairs with the acquire above.
            unsafe { critical_section::release(restore) };
            while lock.load(Ordering::Relaxed) {
                core::hint::spin_loop();
            }
        }
    }

    unsafe fn unlock_global(&self, obj_type: ObjectType) -> Result<()> {
        let lock = self.lock_for(obj_type)?;
        if !lock.load(Ordering::Relaxed) {
            return Err(OsalError::Error);
        }
        // SAFETY: a held table lock means we are inside the critical section.
        let held = unsafe { &mut *self.held.get() };
        if held.depth == 0 {
            return Err(OsalError::Error);
        }
        lock.store(false, Ordering::Release);
        held.depth -= 1;
        if held.depth == 0 {
            if let Some(restore) = held.restore.take() {
                // SAFETY: the state came from the outermost `acquire`.
                unsafe { critical_section::release(restore) };
            }
        }
        Ok(())
    }

    fn current_task_id(&self) -> ObjectId {
        ObjectId::from_raw(self.current_task.load(Ordering::Acquire))
    }

    fn task_delay(&self, ticks: u32) {
        for _ in 0..ticks.saturating_mul(SPINS_PER_TICK) {
            core::hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{IdMap, LockMode};
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_lock_unlock() {
        let backend = SpinBackend::new();
        backend.table_mutex_init(ObjectType::Queue).unwrap();
        unsafe { backend.lock_global(ObjectType::Queue).unwrap() };
        assert_eq!(
            backend.table_mutex_init(ObjectType::Queue),
            Err(OsalError::Error)
        );
        unsafe { backend.unlock_global(ObjectType::Queue).unwrap() };
        backend.table_mutex_init(ObjectType::Queue).unwrap();
    }

    #[test]
    fn test_unlock_without_lock_fails() {
        let backend = SpinBackend::new();
        assert_eq!(
            unsafe { backend.unlock_global(ObjectType::Task) },
            Err(OsalError::Error)
        );
    }

    #[test]
    fn test_held_count_ignores_release_order() {
        let backend = SpinBackend::new();
        unsafe {
            backend.lock_global(ObjectType::Task).unwrap();
            backend.lock_global(ObjectType::Mutex).unwrap();
        }
        assert_eq!(backend.held_locks(), 2);
        unsafe { backend.unlock_global(ObjectType::Task).unwrap() };
        assert_eq!(backend.held_locks(), 1);
        unsafe { backend.unlock_global(ObjectType::Mutex).unwrap() };
        assert_eq!(backend.held_locks(), 0);
    }

    #[test]
    fn test_out_of_order_release_keeps_section_entered() {
        let map = IdMap::new(SpinBackend::new());
        map.init().unwrap();
        let task = map.allocate_new(ObjectType::Task, Some("t")).unwrap().commit().unwrap();
        let queue = map.allocate_new(ObjectType::Queue, Some("q")).unwrap().commit().unwrap();

        let task_handle = map.get_by_id(LockMode::Global, ObjectType::Task, task).unwrap();
        let queue_handle = map.get_by_id(LockMode::Global, ObjectType::Queue, queue).unwrap();
        task_handle.release().unwrap();

        let entered = Arc::new(AtomicBool::new(false));
        let other = {
            let entered = Arc::clone(&entered);
            thread::spawn(move || critical_section::with(|_| entered.store(true, Ordering::SeqCst)))
        };
        thread::sleep(Duration::from_millis(200));
        assert!(
            !entered.load(Ordering::SeqCst),
            "critical section must stay entered while the queue table is held"
        );

        queue_handle.release().unwrap();
        other.join().unwrap();
        assert!(entered.load(Ordering::SeqCst));
        assert_eq!(map.backend().held_locks(), 0);
    }

    #[test]
    fn test_current_task() {
        let backend = SpinBackend::new();
        assert_eq!(backend.current_task_id(), ObjectId::UNDEFINED);
        backend.set_current_task(ObjectId::from_raw(0x0001_0005));
        assert_eq!(backend.current_task_id(), ObjectId::from_raw(0x0001_0005));
    }
}
