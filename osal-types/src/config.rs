//! OSAL configuration constants.
//!
//! Compile-time limits for the resource tables. Every object type owns a
//! fixed-capacity table; the sum of the capacities forms the combined
//! record space that `base_for_type` indexes into.

/// Maximum number of tasks.
pub const MAX_TASKS: u32 = 64;

/// Maximum number of message queues.
pub const MAX_QUEUES: u32 = 64;

/// Maximum number of counting semaphores.
pub const MAX_COUNT_SEMAPHORES: u32 = 20;

/// Maximum number of binary semaphores.
pub const MAX_BIN_SEMAPHORES: u32 = 20;

/// Maximum number of mutexes.
pub const MAX_MUTEXES: u32 = 20;

/// Maximum number of simultaneously open file streams.
pub const MAX_NUM_OPEN_FILES: u32 = 50;

/// Maximum number of simultaneously open directories.
pub const MAX_NUM_OPEN_DIRS: u32 = 4;

/// Maximum number of timebases.
pub const MAX_TIMEBASES: u32 = 5;

/// Maximum number of timer callbacks.
pub const MAX_TIMERS: u32 = 5;

/// Maximum number of loadable modules.
pub const MAX_MODULES: u32 = 20;

/// Maximum number of filesystem mount entries.
pub const MAX_FILE_SYSTEMS: u32 = 14;

/// Number of console devices (normally one, for printf output).
pub const MAX_CONSOLES: u32 = 1;

/// Maximum object name length, including the terminating NUL.
///
/// A name must be strictly shorter than this to be accepted.
pub const MAX_API_NAME: usize = 20;

/// Mask selecting the serial number bits of an opaque ID.
pub const OBJECT_INDEX_MASK: u32 = 0xFFFF;

/// Bit position of the object type within an opaque ID.
pub const OBJECT_TYPE_SHIFT: u32 = 16;

/// Value written to the shutdown flag while a shutdown is in progress.
pub const SHUTDOWN_MAGIC_NUMBER: u32 = 0xABAD_C0DE;

/// Number of passes `delete_all_objects` makes before giving up.
pub const DELETE_ALL_MAX_PASSES: u32 = 5;

/// Delay (in backend ticks) between `delete_all_objects` passes.
pub const DELETE_ALL_RETRY_DELAY: u32 = 5;

/// Sum of all table capacities.
pub const MAX_TOTAL_RECORDS: u32 = MAX_TASKS
    + MAX_QUEUES
    + MAX_BIN_SEMAPHORES
    + MAX_COUNT_SEMAPHORES
    + MAX_MUTEXES
    + MAX_NUM_OPEN_FILES
    + MAX_NUM_OPEN_DIRS
    + MAX_TIMEBASES
    + MAX_TIMERS
    + MAX_MODULES
    + MAX_FILE_SYSTEMS
    + MAX_CONSOLES;

// Every capacity must fit the serial space, otherwise two live serials
// could decode to the same slot.
const _: () = {
    assert!(MAX_TASKS <= OBJECT_INDEX_MASK);
    assert!(MAX_QUEUES <= OBJECT_INDEX_MASK);
    assert!(MAX_NUM_OPEN_FILES <= OBJECT_INDEX_MASK);
    assert!(MAX_MODULES <= OBJECT_INDEX_MASK);
};
