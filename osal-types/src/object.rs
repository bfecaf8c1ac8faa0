//! Object types
//!
//! Every OSAL resource belongs to exactly one of these categories. The
//! numeric value of a type is what ends up in the upper half of an
//! opaque [`ObjectId`](crate::ObjectId).

use core::fmt;

use crate::config;

/// Sentinel returned by [`base_for_type`] for types that own no table.
pub const OBJECT_BASE_INVALID: u32 = u32::MAX;

/// Resource category.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectType {
    /// Never a valid type; an ID of this type is always invalid.
    Undefined = 0x00,
    Task = 0x01,
    Queue = 0x02,
    CountSem = 0x03,
    BinSem = 0x04,
    Mutex = 0x05,
    Stream = 0x06,
    Dir = 0x07,
    TimeBase = 0x08,
    TimerCb = 0x09,
    Module = 0x0A,
    FileSys = 0x0B,
    Console = 0x0C,
    /// First value reserved for application-defined types. Owns no table.
    User = 0x10,
}

impl ObjectType {
    /// All types that own a record table, in table order.
    pub const ALL: [ObjectType; 12] = [
        ObjectType::Task,
        ObjectType::Queue,
        ObjectType::CountSem,
        ObjectType::BinSem,
        ObjectType::Mutex,
        ObjectType::Stream,
        ObjectType::Dir,
        ObjectType::TimeBase,
        ObjectType::TimerCb,
        ObjectType::Module,
        ObjectType::FileSys,
        ObjectType::Console,
    ];

    /// Number of slots needed for a per-type array indexed by `as_index()`.
    pub const TABLE_COUNT: usize = ObjectType::User as usize;

    /// Decode a raw type value.
    pub const fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0x00 => ObjectType::Undefined,
            0x01 => ObjectType::Task,
            0x02 => ObjectType::Queue,
            0x03 => ObjectType::CountSem,
            0x04 => ObjectType::BinSem,
            0x05 => ObjectType::Mutex,
            0x06 => ObjectType::Stream,
            0x07 => ObjectType::Dir,
            0x08 => ObjectType::TimeBase,
            0x09 => ObjectType::TimerCb,
            0x0A => ObjectType::Module,
            0x0B => ObjectType::FileSys,
            0x0C => ObjectType::Console,
            0x10 => ObjectType::User,
            _ => return None,
        })
    }

    /// Raw numeric value.
    pub const fn as_raw(self) -> u32 {
        self as u32
    }

    /// Position of this type in a per-type array.
    pub const fn as_index(self) -> usize {
        self as usize
    }

    /// Whether this type owns a record table.
    pub const fn has_table(self) -> bool {
        max_for_type(self) != 0
    }

    /// Short lowercase name, used in log output.
    pub const fn name(self) -> &'static str {
        match self {
            ObjectType::Undefined => "undefined",
            ObjectType::Task => "task",
            ObjectType::Queue => "queue",
            ObjectType::CountSem => "countsem",
            ObjectType::BinSem => "binsem",
            ObjectType::Mutex => "mutex",
            ObjectType::Stream => "stream",
            ObjectType::Dir => "dir",
            ObjectType::TimeBase => "timebase",
            ObjectType::TimerCb => "timercb",
            ObjectType::Module => "module",
            ObjectType::FileSys => "filesys",
            ObjectType::Console => "console",
            ObjectType::User => "user",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Table capacity of `obj_type`, or 0 if the type owns no table.
pub const fn max_for_type(obj_type: ObjectType) -> u32 {
    match obj_type {
        ObjectType::Task => config::MAX_TASKS,
        ObjectType::Queue => config::MAX_QUEUES,
        ObjectType::BinSem => config::MAX_BIN_SEMAPHORES,
        ObjectType::CountSem => config::MAX_COUNT_SEMAPHORES,
        ObjectType::Mutex => config::MAX_MUTEXES,
        ObjectType::Stream => config::MAX_NUM_OPEN_FILES,
        ObjectType::Dir => config::MAX_NUM_OPEN_DIRS,
        ObjectType::TimeBase => config::MAX_TIMEBASES,
        ObjectType::TimerCb => config::MAX_TIMERS,
        ObjectType::Module => config::MAX_MODULES,
        ObjectType::FileSys => config::MAX_FILE_SYSTEMS,
        ObjectType::Console => config::MAX_CONSOLES,
        ObjectType::Undefined | ObjectType::User => 0,
    }
}

/// Same as [`max_for_type`] for an undecoded raw type value.
pub const fn max_for_raw_type(raw: u32) -> u32 {
    match ObjectType::from_raw(raw) {
        Some(obj_type) => max_for_type(obj_type),
        None => 0,
    }
}

/// Offset of `obj_type` within the combined record space, or
/// [`OBJECT_BASE_INVALID`] if the type owns no table.
pub const fn base_for_type(obj_type: ObjectType) -> u32 {
    const TASK: u32 = 0;
    const QUEUE: u32 = TASK + config::MAX_TASKS;
    const BINSEM: u32 = QUEUE + config::MAX_QUEUES;
    const COUNTSEM: u32 = BINSEM + config::MAX_BIN_SEMAPHORES;
    const MUTEX: u32 = COUNTSEM + config::MAX_COUNT_SEMAPHORES;
    const STREAM: u32 = MUTEX + config::MAX_MUTEXES;
    const DIR: u32 = STREAM + config::MAX_NUM_OPEN_FILES;
    const TIMEBASE: u32 = DIR + config::MAX_NUM_OPEN_DIRS;
    const TIMECB: u32 = TIMEBASE + config::MAX_TIMEBASES;
    const MODULE: u32 = TIMECB + config::MAX_TIMERS;
    const FILESYS: u32 = MODULE + config::MAX_MODULES;
    const CONSOLE: u32 = FILESYS + config::MAX_FILE_SYSTEMS;

    match obj_type {
        ObjectType::Task => TASK,
        ObjectType::Queue => QUEUE,
        ObjectType::BinSem => BINSEM,
        ObjectType::CountSem => COUNTSEM,
        ObjectType::Mutex => MUTEX,
        ObjectType::Stream => STREAM,
        ObjectType::Dir => DIR,
        ObjectType::TimeBase => TIMEBASE,
        ObjectType::TimerCb => TIMECB,
        ObjectType::Module => MODULE,
        ObjectType::FileSys => FILESYS,
        ObjectType::Console => CONSOLE,
        ObjectType::Undefined | ObjectType::User => OBJECT_BASE_INVALID,
    }
}

/// Same as [`base_for_type`] for an undecoded raw type value.
pub const fn base_for_raw_type(raw: u32) -> u32 {
    match ObjectType::from_raw(raw) {
        Some(obj_type) => base_for_type(obj_type),
        None => OBJECT_BASE_INVALID,
    }
}
