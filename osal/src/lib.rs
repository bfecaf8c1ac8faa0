//! OSAL object ID map
//!
//! Every OSAL resource (task, queue, semaphore, mutex, timer, stream,
//! directory, timebase, module, filesystem, console) is known to the rest of
//! the system only by an opaque 32-bit [`ObjectId`]. This crate owns the
//! per-type record tables behind those IDs and the protocol for using them.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │   resource layers (task, queue, sem, ...)    │
//! ├──────────────────────────────────────────────┤
//! │                 osal (this crate)            │
//! │  ┌──────────┐ ┌────────┐ ┌──────┐ ┌───────┐  │
//! │  │ allocate │ │ lookup │ │ iter │ │ table │  │
//! │  └────┬─────┘ └───┬────┘ └──┬───┘ └───┬───┘  │
//! └───────┼───────────┼─────────┼─────────┼──────┘
//!         └───────────┴────┬────┴─────────┘
//!                          │
//!                  OsBackend (spin / posix)
//! ```
//!
//! # Modules
//!
//! - `backend`: per-type lock primitives supplied by the target OS
//! - `table`: record tables and the guard proving a table is locked
//! - `allocate`: two-phase allocate / finalize
//! - `lookup`: lookup by ID, name or predicate, lock modes, refcounts
//! - `iter`: walks over live objects, bulk deletion, resource names

#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

pub mod allocate;
pub mod backend;
pub mod idmap;
pub mod iter;
pub mod lookup;
pub mod record;
pub mod table;

pub use allocate::PendingObject;
pub use backend::{DefaultBackend, OsBackend, SpinBackend};
pub use idmap::{IdMap, IdMapConfig};
pub use lookup::{LockMode, ObjectHandle, ObjectToken};
pub use record::{ObjectRecord, RecordFlags};
pub use table::TableGuard;

#[cfg(all(feature = "posix", unix))]
pub use backend::PosixBackend;

pub use osal_types::{
    base_for_type, convert_to_array_index, error_name, identify_object, max_for_type, ObjectId,
    ObjectName, ObjectType, OsalError, Result,
};
pub use osal_types::id::to_array_index;

/// The process-wide ID map.
static OBJECT_ID_MAP: spin::Lazy<IdMap<DefaultBackend>> =
    spin::Lazy::new(|| IdMap::new(DefaultBackend::new()));

/// Access the process-wide ID map.
pub fn global() -> &'static IdMap<DefaultBackend> {
    &OBJECT_ID_MAP
}

/// Initialize the process-wide ID map.
pub fn init() -> Result<()> {
    log::info!("[OSAL] Initializing object ID map...");
    global().init()?;
    log::info!("[OSAL] Object ID map ready");
    Ok(())
}

/// Check if the process-wide ID map is ready
pub fn is_initialized() -> bool {
    global().is_initialized()
}

/// Prelude for common imports
pub mod prelude {
    pub use crate::{IdMap, LockMode, ObjectHandle, ObjectToken, OsBackend, PendingObject};
    pub use osal_types::prelude::*;
}
