//! Fundamental OSAL types
//!
//! Object types, opaque IDs, inline names, status codes and the
//! compile-time table limits. Shared by the object ID map and by every
//! resource layer that builds on it.

#![no_std]

#[cfg(feature = "std")]
extern crate std;

pub mod config;
pub mod error;
pub mod id;
pub mod name;
pub mod object;

pub use error::{error_name, status_code, OsalError, Result, OS_SUCCESS};
pub use id::{convert_to_array_index, identify_object, ObjectId};
pub use name::{object_name, ObjectName};
pub use object::{base_for_type, max_for_type, ObjectType, OBJECT_BASE_INVALID};

/// Prelude for common imports
pub mod prelude {
    pub use crate::{ObjectId, ObjectName, ObjectType, OsalError, Result};
}
