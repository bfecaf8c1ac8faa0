//! Object names
//!
//! Names live inline in the record tables, so they are fixed-capacity
//! strings rather than heap allocations. The capacity leaves room for the
//! terminator that the classic API writes when copying a name out.

use crate::config::MAX_API_NAME;
use crate::error::{OsalError, Result};

/// Inline object name. Holds at most `MAX_API_NAME - 1` bytes.
pub type ObjectName = heapless::String<MAX_API_NAME>;

/// Whether `name` fits in a record, leaving room for the terminator.
pub const fn name_fits(name: &str) -> bool {
    name.len() < MAX_API_NAME
}

/// Copy `name` into an [`ObjectName`].
///
/// Fails with `NameTooLong` if the name plus terminator would not fit.
pub fn object_name(name: &str) -> Result<ObjectName> {
    if !name_fits(name) {
        return Err(OsalError::NameTooLong);
    }
    let mut out = ObjectName::new();
    out.push_str(name).map_err(|_| OsalError::NameTooLong)?;
    Ok(out)
}
