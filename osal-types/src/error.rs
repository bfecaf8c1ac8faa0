//! OSAL error types

use core::fmt;

/// Error returned by the object ID layer.
///
/// Every variant maps onto a stable numeric OSAL status code, so resource
/// layers that speak the classic integer API can translate losslessly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsalError {
    /// Generic failure, including lock-primitive failures in a backend.
    Error,
    /// Missing or zero-length output buffer.
    InvalidPointer,
    /// Name length (including terminator) exceeds `MAX_API_NAME`.
    NameTooLong,
    /// Table for the requested type is full.
    NoFreeIds,
    /// Another live object of the same type already has this name.
    NameTaken,
    /// Stale or malformed ID.
    InvalidId,
    /// No record matched the name or predicate.
    NameNotFound,
    /// Object type is configured with zero capacity.
    NotImplemented,
    /// Exclusive access requested while the object is referenced.
    ObjectInUse,
    /// Operation not allowed in the current state (shutdown, double release).
    IncorrectObjState,
    /// Object type out of range.
    IncorrectObjType,
}

/// Result type for object ID operations.
pub type Result<T> = core::result::Result<T, OsalError>;

/// Status code for success.
pub const OS_SUCCESS: i32 = 0;

impl OsalError {
    const ALL: [OsalError; 11] = [
        OsalError::Error,
        OsalError::InvalidPointer,
        OsalError::NameTooLong,
        OsalError::NoFreeIds,
        OsalError::NameTaken,
        OsalError::InvalidId,
        OsalError::NameNotFound,
        OsalError::NotImplemented,
        OsalError::ObjectInUse,
        OsalError::IncorrectObjState,
        OsalError::IncorrectObjType,
    ];

    /// Numeric OSAL status code.
    pub const fn code(self) -> i32 {
        match self {
            OsalError::Error => -1,
            OsalError::InvalidPointer => -2,
            OsalError::NameTooLong => -13,
            OsalError::NoFreeIds => -14,
            OsalError::NameTaken => -15,
            OsalError::InvalidId => -16,
            OsalError::NameNotFound => -17,
            OsalError::NotImplemented => -28,
            OsalError::ObjectInUse => -33,
            OsalError::IncorrectObjState => -35,
            OsalError::IncorrectObjType => -36,
        }
    }

    /// Canonical status name, e.g. `OS_ERR_INVALID_ID`.
    pub const fn name(self) -> &'static str {
        match self {
            OsalError::Error => "OS_ERROR",
            OsalError::InvalidPointer => "OS_INVALID_POINTER",
            OsalError::NameTooLong => "OS_ERR_NAME_TOO_LONG",
            OsalError::NoFreeIds => "OS_ERR_NO_FREE_IDS",
            OsalError::NameTaken => "OS_ERR_NAME_TAKEN",
            OsalError::InvalidId => "OS_ERR_INVALID_ID",
            OsalError::NameNotFound => "OS_ERR_NAME_NOT_FOUND",
            OsalError::NotImplemented => "OS_ERR_NOT_IMPLEMENTED",
            OsalError::ObjectInUse => "OS_ERR_OBJECT_IN_USE",
            OsalError::IncorrectObjState => "OS_ERR_INCORRECT_OBJ_STATE",
            OsalError::IncorrectObjType => "OS_ERR_INCORRECT_OBJ_TYPE",
        }
    }

    /// Decode a numeric status code. `OS_SUCCESS` and unknown codes give `None`.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|err| err.code() == code)
    }

    /// Whether retrying later may succeed.
    ///
    /// Exhausted tables and referenced objects are transient; stale IDs and
    /// bad types are caller bugs and retrying will not help.
    pub const fn is_transient(self) -> bool {
        matches!(self, OsalError::NoFreeIds | OsalError::ObjectInUse)
    }
}

impl fmt::Display for OsalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            OsalError::Error => "generic OSAL failure",
            OsalError::InvalidPointer => "invalid pointer",
            OsalError::NameTooLong => "name too long",
            OsalError::NoFreeIds => "no free IDs",
            OsalError::NameTaken => "name already taken",
            OsalError::InvalidId => "invalid ID",
            OsalError::NameNotFound => "name not found",
            OsalError::NotImplemented => "not implemented",
            OsalError::ObjectInUse => "object in use",
            OsalError::IncorrectObjState => "incorrect object state",
            OsalError::IncorrectObjType => "incorrect object type",
        };
        write!(f, "{} ({})", text, self.code())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for OsalError {}

/// Name of a raw status code, including `OS_SUCCESS`.
pub fn error_name(code: i32) -> Option<&'static str> {
    if code == OS_SUCCESS {
        return Some("OS_SUCCESS");
    }
    OsalError::from_code(code).map(OsalError::name)
}

/// Collapse a result into the classic integer status.
pub fn status_code<T>(result: &Result<T>) -> i32 {
    match result {
        Ok(_) => OS_SUCCESS,
        Err(err) => err.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_round_trip() {
        for err in OsalError::ALL {
            assert_eq!(OsalError::from_code(err.code()), Some(err));
        }
        assert_eq!(OsalError::from_code(OS_SUCCESS), None);
        assert_eq!(OsalError::from_code(-9999), None);
    }

    #[test]
    fn test_error_names() {
        assert_eq!(error_name(0), Some("OS_SUCCESS"));
        assert_eq!(error_name(-16), Some("OS_ERR_INVALID_ID"));
        assert_eq!(error_name(-36), Some("OS_ERR_INCORRECT_OBJ_TYPE"));
        assert_eq!(error_name(12345), None);
    }

    #[test]
    fn test_transient_classification() {
        assert!(OsalError::NoFreeIds.is_transient());
        assert!(OsalError::ObjectInUse.is_transient());
        assert!(!OsalError::InvalidId.is_transient());
        assert!(!OsalError::IncorrectObjType.is_transient());
    }

    #[test]
    fn test_status_code() {
        assert_eq!(status_code(&Ok::<u32, OsalError>(7)), OS_SUCCESS);
        assert_eq!(status_code::<()>(&Err(OsalError::NameTaken)), -15);
    }
}
