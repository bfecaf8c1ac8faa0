//! Opaque object IDs
//!
//! An ID packs the object type into the upper 16 bits and a per-type serial
//! number into the lower 16 bits. The serial selects the table slot
//! (`serial % capacity`); the remaining serial bits act as a generation tag,
//! so a reused slot hands out a numerically different ID until the serial
//! space wraps. Zero is never a valid ID.

use core::fmt;

use crate::config::{OBJECT_INDEX_MASK, OBJECT_TYPE_SHIFT};
use crate::error::{OsalError, Result};
use crate::object::{max_for_type, ObjectType};

/// Opaque 32-bit resource identifier.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ObjectId(u32);

impl ObjectId {
    /// The "no object" value. Also marks a free table slot.
    pub const UNDEFINED: ObjectId = ObjectId(0);

    /// Wrap a raw value received from outside (no validation).
    pub const fn from_raw(raw: u32) -> Self {
        ObjectId(raw)
    }

    /// Raw value.
    pub const fn as_raw(self) -> u32 {
        self.0
    }

    pub const fn is_defined(self) -> bool {
        self.0 != 0
    }

    /// Raw type bits, not validated.
    pub const fn raw_type(self) -> u32 {
        self.0 >> OBJECT_TYPE_SHIFT
    }

    /// Serial number bits.
    pub const fn serial(self) -> u32 {
        self.0 & OBJECT_INDEX_MASK
    }

    /// Object type encoded in this ID, or `Undefined` for unknown bits.
    pub const fn object_type(self) -> ObjectType {
        match ObjectType::from_raw(self.raw_type()) {
            Some(obj_type) => obj_type,
            None => ObjectType::Undefined,
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl From<ObjectId> for u32 {
    fn from(id: ObjectId) -> u32 {
        id.0
    }
}

/// Build an ID from a type and serial number.
///
/// Fails with `InvalidId` for the undefined type or a serial outside the
/// index mask.
pub fn compose(obj_type: ObjectType, serial: u32) -> Result<ObjectId> {
    if obj_type == ObjectType::Undefined || (serial & !OBJECT_INDEX_MASK) != 0 {
        return Err(OsalError::InvalidId);
    }
    Ok(ObjectId((obj_type.as_raw() << OBJECT_TYPE_SHIFT) | serial))
}

/// Split an ID into its type and serial number.
///
/// Fails with `InvalidId` if the encoded type is unknown or owns no table.
pub fn decompose(id: ObjectId) -> Result<(ObjectType, u32)> {
    match ObjectType::from_raw(id.raw_type()) {
        Some(obj_type) if obj_type.has_table() => Ok((obj_type, id.serial())),
        _ => Err(OsalError::InvalidId),
    }
}

/// Serial number of `id`, which must be of type `obj_type`.
pub fn unmap(obj_type: ObjectType, id: ObjectId) -> Result<u32> {
    if id.raw_type() != obj_type.as_raw() {
        return Err(OsalError::InvalidId);
    }
    Ok(id.serial())
}

/// Zero-based table index of `id`, which must be of type `obj_type`.
///
/// This is the check every API taking a caller-supplied ID goes through.
pub fn to_array_index(obj_type: ObjectType, id: ObjectId) -> Result<usize> {
    let max = max_for_type(obj_type);
    if max == 0 {
        return Err(OsalError::InvalidId);
    }
    let serial = unmap(obj_type, id)?;
    Ok((serial % max) as usize)
}

/// Type of the object named by `id` (may be `Undefined`).
pub const fn identify_object(id: ObjectId) -> ObjectType {
    id.object_type()
}

/// Table index of `id` regardless of its type.
///
/// Lets applications key their own arrays by OSAL ID. Fails with
/// `IncorrectObjType` when the encoded type owns no table.
pub fn convert_to_array_index(id: ObjectId) -> Result<usize> {
    let obj_type = ObjectType::from_raw(id.raw_type()).ok_or(OsalError::IncorrectObjType)?;
    let max = max_for_type(obj_type);
    if max == 0 {
        return Err(OsalError::IncorrectObjType);
    }
    Ok((id.serial() % max) as usize)
}
