//! Per-slot object records

use bitflags::bitflags;
use osal_types::{ObjectId, ObjectName};

bitflags! {
    /// Record status flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RecordFlags: u16 {
        /// A task is waiting for exclusive access; new REFCOUNT holders back off.
        const EXCLUSIVE_REQUEST = 0x0001;
    }
}

/// Generic metadata for one resource instance.
///
/// A slot is free when `active_id` is [`ObjectId::UNDEFINED`]. Records are
/// only reachable through a locked table, so plain fields are enough.
#[derive(Debug, Clone, Default)]
pub struct ObjectRecord {
    pub(crate) active_id: ObjectId,
    pub(crate) name: Option<ObjectName>,
    pub(crate) creator: ObjectId,
    pub(crate) refcount: u16,
    pub(crate) flags: RecordFlags,
}

impl ObjectRecord {
    pub const fn active_id(&self) -> ObjectId {
        self.active_id
    }

    pub fn is_free(&self) -> bool {
        !self.active_id.is_defined()
    }

    /// Name of the object, `None` for anonymous objects.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Task that created the object.
    pub const fn creator(&self) -> ObjectId {
        self.creator
    }

    /// Outstanding REFCOUNT holders.
    pub const fn refcount(&self) -> u16 {
        self.refcount
    }

    pub const fn flags(&self) -> RecordFlags {
        self.flags
    }

    /// Return the slot to the free pool.
    pub(crate) fn clear(&mut self) {
        *self = ObjectRecord::default();
    }

    /// Claim a free slot for `id`.
    pub(crate) fn claim(&mut self, id: ObjectId, creator: ObjectId) {
        *self = ObjectRecord {
            active_id: id,
            creator,
            ..ObjectRecord::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osal_types::object_name;

    #[test]
    fn test_default_is_free() {
        let record = ObjectRecord::default();
        assert!(record.is_free());
        assert_eq!(record.name(), None);
        assert_eq!(record.refcount(), 0);
        assert!(record.flags().is_empty());
    }

    #[test]
    fn test_claim_resets_previous_state() {
        let mut record = ObjectRecord {
            active_id: ObjectId::from_raw(0x0001_0003),
            name: Some(object_name("old").unwrap()),
            creator: ObjectId::from_raw(0x0001_0001),
            refcount: 4,
            flags: RecordFlags::EXCLUSIVE_REQUEST,
        };
        record.claim(ObjectId::from_raw(0x0001_0043), ObjectId::from_raw(0x0001_0002));
        assert_eq!(record.active_id(), ObjectId::from_raw(0x0001_0043));
        assert_eq!(record.creator(), ObjectId::from_raw(0x0001_0002));
        assert_eq!(record.name(), None);
        assert_eq!(record.refcount(), 0);
        assert!(record.flags().is_empty());

        record.clear();
        assert!(record.is_free());
    }
}
