//! Core identifier types.

use std::num::NonZeroU64;

/// Identity of an entry within its filesystem.
///
/// Allocated from a per-filesystem counter at entry creation, so ids are
/// monotone in creation order. Multi-entry operations sort the participating
/// entries by id and take locks smaller-id first.
///
/// `0` is reserved for "unset/invalid"; use [`EntryId::new`] to construct.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct EntryId(NonZeroU64);

impl EntryId {
    #[inline]
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    #[inline]
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

/// Identity of a filesystem instance within the process.
///
/// Paths and principals are bound to the instance that produced them; two
/// values from different instances never compare equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct FsInstanceId(pub u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_entry_id_is_invalid() {
        assert!(EntryId::new(0).is_none());
        assert_eq!(EntryId::new(7).map(EntryId::get), Some(7));
    }

    #[test]
    fn entry_ids_order_by_raw_value() {
        let a = EntryId::new(1).unwrap();
        let b = EntryId::new(2).unwrap();
        assert!(a < b);
    }
}
