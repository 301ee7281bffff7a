//! Events recorded and exchanged by [`NetworkTagContainer`](super::NetworkTagContainer).

use crate::registry::TagId;

/// Event type tag, as written on the wire (1 byte).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventType {
    Add = 0,
    Remove = 1,
    Value = 2,
    Clear = 3,
    Full = 4,
}

impl TryFrom<u8> for EventType {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0 => Ok(Self::Add),
            1 => Ok(Self::Remove),
            2 => Ok(Self::Value),
            3 => Ok(Self::Clear),
            4 => Ok(Self::Full),
            other => Err(other),
        }
    }
}

/// One `(tag, count)` slot of the replicated list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TagCountEntry {
    pub tag: TagId,
    pub count: u32,
}

impl TagCountEntry {
    pub const fn new(tag: TagId, count: u32) -> Self {
        Self { tag, count }
    }
}

/// A change applied to the replicated list.
///
/// `index` is the list position the event touched. On the authority these are
/// queued for the next flush; on both sides one is reported per applied
/// event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListEvent {
    /// `entry` was appended at `index`.
    Add { index: usize, entry: TagCountEntry },
    /// `entry` was removed from `index`.
    Remove { index: usize, entry: TagCountEntry },
    /// The slot at `index` now holds `entry`.
    Value { index: usize, entry: TagCountEntry },
    /// The list was emptied.
    Clear,
    /// The list was replaced by a full snapshot.
    Full,
}

impl ListEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            Self::Add { .. } => EventType::Add,
            Self::Remove { .. } => EventType::Remove,
            Self::Value { .. } => EventType::Value,
            Self::Clear => EventType::Clear,
            Self::Full => EventType::Full,
        }
    }

    pub fn entry(&self) -> Option<TagCountEntry> {
        match self {
            Self::Add { entry, .. } | Self::Remove { entry, .. } | Self::Value { entry, .. } => {
                Some(*entry)
            }
            Self::Clear | Self::Full => None,
        }
    }
}

/// A tag's count moved from `old_count` to `new_count`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TagCountChange {
    pub tag: TagId,
    pub old_count: u32,
    pub new_count: u32,
}

impl TagCountChange {
    pub fn was_added(&self) -> bool {
        self.old_count == 0 && self.new_count > 0
    }

    pub fn was_removed(&self) -> bool {
        self.old_count > 0 && self.new_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_bytes() {
        for ty in [
            EventType::Add,
            EventType::Remove,
            EventType::Value,
            EventType::Clear,
            EventType::Full,
        ] {
            assert_eq!(EventType::try_from(ty as u8), Ok(ty));
        }
        assert_eq!(EventType::try_from(5), Err(5));
    }

    #[test]
    fn change_direction() {
        let tag = TagId::new(1);
        let added = TagCountChange { tag, old_count: 0, new_count: 1 };
        let bumped = TagCountChange { tag, old_count: 1, new_count: 2 };
        let removed = TagCountChange { tag, old_count: 2, new_count: 0 };

        assert!(added.was_added() && !added.was_removed());
        assert!(!bumped.was_added() && !bumped.was_removed());
        assert!(removed.was_removed() && !removed.was_added());
    }
}
