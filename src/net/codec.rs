//! Wire codec for the delta protocol.
//!
//! All integers are little-endian.
//!
//! ```text
//! delta    := u16 event_count, event*
//! event    := u8 type, payload
//!   Add    (0) := entry
//!   Remove (1) := entry
//!   Value  (2) := i32 index, entry
//!   Clear  (3) := (nothing)
//!   Full   (4) := snapshot
//! snapshot := u16 entry_count, entry*
//! entry    := i32 tag_id, u32 count
//! ```
//!
//! A full resync inside the delta stream is written as a one-event delta
//! carrying a `Full` event.
//!
//! Decoding is all-or-nothing: a payload is parsed completely before any of
//! it is applied.

use zerocopy::byteorder::little_endian::{I32, U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use super::event::{EventType, ListEvent, TagCountEntry};
use crate::error::SyncError;
use crate::registry::TagId;

#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Clone, Copy, Debug)]
#[repr(C)]
struct WireEntry {
    tag_id: I32,
    count: U32,
}

impl WireEntry {
    fn from_entry(entry: TagCountEntry) -> Self {
        Self {
            tag_id: I32::new(entry.tag.raw()),
            count: U32::new(entry.count),
        }
    }

    fn to_entry(self) -> Result<TagCountEntry, SyncError> {
        let raw = self.tag_id.get();
        let tag = TagId::from_raw(raw).ok_or(SyncError::InvalidTagId(raw))?;
        Ok(TagCountEntry::new(tag, self.count.get()))
    }
}

/// A decoded event, before it is applied to a list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WireEvent {
    Add(TagCountEntry),
    Remove(TagCountEntry),
    /// The index is unchecked; applying decides whether it is in range.
    Value { index: i32, entry: TagCountEntry },
    Clear,
    Full(Vec<TagCountEntry>),
}

// =============================================================================
// Encoding
// =============================================================================

/// Encode queued events as a delta payload.
///
/// `Full` markers are local notifications and are not encoded.
pub fn encode_delta(events: &[ListEvent]) -> Result<Vec<u8>, SyncError> {
    let count = events.iter().filter(|e| !matches!(e, ListEvent::Full)).count();
    let mut out = Vec::with_capacity(2 + count * 13);
    write_len(&mut out, count)?;

    for event in events {
        match *event {
            ListEvent::Add { entry, .. } => {
                out.push(EventType::Add as u8);
                out.extend_from_slice(WireEntry::from_entry(entry).as_bytes());
            }
            ListEvent::Remove { entry, .. } => {
                out.push(EventType::Remove as u8);
                out.extend_from_slice(WireEntry::from_entry(entry).as_bytes());
            }
            ListEvent::Value { index, entry } => {
                out.push(EventType::Value as u8);
                let index = i32::try_from(index).map_err(|_| SyncError::TooManyEntries(index))?;
                out.extend_from_slice(I32::new(index).as_bytes());
                out.extend_from_slice(WireEntry::from_entry(entry).as_bytes());
            }
            ListEvent::Clear => out.push(EventType::Clear as u8),
            ListEvent::Full => {}
        }
    }
    Ok(out)
}

/// Encode a delta payload that replaces the receiver's whole list.
pub fn encode_full_delta(entries: &[TagCountEntry]) -> Result<Vec<u8>, SyncError> {
    let mut out = Vec::with_capacity(5 + entries.len() * 8);
    write_len(&mut out, 1)?;
    out.push(EventType::Full as u8);
    write_snapshot(&mut out, entries)?;
    Ok(out)
}

/// Encode a bare snapshot (entry count plus entries).
pub fn encode_snapshot(entries: &[TagCountEntry]) -> Result<Vec<u8>, SyncError> {
    let mut out = Vec::with_capacity(2 + entries.len() * 8);
    write_snapshot(&mut out, entries)?;
    Ok(out)
}

fn write_snapshot(out: &mut Vec<u8>, entries: &[TagCountEntry]) -> Result<(), SyncError> {
    write_len(out, entries.len())?;
    for &entry in entries {
        out.extend_from_slice(WireEntry::from_entry(entry).as_bytes());
    }
    Ok(())
}

fn write_len(out: &mut Vec<u8>, len: usize) -> Result<(), SyncError> {
    let len = u16::try_from(len).map_err(|_| SyncError::TooManyEntries(len))?;
    out.extend_from_slice(U16::new(len).as_bytes());
    Ok(())
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode a delta payload.
pub fn decode_delta(bytes: &[u8]) -> Result<Vec<WireEvent>, SyncError> {
    let mut reader = WireReader::new(bytes);
    let count = reader.read::<U16>()?.get();
    let mut events = Vec::with_capacity(usize::from(count));

    for _ in 0..count {
        let byte = reader.read::<u8>()?;
        let ty = EventType::try_from(byte).map_err(SyncError::UnknownEventType)?;
        let event = match ty {
            EventType::Add => WireEvent::Add(reader.read_entry()?),
            EventType::Remove => WireEvent::Remove(reader.read_entry()?),
            EventType::Value => {
                let index = reader.read::<I32>()?.get();
                WireEvent::Value {
                    index,
                    entry: reader.read_entry()?,
                }
            }
            EventType::Clear => WireEvent::Clear,
            EventType::Full => WireEvent::Full(reader.read_snapshot()?),
        };
        events.push(event);
    }

    reader.finish()?;
    Ok(events)
}

/// Decode a bare snapshot payload.
pub fn decode_snapshot(bytes: &[u8]) -> Result<Vec<TagCountEntry>, SyncError> {
    let mut reader = WireReader::new(bytes);
    let entries = reader.read_snapshot()?;
    reader.finish()?;
    Ok(entries)
}

struct WireReader<'a> {
    buf: &'a [u8],
}

impl<'a> WireReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn read<T: FromBytes>(&mut self) -> Result<T, SyncError> {
        let (value, rest) = T::read_from_prefix(self.buf).map_err(|_| SyncError::Truncated {
            needed: std::mem::size_of::<T>(),
            remaining: self.buf.len(),
        })?;
        self.buf = rest;
        Ok(value)
    }

    fn read_entry(&mut self) -> Result<TagCountEntry, SyncError> {
        self.read::<WireEntry>()?.to_entry()
    }

    fn read_snapshot(&mut self) -> Result<Vec<TagCountEntry>, SyncError> {
        let count = self.read::<U16>()?.get();
        (0..count).map(|_| self.read_entry()).collect()
    }

    fn finish(self) -> Result<(), SyncError> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(SyncError::TrailingBytes(self.buf.len()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(tag: u32, count: u32) -> TagCountEntry {
        TagCountEntry::new(TagId::new(tag), count)
    }

    #[test]
    fn delta_layout_matches_wire_format() {
        let events = [
            ListEvent::Add { index: 0, entry: entry(3, 1) },
            ListEvent::Value { index: 0, entry: entry(3, 2) },
            ListEvent::Clear,
        ];
        let bytes = encode_delta(&events).unwrap();

        #[rustfmt::skip]
        let expected: Vec<u8> = vec![
            3, 0,                   // event count
            0, 3, 0, 0, 0, 1, 0, 0, 0,          // Add(3, 1)
            2, 0, 0, 0, 0, 3, 0, 0, 0, 2, 0, 0, 0, // Value(index 0, 3, 2)
            3,                      // Clear
        ];
        assert_eq!(bytes, expected);
    }

    #[test]
    fn full_delta_layout() {
        let bytes = encode_full_delta(&[entry(1, 4)]).unwrap();
        assert_eq!(bytes, vec![1, 0, 4, 1, 0, 1, 0, 0, 0, 4, 0, 0, 0]);

        let events = decode_delta(&bytes).unwrap();
        assert_eq!(events, vec![WireEvent::Full(vec![entry(1, 4)])]);
    }

    #[test]
    fn decodes_what_was_encoded() {
        let events = [
            ListEvent::Add { index: 0, entry: entry(1, 1) },
            ListEvent::Remove { index: 0, entry: entry(1, 1) },
            ListEvent::Value { index: 7, entry: entry(2, 9) },
            ListEvent::Clear,
        ];
        let decoded = decode_delta(&encode_delta(&events).unwrap()).unwrap();
        assert_eq!(
            decoded,
            vec![
                WireEvent::Add(entry(1, 1)),
                WireEvent::Remove(entry(1, 1)),
                WireEvent::Value { index: 7, entry: entry(2, 9) },
                WireEvent::Clear,
            ]
        );
    }

    #[test]
    fn full_markers_are_not_encoded() {
        let bytes = encode_delta(&[ListEvent::Full, ListEvent::Clear]).unwrap();
        assert_eq!(bytes, vec![1, 0, 3]);
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let bytes = encode_delta(&[ListEvent::Add { index: 0, entry: entry(1, 1) }]).unwrap();
        for len in 0..bytes.len() {
            assert!(
                matches!(decode_delta(&bytes[..len]), Err(SyncError::Truncated { .. })),
                "prefix of {} bytes should be truncated",
                len
            );
        }
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        assert!(matches!(
            decode_delta(&[1, 0, 9]),
            Err(SyncError::UnknownEventType(9))
        ));
    }

    #[test]
    fn negative_tag_id_is_rejected() {
        let bytes = [1, 0, 0, 0xff, 0xff, 0xff, 0xff, 1, 0, 0, 0];
        assert!(matches!(decode_delta(&bytes), Err(SyncError::InvalidTagId(-1))));
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        assert!(matches!(decode_delta(&[1, 0, 3, 3]), Err(SyncError::TrailingBytes(1))));
        assert!(matches!(decode_snapshot(&[0, 0, 1]), Err(SyncError::TrailingBytes(1))));
    }

    #[test]
    fn snapshot_decodes() {
        let entries = vec![entry(1, 2), entry(5, 1)];
        let bytes = encode_snapshot(&entries).unwrap();
        assert_eq!(bytes.len(), 2 + 2 * 8);
        assert_eq!(decode_snapshot(&bytes).unwrap(), entries);
    }

    #[test]
    fn oversized_lists_are_rejected() {
        let entries = vec![entry(1, 1); usize::from(u16::MAX) + 1];
        assert!(matches!(
            encode_snapshot(&entries),
            Err(SyncError::TooManyEntries(_))
        ));
    }
}
