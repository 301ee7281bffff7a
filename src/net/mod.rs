//! Replicated tag container.
//!
//! One [`SyncRole::Authority`] owns the state and queues an event per
//! mutation; any number of [`SyncRole::Observer`]s apply the flushed payloads
//! to a mirror of the authority's list.
//!
//! The list is an ordered `Vec` of `(tag, count)` slots. `Value` events address
//! slots by position, so sender and receiver must see events in the same
//! order. That holds as long as every mutation goes through this type.
//!
//! ```text
//!   Authority                         Observer
//!   add_tag ─┐
//!   add_tag ─┼─► pending ─► flush ─► bytes ─► apply_delta ─► list + counts
//!   clear   ─┘                                     │
//!                                                  └─► drain_list_events
//!                                                      drain_tag_changes
//! ```

pub mod codec;
mod event;
mod transport;

pub use codec::WireEvent;
pub use event::{EventType, ListEvent, TagCountChange, TagCountEntry};
pub use transport::{QueueTransport, Transport};

use std::collections::{HashMap, VecDeque, vec_deque};
use std::sync::Arc;

use tracing::warn;

use crate::container::TagContainer;
use crate::error::SyncError;
use crate::registry::{TagId, TagRegistry};
use crate::tag::GameplayTag;

/// Which side of the replication a container is on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SyncRole {
    /// Accepts local mutations and produces payloads.
    Authority,
    /// Applies received payloads. Local mutation is refused.
    Observer,
}

/// What the next flush will carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SyncState {
    /// Nothing to send.
    Clean,
    /// Queued events, sent one by one.
    DirtyDelta,
    /// A complete snapshot, superseding any queued events.
    DirtyFull,
}

/// Notifications buffered per queue before the oldest are dropped.
pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 1024;

/// Most list entries a full snapshot can carry.
pub const MAX_LIST_ENTRIES: usize = u16::MAX as usize;

/// Counted tag container replicated from one authority to its observers.
///
/// The list holds at most [`MAX_LIST_ENTRIES`] distinct tags (or less, see
/// [`with_max_entries`](Self::with_max_entries)), since a full snapshot
/// counts its entries in a u16. Adding a new tag to a full list is refused.
///
/// Notifications are kept in two bounded queues until drained. When a queue
/// is full the oldest notification is dropped.
#[derive(Debug)]
pub struct NetworkTagContainer {
    registry: Arc<TagRegistry>,
    role: SyncRole,
    list: Vec<TagCountEntry>,
    counts: HashMap<TagId, u32>,
    /// Events queued since the last flush (authority only).
    pending: Vec<ListEvent>,
    full_sync_pending: bool,
    max_entries: usize,
    notification_capacity: usize,
    list_events: VecDeque<ListEvent>,
    tag_changes: VecDeque<TagCountChange>,
}

impl NetworkTagContainer {
    pub fn new(registry: Arc<TagRegistry>, role: SyncRole) -> Self {
        Self {
            registry,
            role,
            list: Vec::new(),
            counts: HashMap::new(),
            pending: Vec::new(),
            full_sync_pending: false,
            max_entries: MAX_LIST_ENTRIES,
            notification_capacity: DEFAULT_NOTIFICATION_CAPACITY,
            list_events: VecDeque::new(),
            tag_changes: VecDeque::new(),
        }
    }

    /// Cap the number of distinct tags. Clamped to [`MAX_LIST_ENTRIES`].
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.min(MAX_LIST_ENTRIES);
        self
    }

    /// Notifications kept per queue until drained. `0` keeps none.
    ///
    /// Default: [`DEFAULT_NOTIFICATION_CAPACITY`]
    pub fn with_notification_capacity(mut self, capacity: usize) -> Self {
        self.notification_capacity = capacity;
        let excess = self.list_events.len().saturating_sub(capacity);
        self.list_events.drain(..excess);
        let excess = self.tag_changes.len().saturating_sub(capacity);
        self.tag_changes.drain(..excess);
        self
    }

    pub fn authority(registry: Arc<TagRegistry>) -> Self {
        Self::new(registry, SyncRole::Authority)
    }

    pub fn observer(registry: Arc<TagRegistry>) -> Self {
        Self::new(registry, SyncRole::Observer)
    }

    #[inline]
    pub fn role(&self) -> SyncRole {
        self.role
    }

    pub fn registry_handle(&self) -> &Arc<TagRegistry> {
        &self.registry
    }

    /// The replicated list, in wire order.
    pub fn entries(&self) -> &[TagCountEntry] {
        &self.list
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    #[inline]
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Events queued for the next delta flush.
    pub fn pending_events(&self) -> &[ListEvent] {
        &self.pending
    }

    // =========================================================================
    // Sending
    // =========================================================================

    pub fn sync_state(&self) -> SyncState {
        if self.full_sync_pending {
            SyncState::DirtyFull
        } else if !self.pending.is_empty() {
            SyncState::DirtyDelta
        } else {
            SyncState::Clean
        }
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.sync_state() != SyncState::Clean
    }

    /// Force the next flush to carry the whole list (first connect, reset).
    pub fn mark_full_sync(&mut self) {
        self.full_sync_pending = true;
    }

    /// Encode what the next flush would send, without consuming it.
    ///
    /// More queued events than a u16 can count are sent as a full snapshot.
    pub fn encode_pending(&self) -> Result<Option<Vec<u8>>, SyncError> {
        match self.sync_state() {
            SyncState::Clean => Ok(None),
            SyncState::DirtyDelta if self.pending.len() <= usize::from(u16::MAX) => {
                codec::encode_delta(&self.pending).map(Some)
            }
            SyncState::DirtyDelta | SyncState::DirtyFull => {
                codec::encode_full_delta(&self.list).map(Some)
            }
        }
    }

    /// Drop queued events and the full-sync flag.
    pub fn reset_dirty(&mut self) {
        self.pending.clear();
        self.full_sync_pending = false;
    }

    /// Encode pending changes and return to [`SyncState::Clean`].
    ///
    /// Returns `None` when there is nothing to send. On error nothing is
    /// consumed.
    pub fn flush(&mut self) -> Result<Option<Vec<u8>>, SyncError> {
        let payload = self.encode_pending()?;
        if payload.is_some() {
            self.reset_dirty();
        }
        Ok(payload)
    }

    /// Flush through `transport`. Pending changes are kept if the send fails.
    ///
    /// Returns whether anything was sent.
    pub fn flush_to<T: Transport>(&mut self, transport: &mut T) -> Result<bool, SyncError> {
        let Some(payload) = self.encode_pending()? else {
            return Ok(false);
        };
        transport
            .send(payload)
            .map_err(|err| SyncError::Transport(Box::new(err)))?;
        self.reset_dirty();
        Ok(true)
    }

    /// Bare snapshot of the list, for a late joiner.
    pub fn write_snapshot(&self) -> Result<Vec<u8>, SyncError> {
        codec::encode_snapshot(&self.list)
    }

    // =========================================================================
    // Receiving
    // =========================================================================

    /// Apply a delta payload produced by an authority's flush.
    ///
    /// The payload is decoded in full before anything is applied; a malformed
    /// payload changes nothing. Events that do not fit the current list (a
    /// `Value` index out of range, a `Remove` for an absent tag) are dropped
    /// and the rest still apply. Returns the number of applied events.
    pub fn apply_delta(&mut self, bytes: &[u8]) -> Result<usize, SyncError> {
        self.require_observer()?;
        let events = codec::decode_delta(bytes)?;
        let mut applied = 0;
        for event in events {
            if self.apply_wire_event(event) {
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// Replace the whole list from a bare snapshot.
    pub fn read_snapshot(&mut self, bytes: &[u8]) -> Result<(), SyncError> {
        self.require_observer()?;
        let entries = codec::decode_snapshot(bytes)?;
        self.replace_all(entries);
        Ok(())
    }

    fn require_observer(&self) -> Result<(), SyncError> {
        match self.role {
            SyncRole::Observer => Ok(()),
            SyncRole::Authority => Err(SyncError::NotObserver),
        }
    }

    fn apply_wire_event(&mut self, event: WireEvent) -> bool {
        match event {
            WireEvent::Add(entry) => {
                self.warn_if_unknown(entry.tag);
                self.list.push(entry);
                let index = self.list.len() - 1;
                self.record(ListEvent::Add { index, entry });
            }
            WireEvent::Remove(entry) => {
                let Some(index) = self.position(entry.tag) else {
                    warn!(tag = %entry.tag, "dropping remove for a tag not in the list");
                    return false;
                };
                self.list.remove(index);
                self.record(ListEvent::Remove { index, entry });
            }
            WireEvent::Value { index, entry } => {
                let slot = usize::try_from(index).ok().filter(|&i| i < self.list.len());
                let Some(index) = slot else {
                    warn!(index, len = self.list.len(), "dropping value event with out-of-range index");
                    return false;
                };
                self.warn_if_unknown(entry.tag);
                let replaced = std::mem::replace(&mut self.list[index], entry);
                if replaced.tag != entry.tag {
                    warn!(index, old = %replaced.tag, new = %entry.tag, "value event changed the tag in a slot");
                    self.evict(replaced.tag);
                }
                self.record(ListEvent::Value { index, entry });
            }
            WireEvent::Clear => {
                self.list.clear();
                self.record(ListEvent::Clear);
            }
            WireEvent::Full(entries) => self.replace_all(entries),
        }
        true
    }

    /// Unknown ids are still applied so list positions stay aligned.
    fn warn_if_unknown(&self, tag: TagId) {
        if !self.registry.contains_id(tag) {
            warn!(tag = %tag, "received tag id is not in the local registry");
        }
    }

    fn replace_all(&mut self, entries: Vec<TagCountEntry>) {
        for entry in &entries {
            self.warn_if_unknown(entry.tag);
        }
        self.list = entries;

        let old = std::mem::take(&mut self.counts);
        for entry in &self.list {
            if entry.count > 0 {
                self.counts.insert(entry.tag, entry.count);
            }
        }

        let mut changes: Vec<TagCountChange> = old
            .iter()
            .map(|(&tag, &old_count)| TagCountChange {
                tag,
                old_count,
                new_count: self.counts.get(&tag).copied().unwrap_or(0),
            })
            .chain(
                self.counts
                    .iter()
                    .filter(|(tag, _)| !old.contains_key(tag))
                    .map(|(&tag, &new_count)| TagCountChange {
                        tag,
                        old_count: 0,
                        new_count,
                    }),
            )
            .filter(|change| change.old_count != change.new_count)
            .collect();
        changes.sort_by_key(|change| change.tag);

        self.notify(ListEvent::Full);
        for change in changes {
            self.notify_change(change);
        }
    }

    /// Drop `tag` from the count cache, reporting it as removed.
    fn evict(&mut self, tag: TagId) {
        if let Some(old_count) = self.counts.remove(&tag) {
            self.notify_change(TagCountChange {
                tag,
                old_count,
                new_count: 0,
            });
        }
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    /// One entry per applied list event, local or received, oldest first.
    pub fn drain_list_events(&mut self) -> vec_deque::Drain<'_, ListEvent> {
        self.list_events.drain(..)
    }

    /// One entry per tag whose count moved.
    pub fn drain_tag_changes(&mut self) -> vec_deque::Drain<'_, TagCountChange> {
        self.tag_changes.drain(..)
    }

    fn notify(&mut self, event: ListEvent) {
        push_bounded(&mut self.list_events, self.notification_capacity, event);
    }

    fn notify_change(&mut self, change: TagCountChange) {
        push_bounded(&mut self.tag_changes, self.notification_capacity, change);
    }

    /// Update the count cache for an applied event and notify.
    fn record(&mut self, event: ListEvent) {
        match event {
            ListEvent::Add { entry, .. } | ListEvent::Value { entry, .. } => {
                let old_count = if entry.count > 0 {
                    self.counts.insert(entry.tag, entry.count)
                } else {
                    self.counts.remove(&entry.tag)
                };
                self.notify_change(TagCountChange {
                    tag: entry.tag,
                    old_count: old_count.unwrap_or(0),
                    new_count: entry.count,
                });
            }
            ListEvent::Remove { entry, .. } => {
                let old_count = self.counts.remove(&entry.tag).unwrap_or(0);
                self.notify_change(TagCountChange {
                    tag: entry.tag,
                    old_count,
                    new_count: 0,
                });
            }
            ListEvent::Clear => {
                let mut cleared: Vec<_> = self.counts.drain().collect();
                cleared.sort_unstable_by_key(|&(tag, _)| tag);
                for (tag, old_count) in cleared {
                    self.notify_change(TagCountChange {
                        tag,
                        old_count,
                        new_count: 0,
                    });
                }
            }
            ListEvent::Full => {}
        }
        self.notify(event);
    }

    // =========================================================================
    // Local mutation (authority)
    // =========================================================================

    fn position(&self, tag: TagId) -> Option<usize> {
        self.list.iter().position(|entry| entry.tag == tag)
    }

    /// Resolve `tag` for a local mutation, refusing on observers.
    fn mutable_id(&self, tag: &GameplayTag, op: &'static str) -> Option<TagId> {
        if self.role == SyncRole::Observer {
            warn!(op, "observer refused a local mutation");
            return None;
        }
        self.registry.resolve(tag)
    }

    /// Append a new slot for `id`, unless the list is at its cap.
    fn push_entry(&mut self, id: TagId) -> bool {
        if self.list.len() >= self.max_entries {
            warn!(tag = %id, max = self.max_entries, "list is full, refusing a new tag");
            return false;
        }
        let entry = TagCountEntry::new(id, 1);
        self.list.push(entry);
        let index = self.list.len() - 1;
        self.queue(ListEvent::Add { index, entry });
        true
    }

    fn queue(&mut self, event: ListEvent) {
        self.pending.push(event);
        self.record(event);
    }
}

fn push_bounded<T>(queue: &mut VecDeque<T>, capacity: usize, item: T) {
    if capacity == 0 {
        return;
    }
    if queue.len() >= capacity {
        queue.pop_front();
    }
    queue.push_back(item);
}

impl TagContainer for NetworkTagContainer {
    fn registry(&self) -> &TagRegistry {
        &self.registry
    }

    fn count_of(&self, id: TagId) -> u32 {
        self.counts.get(&id).copied().unwrap_or(0)
    }

    fn stored(&self) -> Box<dyn Iterator<Item = (TagId, u32)> + '_> {
        Box::new(self.counts.iter().map(|(&id, &count)| (id, count)))
    }

    fn add_tag(&mut self, tag: &GameplayTag) -> bool {
        let Some(id) = self.mutable_id(tag, "add_tag") else {
            return false;
        };
        let Some(index) = self.position(id) else {
            return self.push_entry(id);
        };
        let entry = TagCountEntry::new(id, self.list[index].count.saturating_add(1));
        self.list[index] = entry;
        self.queue(ListEvent::Value { index, entry });
        true
    }

    fn add_tag_unique(&mut self, tag: &GameplayTag) -> bool {
        let Some(id) = self.mutable_id(tag, "add_tag_unique") else {
            return false;
        };
        if self.position(id).is_some() {
            return false;
        }
        self.push_entry(id)
    }

    fn remove_tag_once(&mut self, tag: &GameplayTag) -> bool {
        let Some(id) = self.mutable_id(tag, "remove_tag_once") else {
            return false;
        };
        let Some(index) = self.position(id) else {
            return false;
        };
        let current = self.list[index];
        if current.count > 1 {
            let entry = TagCountEntry::new(id, current.count - 1);
            self.list[index] = entry;
            self.queue(ListEvent::Value { index, entry });
        } else {
            self.list.remove(index);
            self.queue(ListEvent::Remove { index, entry: current });
        }
        true
    }

    fn remove_tag_all(&mut self, tag: &GameplayTag) -> bool {
        let Some(id) = self.mutable_id(tag, "remove_tag_all") else {
            return false;
        };
        let Some(index) = self.position(id) else {
            return false;
        };
        let entry = self.list.remove(index);
        self.queue(ListEvent::Remove { index, entry });
        true
    }

    fn clear_tags(&mut self) {
        if self.role == SyncRole::Observer {
            warn!(op = "clear_tags", "observer refused a local mutation");
            return;
        }
        if !self.list.is_empty() {
            self.list.clear();
            self.queue(ListEvent::Clear);
        }
    }
}
