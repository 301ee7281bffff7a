//! Counted tag containers.
//!
//! A container tracks, per owner, how many times each tag is active. A tag
//! added three times must be removed three times (or all at once with
//! [`remove_tag_all`](TagContainer::remove_tag_all)).
//!
//! # Example
//!
//! ```ignore
//! let mut tags = GameplayTagContainer::new(registry.clone());
//! let burning = registry.request_tag("Status.Burning");
//!
//! tags.add_tag(&burning);
//! tags.add_tag(&burning);
//! assert_eq!(tags.count_tag(&burning), 2);
//!
//! if tags.has_tag_include_children(&registry.request_tag("Status")) {
//!     // owner has some Status-related tag
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::registry::{TagId, TagRegistry};
use crate::tag::GameplayTag;

/// Query and mutation surface shared by local and networked containers.
///
/// Mutations resolve the handle against [`registry`](Self::registry) and are
/// no-ops returning `false` for invalid handles, so invalid tags are never
/// stored. Queries treat invalid handles as absent.
pub trait TagContainer {
    /// Registry the stored ids belong to.
    fn registry(&self) -> &TagRegistry;

    /// Stored count for `id`, or 0.
    fn count_of(&self, id: TagId) -> u32;

    /// Every stored `(id, count)` pair. Counts are always positive.
    fn stored(&self) -> Box<dyn Iterator<Item = (TagId, u32)> + '_>;

    /// Increment the count of `tag`.
    fn add_tag(&mut self, tag: &GameplayTag) -> bool;

    /// Insert `tag` with count 1 only if it is absent.
    ///
    /// Returns `true` iff newly inserted.
    fn add_tag_unique(&mut self, tag: &GameplayTag) -> bool;

    /// Decrement the count of `tag`, dropping it at zero.
    ///
    /// Returns `true` iff there was an entry to decrement.
    fn remove_tag_once(&mut self, tag: &GameplayTag) -> bool;

    /// Drop `tag` regardless of its count.
    ///
    /// Returns `true` iff an entry existed.
    fn remove_tag_all(&mut self, tag: &GameplayTag) -> bool;

    fn clear_tags(&mut self);

    /// `count(tag) > 0`
    fn has_tag(&self, tag: &GameplayTag) -> bool {
        self.count_tag(tag) > 0
    }

    fn count_tag(&self, tag: &GameplayTag) -> u32 {
        self.registry()
            .resolve(tag)
            .map_or(0, |id| self.count_of(id))
    }

    /// True if `tag` or any stored descendant of it is present.
    fn has_tag_include_children(&self, tag: &GameplayTag) -> bool {
        let Some(id) = self.registry().resolve(tag) else {
            return false;
        };
        if self.count_of(id) > 0 {
            return true;
        }
        let registry = self.registry();
        self.stored()
            .any(|(stored, _)| registry.is_ancestor_of(id, stored))
    }

    /// Count of `tag` plus the counts of all its stored descendants.
    ///
    /// Saturates at `u32::MAX`; received counts can be anything.
    fn count_tag_include_children(&self, tag: &GameplayTag) -> u32 {
        let Some(id) = self.registry().resolve(tag) else {
            return 0;
        };
        let registry = self.registry();
        self.stored()
            .filter(|&(stored, _)| stored == id || registry.is_ancestor_of(id, stored))
            .fold(0u32, |total, (_, count)| total.saturating_add(count))
    }

    /// True if any tag stored in `other` is stored here (exact match).
    fn has_any_tags(&self, other: &dyn TagContainer) -> bool {
        other.stored().any(|(id, _)| self.count_of(id) > 0)
    }

    /// True if every tag stored in `other` is stored here (exact match).
    ///
    /// An empty `other` is trivially contained.
    fn has_all_tags(&self, other: &dyn TagContainer) -> bool {
        other.stored().all(|(id, _)| self.count_of(id) > 0)
    }

    /// Handles for every stored tag, in no particular order.
    fn all_tags(&self) -> Vec<GameplayTag> {
        self.stored().map(|(id, _)| GameplayTag::Resolved(id)).collect()
    }

    /// Number of distinct stored tags.
    fn unique_tag_count(&self) -> usize {
        self.stored().count()
    }

    /// Sum of all counts.
    fn total_tag_count(&self) -> u64 {
        self.stored().map(|(_, count)| u64::from(count)).sum()
    }
}

// =============================================================================
// GameplayTagContainer
// =============================================================================

/// Local, in-process counted tag container.
#[derive(Clone, Debug)]
pub struct GameplayTagContainer {
    registry: Arc<TagRegistry>,
    counts: HashMap<TagId, u32>,
}

impl GameplayTagContainer {
    /// Create an empty container over `registry`.
    pub fn new(registry: Arc<TagRegistry>) -> Self {
        Self {
            registry,
            counts: HashMap::new(),
        }
    }

    /// Builder method: add a tag once and return self.
    pub fn with(mut self, tag: &GameplayTag) -> Self {
        self.add_tag(tag);
        self
    }

    /// Shared handle to the registry.
    pub fn registry_handle(&self) -> &Arc<TagRegistry> {
        &self.registry
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Persisted form, sorted by tag name so saves are stable.
    pub fn to_persisted(&self) -> PersistedTags {
        let mut entries: Vec<(&str, u32)> = self
            .counts
            .iter()
            .filter_map(|(&id, &count)| {
                self.registry.definition(id).map(|def| (def.name(), count))
            })
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        let (tags, counts): (Vec<String>, Vec<u32>) = entries
            .into_iter()
            .map(|(name, count)| (name.to_string(), count))
            .unzip();
        PersistedTags { tags, counts }
    }

    /// Rebuild from a persisted form.
    ///
    /// Names that do not resolve and zero counts are skipped. Tags and counts
    /// are paired up to the shorter list.
    pub fn from_persisted(registry: Arc<TagRegistry>, persisted: &PersistedTags) -> Self {
        let mut counts = HashMap::new();
        for (name, &count) in persisted.tags.iter().zip(&persisted.counts) {
            if count == 0 {
                continue;
            }
            if let Some(id) = registry.id_of(name) {
                counts.insert(id, count);
            }
        }
        Self { registry, counts }
    }
}

impl TagContainer for GameplayTagContainer {
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
        let Some(id) = self.registry.resolve(tag) else {
            return false;
        };
        let count = self.counts.entry(id).or_insert(0);
        *count = count.saturating_add(1);
        true
    }

    fn add_tag_unique(&mut self, tag: &GameplayTag) -> bool {
        let Some(id) = self.registry.resolve(tag) else {
            return false;
        };
        if self.counts.contains_key(&id) {
            return false;
        }
        self.counts.insert(id, 1);
        true
    }

    fn remove_tag_once(&mut self, tag: &GameplayTag) -> bool {
        let Some(id) = self.registry.resolve(tag) else {
            return false;
        };
        let Some(count) = self.counts.get_mut(&id) else {
            return false;
        };
        *count -= 1;
        if *count == 0 {
            self.counts.remove(&id);
        }
        true
    }

    fn remove_tag_all(&mut self, tag: &GameplayTag) -> bool {
        let Some(id) = self.registry.resolve(tag) else {
            return false;
        };
        self.counts.remove(&id).is_some()
    }

    fn clear_tags(&mut self) {
        self.counts.clear();
    }
}

impl PartialEq for GameplayTagContainer {
    fn eq(&self, other: &Self) -> bool {
        self.counts == other.counts
    }
}

/// Serializable container state, ordered by tag name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedTags {
    pub tags: Vec<String>,
    pub counts: Vec<u32>,
}

// =============================================================================
// Tests
// =============================================================================
