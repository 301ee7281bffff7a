//! Tag handle: a lightweight reference to a registered tag.
//!
//! A handle is either resolved to a [`TagId`], pending lookup by name (as
//! deserialized from authored data), or invalid. Resolution never changes the
//! tag a handle denotes, so caching the result is always safe.
//!
//! ## Equality
//!
//! Handles are [`PartialEq`] but deliberately not [`Eq`]:
//!
//! - resolved handles compare by identity;
//! - pending handles compare by name;
//! - [`GameplayTag::Invalid`] equals nothing, not even another invalid handle.
//!
//! The last rule keeps two unset fields from spuriously matching. Containers
//! key on [`TagId`] instead of on handles for this reason.
//!
//! `==` never consults a registry, so pending equality is by name only. Two
//! pending handles for the same unregistered name compare equal until they
//! are resolved, and a pending handle never equals a resolved one. Use
//! [`GameplayTag::same_tag`] to compare by resolved identity.

use std::hash::{Hash, Hasher};

use serde::Deserialize;

use crate::registry::{INVALID_RAW_ID, INVALID_TAG_NAME, TagId, TagRegistry};

#[derive(Clone, Debug, Deserialize)]
#[serde(from = "String")]
pub enum GameplayTag {
    /// Resolved against a registry.
    Resolved(TagId),
    /// Authored by name, not yet looked up.
    Unresolved(String),
    /// Failed to resolve. Never retried.
    Invalid,
}

impl GameplayTag {
    /// The `None` sentinel tag.
    pub const NONE: GameplayTag = GameplayTag::Resolved(TagId::NONE);

    /// A pending handle for `name`. An empty name is the `None` tag.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        if name.is_empty() {
            Self::NONE
        } else {
            Self::Unresolved(name)
        }
    }

    /// Resolve in place and return the raw identity.
    ///
    /// A pending handle is looked up once: on success it becomes
    /// [`Resolved`](Self::Resolved), on failure it becomes
    /// [`Invalid`](Self::Invalid) for good. Resolved and invalid handles are
    /// returned as-is.
    pub fn resolve(&mut self, registry: &TagRegistry) -> i32 {
        if let Self::Unresolved(name) = self {
            *self = match registry.id_of(name) {
                Some(id) => Self::Resolved(id),
                None => Self::Invalid,
            };
        }
        self.raw_id()
    }

    /// Resolve without touching `self`, returning the resolved handle.
    pub fn resolved(&self, registry: &TagRegistry) -> GameplayTag {
        match self {
            Self::Unresolved(name) => registry
                .id_of(name)
                .map_or(Self::Invalid, Self::Resolved),
            other => other.clone(),
        }
    }

    /// Identity as written on the wire: -1 unless resolved.
    #[inline]
    pub fn raw_id(&self) -> i32 {
        match self {
            Self::Resolved(id) => id.raw(),
            _ => INVALID_RAW_ID,
        }
    }

    #[inline]
    pub fn id(&self) -> Option<TagId> {
        match self {
            Self::Resolved(id) => Some(*id),
            _ => None,
        }
    }

    /// True once resolved to a registered identity.
    ///
    /// Pending handles report false until [`resolve`](Self::resolve) runs.
    /// To ask whether a pending handle would resolve without mutating it, use
    /// `registry.resolve(&tag).is_some()`.
    #[inline]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::Resolved(id) if id.is_none())
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Unresolved(_))
    }

    /// Full tag name, or `"Invalid"` if the handle does not resolve.
    pub fn name<'a>(&'a self, registry: &'a TagRegistry) -> &'a str {
        registry
            .resolve(self)
            .and_then(|id| registry.definition(id))
            .map_or(INVALID_TAG_NAME, |def| def.name())
    }

    /// Tag description, or `"Invalid"` if the handle does not resolve.
    pub fn description<'a>(&self, registry: &'a TagRegistry) -> &'a str {
        registry
            .resolve(self)
            .and_then(|id| registry.definition(id))
            .map_or(INVALID_TAG_NAME, |def| def.description())
    }

    /// Is this tag a strict ancestor of `other`? False if either is invalid.
    pub fn is_parent_of(&self, other: &GameplayTag, registry: &TagRegistry) -> bool {
        match (registry.resolve(self), registry.resolve(other)) {
            (Some(a), Some(b)) => registry.is_ancestor_of(a, b),
            _ => false,
        }
    }

    /// Is this tag a strict descendant of `other`? False if either is invalid.
    pub fn is_child_of(&self, other: &GameplayTag, registry: &TagRegistry) -> bool {
        other.is_parent_of(self, registry)
    }

    /// Do both handles resolve to the same tag in `registry`?
    ///
    /// Unlike `==`, pending handles are looked up first. Handles that do not
    /// resolve are never the same tag, not even as each other.
    pub fn same_tag(&self, other: &GameplayTag, registry: &TagRegistry) -> bool {
        match (registry.resolve(self), registry.resolve(other)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl Default for GameplayTag {
    fn default() -> Self {
        Self::NONE
    }
}

impl From<TagId> for GameplayTag {
    fn from(id: TagId) -> Self {
        Self::Resolved(id)
    }
}

impl From<String> for GameplayTag {
    fn from(name: String) -> Self {
        Self::named(name)
    }
}

impl From<&str> for GameplayTag {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

impl PartialEq for GameplayTag {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Resolved(a), Self::Resolved(b)) => a == b,
            (Self::Unresolved(a), Self::Unresolved(b)) => a == b,
            _ => false,
        }
    }
}

impl Hash for GameplayTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Resolved(id) => id.hash(state),
            Self::Unresolved(name) => name.hash(state),
            Self::Invalid => INVALID_RAW_ID.hash(state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StaticTagSource;

    fn registry() -> TagRegistry {
        let source =
            StaticTagSource::from_names("test", ["Enemy.Type.Boss", "Enemy.Type.Normal"]);
        TagRegistry::build(&[&source])
    }

    #[test]
    fn resolve_memoizes() {
        let reg = registry();
        let mut tag = GameplayTag::named("Enemy.Type");
        assert!(tag.is_pending());
        assert!(!tag.is_valid());

        let raw = tag.resolve(&reg);
        assert_eq!(raw, reg.id_of("Enemy.Type").unwrap().raw());
        assert!(tag.is_valid());
        assert_eq!(tag.resolve(&reg), raw);
    }

    #[test]
    fn failed_resolution_is_permanent() {
        let reg = registry();
        let mut tag = GameplayTag::named("Enemy.Type.Minion");
        assert_eq!(tag.resolve(&reg), INVALID_RAW_ID);
        assert!(matches!(tag, GameplayTag::Invalid));

        // Even against a registry that knows the name, no retry happens
        let other = TagRegistry::build(&[&StaticTagSource::from_names("x", ["Enemy.Type.Minion"])]);
        assert_eq!(tag.resolve(&other), INVALID_RAW_ID);
    }

    #[test]
    fn resolved_is_pure() {
        let reg = registry();
        let tag = GameplayTag::named("Enemy");
        let resolved = tag.resolved(&reg);
        assert!(tag.is_pending());
        assert!(resolved.is_valid());
    }

    #[test]
    fn empty_name_is_none() {
        let tag = GameplayTag::named("");
        assert!(tag.is_none());
        assert!(tag.is_valid());
        assert_eq!(tag.raw_id(), 0);
        assert!(GameplayTag::default().is_none());
    }

    #[test]
    #[allow(clippy::eq_op)]
    fn invalid_never_equals_invalid() {
        let a = GameplayTag::Invalid;
        let b = GameplayTag::Invalid;
        assert_ne!(a, b);
        assert!(a != a);
    }

    #[test]
    fn equality_by_identity_or_name() {
        let reg = registry();
        let boss = reg.request_tag("Enemy.Type.Boss");
        assert_eq!(boss, reg.request_tag("Enemy.Type.Boss"));
        assert_ne!(boss, reg.request_tag("Enemy.Type.Normal"));

        assert_eq!(GameplayTag::named("A.B"), GameplayTag::named("A.B"));
        // A pending handle does not equal its resolved form until resolved
        let mut pending = GameplayTag::named("Enemy.Type.Boss");
        assert_ne!(pending, boss);
        pending.resolve(&reg);
        assert_eq!(pending, boss);
    }

    #[test]
    fn pending_equality_is_by_name() {
        let reg = registry();
        let a = GameplayTag::named("Enemy.Gone");
        let b = GameplayTag::named("Enemy.Gone");
        assert_eq!(a, b);
        assert!(!a.same_tag(&b, &reg));

        let mut a = a;
        let mut b = b;
        a.resolve(&reg);
        b.resolve(&reg);
        assert_ne!(a, b);
    }

    #[test]
    fn same_tag_resolves_both_sides() {
        let reg = registry();
        let boss = reg.request_tag("Enemy.Type.Boss");
        let pending = GameplayTag::named("Enemy.Type.Boss");

        assert_ne!(pending, boss);
        assert!(pending.same_tag(&boss, &reg));
        assert!(boss.same_tag(&pending, &reg));
        assert!(!pending.same_tag(&reg.request_tag("Enemy.Type"), &reg));
        assert!(!GameplayTag::Invalid.same_tag(&GameplayTag::Invalid, &reg));
    }

    #[test]
    fn validity_of_a_pending_handle() {
        let reg = registry();
        let known = GameplayTag::named("Enemy.Type");
        let unknown = GameplayTag::named("Enemy.Type.Minion");

        assert!(!known.is_valid());
        assert!(reg.resolve(&known).is_some());
        assert!(reg.resolve(&unknown).is_none());
        assert!(known.resolved(&reg).is_valid());
        assert!(!unknown.resolved(&reg).is_valid());
    }

    #[test]
    fn hierarchy_through_handles() {
        let reg = registry();
        let enemy = GameplayTag::named("Enemy");
        let ty = GameplayTag::named("Enemy.Type");
        let boss = reg.request_tag("Enemy.Type.Boss");

        assert!(ty.is_parent_of(&boss, &reg));
        assert!(boss.is_child_of(&enemy, &reg));
        assert!(!boss.is_parent_of(&ty, &reg));
        assert!(!boss.is_child_of(&boss, &reg));
        assert!(!GameplayTag::Invalid.is_parent_of(&boss, &reg));
        assert!(!boss.is_child_of(&GameplayTag::Invalid, &reg));
    }

    #[test]
    fn names_and_descriptions() {
        let reg = registry();
        assert_eq!(reg.request_tag("Enemy.Type").name(&reg), "Enemy.Type");
        assert_eq!(GameplayTag::named("Enemy").name(&reg), "Enemy");
        assert_eq!(GameplayTag::named("Missing").name(&reg), "Invalid");
        assert_eq!(GameplayTag::NONE.description(&reg), "Empty Tag");
    }

    #[test]
    fn deserializes_from_name() {
        let tag: GameplayTag = serde_json::from_str("\"Enemy.Type.Boss\"").unwrap();
        assert_eq!(tag, GameplayTag::named("Enemy.Type.Boss"));

        let none: GameplayTag = serde_json::from_str("\"\"").unwrap();
        assert!(none.is_none());
    }
}
