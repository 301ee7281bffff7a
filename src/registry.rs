//! Tag registry: interned, hierarchy-linked tag definitions.
//!
//! Definitions live in an arena indexed by dense [`TagId`]. Each definition
//! stores its parent as an id, so the hierarchy is a forest by construction.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::RegistryConfig;
use crate::source::{DeclaredTag, RegistrationContext, RegistrationError, TagSource};
use crate::tag::GameplayTag;

/// Name of the sentinel tag at identity 0.
pub const NONE_TAG_NAME: &str = "None";

/// Name reported for handles that do not resolve.
pub const INVALID_TAG_NAME: &str = "Invalid";

/// Raw identity of an invalid tag. Never stored in a registry.
pub const INVALID_RAW_ID: i32 = -1;

/// Dense identity of a registered tag.
///
/// Stable for the lifetime of one registry build. Identity 0 is the `None`
/// sentinel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(u32);

impl TagId {
    pub const NONE: TagId = TagId(0);

    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Convert a raw wire identity. Negative values have no `TagId`.
    #[inline]
    pub fn from_raw(raw: i32) -> Option<Self> {
        u32::try_from(raw).ok().map(Self)
    }

    /// The identity as written on the wire.
    #[inline]
    pub const fn raw(self) -> i32 {
        self.0 as i32
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A registered tag. Immutable once the registry is built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagDefinition {
    name: String,
    description: String,
    id: TagId,
    parent: Option<TagId>,
    depth: u32,
    source_name: Option<String>,
}

impl TagDefinition {
    /// Full dot-separated path (e.g. `"Player.State.Idle"`).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn id(&self) -> TagId {
        self.id
    }

    pub fn parent(&self) -> Option<TagId> {
        self.parent
    }

    /// Tree depth (root segments and `None` are 0).
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// The source that declared this tag; `None` for implicit ancestors and
    /// the sentinel.
    pub fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }

    /// True if some source declared this exact name.
    pub fn is_explicit(&self) -> bool {
        self.source_name.is_some()
    }

    /// Last path segment.
    pub fn leaf_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

/// Registry of resolved tag definitions.
///
/// Provides:
/// - Exact-match name → definition lookup (O(1))
/// - Id → definition lookup (O(1))
/// - Ancestry checks by walking parent ids (O(depth))
#[derive(Clone, Debug)]
pub struct TagRegistry {
    definitions: Vec<TagDefinition>,
    name_to_id: HashMap<String, TagId>,
    errors: Vec<RegistrationError>,
    generation: u64,
}

impl Default for TagRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TagRegistry {
    /// A registry holding only the `None` sentinel.
    pub fn new() -> Self {
        HierarchyBuilder::new().finish(Vec::new(), 0)
    }

    /// Build a registry from sources with the default config.
    pub fn build(sources: &[&dyn TagSource]) -> Self {
        Self::build_with_config(sources, &RegistryConfig::default())
    }

    /// Build a registry from sources.
    ///
    /// Sources are visited in slice order, so identities are a function of
    /// that order. Registration errors never abort the build; they are logged
    /// and kept in [`errors`](Self::errors).
    pub fn build_with_config(sources: &[&dyn TagSource], config: &RegistryConfig) -> Self {
        let mut context =
            RegistrationContext::new().with_strict_identifiers(config.strict_identifiers);
        for source in sources {
            source.register_tags(&mut context);
        }

        let mut builder = HierarchyBuilder::new();
        for declared in context.declared() {
            builder.insert_path(declared, &context);
        }
        let registry = builder.finish(context.into_errors(), 0);
        registry.log_summary(config);
        registry
    }

    pub(crate) fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    fn log_summary(&self, config: &RegistryConfig) {
        for err in &self.errors {
            error!(
                tag = %err.tag_name,
                origin = err.source_name.as_deref().unwrap_or("unknown"),
                "failed to register gameplay tag: {}",
                err.message
            );
        }

        info!(count = self.tag_count(), "gameplay tag registry built");

        if self.definitions.len() <= config.verbose_listing_limit {
            for def in &self.definitions {
                debug!(
                    id = def.id.raw(),
                    origin = def.source_name().unwrap_or("implicit"),
                    "  - {}",
                    def.name
                );
            }
        }
    }

    // -------------------------------------------------------------------------
    // Lookup
    // -------------------------------------------------------------------------

    /// Exact-match lookup by full path.
    #[inline]
    pub fn lookup(&self, name: &str) -> Option<&TagDefinition> {
        self.name_to_id.get(name).map(|id| &self.definitions[id.index()])
    }

    /// Path → id
    #[inline]
    pub fn id_of(&self, name: &str) -> Option<TagId> {
        self.name_to_id.get(name).copied()
    }

    /// Id → definition
    #[inline]
    pub fn definition(&self, id: TagId) -> Option<&TagDefinition> {
        self.definitions.get(id.index())
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.name_to_id.contains_key(name)
    }

    #[inline]
    pub fn contains_id(&self, id: TagId) -> bool {
        id.index() < self.definitions.len()
    }

    /// All definitions in identity order, `None` first.
    pub fn definitions(&self) -> &[TagDefinition] {
        &self.definitions
    }

    /// Number of definitions, including `None`.
    #[inline]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// True if only the `None` sentinel is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.definitions.len() <= 1
    }

    /// Number of real tags (excludes `None`).
    #[inline]
    pub fn tag_count(&self) -> usize {
        self.definitions.len().saturating_sub(1)
    }

    /// Errors collected while registering.
    pub fn errors(&self) -> &[RegistrationError] {
        &self.errors
    }

    /// Build counter, incremented on every reload by [`TagManager`](crate::TagManager).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    // -------------------------------------------------------------------------
    // Handles
    // -------------------------------------------------------------------------

    /// Request a handle by name.
    ///
    /// An empty name yields [`GameplayTag::NONE`]; an unknown name yields
    /// [`GameplayTag::Invalid`].
    pub fn request_tag(&self, name: &str) -> GameplayTag {
        if name.is_empty() {
            return GameplayTag::NONE;
        }
        match self.id_of(name) {
            Some(id) => GameplayTag::Resolved(id),
            None => GameplayTag::Invalid,
        }
    }

    /// Like [`request_tag`](Self::request_tag), but only returns valid,
    /// non-`None` tags.
    pub fn try_request_tag(&self, name: &str) -> Option<GameplayTag> {
        self.id_of(name)
            .filter(|id| !id.is_none())
            .map(GameplayTag::Resolved)
    }

    /// Handle for a raw wire identity. Unknown or negative ids give
    /// [`GameplayTag::NONE`].
    pub fn tag_by_id(&self, raw: i32) -> GameplayTag {
        match TagId::from_raw(raw) {
            Some(id) if self.contains_id(id) => GameplayTag::Resolved(id),
            _ => GameplayTag::NONE,
        }
    }

    /// Handles for every registered tag except `None`.
    pub fn all_tags(&self) -> impl Iterator<Item = GameplayTag> + '_ {
        self.definitions
            .iter()
            .skip(1)
            .map(|def| GameplayTag::Resolved(def.id))
    }

    /// Resolve a handle against this registry without modifying it.
    ///
    /// Resolved handles are checked for range; unresolved handles are looked
    /// up by name.
    pub fn resolve(&self, tag: &GameplayTag) -> Option<TagId> {
        match tag {
            GameplayTag::Resolved(id) => self.contains_id(*id).then_some(*id),
            GameplayTag::Unresolved(name) => self.id_of(name),
            GameplayTag::Invalid => None,
        }
    }

    // -------------------------------------------------------------------------
    // Hierarchy
    // -------------------------------------------------------------------------

    #[inline]
    pub fn parent_of(&self, id: TagId) -> Option<TagId> {
        self.definition(id)?.parent
    }

    #[inline]
    pub fn depth_of(&self, id: TagId) -> Option<u32> {
        self.definition(id).map(|def| def.depth)
    }

    /// Is `ancestor` a strict ancestor of `descendant`?
    ///
    /// True iff `ancestor` is shallower and walking `descendant`'s parents
    /// exactly the depth difference lands on it. A tag is never its own
    /// ancestor.
    ///
    /// ```text
    /// is_ancestor_of(Enemy, Enemy.Type.Boss)      → true
    /// is_ancestor_of(Enemy.Type, Enemy.Type)      → false
    /// is_ancestor_of(Player, Enemy.Type.Boss)     → false
    /// ```
    pub fn is_ancestor_of(&self, ancestor: TagId, descendant: TagId) -> bool {
        let (Some(a), Some(b)) = (self.definition(ancestor), self.definition(descendant)) else {
            return false;
        };
        if a.depth >= b.depth {
            return false;
        }

        let mut current = b;
        for _ in 0..(b.depth - a.depth) {
            match current.parent.and_then(|p| self.definition(p)) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
        current.id == a.id
    }

    /// Path-based convenience for [`is_ancestor_of`](Self::is_ancestor_of).
    ///
    /// Returns `None` if either path is not registered.
    pub fn is_ancestor_of_path(&self, ancestor: &str, descendant: &str) -> Option<bool> {
        let a = self.id_of(ancestor)?;
        let b = self.id_of(descendant)?;
        Some(self.is_ancestor_of(a, b))
    }

    /// Collect all registered strict descendants of `ancestor`, in id order.
    ///
    /// Not O(1): iterates all entries.
    pub fn descendants_of(&self, ancestor: TagId) -> Vec<TagId> {
        self.definitions
            .iter()
            .filter(|def| self.is_ancestor_of(ancestor, def.id))
            .map(|def| def.id)
            .collect()
    }

    /// Direct children of `parent`, in id order.
    pub fn children_of(&self, parent: TagId) -> Vec<TagId> {
        self.definitions
            .iter()
            .filter(|def| def.parent == Some(parent))
            .map(|def| def.id)
            .collect()
    }
}

// =============================================================================
// Hierarchy builder: walks dotted paths into a linked arena
// =============================================================================

#[derive(Debug)]
struct HierarchyBuilder {
    definitions: Vec<TagDefinition>,
    name_to_id: HashMap<String, TagId>,
}

impl HierarchyBuilder {
    fn new() -> Self {
        let none = TagDefinition {
            name: NONE_TAG_NAME.to_string(),
            description: "Empty Tag".to_string(),
            id: TagId::NONE,
            parent: None,
            depth: 0,
            source_name: None,
        };
        let mut name_to_id = HashMap::new();
        name_to_id.insert(none.name.clone(), TagId::NONE);
        Self {
            definitions: vec![none],
            name_to_id,
        }
    }

    /// Insert `declared` and every missing ancestor, shallowest first.
    ///
    /// An ancestor that some source declares explicitly takes that
    /// declaration's description and source even when it is created here.
    fn insert_path(&mut self, declared: &DeclaredTag, context: &RegistrationContext) {
        let name = declared.name.as_str();
        let mut parent: Option<TagId> = None;
        let mut end = 0;

        for (depth, segment) in name.split('.').enumerate() {
            end = if depth == 0 {
                segment.len()
            } else {
                end + 1 + segment.len()
            };
            let path = &name[..end];

            let id = match self.name_to_id.get(path) {
                Some(&id) => id,
                None => {
                    let id = TagId::new(self.definitions.len() as u32);
                    let explicit = context.get(path);
                    self.definitions.push(TagDefinition {
                        name: path.to_string(),
                        description: explicit.map(|d| d.description.clone()).unwrap_or_default(),
                        id,
                        parent,
                        depth: depth as u32,
                        source_name: explicit.map(|d| d.source_name.clone()),
                    });
                    self.name_to_id.insert(path.to_string(), id);
                    id
                }
            };
            parent = Some(id);
        }
    }

    fn finish(self, errors: Vec<RegistrationError>, generation: u64) -> TagRegistry {
        TagRegistry {
            definitions: self.definitions,
            name_to_id: self.name_to_id,
            errors,
            generation,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
