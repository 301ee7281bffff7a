//! # Gameplay Tags
//!
//! Hierarchical, dot-separated tags (`Status.Buff.Haste`) with counted
//! per-owner containers and a delta-replicated network container.
//! Inspired by UE5 GameplayTags.
//!
//! ## Design
//!
//! Tag sources declare flat paths. A build turns them into an arena of
//! definitions with dense identities, filling in every missing ancestor:
//!
//! ```text
//!   sources                       registry
//!   ─────────────────             ───────────────────────────────
//!   "Enemy.Type.Boss"      ──►    #0 None
//!   "Enemy.Type.Normal"           #1 Enemy               depth 0
//!                                 #2 Enemy.Type          depth 1, parent #1
//!                                 #3 Enemy.Type.Boss     depth 2, parent #2
//!                                 #4 Enemy.Type.Normal   depth 2, parent #2
//! ```
//!
//! Ancestry is answered by walking parent ids, so no tag is its own ancestor
//! and `A.B` is never an ancestor of `A.BC`.
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use gameplay_tags::{GameplayTagContainer, StaticTagSource, TagContainer, TagRegistry};
//!
//! let source = StaticTagSource::from_names("core", ["Enemy.Type.Boss", "Enemy.Type.Normal"]);
//! let registry = Arc::new(TagRegistry::build(&[&source]));
//!
//! let boss = registry.request_tag("Enemy.Type.Boss");
//! assert!(boss.is_child_of(&registry.request_tag("Enemy"), &registry));
//!
//! let mut tags = GameplayTagContainer::new(registry.clone());
//! tags.add_tag(&boss);
//! assert!(tags.has_tag_include_children(&registry.request_tag("Enemy.Type")));
//! ```
//!
//! Registries are passed explicitly; there is no global. A [`TagManager`]
//! wraps the build-once/reload lifecycle when one is wanted.

pub mod bevy;
pub mod config;
pub mod container;
pub mod error;
pub mod manager;
pub mod net;
pub mod registry;
pub mod source;
pub mod tag;

pub use config::RegistryConfig;
pub use container::{GameplayTagContainer, PersistedTags, TagContainer};
pub use error::{ConfigError, SourceError, SyncError};
pub use manager::{SharedTagSource, TagManager};
pub use net::{
    DEFAULT_NOTIFICATION_CAPACITY, EventType, ListEvent, MAX_LIST_ENTRIES, NetworkTagContainer,
    QueueTransport, SyncRole, SyncState, TagCountChange, TagCountEntry, Transport,
};
pub use registry::{
    INVALID_RAW_ID, INVALID_TAG_NAME, NONE_TAG_NAME, TagDefinition, TagId, TagRegistry,
};
pub use source::{
    RegistrationContext, RegistrationError, StaticTagSource, TagSource, TomlTagSource,
    validate_tag_name,
};
pub use tag::GameplayTag;
