//! Bevy integration for gameplay tags.
//!
//! Provides:
//! - `GameplayTagsPlugin`: builder-pattern plugin that inserts a [`TagManager`] resource
//! - `OwnedTags`: counted tag container as a component
//!
//! # Example
//!
//! ```ignore
//! use bevy::prelude::*;
//! use gameplay_tags::bevy::*;
//! use gameplay_tags::{StaticTagSource, TagContainer};
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(
//!             GameplayTagsPlugin::new()
//!                 .with_source(StaticTagSource::from_names("core", ["Status.Burning"]))
//!         )
//!         .add_systems(Startup, spawn_burning)
//!         .run();
//! }
//!
//! fn spawn_burning(mut commands: Commands, tags: Res<TagManager>) {
//!     let registry = tags.registry().clone();
//!     let burning = registry.request_tag("Status.Burning");
//!     commands.spawn(OwnedTags::new(registry).with(&burning));
//! }
//! ```

use std::sync::Arc;

use bevy::prelude::*;

use crate::config::RegistryConfig;
use crate::container::GameplayTagContainer;
use crate::manager::SharedTagSource;
use crate::registry::TagRegistry;
use crate::source::TagSource;
use crate::tag::GameplayTag;

pub use crate::manager::TagManager;

// =============================================================================
// Plugin
// =============================================================================

/// Bevy plugin for the gameplay tag system.
///
/// ```ignore
/// App::new()
///     .add_plugins(
///         GameplayTagsPlugin::new()
///             .with_source(TomlTagSource::from_file("assets/tags.toml")?)
///             .live(true)
///     )
/// ```
#[derive(Default)]
pub struct GameplayTagsPlugin {
    sources: Vec<SharedTagSource>,
    config: RegistryConfig,
    live: bool,
}

impl GameplayTagsPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: impl TagSource + Send + Sync + 'static) -> Self {
        self.sources.push(Arc::new(source));
        self
    }

    pub fn with_config(mut self, config: RegistryConfig) -> Self {
        self.config = config;
        self
    }

    /// Mark the manager live from the start, so reloads are warned about.
    ///
    /// Default: `false`
    pub fn live(mut self, live: bool) -> Self {
        self.live = live;
        self
    }
}

impl Plugin for GameplayTagsPlugin {
    fn build(&self, app: &mut App) {
        let mut manager = TagManager::new(self.config.clone());
        for source in &self.sources {
            manager.add_source(Arc::clone(source));
        }
        // Build now so registration errors show up at startup
        manager.registry();
        manager.set_live(self.live);

        app.insert_resource(manager);
    }
}

impl Resource for TagManager {}

// =============================================================================
// OwnedTags Component
// =============================================================================

/// Counted gameplay tags owned by an entity.
///
/// ```ignore
/// fn burning(query: Query<(Entity, &OwnedTags)>, tags: Res<TagManager>) {
///     let status = tags.request_tag("Status");
///     for (entity, owned) in query.iter() {
///         if owned.has_tag_include_children(&status) {
///             // entity has some Status tag
///         }
///     }
/// }
/// ```
#[derive(Component, Clone, Debug, PartialEq, Deref, DerefMut)]
pub struct OwnedTags(pub GameplayTagContainer);

impl OwnedTags {
    pub fn new(registry: Arc<TagRegistry>) -> Self {
        Self(GameplayTagContainer::new(registry))
    }

    /// Builder method: add a tag once and return self.
    pub fn with(self, tag: &GameplayTag) -> Self {
        Self(self.0.with(tag))
    }
}

impl From<GameplayTagContainer> for OwnedTags {
    fn from(container: GameplayTagContainer) -> Self {
        Self(container)
    }
}

// =============================================================================
// Tests
// =============================================================================
