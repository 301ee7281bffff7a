//! Owner of the tag sources and the registry built from them.
//!
//! The registry is built once, on first access. [`TagManager::reload`]
//! replaces it with a fresh build; handles resolved against the old build
//! keep their old identities, which may now name different tags.

use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::{info, warn};

use crate::config::RegistryConfig;
use crate::registry::TagRegistry;
use crate::source::TagSource;
use crate::tag::GameplayTag;

/// A tag source that can be shared across threads.
pub type SharedTagSource = Arc<dyn TagSource + Send + Sync>;

#[derive(Default)]
pub struct TagManager {
    sources: Vec<SharedTagSource>,
    config: RegistryConfig,
    registry: OnceLock<Arc<TagRegistry>>,
    generation: u64,
    live: bool,
    reloaded: bool,
}

impl TagManager {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Builder method: add a source and return self.
    pub fn with_source(mut self, source: impl TagSource + Send + Sync + 'static) -> Self {
        self.sources.push(Arc::new(source));
        self
    }

    /// Add a source. It is picked up by the first build or the next reload.
    pub fn add_source(&mut self, source: SharedTagSource) {
        self.sources.push(source);
    }

    pub fn sources(&self) -> &[SharedTagSource] {
        &self.sources
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// The registry, built from the sources on first call.
    pub fn registry(&self) -> &Arc<TagRegistry> {
        self.registry.get_or_init(|| Arc::new(self.build_registry()))
    }

    pub fn is_initialized(&self) -> bool {
        self.registry.get().is_some()
    }

    /// Rebuild the registry from the current sources.
    ///
    /// Warns when the manager is live, since handles resolved against the
    /// previous build may now point at different tags.
    pub fn reload(&mut self) -> &Arc<TagRegistry> {
        self.generation += 1;
        if self.live && self.config.warn_on_live_reload {
            warn!(
                generation = self.generation,
                "gameplay tag registry reloaded while live; previously resolved tags may be stale"
            );
        } else {
            info!(generation = self.generation, "reloading gameplay tag registry");
        }

        let registry = Arc::new(self.build_registry());
        self.registry = OnceLock::from(registry);
        self.reloaded = true;
        self.registry()
    }

    /// Mark whether gameplay is running. Reloads while live are warned about.
    pub fn set_live(&mut self, live: bool) {
        self.live = live;
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn has_been_reloaded(&self) -> bool {
        self.reloaded
    }

    /// Shorthand for `registry().request_tag(name)`.
    pub fn request_tag(&self, name: &str) -> GameplayTag {
        self.registry().request_tag(name)
    }

    fn build_registry(&self) -> TagRegistry {
        let sources: Vec<&dyn TagSource> = self
            .sources
            .iter()
            .map(|source| source.as_ref() as &dyn TagSource)
            .collect();
        TagRegistry::build_with_config(&sources, &self.config).with_generation(self.generation)
    }
}

impl fmt::Debug for TagManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.sources.iter().map(|source| source.name()).collect();
        f.debug_struct("TagManager")
            .field("sources", &names)
            .field("config", &self.config)
            .field("initialized", &self.is_initialized())
            .field("generation", &self.generation)
            .field("live", &self.live)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Mutex;

    use super::*;
    use crate::source::StaticTagSource;

    fn manager() -> TagManager {
        TagManager::new(RegistryConfig::default())
            .with_source(StaticTagSource::from_names("core", ["Enemy.Type.Boss"]))
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Reload `manager` and return what got logged at WARN or above.
    fn reload_warnings(manager: &mut TagManager) -> String {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            manager.reload();
        });
        let bytes = logs.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn builds_lazily_once() {
        let manager = manager();
        assert!(!manager.is_initialized());

        let first = Arc::clone(manager.registry());
        assert!(manager.is_initialized());
        assert!(Arc::ptr_eq(&first, manager.registry()));
        assert!(manager.request_tag("Enemy.Type").is_valid());
        assert_eq!(first.generation(), 0);
    }

    #[test]
    fn reload_picks_up_new_sources() {
        let mut manager = manager();
        let before = Arc::clone(manager.registry());
        assert!(!manager.request_tag("Item.Potion").is_valid());

        manager.add_source(Arc::new(StaticTagSource::from_names("items", ["Item.Potion"])));
        // Not visible until a reload
        assert!(!manager.request_tag("Item.Potion").is_valid());

        let after = Arc::clone(manager.reload());
        assert!(!Arc::ptr_eq(&before, &after));
        assert!(manager.request_tag("Item.Potion").is_valid());
        assert_eq!(after.generation(), 1);
        assert!(manager.has_been_reloaded());
    }

    #[test]
    fn live_flag() {
        let mut manager = manager();
        assert!(!manager.is_live());
        manager.set_live(true);
        assert!(manager.is_live());

        manager.reload();
        assert!(manager.has_been_reloaded());
        assert_eq!(manager.registry().generation(), 1);
    }

    #[test]
    fn live_reload_warns() {
        let mut manager = manager();
        manager.set_live(true);

        let logs = reload_warnings(&mut manager);
        assert!(logs.contains("WARN"), "{logs}");
        assert!(logs.contains("reloaded while live"), "{logs}");
        assert!(logs.contains("generation=1"), "{logs}");
    }

    #[test]
    fn idle_reload_does_not_warn() {
        let mut manager = manager();
        assert!(reload_warnings(&mut manager).is_empty());
    }

    #[test]
    fn live_reload_warning_can_be_disabled() {
        let config = RegistryConfig::parse("warn_on_live_reload = false").unwrap();
        let mut manager = TagManager::new(config)
            .with_source(StaticTagSource::from_names("core", ["Enemy.Type.Boss"]));
        manager.set_live(true);

        assert!(reload_warnings(&mut manager).is_empty());
        assert_eq!(manager.registry().generation(), 1);
    }

    #[test]
    fn old_handles_survive_reload_by_identity() {
        let mut manager = TagManager::default()
            .with_source(StaticTagSource::from_names("a", ["B.Tag"]));
        let b = manager.request_tag("B.Tag");

        manager.add_source(Arc::new(StaticTagSource::from_names("z", ["A.Tag"])));
        manager.reload();

        // Appending a source leaves earlier identities in place
        assert_eq!(b.name(manager.registry()), "B.Tag");
        assert!(manager.request_tag("A.Tag").is_valid());
    }
}
