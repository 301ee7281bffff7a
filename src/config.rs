//! Registry configuration, loadable from TOML.
//!
//! ```toml
//! verbose_listing_limit = 50
//! warn_on_live_reload = true
//! strict_identifiers = false
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// Knobs for building and reloading a [`TagRegistry`](crate::TagRegistry).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// Every definition is logged at debug level when the registry holds at
    /// most this many tags.
    pub verbose_listing_limit: usize,
    /// Emit a warning when the registry is rebuilt while the manager is live.
    pub warn_on_live_reload: bool,
    /// Restrict segments to identifiers: a letter or `_` first, then
    /// alphanumerics or `_`.
    pub strict_identifiers: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            verbose_listing_limit: 50,
            warn_on_live_reload: true,
            strict_identifiers: false,
        }
    }
}

impl RegistryConfig {
    /// Parse from a TOML string. Missing keys keep their defaults.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Parse from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }
}
