//! Tag sources and the registration context they write into.
//!
//! A [`TagSource`] supplies raw `(name, description)` pairs. The registry
//! hands every source the same [`RegistrationContext`], which validates names,
//! keeps the first declaration of each name, and records everything it
//! rejects as a [`RegistrationError`].

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::SourceError;
use crate::registry::NONE_TAG_NAME;

/// Supplies tag declarations to a registry build.
pub trait TagSource {
    /// Human-readable source name, used in diagnostics.
    fn name(&self) -> &str;

    /// Declare this source's tags into `context`.
    fn register_tags(&self, context: &mut RegistrationContext);
}

/// A declaration rejected during registration.
///
/// These are soft errors: the build still completes, keeping the first
/// declaration of any duplicated name.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("failed to register tag \"{tag_name}\": {message} (source: {})", .source_name.as_deref().unwrap_or("unknown"))]
pub struct RegistrationError {
    pub tag_name: String,
    pub message: String,
    pub source_name: Option<String>,
}

/// A tag as declared by a source, before hierarchy construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeclaredTag {
    pub name: String,
    pub description: String,
    pub source_name: String,
}

/// Collects declarations for one registry build.
#[derive(Debug, Default)]
pub struct RegistrationContext {
    declared: Vec<DeclaredTag>,
    by_name: HashMap<String, usize>,
    errors: Vec<RegistrationError>,
    strict_identifiers: bool,
}

impl RegistrationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept identifier-like segments (see [`RegistryConfig`](crate::RegistryConfig)).
    pub fn with_strict_identifiers(mut self, strict: bool) -> Self {
        self.strict_identifiers = strict;
        self
    }

    /// Declare a tag on behalf of `source`.
    pub fn register<S: TagSource + ?Sized>(&mut self, name: &str, description: &str, source: &S) {
        self.register_from(name, description, source.name());
    }

    /// Declare a tag, naming the source directly.
    ///
    /// The first declaration of a name wins. A later declaration with the same
    /// description is accepted silently; any other later declaration is
    /// recorded as an error.
    pub fn register_from(&mut self, name: &str, description: &str, source_name: &str) {
        if let Err(message) = validate_tag_name(name, self.strict_identifiers) {
            self.push_error(name, message, source_name);
            return;
        }

        if let Some(&idx) = self.by_name.get(name) {
            let existing = &self.declared[idx];
            if existing.description != description {
                let message = format!(
                    "duplicate declaration with a different description; keeping the one from '{}'",
                    existing.source_name
                );
                self.push_error(name, message, source_name);
            }
            return;
        }

        self.by_name.insert(name.to_string(), self.declared.len());
        self.declared.push(DeclaredTag {
            name: name.to_string(),
            description: description.to_string(),
            source_name: source_name.to_string(),
        });
    }

    /// Accepted declarations, in registration order.
    pub fn declared(&self) -> &[DeclaredTag] {
        &self.declared
    }

    /// Look up an accepted declaration by exact name.
    pub fn get(&self, name: &str) -> Option<&DeclaredTag> {
        self.by_name.get(name).map(|&idx| &self.declared[idx])
    }

    pub fn errors(&self) -> &[RegistrationError] {
        &self.errors
    }

    pub(crate) fn into_errors(self) -> Vec<RegistrationError> {
        self.errors
    }

    fn push_error(&mut self, name: &str, message: String, source_name: &str) {
        self.errors.push(RegistrationError {
            tag_name: name.to_string(),
            message,
            source_name: Some(source_name.to_string()),
        });
    }
}

/// Check a dotted tag path.
///
/// Rejects empty names, empty segments (leading, trailing or doubled dots) and
/// the reserved `None` root. With `strict`, each segment must also be an
/// identifier.
pub fn validate_tag_name(name: &str, strict: bool) -> Result<(), String> {
    if name.is_empty() {
        return Err("empty tag name".into());
    }
    if name.starts_with('.') || name.ends_with('.') {
        return Err("cannot start or end with '.'".into());
    }
    if name.contains("..") {
        return Err("contains an empty segment".into());
    }
    if name.split('.').next() == Some(NONE_TAG_NAME) {
        return Err(format!("'{}' is reserved", NONE_TAG_NAME));
    }

    if strict {
        for seg in name.split('.') {
            let mut chars = seg.chars();
            if let Some(first) = chars.next()
                && !first.is_alphabetic()
                && first != '_'
            {
                return Err(format!(
                    "segment '{}' must start with a letter or underscore",
                    seg
                ));
            }
            if let Some(c) = chars.find(|&c| !c.is_alphanumeric() && c != '_') {
                return Err(format!("segment '{}' contains invalid character '{}'", seg, c));
            }
        }
    }

    Ok(())
}

// =============================================================================
// Built-in sources
// =============================================================================

/// A source backed by an in-memory list of declarations.
#[derive(Clone, Debug, Default)]
pub struct StaticTagSource {
    name: String,
    tags: Vec<(String, String)>,
}

impl StaticTagSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: Vec::new(),
        }
    }

    /// Builder method: declare a tag with a description.
    pub fn with_tag(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.tags.push((name.into(), description.into()));
        self
    }

    /// Build a source from bare names with empty descriptions.
    pub fn from_names<I, S>(name: impl Into<String>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            tags: names.into_iter().map(|n| (n.into(), String::new())).collect(),
        }
    }
}

impl TagSource for StaticTagSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn register_tags(&self, context: &mut RegistrationContext) {
        for (name, description) in &self.tags {
            context.register(name, description, self);
        }
    }
}

/// A source backed by a TOML tag database.
///
/// ```toml
/// [[tags]]
/// name = "Enemy.Type.Boss"
/// description = "Boss-tier enemies"
///
/// [[tags]]
/// name = "Player.State.Idle"
/// ```
#[derive(Clone, Debug)]
pub struct TomlTagSource {
    name: String,
    entries: Vec<RawTagEntry>,
}

/// Raw TOML structure.
#[derive(Debug, Deserialize)]
struct RawTagDatabase {
    #[serde(default)]
    tags: Vec<RawTagEntry>,
}

#[derive(Clone, Debug, Deserialize)]
struct RawTagEntry {
    name: String,
    #[serde(default)]
    description: String,
}

impl TomlTagSource {
    /// Parse a database from a TOML string.
    pub fn parse(name: impl Into<String>, content: &str) -> Result<Self, SourceError> {
        let raw: RawTagDatabase = toml::from_str(content)?;
        Ok(Self {
            name: name.into(),
            entries: raw.tags,
        })
    }

    /// Parse a database from a TOML file. The source is named after the path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(format!("file: {}", path.display()), &content)
    }

    /// Number of declarations in the database.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TagSource for TomlTagSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn register_tags(&self, context: &mut RegistrationContext) {
        for entry in &self.entries {
            context.register(&entry.name, &entry.description, self);
        }
        tracing::debug!(source = %self.name, count = self.entries.len(), "loaded tag database");
    }
}
