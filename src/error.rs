//! Error types for loading tag data and running the sync protocol.
//!
//! Registration problems are not errors in this sense: they are collected as
//! [`RegistrationError`](crate::source::RegistrationError) records and the
//! build carries on.

use std::path::PathBuf;

/// Failure loading a TOML tag database.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read tag database {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse tag database: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Failure loading a [`RegistryConfig`](crate::config::RegistryConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors raised by the network delta protocol.
///
/// Wire-level variants reject a whole payload; nothing from a rejected
/// payload is applied.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("payload truncated: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error("unknown event type {0}")]
    UnknownEventType(u8),

    #[error("invalid tag id {0} on the wire")]
    InvalidTagId(i32),

    #[error("{0} trailing bytes after the last event")]
    TrailingBytes(usize),

    #[error("{0} entries do not fit a u16 length prefix")]
    TooManyEntries(usize),

    #[error("only an observer may apply received state")]
    NotObserver,

    #[error("transport failed: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}
