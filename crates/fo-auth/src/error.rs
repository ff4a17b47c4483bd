//! Error types for directory authentication

use thiserror::Error;

/// Result type for directory protocol operations
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Errors raised while building a [`DirectoryConfig`](crate::DirectoryConfig).
///
/// These only ever surface at construction time.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required config values: {}", .0.join(", "))]
    MissingKeys(Vec<&'static str>),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Network or protocol faults while talking to the directory.
///
/// A rejected bind is not an error; see [`BindOutcome`](crate::ldap::BindOutcome).
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Failed to connect to LDAP server {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: ldap3::LdapError,
    },

    #[error("LDAP protocol error: {0}")]
    Protocol(#[from] ldap3::LdapError),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("No LDAP endpoints configured")]
    NoEndpoints,
}
