//! Directory authentication for FO services

pub mod error;
pub mod ldap;

pub use error::{ConfigError, DirectoryError, DirectoryResult};
pub use ldap::{AuthClient, AuthOutcome, DirectoryConfig, RawDirectoryConfig, ServerPool};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
