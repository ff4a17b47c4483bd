//! LDAP search-then-bind authentication
//!
//! Flow for one attempt:
//! - Bind as the service account (optionally after STARTTLS)
//! - Search for the user's DN
//! - Re-bind as that DN with the user's password
//!
//! Sessions are scoped to the attempt; nothing is cached between calls.

mod bind;
mod client;
mod config;
mod search;
mod server;
mod session;

#[cfg(test)]
mod mock;

pub use bind::{simple_bind, BindOutcome, BoundSession};
pub use client::{AuthClient, AuthOutcome};
pub use config::{normalize_filter, DirectoryConfig, Endpoints, RawDirectoryConfig};
pub use search::{build_filter, SearchOutcome, SearchVerifier};
pub use server::{ConnectSettings, DirectoryServer, ServerPool, TlsPolicy};
pub use session::{
    BindStatus, DirectoryConnector, DirectoryEntry, DirectorySession, Ldap3Connector,
    RC_INVALID_CREDENTIALS, RC_SUCCESS,
};
