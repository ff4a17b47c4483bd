//! Directory server descriptors
//!
//! A [`ServerPool`] is rebuilt from the configuration on every
//! authentication attempt; it holds no connection state.

use crate::ldap::config::DirectoryConfig;
use std::time::Duration;

/// Certificate validation policy for TLS connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsPolicy {
    /// Server certificate must validate
    #[default]
    Required,
    /// Certificate errors are ignored (not recommended for production)
    Optional,
}

/// A single directory endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryServer {
    pub url: String,
    pub tls: TlsPolicy,
}

/// Transport settings shared by every endpoint of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectSettings {
    pub starttls: bool,
    pub timeout: Duration,
}

/// Ordered set of endpoints for one directory service
#[derive(Debug, Clone)]
pub struct ServerPool {
    servers: Vec<DirectoryServer>,
    settings: ConnectSettings,
}

impl ServerPool {
    pub fn new(servers: Vec<DirectoryServer>, settings: ConnectSettings) -> Self {
        Self { servers, settings }
    }

    /// Build the pool described by a configuration
    pub fn from_config(config: &DirectoryConfig) -> Self {
        let tls = if config.tls_verify {
            TlsPolicy::Required
        } else {
            TlsPolicy::Optional
        };

        let servers = config
            .endpoints
            .iter()
            .map(|url| DirectoryServer {
                url: url.clone(),
                tls,
            })
            .collect();

        Self::new(
            servers,
            ConnectSettings {
                starttls: config.use_starttls,
                timeout: config.timeout,
            },
        )
    }

    /// Endpoints in failover order
    pub fn servers(&self) -> &[DirectoryServer] {
        &self.servers
    }

    pub fn settings(&self) -> ConnectSettings {
        self.settings
    }
}
