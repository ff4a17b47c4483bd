//! Directory protocol seam
//!
//! [`DirectoryConnector`] opens one [`DirectorySession`] per endpoint. The
//! production implementation is backed by `ldap3`.

use crate::error::{DirectoryError, DirectoryResult};
use crate::ldap::server::{ConnectSettings, DirectoryServer, TlsPolicy};
use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, ResultEntry, Scope, SearchEntry};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// LDAP result code for a successful operation
pub const RC_SUCCESS: u32 = 0;

/// LDAP result code for invalid credentials
pub const RC_INVALID_CREDENTIALS: u32 = 49;

/// Directory answer to a simple bind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindStatus {
    Success,
    /// The directory refused the credentials (bad password, disabled account, ...)
    Refused { rc: u32, message: String },
}

/// A search result entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub dn: String,
    pub attrs: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    /// First value of an attribute
    pub fn first_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .get(name)
            .and_then(|v| v.first())
            .map(|s| s.as_str())
    }
}

impl From<SearchEntry> for DirectoryEntry {
    fn from(entry: SearchEntry) -> Self {
        Self {
            dn: entry.dn,
            attrs: entry.attrs,
        }
    }
}

/// One live connection to a directory server
#[async_trait]
pub trait DirectorySession: Send {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> DirectoryResult<BindStatus>;

    /// Subtree search under `base`, returning entries only
    async fn search(
        &mut self,
        base: &str,
        filter: &str,
        attrs: &[&str],
    ) -> DirectoryResult<Vec<DirectoryEntry>>;

    async fn unbind(&mut self) -> DirectoryResult<()>;
}

/// Opens sessions against directory endpoints
#[async_trait]
pub trait DirectoryConnector: Send + Sync {
    async fn connect(
        &self,
        server: &DirectoryServer,
        settings: ConnectSettings,
    ) -> DirectoryResult<Box<dyn DirectorySession>>;
}

/// `ldap3` backed connector
#[derive(Debug, Clone, Copy, Default)]
pub struct Ldap3Connector;

struct Ldap3Session {
    ldap: Ldap,
    timeout: Duration,
}

#[async_trait]
impl DirectoryConnector for Ldap3Connector {
    async fn connect(
        &self,
        server: &DirectoryServer,
        settings: ConnectSettings,
    ) -> DirectoryResult<Box<dyn DirectorySession>> {
        // STARTTLS, when enabled, is negotiated by ldap3 before the
        // connection is handed back; a failed upgrade is a connect error.
        let conn_settings = LdapConnSettings::new()
            .set_conn_timeout(settings.timeout)
            .set_starttls(settings.starttls)
            .set_no_tls_verify(server.tls == TlsPolicy::Optional);

        debug!("Connecting to LDAP server: {}", server.url);

        let (conn, ldap) = LdapConnAsync::with_settings(conn_settings, &server.url)
            .await
            .map_err(|source| DirectoryError::Connect {
                url: server.url.clone(),
                source,
            })?;

        ldap3::drive!(conn);

        Ok(Box::new(Ldap3Session {
            ldap,
            timeout: settings.timeout,
        }))
    }
}

#[async_trait]
impl DirectorySession for Ldap3Session {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> DirectoryResult<BindStatus> {
        let timeout = self.timeout;
        let result = self.ldap.with_timeout(timeout).simple_bind(dn, password).await?;

        if result.rc == RC_SUCCESS {
            Ok(BindStatus::Success)
        } else {
            Ok(BindStatus::Refused {
                rc: result.rc,
                message: result.text,
            })
        }
    }

    async fn search(
        &mut self,
        base: &str,
        filter: &str,
        attrs: &[&str],
    ) -> DirectoryResult<Vec<DirectoryEntry>> {
        let timeout = self.timeout;
        let (rs, _res) = self
            .ldap
            .with_timeout(timeout)
            .search(base, Scope::Subtree, filter, attrs.to_vec())
            .await?
            .success()?;

        Ok(rs
            .into_iter()
            .filter(is_search_entry)
            .map(|entry| SearchEntry::construct(entry).into())
            .collect())
    }

    async fn unbind(&mut self) -> DirectoryResult<()> {
        self.ldap.unbind().await?;
        Ok(())
    }
}

/// Referrals and intermediate responses are not matches
fn is_search_entry(entry: &ResultEntry) -> bool {
    !entry.is_ref() && !entry.is_intermediate()
}
