//! Search-then-bind verification
//!
//! 1. Bind as the service account
//! 2. Search for exactly one entry matching the caller's attribute filters
//! 3. Release the service session
//! 4. Bind as the matched DN with the caller's password

use crate::error::DirectoryResult;
use crate::ldap::bind::{simple_bind, BindOutcome, BoundSession};
use crate::ldap::config::DirectoryConfig;
use crate::ldap::server::ServerPool;
use crate::ldap::session::{DirectoryConnector, DirectoryEntry, DirectorySession};
use ldap3::ldap_escape;
use tracing::{debug, info, warn};

/// Outcome of an authenticated search that reached the directory
#[derive(Debug)]
pub enum SearchOutcome {
    /// One entry matched and the user bind succeeded
    Authenticated {
        session: BoundSession,
        entry: DirectoryEntry,
    },
    /// One entry matched but the user bind was refused
    Rejected { entry: DirectoryEntry },
    /// The service account could not bind; no search was attempted
    ServiceBindFailed,
    NotFound,
    /// More than one entry matched
    Ambiguous(usize),
}

impl SearchOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SearchOutcome::Authenticated { .. })
    }

    /// Matched entry, also available when the user bind was refused
    pub fn entry(&self) -> Option<&DirectoryEntry> {
        match self {
            SearchOutcome::Authenticated { entry, .. } | SearchOutcome::Rejected { entry } => {
                Some(entry)
            }
            _ => None,
        }
    }
}

/// Runs the search-then-bind sequence for one authentication attempt
pub struct SearchVerifier<'a> {
    connector: &'a dyn DirectoryConnector,
    config: &'a DirectoryConfig,
}

impl<'a> SearchVerifier<'a> {
    pub fn new(connector: &'a dyn DirectoryConnector, config: &'a DirectoryConfig) -> Self {
        Self { connector, config }
    }

    /// Locate the entry matching `filters` and re-bind as it with `password`.
    ///
    /// Every session bound as the service account is released before this
    /// returns.
    pub async fn authenticated_search(
        &self,
        pool: &ServerPool,
        password: &str,
        filters: &[(&str, &str)],
    ) -> DirectoryResult<SearchOutcome> {
        let mut service = match simple_bind(
            self.connector,
            pool,
            &self.config.service_bind_dn,
            &self.config.service_bind_password,
        )
        .await?
        {
            BindOutcome::Bound(session) => session,
            BindOutcome::Rejected { rc, message } => {
                warn!(
                    "LDAP service account bind failed for {}: {} (code {})",
                    self.config.service_bind_dn, message, rc
                );
                return Ok(SearchOutcome::ServiceBindFailed);
            }
        };

        let filter = build_filter(filters, self.config.search_filter.as_deref());
        debug!("LDAP search filter: {}", filter);

        let result = service
            .session_mut()
            .search(
                &self.config.base_dn,
                &filter,
                &[self.config.lookup_attribute.as_str()],
            )
            .await;

        // The user bind below gets its own session.
        service.unbind().await;

        let mut entries = result.map_err(|e| {
            warn!("Error during LDAP search under {}: {}", self.config.base_dn, e);
            e
        })?;

        if entries.len() > 1 {
            warn!(
                "LDAP search returned too many ({}) results for {}",
                entries.len(),
                filter
            );
            return Ok(SearchOutcome::Ambiguous(entries.len()));
        }

        let Some(entry) = entries.pop() else {
            info!("LDAP search returned no results for {}", filter);
            return Ok(SearchOutcome::NotFound);
        };

        debug!("LDAP search found dn: {}", entry.dn);

        match simple_bind(self.connector, pool, &entry.dn, password).await? {
            BindOutcome::Bound(session) => Ok(SearchOutcome::Authenticated { session, entry }),
            BindOutcome::Rejected { .. } => Ok(SearchOutcome::Rejected { entry }),
        }
    }
}

/// Compose `(&(name=value)...(configured))` with escaped values
pub fn build_filter(filters: &[(&str, &str)], configured: Option<&str>) -> String {
    let mut query: String = filters
        .iter()
        .map(|(name, value)| format!("({}={})", name, ldap_escape(*value)))
        .collect();

    if let Some(extra) = configured {
        query.push_str(extra);
    }

    format!("(&{})", query)
}
