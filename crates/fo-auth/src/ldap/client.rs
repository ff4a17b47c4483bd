//! LDAP authentication client
//!
//! Entry point for the web application. Every outcome other than a
//! confirmed bind as the user collapses into [`AuthOutcome::NotAuthenticated`],
//! so callers cannot tell an unknown user from a wrong password or from a
//! directory outage. That distinction only appears in the logs.

use crate::error::ConfigError;
use crate::ldap::config::{DirectoryConfig, RawDirectoryConfig};
use crate::ldap::search::{SearchOutcome, SearchVerifier};
use crate::ldap::server::ServerPool;
use crate::ldap::session::{DirectoryConnector, Ldap3Connector};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Result of [`AuthClient::authenticate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The directory confirmed the credentials
    Authenticated,
    /// Not confirmed, for any reason
    NotAuthenticated,
}

impl AuthOutcome {
    pub fn is_authenticated(self) -> bool {
        self == AuthOutcome::Authenticated
    }
}

impl From<AuthOutcome> for bool {
    fn from(outcome: AuthOutcome) -> Self {
        outcome.is_authenticated()
    }
}

/// Long-lived, shareable directory authentication client.
///
/// Holds no connection state: each call to [`authenticate`](Self::authenticate)
/// opens and releases its own sessions.
pub struct AuthClient {
    config: DirectoryConfig,
    connector: Arc<dyn DirectoryConnector>,
}

impl AuthClient {
    /// Create a client backed by `ldap3`
    pub fn new(config: DirectoryConfig) -> Self {
        Self::with_connector(config, Arc::new(Ldap3Connector))
    }

    pub fn with_connector(config: DirectoryConfig, connector: Arc<dyn DirectoryConnector>) -> Self {
        Self { config, connector }
    }

    /// Validate raw settings and create a client backed by `ldap3`
    pub fn from_config(raw: RawDirectoryConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(DirectoryConfig::parse(raw)?))
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    /// Endpoints for one authentication attempt
    pub fn server_pool(&self) -> ServerPool {
        ServerPool::from_config(&self.config)
    }

    /// Authenticate a user with username and password
    pub async fn authenticate(&self, username: &str, password: &str) -> AuthOutcome {
        if password.is_empty() || username.is_empty() {
            debug!("Skipping LDAP authentication: empty username or password");
            return AuthOutcome::NotAuthenticated;
        }

        let pool = self.server_pool();
        debug!(
            "Attempting LDAP connection with {}",
            self.config.endpoints.join(", ")
        );

        let verifier = SearchVerifier::new(self.connector.as_ref(), &self.config);
        let result = verifier
            .authenticated_search(
                &pool,
                password,
                &[(self.config.lookup_attribute.as_str(), username)],
            )
            .await;

        match result {
            Ok(SearchOutcome::Authenticated { session, .. }) => {
                info!("User {} authenticated against LDAP server: {}", username, session);
                session.unbind().await;
                AuthOutcome::Authenticated
            }
            Ok(outcome) => {
                debug!("LDAP authentication not confirmed for {}: {:?}", username, outcome);
                AuthOutcome::NotAuthenticated
            }
            Err(e) => {
                error!("Error during LDAP authentication: {}", e);
                AuthOutcome::NotAuthenticated
            }
        }
    }
}

impl fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
