//! Simple bind against a server pool

use crate::error::{DirectoryError, DirectoryResult};
use crate::ldap::server::ServerPool;
use crate::ldap::session::{BindStatus, DirectoryConnector, DirectorySession, RC_INVALID_CREDENTIALS};
use std::fmt;
use tracing::{debug, info, warn};

/// A session bound as some identity.
///
/// Owned by exactly one authentication attempt and released with
/// [`BoundSession::unbind`].
pub struct BoundSession {
    session: Box<dyn DirectorySession>,
    server_url: String,
    bound_dn: String,
}

impl BoundSession {
    /// URL of the endpoint this session is connected to
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// DN the session is bound as
    pub fn bound_dn(&self) -> &str {
        &self.bound_dn
    }

    pub(crate) fn session_mut(&mut self) -> &mut dyn DirectorySession {
        self.session.as_mut()
    }

    /// Release the session. Unbind failures are only logged.
    pub async fn unbind(mut self) {
        release(self.session.as_mut(), &self.server_url).await;
    }
}

impl fmt::Debug for BoundSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundSession")
            .field("server_url", &self.server_url)
            .field("bound_dn", &self.bound_dn)
            .finish()
    }
}

impl fmt::Display for BoundSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} as {}", self.server_url, self.bound_dn)
    }
}

/// Result of a bind that reached the directory
#[derive(Debug)]
pub enum BindOutcome {
    Bound(BoundSession),
    Rejected { rc: u32, message: String },
}

impl BindOutcome {
    pub fn is_bound(&self) -> bool {
        matches!(self, BindOutcome::Bound(_))
    }
}

/// Open a fresh session on the first reachable endpoint and bind as `dn`.
///
/// A refused bind is `Ok(BindOutcome::Rejected)`; connection, STARTTLS and
/// protocol faults are returned as errors.
pub async fn simple_bind(
    connector: &dyn DirectoryConnector,
    pool: &ServerPool,
    dn: &str,
    password: &str,
) -> DirectoryResult<BindOutcome> {
    // An empty password turns a simple bind into an unauthenticated bind,
    // which many servers answer with success.
    if password.is_empty() {
        warn!("Refusing LDAP bind with empty password for {}", dn);
        return Ok(BindOutcome::Rejected {
            rc: RC_INVALID_CREDENTIALS,
            message: "empty password".to_string(),
        });
    }

    let (mut session, server_url) = connect(connector, pool).await?;

    match session.simple_bind(dn, password).await {
        Ok(BindStatus::Success) => {
            debug!("LDAP bind successful in simple mode on {}", server_url);
            Ok(BindOutcome::Bound(BoundSession {
                session,
                server_url,
                bound_dn: dn.to_string(),
            }))
        }
        Ok(BindStatus::Refused { rc, message }) => {
            info!("LDAP bind failed for {}: {} (code {})", dn, message, rc);
            release(session.as_mut(), &server_url).await;
            Ok(BindOutcome::Rejected { rc, message })
        }
        Err(e) => {
            warn!("Error during LDAP bind on {}: {}", server_url, e);
            release(session.as_mut(), &server_url).await;
            Err(e)
        }
    }
}

/// Try each endpoint in order until one accepts a connection
async fn connect(
    connector: &dyn DirectoryConnector,
    pool: &ServerPool,
) -> DirectoryResult<(Box<dyn DirectorySession>, String)> {
    let settings = pool.settings();
    let mut last_error = None;

    for server in pool.servers() {
        match connector.connect(server, settings).await {
            Ok(session) => {
                if settings.starttls {
                    debug!("Upgraded LDAP connection through StartTLS: {}", server.url);
                }
                return Ok((session, server.url.clone()));
            }
            Err(e) => {
                warn!("LDAP server {} unavailable: {}", server.url, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or(DirectoryError::NoEndpoints))
}

pub(crate) async fn release(session: &mut dyn DirectorySession, server_url: &str) {
    if let Err(e) = session.unbind().await {
        debug!("LDAP unbind failed on {}: {}", server_url, e);
    }
}
