//! In-memory directory for tests
//!
//! Evaluates AND-of-equality filters, counts connections and tracks how many
//! sessions are still open.

use crate::error::{DirectoryError, DirectoryResult};
use crate::ldap::config::{DirectoryConfig, Endpoints, RawDirectoryConfig};
use crate::ldap::server::{ConnectSettings, DirectoryServer, ServerPool, TlsPolicy};
use crate::ldap::session::{
    BindStatus, DirectoryConnector, DirectoryEntry, DirectorySession, RC_INVALID_CREDENTIALS,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

pub const SERVICE_DN: &str = "cn=reader,dc=example,dc=com";
pub const SERVICE_PASSWORD: &str = "reader-secret";
pub const BASE_DN: &str = "ou=people,dc=example,dc=com";

struct MockEntry {
    dn: String,
    password: String,
    attrs: HashMap<String, Vec<String>>,
}

#[derive(Default)]
struct State {
    entries: Vec<MockEntry>,
    unreachable: HashSet<String>,
    starttls_failure: bool,
    bind_fault: bool,
    search_fault: bool,
    connections: usize,
    open_sessions: usize,
    binds: usize,
    searches: Vec<String>,
}

#[derive(Clone, Default)]
pub struct MockDirectory {
    state: Arc<Mutex<State>>,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory holding the service account only
    pub fn with_service_account() -> Self {
        Self::new().with_entry(SERVICE_DN, SERVICE_PASSWORD, &[("cn", "reader")])
    }

    /// Add a person under [`BASE_DN`] with `uid` and `objectClass=person`
    pub fn with_person(self, uid: &str, password: &str) -> Self {
        let dn = format!("uid={},{}", uid, BASE_DN);
        self.with_entry(&dn, password, &[("uid", uid), ("objectClass", "person")])
    }

    pub fn with_entry(self, dn: &str, password: &str, attrs: &[(&str, &str)]) -> Self {
        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in attrs {
            map.entry(name.to_string())
                .or_default()
                .push(value.to_string());
        }

        self.state.lock().entries.push(MockEntry {
            dn: dn.to_string(),
            password: password.to_string(),
            attrs: map,
        });
        self
    }

    pub fn with_unreachable(self, url: &str) -> Self {
        self.state.lock().unreachable.insert(url.to_string());
        self
    }

    pub fn with_starttls_failure(self) -> Self {
        self.state.lock().starttls_failure = true;
        self
    }

    pub fn with_bind_fault(self) -> Self {
        self.state.lock().bind_fault = true;
        self
    }

    pub fn with_search_fault(self) -> Self {
        self.state.lock().search_fault = true;
        self
    }

    pub fn pool(&self, urls: &[&str]) -> ServerPool {
        build_pool(urls, false)
    }

    pub fn pool_with_starttls(&self, urls: &[&str]) -> ServerPool {
        build_pool(urls, true)
    }

    pub fn connections(&self) -> usize {
        self.state.lock().connections
    }

    pub fn open_sessions(&self) -> usize {
        self.state.lock().open_sessions
    }

    pub fn binds(&self) -> usize {
        self.state.lock().binds
    }

    /// Filters of every search performed so far
    pub fn searches(&self) -> Vec<String> {
        self.state.lock().searches.clone()
    }
}

fn build_pool(urls: &[&str], starttls: bool) -> ServerPool {
    ServerPool::new(
        urls.iter()
            .map(|url| DirectoryServer {
                url: url.to_string(),
                tls: TlsPolicy::Required,
            })
            .collect(),
        ConnectSettings {
            starttls,
            timeout: Duration::from_secs(1),
        },
    )
}

/// Configuration pointing at the mock directory
pub fn test_config(filter: Option<&str>) -> DirectoryConfig {
    DirectoryConfig::parse(RawDirectoryConfig {
        uri: Some(Endpoints::One("ldap://localhost:389".to_string())),
        base: Some(BASE_DN.to_string()),
        bind_dn: Some(SERVICE_DN.to_string()),
        bind_password: Some(SERVICE_PASSWORD.to_string()),
        filter: filter.map(str::to_string),
        ..Default::default()
    })
    .unwrap()
}

#[async_trait]
impl DirectoryConnector for MockDirectory {
    async fn connect(
        &self,
        server: &DirectoryServer,
        settings: ConnectSettings,
    ) -> DirectoryResult<Box<dyn DirectorySession>> {
        let mut state = self.state.lock();
        state.connections += 1;

        if state.unreachable.contains(&server.url) {
            return Err(DirectoryError::Transport(format!(
                "connection refused: {}",
                server.url
            )));
        }
        if settings.starttls && state.starttls_failure {
            return Err(DirectoryError::Transport(
                "StartTLS negotiation failed".to_string(),
            ));
        }

        state.open_sessions += 1;
        Ok(Box::new(MockSession {
            state: self.state.clone(),
            bound: false,
            closed: false,
        }))
    }
}

/// Connector that fails the test when contacted
pub struct UnreachableConnector;

#[async_trait]
impl DirectoryConnector for UnreachableConnector {
    async fn connect(
        &self,
        server: &DirectoryServer,
        _settings: ConnectSettings,
    ) -> DirectoryResult<Box<dyn DirectorySession>> {
        panic!("directory contacted at {}", server.url);
    }
}

struct MockSession {
    state: Arc<Mutex<State>>,
    bound: bool,
    closed: bool,
}

#[async_trait]
impl DirectorySession for MockSession {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> DirectoryResult<BindStatus> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        state.binds += 1;

        if state.bind_fault {
            return Err(DirectoryError::Transport(
                "connection reset by peer".to_string(),
            ));
        }

        let accepted = state
            .entries
            .iter()
            .any(|e| e.dn.eq_ignore_ascii_case(dn) && e.password == password);

        self.bound = accepted;
        if accepted {
            Ok(BindStatus::Success)
        } else {
            Ok(BindStatus::Refused {
                rc: RC_INVALID_CREDENTIALS,
                message: "invalidCredentials".to_string(),
            })
        }
    }

    async fn search(
        &mut self,
        base: &str,
        filter: &str,
        attrs: &[&str],
    ) -> DirectoryResult<Vec<DirectoryEntry>> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        state.searches.push(filter.to_string());

        if state.search_fault {
            return Err(DirectoryError::Transport("unexpected disconnect".to_string()));
        }
        if !self.bound {
            return Err(DirectoryError::Transport("search on unbound session".to_string()));
        }

        let suffix = format!(",{}", base.to_ascii_lowercase());
        Ok(state
            .entries
            .iter()
            .filter(|e| e.dn.to_ascii_lowercase().ends_with(&suffix))
            .filter(|e| filter_matches(filter, &e.attrs))
            .map(|e| DirectoryEntry {
                dn: e.dn.clone(),
                attrs: e
                    .attrs
                    .iter()
                    .filter(|(name, _)| attrs.iter().any(|a| a.eq_ignore_ascii_case(name)))
                    .map(|(name, values)| (name.clone(), values.clone()))
                    .collect(),
            })
            .collect())
    }

    async fn unbind(&mut self) -> DirectoryResult<()> {
        if !self.closed {
            self.closed = true;
            self.bound = false;
            self.state.lock().open_sessions -= 1;
        }
        Ok(())
    }
}

/// Evaluate `(attr=value)` and `(&...)` filters; `*` tests presence
fn filter_matches(filter: &str, attrs: &HashMap<String, Vec<String>>) -> bool {
    let inner = filter
        .strip_prefix('(')
        .and_then(|f| f.strip_suffix(')'))
        .unwrap_or(filter);

    if let Some(clauses) = inner.strip_prefix('&') {
        return split_clauses(clauses)
            .into_iter()
            .all(|clause| filter_matches(clause, attrs));
    }

    let Some((name, value)) = inner.split_once('=') else {
        return false;
    };

    let values = attrs
        .iter()
        .find(|(attr, _)| attr.eq_ignore_ascii_case(name))
        .map(|(_, values)| values);

    match values {
        Some(values) if value == "*" => !values.is_empty(),
        Some(values) => values.iter().any(|v| v.eq_ignore_ascii_case(value)),
        None => false,
    }
}

fn split_clauses(s: &str) -> Vec<&str> {
    let mut clauses = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match c {
            '(' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    clauses.push(&s[start..=i]);
                }
            }
            _ => {}
        }
    }

    clauses
}
