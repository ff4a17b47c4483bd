//! LDAP directory configuration
//!
//! The raw mapping mirrors the keys of `ldap.toml`:
//! - `uri` (or `endpoints`): one URL or a list of URLs
//! - `base`, `bind_dn`, `bind_password`: required
//! - `starttls`, `filter`, `tls_verify`, `lookup_attribute`, `timeout_seconds`: optional

use crate::error::ConfigError;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// One endpoint or an ordered list of endpoints
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Endpoints {
    One(String),
    Many(Vec<String>),
}

impl Endpoints {
    /// Normalize into an ordered list
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Endpoints::One(uri) => vec![uri],
            Endpoints::Many(uris) => uris,
        }
    }
}

/// Unvalidated directory settings, as read from a config source
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RawDirectoryConfig {
    /// LDAP server URL(s), ldap:// or ldaps://
    #[serde(default, alias = "endpoints")]
    pub uri: Option<Endpoints>,

    /// Upgrade plaintext connections with STARTTLS before binding
    #[serde(default)]
    pub starttls: bool,

    /// Base DN for user searches
    #[serde(default)]
    pub base: Option<String>,

    /// Service account DN used for the search step
    #[serde(default)]
    pub bind_dn: Option<String>,

    /// Service account password
    #[serde(default)]
    pub bind_password: Option<String>,

    /// Extra filter fragment AND-ed into every user search
    #[serde(default)]
    pub filter: Option<String>,

    /// Require certificate validation for TLS connections
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,

    /// Attribute matched against the username
    #[serde(default = "default_lookup_attribute")]
    pub lookup_attribute: String,

    /// Connect and per-operation timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_tls_verify() -> bool {
    true
}

fn default_lookup_attribute() -> String {
    "uid".to_string()
}

fn default_timeout() -> u64 {
    10
}

impl RawDirectoryConfig {
    /// Parse an `ldap.toml` document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Read an `ldap.toml` file without validating it
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

impl Default for RawDirectoryConfig {
    fn default() -> Self {
        Self {
            uri: None,
            starttls: false,
            base: None,
            bind_dn: None,
            bind_password: None,
            filter: None,
            tls_verify: default_tls_verify(),
            lookup_attribute: default_lookup_attribute(),
            timeout_seconds: default_timeout(),
        }
    }
}

/// Validated directory configuration, built once per process
#[derive(Clone)]
pub struct DirectoryConfig {
    /// Ordered, non-empty list of server URLs
    pub endpoints: Vec<String>,
    pub use_starttls: bool,
    pub base_dn: String,
    pub service_bind_dn: String,
    pub service_bind_password: String,
    /// Normalized filter fragment, always parenthesized when present
    pub search_filter: Option<String>,
    pub tls_verify: bool,
    pub lookup_attribute: String,
    pub timeout: Duration,
}

impl DirectoryConfig {
    /// Validate raw settings.
    ///
    /// Every missing required key is reported in a single
    /// [`ConfigError::MissingKeys`].
    pub fn parse(raw: RawDirectoryConfig) -> Result<Self, ConfigError> {
        let endpoints = raw.uri.map(Endpoints::into_vec).unwrap_or_default();

        let (base_dn, service_bind_dn, service_bind_password) =
            match (endpoints.is_empty(), raw.base, raw.bind_dn, raw.bind_password) {
                (false, Some(base), Some(dn), Some(password)) => (base, dn, password),
                (no_uri, base, dn, password) => {
                    let mut missing = Vec::new();
                    if no_uri {
                        missing.push("uri");
                    }
                    if dn.is_none() {
                        missing.push("bind_dn");
                    }
                    if password.is_none() {
                        missing.push("bind_password");
                    }
                    if base.is_none() {
                        missing.push("base");
                    }
                    return Err(ConfigError::MissingKeys(missing));
                }
            };

        for endpoint in &endpoints {
            validate_endpoint(endpoint)?;
        }

        if raw.timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "timeout_seconds must be greater than zero".to_string(),
            ));
        }

        let lookup_attribute = raw.lookup_attribute.trim().to_string();
        if lookup_attribute.is_empty() {
            return Err(ConfigError::Invalid(
                "lookup_attribute must not be empty".to_string(),
            ));
        }

        Ok(Self {
            endpoints,
            use_starttls: raw.starttls,
            base_dn,
            service_bind_dn,
            service_bind_password,
            search_filter: normalize_filter(raw.filter),
            tls_verify: raw.tls_verify,
            lookup_attribute,
            timeout: Duration::from_secs(raw.timeout_seconds),
        })
    }
}

impl fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("endpoints", &self.endpoints)
            .field("use_starttls", &self.use_starttls)
            .field("base_dn", &self.base_dn)
            .field("service_bind_dn", &self.service_bind_dn)
            .field("service_bind_password", &"<redacted>")
            .field("search_filter", &self.search_filter)
            .field("tls_verify", &self.tls_verify)
            .field("lookup_attribute", &self.lookup_attribute)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Wrap a bare filter fragment as `(fragment)`.
///
/// Fragments that already contain `(` are kept as-is. Blank fragments mean
/// "no constraint".
pub fn normalize_filter(filter: Option<String>) -> Option<String> {
    let filter = filter?;
    let filter = filter.trim();

    if filter.is_empty() {
        None
    } else if filter.contains('(') {
        Some(filter.to_string())
    } else {
        Some(format!("({})", filter))
    }
}

fn validate_endpoint(endpoint: &str) -> Result<(), ConfigError> {
    let url = Url::parse(endpoint)
        .map_err(|e| ConfigError::Invalid(format!("invalid LDAP URL {}: {}", endpoint, e)))?;

    match url.scheme() {
        "ldap" | "ldaps" => Ok(()),
        scheme => Err(ConfigError::Invalid(format!(
            "LDAP URL {} must use ldap:// or ldaps://, not {}://",
            endpoint, scheme
        ))),
    }
}
