//! Loading `ldap.toml` with environment overrides

use fo_auth::{ConfigError, DirectoryConfig, RawDirectoryConfig};
use std::path::Path;

/// Environment variable overriding `bind_password`
pub const BIND_PASSWORD_ENV: &str = "FO_LDAP_BIND_PASSWORD";

/// Apply environment overrides on top of file settings
pub fn apply_env(mut raw: RawDirectoryConfig) -> RawDirectoryConfig {
    if let Ok(password) = std::env::var(BIND_PASSWORD_ENV) {
        raw.bind_password = Some(password);
    }
    raw
}

pub fn load(path: &Path) -> Result<DirectoryConfig, ConfigError> {
    DirectoryConfig::parse(apply_env(RawDirectoryConfig::from_file(path)?))
}

/// Human readable summary, without secrets
pub fn describe(config: &DirectoryConfig) -> String {
    let lines = [
        format!("endpoints:        {}", config.endpoints.join(", ")),
        format!("starttls:         {}", config.use_starttls),
        format!("tls verify:       {}", config.tls_verify),
        format!("base:             {}", config.base_dn),
        format!("bind dn:          {}", config.service_bind_dn),
        format!("lookup attribute: {}", config.lookup_attribute),
        format!("timeout:          {}s", config.timeout.as_secs()),
        format!(
            "filter:           {}",
            config.search_filter.as_deref().unwrap_or("(none)")
        ),
    ];
    lines.join("\n")
}
