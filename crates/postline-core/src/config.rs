//! Configuration types.
//!
//! Everything here is plain serde data so it can be loaded from a JSON file
//! or embedded in a larger application config.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::SqliteListingCache;
use crate::{Error, Result};

/// Security/encryption mode for connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Security {
    /// No encryption (not recommended).
    None,
    /// Implicit TLS (connect directly with TLS).
    #[default]
    Tls,
    /// STARTTLS upgrade after plaintext connect.
    StartTls,
}

impl Security {
    /// Get display name for the security mode.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::None => "None (insecure)",
            Self::Tls => "SSL/TLS",
            Self::StartTls => "STARTTLS",
        }
    }

    /// TLS policy for the submission negotiation step.
    ///
    /// Implicit TLS is already encrypted, so it never asks for STARTTLS.
    #[must_use]
    pub const fn tls_policy(self) -> postline_smtp::TlsPolicy {
        match self {
            Self::None | Self::Tls => postline_smtp::TlsPolicy::Disabled,
            Self::StartTls => postline_smtp::TlsPolicy::Required,
        }
    }
}

fn default_client_hostname() -> String {
    "127.0.0.1".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

/// SMTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    /// Server hostname.
    pub host: String,
    /// Server port; 0 picks the default for `security`.
    #[serde(default)]
    pub port: u16,
    /// Security mode.
    #[serde(default)]
    pub security: Security,
    /// Name announced in EHLO/HELO.
    #[serde(default = "default_client_hostname")]
    pub client_hostname: String,
    /// Connect and read timeout, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Username for authentication; empty skips AUTH.
    #[serde(default)]
    pub username: String,
    /// Password for authentication.
    #[serde(default, skip_serializing)]
    pub password: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 0,
            security: Security::default(),
            client_hostname: default_client_hostname(),
            timeout_secs: default_timeout_secs(),
            username: String::new(),
            password: String::new(),
        }
    }
}

impl SmtpConfig {
    /// Get default port for the security mode.
    #[must_use]
    pub const fn default_port(security: Security) -> u16 {
        match security {
            Security::None => 25,
            Security::StartTls => 587,
            Security::Tls => 465,
        }
    }

    /// Port to connect to.
    #[must_use]
    pub const fn effective_port(&self) -> u16 {
        if self.port == 0 {
            Self::default_port(self.security)
        } else {
            self.port
        }
    }

    /// Read timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

const fn default_page_limit_max() -> u32 {
    999
}

/// Message listing behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Use server-side SORT when available.
    #[serde(default)]
    pub use_sort: bool,
    /// Use server-side THREAD when available.
    #[serde(default)]
    pub use_threads: bool,
    /// Caller's offset from UTC in seconds, applied to `date:` searches.
    #[serde(default)]
    pub timezone_offset_secs: i64,
    /// Largest accepted page size.
    #[serde(default = "default_page_limit_max")]
    pub page_limit_max: u32,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            use_sort: false,
            use_threads: false,
            timezone_offset_secs: 0,
            page_limit_max: default_page_limit_max(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Outgoing mail server.
    #[serde(default)]
    pub smtp: SmtpConfig,
    /// Listing options.
    #[serde(default)]
    pub listing: ListingConfig,
    /// `SQLite` file for the listing cache; no cache when absent.
    #[serde(default)]
    pub cache_path: Option<PathBuf>,
}

impl Config {
    /// Parses a configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the text is not valid configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path).await?;
        tracing::debug!(path = %path.display(), "loading configuration");
        Self::from_json_str(&text)
    }

    /// Opens the persistent listing cache, if a path is configured.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a path that is not UTF-8 and a cache
    /// error if the database cannot be opened.
    pub async fn open_cache(&self) -> Result<Option<SqliteListingCache>> {
        let Some(path) = &self.cache_path else {
            return Ok(None);
        };
        let path = path.to_str().ok_or_else(|| {
            Error::Config(format!("cache path {} is not valid UTF-8", path.display()))
        })?;
        SqliteListingCache::new(path).await.map(Some)
    }

    fn validate(&self) -> Result<()> {
        if self.listing.page_limit_max == 0 {
            return Err(Error::Config("listing.page_limit_max must be positive".into()));
        }
        if self.smtp.timeout_secs == 0 {
            return Err(Error::Config("smtp.timeout_secs must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config = Config::from_json_str(r#"{"smtp": {"host": "smtp.example.com"}}"#).unwrap();
        assert_eq!(config.smtp.security, Security::Tls);
        assert_eq!(config.smtp.effective_port(), 465);
        assert_eq!(config.smtp.client_hostname, "127.0.0.1");
        assert_eq!(config.smtp.timeout(), Duration::from_secs(30));
        assert_eq!(config.listing.page_limit_max, 999);
        assert!(config.cache_path.is_none());
    }

    #[test]
    fn explicit_values() {
        let json = r#"{
            "smtp": {"host": "mx", "port": 2525, "security": "StartTls", "username": "u", "password": "p"},
            "listing": {"use_sort": true, "use_threads": true, "timezone_offset_secs": 3600},
            "cache_path": "/tmp/postline.db"
        }"#;
        let config = Config::from_json_str(json).unwrap();
        assert_eq!(config.smtp.effective_port(), 2525);
        assert_eq!(config.smtp.security.tls_policy(), postline_smtp::TlsPolicy::Required);
        assert!(config.listing.use_threads);
        assert_eq!(config.listing.timezone_offset_secs, 3600);
        assert_eq!(config.cache_path, Some(PathBuf::from("/tmp/postline.db")));
    }

    #[test]
    fn password_is_not_serialized() {
        let config = SmtpConfig {
            password: "hunter2".into(),
            ..SmtpConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("hunter2"));
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(Config::from_json_str("not json").is_err());
        let err = Config::from_json_str(r#"{"listing": {"page_limit_max": 0}}"#).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
    }

    #[test]
    fn default_ports() {
        assert_eq!(SmtpConfig::default_port(Security::None), 25);
        assert_eq!(SmtpConfig::default_port(Security::StartTls), 587);
        assert_eq!(Security::Tls.display_name(), "SSL/TLS");
    }

    #[tokio::test]
    async fn cache_is_opened_only_when_configured() {
        assert!(Config::default().open_cache().await.unwrap().is_none());

        let path = std::env::temp_dir().join(format!("postline-config-{}.db", std::process::id()));
        let config = Config {
            cache_path: Some(path.clone()),
            ..Config::default()
        };
        let cache = config.open_cache().await.unwrap().unwrap();
        assert_eq!(cache.count().await.unwrap(), 0);
        drop(cache);
        let _ = std::fs::remove_file(path);
    }
}
