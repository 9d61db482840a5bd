//! Configuration loading.
//!
//! Configuration lives in a TOML file with two optional sections:
//!
//! ```toml
//! [session]
//! backend = "memory"
//! cookie_name = "keepsake_sid"
//! max_lifetime_secs = 3600
//! gc_interval_secs = 600
//!
//! [server]
//! bind = "127.0.0.1:8080"
//! ```
//!
//! Missing sections and fields fall back to defaults.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use keepsake_session::{MEMORY_BACKEND, StoreConfig};
use serde::Deserialize;

/// Default cookie carrying the session identifier.
pub const DEFAULT_COOKIE_NAME: &str = "keepsake_sid";

/// Default idle lifetime in seconds (1 hour).
pub const DEFAULT_MAX_LIFETIME_SECS: u64 = 3600;

/// Default bind address.
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value failed validation.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Session settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Registered backend to store sessions in.
    pub backend: String,

    /// Cookie carrying the session identifier.
    pub cookie_name: String,

    /// Idle lifetime before a session is swept, and cookie Max-Age.
    pub max_lifetime_secs: u64,

    /// Time between sweeps. Defaults to `max_lifetime_secs`.
    pub gc_interval_secs: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: MEMORY_BACKEND.to_string(),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            max_lifetime_secs: DEFAULT_MAX_LIFETIME_SECS,
            gc_interval_secs: None,
        }
    }
}

impl SessionConfig {
    /// Idle lifetime as a duration.
    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }

    /// Expiry settings for the store.
    pub fn store_config(&self) -> StoreConfig {
        let config = StoreConfig::new().with_max_idle(self.max_lifetime());
        match self.gc_interval_secs {
            Some(secs) => config.with_gc_interval(Duration::from_secs(secs)),
            None => config,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.backend.is_empty() {
            return Err(ConfigError::Invalid("session.backend is empty".into()));
        }
        if !is_valid_cookie_name(&self.cookie_name) {
            return Err(ConfigError::Invalid(format!(
                "session.cookie_name '{}' is not a valid cookie name",
                self.cookie_name
            )));
        }
        if self.max_lifetime_secs == 0 {
            return Err(ConfigError::Invalid(
                "session.max_lifetime_secs must be greater than zero".into(),
            ));
        }
        if self.gc_interval_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "session.gc_interval_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind the server to.
    pub bind: SocketAddr,

    /// Enable HTTP request tracing.
    pub request_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            request_logging: true,
        }
    }
}

impl ServerConfig {
    /// Set the bind address.
    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind = addr;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.request_logging = enabled;
        self
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct KeepsakeConfig {
    pub session: SessionConfig,
    pub server: ServerConfig,
}

impl KeepsakeConfig {
    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: KeepsakeConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all sections.
    pub fn validate(&self) -> Result<()> {
        self.session.validate()
    }
}

/// Load config from a specific file path.
pub fn load_config_file(path: &Path) -> Result<KeepsakeConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    KeepsakeConfig::from_toml(&contents)
}

/// Whether `name` is an RFC 6265 cookie-name token.
pub fn is_valid_cookie_name(name: &str) -> bool {
    const SEPARATORS: &[u8] = b"()<>@,;:\\\"/[]?={} \t";
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_graphic() && !SEPARATORS.contains(&b))
}
