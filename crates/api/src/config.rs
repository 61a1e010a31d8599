//! Server configuration, loaded once at startup from `ATELIER_*` variables.
//!
//! Nested keys use `__`: `ATELIER_SESSION__TTL_SECONDS` sets
//! `session.ttl_seconds`.

use serde::Deserialize;

use atelier_auth::{DEFAULT_SESSION_TTL_SECONDS, ImpersonationConfig};

const ENV_PREFIX: &str = "ATELIER";

#[derive(Clone, Deserialize)]
pub struct AppConfig {
    /// HMAC key for session tokens. Validated when the codec is built.
    #[serde(default)]
    pub session_secret: String,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub impersonation: ImpersonationConfig,

    /// Super-admin account seeded into the directory at startup.
    #[serde(default)]
    pub bootstrap: Option<BootstrapAdmin>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_ttl_seconds")]
    pub ttl_seconds: i64,

    /// Set `Secure` on session cookies. Turn off only for local HTTP.
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,
}

#[derive(Clone, Deserialize)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
    #[serde(default = "default_admin_name")]
    pub name: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_session_ttl_seconds() -> i64 {
    DEFAULT_SESSION_TTL_SECONDS
}

fn default_secure_cookies() -> bool {
    true
}

fn default_admin_name() -> String {
    "Platform Admin".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_session_ttl_seconds(),
            secure_cookies: default_secure_cookies(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_environment(environment())
    }

    fn from_environment(source: config::Environment) -> Result<Self, config::ConfigError> {
        let config: Self = config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()?;
        config.validate()
    }

    /// A non-positive lifetime would mint tokens that are expired on arrival.
    fn validate(self) -> Result<Self, config::ConfigError> {
        for (key, ttl) in [
            ("session.ttl_seconds", self.session.ttl_seconds),
            ("impersonation.ttl_seconds", self.impersonation.ttl_seconds),
        ] {
            if ttl <= 0 {
                return Err(config::ConfigError::Message(format!(
                    "{key} must be positive, got {ttl}"
                )));
            }
        }
        Ok(self)
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("session_secret", &"<redacted>")
            .field("bind_addr", &self.bind_addr)
            .field("session", &self.session)
            .field("impersonation", &self.impersonation)
            .field("bootstrap", &self.bootstrap)
            .finish()
    }
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .finish()
    }
}
