//! Process-wide signing secret.

use thiserror::Error;

/// Minimum secret length, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// HMAC key used to sign and verify session tokens.
///
/// Construct once at startup and inject it; a `SessionSecret` that exists is
/// always long enough.
#[derive(Clone)]
pub struct SessionSecret(Vec<u8>);

impl SessionSecret {
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self, SecretError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(SecretError::Missing);
        }
        if secret.len() < MIN_SECRET_LEN {
            return Err(SecretError::TooShort { len: secret.len() });
        }
        Ok(Self(secret))
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl core::fmt::Debug for SessionSecret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("SessionSecret(<redacted>)")
    }
}

/// Configuration-time secret failure. Fatal at startup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SecretError {
    #[error("session secret is not set")]
    Missing,

    #[error("session secret must be at least {MIN_SECRET_LEN} bytes long (got {len})")]
    TooShort { len: usize },
}

impl SecretError {
    pub fn code(&self) -> &'static str {
        "MISSING_SECRET"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_and_short_secrets() {
        assert_eq!(SessionSecret::new("").unwrap_err(), SecretError::Missing);
        assert_eq!(
            SessionSecret::new("x".repeat(31)).unwrap_err(),
            SecretError::TooShort { len: 31 }
        );
        assert!(SessionSecret::new("x".repeat(32)).is_ok());
    }

    #[test]
    fn both_failures_share_the_config_code() {
        assert_eq!(SecretError::Missing.code(), "MISSING_SECRET");
        assert_eq!(SecretError::TooShort { len: 3 }.code(), "MISSING_SECRET");
    }

    #[test]
    fn debug_does_not_leak_the_secret() {
        let secret = SessionSecret::new("super-secret-value-that-is-long-enough").unwrap();
        assert!(!format!("{secret:?}").contains("super-secret"));
    }
}
