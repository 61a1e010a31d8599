use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use atelier_auth::{RevocationKey, RevocationList, SessionClaims};

/// Process-local denylist.
///
/// Entries are kept until the revoked token's own expiry and purged on the
/// next write after that. A multi-instance deployment needs a shared backend
/// behind the same trait.
#[derive(Debug, Default)]
pub struct InMemoryRevocationList {
    inner: RwLock<HashMap<RevocationKey, i64>>,
}

impl InMemoryRevocationList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RevocationList for InMemoryRevocationList {
    fn revoke(&self, claims: &SessionClaims, now: DateTime<Utc>) {
        if claims.is_expired_at(now) {
            return;
        }
        if let Ok(mut map) = self.inner.write() {
            let now = now.timestamp();
            map.retain(|_key, expires_at| *expires_at > now);
            map.insert(RevocationKey::of(claims), claims.expires_at());
            tracing::debug!(
                subject_id = %claims.subject_id(),
                issued_at = claims.issued_at(),
                entries = map.len(),
                "session token revoked"
            );
        }
    }

    fn is_revoked(&self, claims: &SessionClaims, now: DateTime<Utc>) -> bool {
        let Ok(map) = self.inner.read() else {
            // A poisoned denylist cannot vouch for anything.
            return true;
        };
        map.get(&RevocationKey::of(claims))
            .is_some_and(|expires_at| *expires_at > now.timestamp())
    }
}
