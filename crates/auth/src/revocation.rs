//! Server-side denylist consulted before sensitive operations.
//!
//! Tokens are stateless, so logout alone cannot invalidate a copied token.
//! A denylist entry names one issued token by subject and issue time and only
//! needs to live until that token would have expired anyway.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use atelier_core::SubjectId;

use crate::SessionClaims;

/// Identifies one issued token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RevocationKey {
    pub subject_id: SubjectId,
    pub issued_at: i64,
}

impl RevocationKey {
    pub fn of(claims: &SessionClaims) -> Self {
        Self {
            subject_id: claims.subject_id().clone(),
            issued_at: claims.issued_at(),
        }
    }
}

pub trait RevocationList: Send + Sync {
    /// Deny the token these claims came from until it expires.
    fn revoke(&self, claims: &SessionClaims, now: DateTime<Utc>);

    fn is_revoked(&self, claims: &SessionClaims, now: DateTime<Utc>) -> bool;
}

impl<S> RevocationList for Arc<S>
where
    S: RevocationList + ?Sized,
{
    fn revoke(&self, claims: &SessionClaims, now: DateTime<Utc>) {
        (**self).revoke(claims, now)
    }

    fn is_revoked(&self, claims: &SessionClaims, now: DateTime<Utc>) -> bool {
        (**self).is_revoked(claims, now)
    }
}
