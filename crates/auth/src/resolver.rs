//! Request-time session resolution and impersonation.
//!
//! Impersonation is a two-token model: the active credential is an ordinary
//! TENANT_ADMIN token, and the super-admin's original token rides along as a
//! return ticket. [`Session`] makes the two states explicit so ending
//! impersonation pattern-matches instead of probing for an optional cookie.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use atelier_core::{SubjectId, TenantId};

use crate::codec::{SessionCodec, SessionToken, VerifyError};
use crate::scope::{AuthzError, TenantFilter, resolve_scope};
use crate::{Role, SessionClaims, SessionPayload};

/// What happens once the return ticket stops verifying while the
/// impersonated session is still alive.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnTicketPolicy {
    /// Reject the impersonated session too; the caller logs in again.
    #[default]
    RequireReauthentication,
    /// Keep the impersonated session until its own expiry. Ending
    /// impersonation still fails, so the caller stays a tenant admin.
    /// Applies only to an expired super-admin ticket; any other unusable
    /// ticket is ignored and the session resolves as direct.
    ContinueUntilExpiry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpersonationConfig {
    /// Lifetime of the minted TENANT_ADMIN token.
    #[serde(default = "default_impersonation_ttl_seconds")]
    pub ttl_seconds: i64,

    #[serde(default)]
    pub return_ticket_policy: ReturnTicketPolicy,
}

fn default_impersonation_ttl_seconds() -> i64 {
    60 * 60 * 8
}

impl Default for ImpersonationConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_impersonation_ttl_seconds(),
            return_ticket_policy: ReturnTicketPolicy::default(),
        }
    }
}

/// The preserved super-admin credential.
#[derive(Clone, PartialEq, Eq)]
pub struct ReturnTicket(String);

impl ReturnTicket {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for ReturnTicket {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("ReturnTicket(<redacted>)")
    }
}

/// A verified request session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    Direct(SessionToken),
    Impersonating {
        active: SessionToken,
        return_ticket: ReturnTicket,
    },
}

impl Session {
    /// The credential requests are authorized with.
    pub fn active(&self) -> &SessionToken {
        match self {
            Session::Direct(active) | Session::Impersonating { active, .. } => active,
        }
    }

    pub fn claims(&self) -> &SessionClaims {
        self.active().claims()
    }

    pub fn scope(&self) -> TenantFilter {
        resolve_scope(self.claims())
    }

    pub fn is_impersonating(&self) -> bool {
        matches!(self, Session::Impersonating { .. })
    }

    pub fn return_ticket(&self) -> Option<&ReturnTicket> {
        match self {
            Session::Direct(_) => None,
            Session::Impersonating { return_ticket, .. } => Some(return_ticket),
        }
    }
}

/// Tenant identity a super-admin switches into.
///
/// The subject is a real staff user of the tenant, so the minted token is
/// indistinguishable from one issued at a normal tenant login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpersonationTarget {
    pub tenant_id: TenantId,
    pub tenant_slug: Option<String>,
    pub subject_id: SubjectId,
    pub email: String,
    pub display_name: String,
}

impl ImpersonationTarget {
    fn into_payload(self) -> SessionPayload {
        SessionPayload::tenant_admin(
            self.subject_id,
            self.email,
            self.display_name,
            self.tenant_id,
            self.tenant_slug,
        )
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("session rejected: {0}")]
    Unauthenticated(VerifyError),

    #[error("impersonation ended: {0}")]
    ReturnTicketLapsed(AuthzError),
}

impl SessionError {
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::Unauthenticated(reason) => reason.code(),
            SessionError::ReturnTicketLapsed(_) => "IMPERSONATION_LAPSED",
        }
    }
}

/// Turns cookies into a [`Session`] and drives impersonation transitions.
#[derive(Debug, Clone)]
pub struct SessionResolver {
    codec: SessionCodec,
    impersonation: ImpersonationConfig,
}

impl SessionResolver {
    pub fn new(codec: SessionCodec, impersonation: ImpersonationConfig) -> Self {
        Self {
            codec,
            impersonation,
        }
    }

    pub fn codec(&self) -> &SessionCodec {
        &self.codec
    }

    /// Resolve the active credential and, if present, the return ticket.
    pub fn resolve_at(
        &self,
        active: Option<&str>,
        return_ticket: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Session, SessionError> {
        let Some(raw) = active.filter(|token| !token.is_empty()) else {
            return Err(SessionError::Unauthenticated(VerifyError::MissingToken));
        };
        let claims = self
            .codec
            .verify_at(Some(raw), now)
            .map_err(SessionError::Unauthenticated)?;
        let active = SessionToken::new(raw.to_string(), claims);

        let Some(ticket) = return_ticket.filter(|ticket| !ticket.is_empty()) else {
            return Ok(Session::Direct(active));
        };

        // A leftover ticket next to a platform session has nothing to return to.
        if active.claims().role() == Role::SuperAdmin {
            return Ok(Session::Direct(active));
        }

        let lenient =
            self.impersonation.return_ticket_policy == ReturnTicketPolicy::ContinueUntilExpiry;

        // Only a genuine super-admin credential makes this an impersonation.
        let reason = match self.codec.verify_signed(Some(ticket)) {
            Ok(claims) if claims.role() == Role::SuperAdmin => {
                if claims.is_expired_at(now) && !lenient {
                    return Err(SessionError::ReturnTicketLapsed(
                        AuthzError::ReturnTicketRejected(VerifyError::ExpiredToken),
                    ));
                }
                return Ok(Session::Impersonating {
                    active,
                    return_ticket: ReturnTicket(ticket.to_string()),
                });
            }
            Ok(_) => AuthzError::SuperAdminRequired,
            Err(reason) => AuthzError::ReturnTicketRejected(reason),
        };

        if lenient {
            Ok(Session::Direct(active))
        } else {
            Err(SessionError::ReturnTicketLapsed(reason))
        }
    }

    /// PLATFORM_SESSION → IMPERSONATED_SESSION.
    ///
    /// Only a direct SUPER_ADMIN session may start; an impersonated session is
    /// a TENANT_ADMIN session and is refused like any other.
    pub fn begin_impersonation_at(
        &self,
        current: &Session,
        target: ImpersonationTarget,
        now: DateTime<Utc>,
    ) -> Result<Session, AuthzError> {
        let Session::Direct(platform) = current else {
            return Err(AuthzError::SuperAdminRequired);
        };
        if platform.claims().role() != Role::SuperAdmin {
            return Err(AuthzError::SuperAdminRequired);
        }

        let active = self
            .codec
            .sign_at(&target.into_payload(), self.impersonation.ttl_seconds, now)
            .map_err(|e| AuthzError::Mint(e.to_string()))?;

        Ok(Session::Impersonating {
            active,
            return_ticket: ReturnTicket(platform.as_str().to_string()),
        })
    }

    /// IMPERSONATED_SESSION → PLATFORM_SESSION.
    ///
    /// The return ticket is re-verified from scratch. On failure `current` is
    /// untouched: the caller stays impersonated and never becomes unscoped.
    pub fn end_impersonation_at(
        &self,
        current: &Session,
        now: DateTime<Utc>,
    ) -> Result<Session, AuthzError> {
        let Session::Impersonating { return_ticket, .. } = current else {
            return Err(AuthzError::NotImpersonating);
        };

        let restored = self.verify_return_ticket(return_ticket.as_str(), now)?;
        Ok(Session::Direct(restored))
    }

    fn verify_return_ticket(
        &self,
        ticket: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionToken, AuthzError> {
        let claims = self
            .codec
            .verify_at(Some(ticket), now)
            .map_err(AuthzError::ReturnTicketRejected)?;
        if claims.role() != Role::SuperAdmin {
            return Err(AuthzError::SuperAdminRequired);
        }
        Ok(SessionToken::new(ticket.to_string(), claims))
    }
}
