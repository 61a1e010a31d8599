use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use atelier_core::{DomainError, SubjectId, TenantId};

use crate::Role;

/// What a session is allowed to see.
///
/// A tenant admin always carries its tenant; a super admin never does. The
/// flat wire form (`role` + optional `tenantId`) is only accepted when it maps
/// onto one of these variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authority {
    SuperAdmin,
    TenantAdmin {
        tenant_id: TenantId,
        tenant_slug: Option<String>,
    },
}

impl Authority {
    pub fn role(&self) -> Role {
        match self {
            Authority::SuperAdmin => Role::SuperAdmin,
            Authority::TenantAdmin { .. } => Role::TenantAdmin,
        }
    }

    pub fn tenant_id(&self) -> Option<&TenantId> {
        match self {
            Authority::SuperAdmin => None,
            Authority::TenantAdmin { tenant_id, .. } => Some(tenant_id),
        }
    }

    pub fn tenant_slug(&self) -> Option<&str> {
        match self {
            Authority::SuperAdmin => None,
            Authority::TenantAdmin { tenant_slug, .. } => tenant_slug.as_deref(),
        }
    }
}

/// Identity data supplied when minting a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPayload {
    pub subject_id: SubjectId,
    /// Denormalized for display; not authoritative.
    pub email: String,
    /// Denormalized for display; not authoritative.
    pub display_name: String,
    pub authority: Authority,
}

impl SessionPayload {
    pub fn super_admin(
        subject_id: SubjectId,
        email: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            subject_id,
            email: email.into(),
            display_name: display_name.into(),
            authority: Authority::SuperAdmin,
        }
    }

    pub fn tenant_admin(
        subject_id: SubjectId,
        email: impl Into<String>,
        display_name: impl Into<String>,
        tenant_id: TenantId,
        tenant_slug: Option<String>,
    ) -> Self {
        Self {
            subject_id,
            email: email.into(),
            display_name: display_name.into(),
            authority: Authority::TenantAdmin {
                tenant_id,
                tenant_slug,
            },
        }
    }
}

/// Decoded payload of a session token: identity plus issue/expiry (Unix seconds).
///
/// Claims are immutable; changing any of them means minting a new token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireClaims", into = "WireClaims")]
pub struct SessionClaims {
    payload: SessionPayload,
    issued_at: i64,
    expires_at: i64,
}

impl SessionClaims {
    pub fn new(payload: SessionPayload, issued_at: i64, expires_at: i64) -> Self {
        Self {
            payload,
            issued_at,
            expires_at,
        }
    }

    pub fn payload(&self) -> &SessionPayload {
        &self.payload
    }

    pub fn subject_id(&self) -> &SubjectId {
        &self.payload.subject_id
    }

    pub fn email(&self) -> &str {
        &self.payload.email
    }

    pub fn display_name(&self) -> &str {
        &self.payload.display_name
    }

    pub fn authority(&self) -> &Authority {
        &self.payload.authority
    }

    pub fn role(&self) -> Role {
        self.payload.authority.role()
    }

    pub fn tenant_id(&self) -> Option<&TenantId> {
        self.payload.authority.tenant_id()
    }

    pub fn tenant_slug(&self) -> Option<&str> {
        self.payload.authority.tenant_slug()
    }

    pub fn issued_at(&self) -> i64 {
        self.issued_at
    }

    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    /// `expiresAt <= now` means expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now.timestamp()
    }

    /// Seconds of validity left at `now` (zero once expired).
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now.timestamp()).max(0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClaimsError {
    #[error("invalid subject: {0}")]
    InvalidSubject(DomainError),

    #[error("TENANT_ADMIN claims must carry a non-empty tenantId")]
    MissingTenant,

    #[error("SUPER_ADMIN claims must not carry a tenantId")]
    UnexpectedTenant,
}

/// Flat JSON shape of the token payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireClaims {
    sub: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    name: String,
    role: Role,
    #[serde(rename = "tenantId", default, skip_serializing_if = "Option::is_none")]
    tenant_id: Option<String>,
    #[serde(rename = "tenantSlug", default, skip_serializing_if = "Option::is_none")]
    tenant_slug: Option<String>,
    iat: i64,
    exp: i64,
}

impl TryFrom<WireClaims> for SessionClaims {
    type Error = ClaimsError;

    fn try_from(wire: WireClaims) -> Result<Self, Self::Error> {
        let subject_id = SubjectId::parse(wire.sub).map_err(ClaimsError::InvalidSubject)?;

        let authority = match (wire.role, wire.tenant_id) {
            (Role::SuperAdmin, None) => Authority::SuperAdmin,
            (Role::SuperAdmin, Some(_)) => return Err(ClaimsError::UnexpectedTenant),
            (Role::TenantAdmin, None) => return Err(ClaimsError::MissingTenant),
            (Role::TenantAdmin, Some(raw)) => Authority::TenantAdmin {
                tenant_id: TenantId::parse(raw).map_err(|_| ClaimsError::MissingTenant)?,
                tenant_slug: wire.tenant_slug,
            },
        };

        Ok(Self {
            payload: SessionPayload {
                subject_id,
                email: wire.email,
                display_name: wire.name,
                authority,
            },
            issued_at: wire.iat,
            expires_at: wire.exp,
        })
    }
}

impl From<SessionClaims> for WireClaims {
    fn from(claims: SessionClaims) -> Self {
        let role = claims.role();
        let SessionPayload {
            subject_id,
            email,
            display_name,
            authority,
        } = claims.payload;

        let (tenant_id, tenant_slug) = match authority {
            Authority::SuperAdmin => (None, None),
            Authority::TenantAdmin {
                tenant_id,
                tenant_slug,
            } => (Some(tenant_id.into()), tenant_slug),
        };

        Self {
            sub: subject_id.into(),
            email,
            name: display_name,
            role,
            tenant_id,
            tenant_slug,
            iat: claims.issued_at,
            exp: claims.expires_at,
        }
    }
}
