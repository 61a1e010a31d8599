//! Tenant scoping contract consumed by every data-access path.
//!
//! The resolver never runs queries. It hands out a [`TenantFilter`] and the
//! storage layer AND-merges it into every read and write predicate.

use thiserror::Error;

use atelier_core::TenantId;

use crate::codec::VerifyError;
use crate::{Authority, SessionClaims};

/// Query constraint derived from a verified session.
///
/// `Unrestricted` is an explicit value, not the absence of a filter: code that
/// forgets to ask for a scope does not compile into "match everything".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TenantFilter {
    /// Super-admin: any tenant may be named explicitly, or none for
    /// platform-wide aggregates.
    Unrestricted,
    /// Single-tenant equality constraint.
    Tenant(TenantId),
}

/// Rows that belong to exactly one tenant.
pub trait TenantOwned {
    fn tenant_id(&self) -> &TenantId;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("tenant mismatch: scoped to '{scoped}', requested '{requested}'")]
    TenantMismatch {
        scoped: TenantId,
        requested: TenantId,
    },

    #[error("an explicit tenant is required for this operation")]
    TenantRequired,

    #[error("super-admin role required")]
    SuperAdminRequired,

    #[error("session is not impersonating a tenant")]
    NotImpersonating,

    #[error("impersonation return ticket rejected: {0}")]
    ReturnTicketRejected(VerifyError),

    #[error("failed to mint session token: {0}")]
    Mint(String),
}

/// Derive the scope for a verified session.
pub fn resolve_scope(claims: &SessionClaims) -> TenantFilter {
    match claims.authority() {
        Authority::SuperAdmin => TenantFilter::Unrestricted,
        Authority::TenantAdmin { tenant_id, .. } => TenantFilter::Tenant(tenant_id.clone()),
    }
}

impl TenantFilter {
    pub fn is_unrestricted(&self) -> bool {
        matches!(self, TenantFilter::Unrestricted)
    }

    pub fn tenant_id(&self) -> Option<&TenantId> {
        match self {
            TenantFilter::Unrestricted => None,
            TenantFilter::Tenant(tenant_id) => Some(tenant_id),
        }
    }

    /// The predicate storage layers AND into their own.
    pub fn admits(&self, tenant_id: &TenantId) -> bool {
        match self {
            TenantFilter::Unrestricted => true,
            TenantFilter::Tenant(scoped) => scoped == tenant_id,
        }
    }

    pub fn admits_row<T: TenantOwned + ?Sized>(&self, row: &T) -> bool {
        self.admits(row.tenant_id())
    }

    /// Keep only the rows this scope may see.
    pub fn retain<I>(&self, rows: I) -> impl Iterator<Item = I::Item>
    where
        I: IntoIterator,
        I::Item: TenantOwned,
    {
        rows.into_iter().filter(move |row| self.admits_row(row))
    }

    /// Apply an explicitly requested tenant (e.g. `?tenantId=`).
    ///
    /// Super-admins may pick any tenant; tenant admins may only name their own.
    pub fn narrow(self, requested: Option<TenantId>) -> Result<TenantFilter, AuthzError> {
        match (self, requested) {
            (filter, None) => Ok(filter),
            (TenantFilter::Unrestricted, Some(requested)) => Ok(TenantFilter::Tenant(requested)),
            (TenantFilter::Tenant(scoped), Some(requested)) if scoped == requested => {
                Ok(TenantFilter::Tenant(scoped))
            }
            (TenantFilter::Tenant(scoped), Some(requested)) => {
                Err(AuthzError::TenantMismatch { scoped, requested })
            }
        }
    }

    /// Writes must land in a concrete tenant.
    pub fn require_tenant(&self) -> Result<&TenantId, AuthzError> {
        self.tenant_id().ok_or(AuthzError::TenantRequired)
    }

    pub fn authorize_resource(&self, resource_tenant: &TenantId) -> Result<(), AuthzError> {
        match self {
            TenantFilter::Tenant(scoped) if scoped != resource_tenant => {
                Err(AuthzError::TenantMismatch {
                    scoped: scoped.clone(),
                    requested: resource_tenant.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    /// A payload that names a tenant must name the scoped one.
    pub fn check_payload_tenant(&self, claimed: Option<&TenantId>) -> Result<(), AuthzError> {
        match claimed {
            Some(claimed) => self.authorize_resource(claimed),
            None => Ok(()),
        }
    }
}
