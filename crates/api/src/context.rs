use atelier_auth::{AuthzError, Session, SessionClaims, TenantFilter};
use atelier_core::TenantId;

/// Tenant scope for a request.
///
/// Derived from the verified session only; present on every protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    filter: TenantFilter,
}

impl TenantContext {
    pub fn new(filter: TenantFilter) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> &TenantFilter {
        &self.filter
    }

    /// Scope for a request that may name a tenant explicitly.
    pub fn narrow(&self, requested: Option<TenantId>) -> Result<TenantFilter, AuthzError> {
        self.filter.clone().narrow(requested)
    }
}

/// Principal context for a request (the resolved session).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    session: Session,
}

impl PrincipalContext {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn claims(&self) -> &SessionClaims {
        self.session.claims()
    }
}
