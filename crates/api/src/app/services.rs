//! Service wiring shared by every handler.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use atelier_auth::{
    RevocationList, SecretError, SessionCodec, SessionResolver, SessionSecret, TenantOwned,
};
use atelier_core::{DomainError, DomainResult, SubjectId, TenantId};
use atelier_infra::{Directory, InMemoryRevocationList, InMemoryTenantStore, TenantStore};

use crate::config::AppConfig;
use crate::cookies::CookieSettings;
use crate::middleware::AuthState;

/// A tenant's appointment, the demo tenant-scoped resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub customer_name: String,
    pub service: String,
    pub starts_at: DateTime<Utc>,
    pub created_by: SubjectId,
}

impl Booking {
    pub fn new(
        tenant_id: TenantId,
        customer_name: String,
        service: String,
        starts_at: DateTime<Utc>,
        created_by: SubjectId,
    ) -> DomainResult<Self> {
        if customer_name.trim().is_empty() {
            return Err(DomainError::validation("customerName must not be blank"));
        }
        if service.trim().is_empty() {
            return Err(DomainError::validation("service must not be blank"));
        }
        Ok(Self {
            id: Uuid::now_v7(),
            tenant_id,
            customer_name: customer_name.trim().to_string(),
            service: service.trim().to_string(),
            starts_at,
            created_by,
        })
    }
}

impl TenantOwned for Booking {
    fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }
}

pub type BookingStore = Arc<dyn TenantStore<Uuid, Booking>>;

pub struct AppServices {
    pub resolver: SessionResolver,
    pub session_ttl_seconds: i64,
    pub cookies: CookieSettings,
    pub directory: Arc<dyn Directory>,
    pub revocations: Arc<dyn RevocationList>,
    pub bookings: BookingStore,
}

impl AppServices {
    /// Wire services from configuration. Fails if the session secret is
    /// missing or too short.
    pub fn new(config: &AppConfig, directory: Arc<dyn Directory>) -> Result<Self, SecretError> {
        let secret = SessionSecret::new(config.session_secret.as_bytes().to_vec())?;
        let resolver = SessionResolver::new(SessionCodec::new(secret), config.impersonation.clone());

        Ok(Self {
            resolver,
            session_ttl_seconds: config.session.ttl_seconds,
            cookies: CookieSettings::new(config.session.secure_cookies),
            directory,
            revocations: Arc::new(InMemoryRevocationList::new()),
            bookings: Arc::new(InMemoryTenantStore::new()),
        })
    }

    pub fn auth_state(&self) -> AuthState {
        AuthState {
            resolver: self.resolver.clone(),
            cookies: self.cookies,
        }
    }
}
