//! Tenants and their staff accounts.
//!
//! The directory is what login and impersonation consult; it never sees a
//! session token. Passwords are stored as argon2 PHC strings.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};
use serde::Serialize;
use thiserror::Error;

use atelier_auth::{ImpersonationTarget, SessionPayload};
use atelier_core::{SubjectId, TenantId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("tenant not found: {0}")]
    TenantNotFound(TenantId),

    #[error("tenant is deactivated: {0}")]
    TenantInactive(TenantId),

    #[error("no active user found for tenant {0}")]
    NoActiveUser(TenantId),

    #[error("an account already exists for {0}")]
    DuplicateEmail(String),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("directory storage unavailable")]
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantRecord {
    pub id: TenantId,
    pub slug: String,
    pub name: String,
    pub is_active: bool,
}

pub trait Directory: Send + Sync {
    /// Check credentials. Unknown email, wrong password and deactivated
    /// accounts are indistinguishable to the caller.
    fn authenticate(&self, email: &str, password: &str) -> Option<SessionPayload>;

    fn tenant(&self, tenant_id: &TenantId) -> Option<TenantRecord>;

    fn tenant_by_slug(&self, slug: &str) -> Option<TenantRecord>;

    /// Identity a super-admin takes on when entering `tenant_id`: the
    /// tenant's first active staff user.
    fn impersonation_target(&self, tenant_id: &TenantId)
    -> Result<ImpersonationTarget, DirectoryError>;
}

impl<S> Directory for Arc<S>
where
    S: Directory + ?Sized,
{
    fn authenticate(&self, email: &str, password: &str) -> Option<SessionPayload> {
        (**self).authenticate(email, password)
    }

    fn tenant(&self, tenant_id: &TenantId) -> Option<TenantRecord> {
        (**self).tenant(tenant_id)
    }

    fn tenant_by_slug(&self, slug: &str) -> Option<TenantRecord> {
        (**self).tenant_by_slug(slug)
    }

    fn impersonation_target(
        &self,
        tenant_id: &TenantId,
    ) -> Result<ImpersonationTarget, DirectoryError> {
        (**self).impersonation_target(tenant_id)
    }
}

#[derive(Debug, Clone)]
struct UserRecord {
    subject_id: SubjectId,
    email: String,
    display_name: String,
    password_hash: String,
    tenant_id: Option<TenantId>,
    is_active: bool,
}

impl UserRecord {
    fn payload(&self, tenant: Option<&TenantRecord>) -> SessionPayload {
        match (&self.tenant_id, tenant) {
            (Some(tenant_id), tenant) => SessionPayload::tenant_admin(
                self.subject_id.clone(),
                self.email.clone(),
                self.display_name.clone(),
                tenant_id.clone(),
                tenant.map(|t| t.slug.clone()),
            ),
            (None, _) => SessionPayload::super_admin(
                self.subject_id.clone(),
                self.email.clone(),
                self.display_name.clone(),
            ),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    tenants: HashMap<TenantId, TenantRecord>,
    // Insertion order decides which user impersonation picks.
    users: Vec<UserRecord>,
}

/// In-memory directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    inner: RwLock<State>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tenant(
        &self,
        slug: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<TenantRecord, DirectoryError> {
        let record = TenantRecord {
            id: TenantId::new(),
            slug: slug.into(),
            name: name.into(),
            is_active: true,
        };
        let mut state = self.inner.write().map_err(|_| DirectoryError::Unavailable)?;
        state.tenants.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    pub fn set_tenant_active(&self, tenant_id: &TenantId, active: bool) -> Result<(), DirectoryError> {
        let mut state = self.inner.write().map_err(|_| DirectoryError::Unavailable)?;
        let tenant = state
            .tenants
            .get_mut(tenant_id)
            .ok_or_else(|| DirectoryError::TenantNotFound(tenant_id.clone()))?;
        tenant.is_active = active;
        Ok(())
    }

    pub fn add_super_admin(
        &self,
        email: &str,
        display_name: &str,
        password: &str,
    ) -> Result<SubjectId, DirectoryError> {
        self.insert_user(email, display_name, password, None)
    }

    pub fn add_tenant_user(
        &self,
        tenant_id: &TenantId,
        email: &str,
        display_name: &str,
        password: &str,
    ) -> Result<SubjectId, DirectoryError> {
        {
            let state = self.inner.read().map_err(|_| DirectoryError::Unavailable)?;
            if !state.tenants.contains_key(tenant_id) {
                return Err(DirectoryError::TenantNotFound(tenant_id.clone()));
            }
        }
        self.insert_user(email, display_name, password, Some(tenant_id.clone()))
    }

    pub fn set_user_active(&self, subject_id: &SubjectId, active: bool) -> Result<(), DirectoryError> {
        let mut state = self.inner.write().map_err(|_| DirectoryError::Unavailable)?;
        if let Some(user) = state.users.iter_mut().find(|u| &u.subject_id == subject_id) {
            user.is_active = active;
        }
        Ok(())
    }

    fn insert_user(
        &self,
        email: &str,
        display_name: &str,
        password: &str,
        tenant_id: Option<TenantId>,
    ) -> Result<SubjectId, DirectoryError> {
        let email = normalize_email(email);
        let password_hash = hash_password(password)?;

        let mut state = self.inner.write().map_err(|_| DirectoryError::Unavailable)?;
        if state.users.iter().any(|u| u.email == email) {
            return Err(DirectoryError::DuplicateEmail(email));
        }

        let subject_id = SubjectId::new();
        state.users.push(UserRecord {
            subject_id: subject_id.clone(),
            email,
            display_name: display_name.to_string(),
            password_hash,
            tenant_id,
            is_active: true,
        });
        Ok(subject_id)
    }
}

impl Directory for InMemoryDirectory {
    fn authenticate(&self, email: &str, password: &str) -> Option<SessionPayload> {
        let email = normalize_email(email);
        let state = self.inner.read().ok()?;
        let user = state.users.iter().find(|u| u.email == email);

        let password_ok = verify_password(password, hash_to_check(user)?);
        let user = user?;
        if !password_ok || !user.is_active {
            return None;
        }

        let tenant = match &user.tenant_id {
            Some(tenant_id) => {
                let tenant = state.tenants.get(tenant_id)?;
                if !tenant.is_active {
                    tracing::debug!(tenant_id = %tenant_id, "login refused for deactivated tenant");
                    return None;
                }
                Some(tenant)
            }
            None => None,
        };

        Some(user.payload(tenant))
    }

    fn tenant(&self, tenant_id: &TenantId) -> Option<TenantRecord> {
        self.inner.read().ok()?.tenants.get(tenant_id).cloned()
    }

    fn tenant_by_slug(&self, slug: &str) -> Option<TenantRecord> {
        self.inner
            .read()
            .ok()?
            .tenants
            .values()
            .find(|t| t.slug == slug)
            .cloned()
    }

    fn impersonation_target(
        &self,
        tenant_id: &TenantId,
    ) -> Result<ImpersonationTarget, DirectoryError> {
        let state = self.inner.read().map_err(|_| DirectoryError::Unavailable)?;
        let tenant = state
            .tenants
            .get(tenant_id)
            .ok_or_else(|| DirectoryError::TenantNotFound(tenant_id.clone()))?;
        if !tenant.is_active {
            return Err(DirectoryError::TenantInactive(tenant_id.clone()));
        }

        let user = state
            .users
            .iter()
            .find(|u| u.is_active && u.tenant_id.as_ref() == Some(tenant_id))
            .ok_or_else(|| DirectoryError::NoActiveUser(tenant_id.clone()))?;

        Ok(ImpersonationTarget {
            tenant_id: tenant_id.clone(),
            tenant_slug: Some(tenant.slug.clone()),
            subject_id: user.subject_id.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
        })
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn hash_password(password: &str) -> Result<String, DirectoryError> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| DirectoryError::PasswordHash(e.to_string()))?;
    let salt =
        SaltString::encode_b64(&salt_bytes).map_err(|e| DirectoryError::PasswordHash(e.to_string()))?;
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DirectoryError::PasswordHash(e.to_string()))?;
    Ok(phc.to_string())
}

/// Unknown emails are checked against a decoy hash so they cost the same
/// argon2 work as a wrong password.
fn hash_to_check(user: Option<&UserRecord>) -> Option<&str> {
    match user {
        Some(user) => Some(&user.password_hash),
        None => decoy_hash(),
    }
}

fn decoy_hash() -> Option<&'static str> {
    static DECOY: OnceLock<Option<String>> = OnceLock::new();
    DECOY
        .get_or_init(|| hash_password("decoy-password-never-issued").ok())
        .as_deref()
}

fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
