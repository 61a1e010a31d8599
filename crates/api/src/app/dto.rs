use axum::response::Response;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use atelier_auth::{Session, SessionClaims, TenantFilter};
use atelier_core::TenantId;

use crate::app::errors;
use crate::app::services::Booking;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpersonateRequest {
    #[serde(default)]
    pub tenant_id: Option<String>,
}

/// `?tenantId=` / `?tenantSlug=` selector accepted by tenant-scoped routes.
/// `tenantId` wins when both are given.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantQuery {
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub tenant_slug: Option<String>,
    /// Case-insensitive substring match on the customer name.
    #[serde(default)]
    pub customer: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    /// Optional; when present it must agree with the request scope.
    #[serde(default)]
    pub tenant_id: Option<String>,
    pub customer_name: String,
    pub service: String,
    pub starts_at: DateTime<Utc>,
}

/// Parse an optional tenant id from a query string or body.
pub fn parse_tenant_id(
    field: &'static str,
    raw: Option<String>,
) -> Result<Option<TenantId>, Response> {
    raw.map(|raw| TenantId::parse(raw).map_err(|e| errors::invalid_id(field, e.to_string())))
        .transpose()
}

pub fn claims_to_json(claims: &SessionClaims) -> Value {
    json!({
        "id": claims.subject_id().to_string(),
        "email": claims.email(),
        "name": claims.display_name(),
        "role": claims.role().as_str(),
        "tenantId": claims.tenant_id().map(|t| t.to_string()),
        "tenantSlug": claims.tenant_slug(),
    })
}

pub fn scope_to_json(filter: &TenantFilter) -> Value {
    match filter {
        TenantFilter::Unrestricted => json!({ "kind": "unrestricted" }),
        TenantFilter::Tenant(tenant_id) => json!({
            "kind": "tenant",
            "tenantId": tenant_id.to_string(),
        }),
    }
}

pub fn session_to_json(session: &Session) -> Value {
    let claims = session.claims();
    json!({
        "user": claims_to_json(claims),
        "scope": scope_to_json(&session.scope()),
        "impersonating": session.is_impersonating(),
        "issuedAt": claims.issued_at(),
        "expiresAt": claims.expires_at(),
    })
}

pub fn booking_to_json(booking: &Booking) -> Value {
    serde_json::to_value(booking).unwrap_or(Value::Null)
}
