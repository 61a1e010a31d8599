use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use uuid::Uuid;

use atelier_auth::TenantFilter;
use atelier_core::TenantId;
use atelier_infra::DirectoryError;

use crate::app::services::{AppServices, Booking};
use crate::app::{dto, errors};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_booking).get(list_bookings))
        .route("/:id", get(get_booking))
}

/// Apply `?tenantId=` or `?tenantSlug=` to the session scope.
fn request_scope(
    services: &AppServices,
    tenant: &TenantContext,
    query: &dto::TenantQuery,
) -> Result<TenantFilter, Response> {
    let requested = match (
        dto::parse_tenant_id("tenantId", query.tenant_id.clone())?,
        query.tenant_slug.as_deref(),
    ) {
        (Some(tenant_id), _) => Some(tenant_id),
        (None, Some(slug)) => Some(tenant_for_slug(services, tenant, slug)?),
        (None, None) => None,
    };
    tenant
        .narrow(requested)
        .map_err(errors::authz_error_to_response)
}

/// Tenant-scoped sessions get a mismatch for any foreign slug, known or not.
fn tenant_for_slug(
    services: &AppServices,
    tenant: &TenantContext,
    slug: &str,
) -> Result<TenantId, Response> {
    match (services.directory.tenant_by_slug(slug), tenant.filter()) {
        (Some(record), _) => Ok(record.id),
        (None, TenantFilter::Unrestricted) => Err(errors::json_error(
            StatusCode::NOT_FOUND,
            "TENANT_NOT_FOUND",
            format!("no tenant with slug {slug}"),
        )),
        (None, TenantFilter::Tenant(_)) => Err(errors::json_error(
            StatusCode::FORBIDDEN,
            "TENANT_MISMATCH",
            "requested tenant is outside the session scope",
        )),
    }
}

pub async fn list_bookings(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Query(query): Query<dto::TenantQuery>,
) -> Response {
    let scope = match request_scope(&services, &tenant, &query) {
        Ok(scope) => scope,
        Err(response) => return response,
    };

    let needle = query.customer.map(|c| c.to_lowercase());
    let mut items = services.bookings.query(&scope, &|booking: &Booking| {
        needle
            .as_deref()
            .is_none_or(|needle| booking.customer_name.to_lowercase().contains(needle))
    });
    items.sort_by(|a, b| a.starts_at.cmp(&b.starts_at).then(a.id.cmp(&b.id)));

    let items = items.iter().map(dto::booking_to_json).collect::<Vec<_>>();
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "scope": dto::scope_to_json(&scope),
            "items": items,
        })),
    )
        .into_response()
}

pub async fn get_booking(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> Response {
    let Ok(id) = Uuid::parse_str(&id) else {
        return errors::invalid_id("id", "expected a UUID");
    };

    // Out-of-scope rows read as missing, not forbidden.
    match services.bookings.get(tenant.filter(), &id) {
        Some(booking) => (StatusCode::OK, Json(dto::booking_to_json(&booking))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "booking not found"),
    }
}

pub async fn create_booking(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::TenantQuery>,
    Json(body): Json<dto::CreateBookingRequest>,
) -> Response {
    let scope = match request_scope(&services, &tenant, &query) {
        Ok(scope) => scope,
        Err(response) => return response,
    };
    let claimed = match dto::parse_tenant_id("tenantId", body.tenant_id) {
        Ok(claimed) => claimed,
        Err(response) => return response,
    };

    if let Err(e) = scope.check_payload_tenant(claimed.as_ref()) {
        return errors::authz_error_to_response(e);
    }
    let scope = match scope.narrow(claimed) {
        Ok(scope) => scope,
        Err(e) => return errors::authz_error_to_response(e),
    };
    let tenant_id = match scope.require_tenant() {
        Ok(tenant_id) => tenant_id.clone(),
        Err(e) => return errors::authz_error_to_response(e),
    };

    match services.directory.tenant(&tenant_id) {
        None => {
            return errors::json_error(
                StatusCode::NOT_FOUND,
                "TENANT_NOT_FOUND",
                "tenant not found",
            );
        }
        Some(record) if !record.is_active => {
            return errors::directory_error_to_response(DirectoryError::TenantInactive(tenant_id));
        }
        Some(_) => {}
    }

    let booking = match Booking::new(
        tenant_id.clone(),
        body.customer_name,
        body.service,
        body.starts_at,
        principal.claims().subject_id().clone(),
    ) {
        Ok(booking) => booking,
        Err(e) => return errors::domain_error_to_response(e),
    };
    services
        .bookings
        .upsert(tenant_id, booking.id, booking.clone());

    (StatusCode::CREATED, Json(dto::booking_to_json(&booking))).into_response()
}
