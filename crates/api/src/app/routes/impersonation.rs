use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use serde_json::json;

use atelier_auth::{AuthzError, VerifyError};

use crate::app::routes::auth::require_unrevoked;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

/// POST /super-admin/impersonate: enter a tenant as its first active user.
pub async fn begin(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    jar: CookieJar,
    Json(body): Json<dto::ImpersonateRequest>,
) -> Response {
    // Refuse before touching the directory so non-admins cannot probe tenants.
    if !principal.session().scope().is_unrestricted() {
        return errors::authz_error_to_response(AuthzError::SuperAdminRequired);
    }

    let now = Utc::now();
    if let Err(response) = require_unrevoked(&services, &principal, now) {
        return response;
    }

    let tenant_id = match dto::parse_tenant_id("tenantId", body.tenant_id) {
        Ok(Some(tenant_id)) => tenant_id,
        Ok(None) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "TENANT_ID_REQUIRED",
                "tenantId is required",
            );
        }
        Err(response) => return response,
    };

    let target = match services.directory.impersonation_target(&tenant_id) {
        Ok(target) => target,
        Err(e) => return errors::directory_error_to_response(e),
    };

    let session = match services
        .resolver
        .begin_impersonation_at(principal.session(), target, now)
    {
        Ok(session) => session,
        Err(e) => return errors::authz_error_to_response(e),
    };

    tracing::info!(
        impersonator = %principal.claims().subject_id(),
        subject_id = %session.claims().subject_id(),
        tenant_id = %tenant_id,
        "impersonation started"
    );

    let tenant = services.directory.tenant(&tenant_id);
    let jar = services.cookies.store_session(jar, &session, now);
    (
        jar,
        Json(json!({
            "success": true,
            "tenant": tenant,
            "session": dto::session_to_json(&session),
        })),
    )
        .into_response()
}

/// DELETE /super-admin/impersonate: return to the preserved super-admin session.
///
/// Any failure leaves the cookies alone, so the caller stays impersonated.
pub async fn end(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    jar: CookieJar,
) -> Response {
    let now = Utc::now();
    let restored = match services
        .resolver
        .end_impersonation_at(principal.session(), now)
    {
        Ok(restored) => restored,
        Err(e) => {
            tracing::debug!(error = %e, "impersonation end refused");
            return errors::authz_error_to_response(e);
        }
    };

    if services.revocations.is_revoked(restored.claims(), now) {
        tracing::debug!(code = "REVOKED_TOKEN", "impersonation end refused");
        return errors::authz_error_to_response(AuthzError::ReturnTicketRejected(
            VerifyError::RevokedToken,
        ));
    }

    tracing::info!(
        subject_id = %restored.claims().subject_id(),
        tenant_id = ?principal.claims().tenant_id().map(|t| t.to_string()),
        "impersonation ended"
    );

    let jar = services.cookies.store_session(jar, &restored, now);
    (
        jar,
        Json(json!({
            "success": true,
            "session": dto::session_to_json(&restored),
        })),
    )
        .into_response()
}
