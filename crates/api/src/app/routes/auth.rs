use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use chrono::{DateTime, Utc};
use serde_json::json;

use atelier_auth::{Session, SessionClaims};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    jar: CookieJar,
    Json(body): Json<dto::LoginRequest>,
) -> Response {
    let directory = services.directory.clone();
    // Argon2 verification blocks.
    let authenticated =
        tokio::task::spawn_blocking(move || directory.authenticate(&body.email, &body.password))
            .await;
    let authenticated = match authenticated {
        Ok(authenticated) => authenticated,
        Err(e) => {
            tracing::error!(error = %e, "credential check did not complete");
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "LOGIN_FAILED",
                "credential check did not complete",
            );
        }
    };

    let Some(payload) = authenticated else {
        tracing::debug!(code = "INVALID_CREDENTIALS", "login rejected");
        return errors::json_error(
            StatusCode::UNAUTHORIZED,
            "INVALID_CREDENTIALS",
            "invalid email or password",
        );
    };

    let now = Utc::now();
    let token = match services
        .resolver
        .codec()
        .sign_at(&payload, services.session_ttl_seconds, now)
    {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, "failed to sign session token");
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "TOKEN_MINT_FAILED",
                e.to_string(),
            );
        }
    };

    tracing::info!(
        subject_id = %token.claims().subject_id(),
        role = %token.claims().role(),
        "session started"
    );

    let session = Session::Direct(token);
    let jar = services.cookies.store_session(jar, &session, now);
    (jar, Json(dto::session_to_json(&session))).into_response()
}

pub async fn logout(Extension(services): Extension<Arc<AppServices>>) -> Response {
    (
        services.cookies.clear(CookieJar::new()),
        Json(json!({ "success": true })),
    )
        .into_response()
}

/// Denylist the caller's token (and its return ticket, if impersonating).
pub async fn revoke(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    let now = Utc::now();
    let claims = match require_unrevoked(&services, &principal, now) {
        Ok(claims) => claims,
        Err(response) => return response,
    };

    services.revocations.revoke(&claims, now);
    let mut revoked = 1;

    if let Some(ticket) = principal.session().return_ticket() {
        if let Ok(ticket_claims) = services.resolver.codec().verify_at(Some(ticket.as_str()), now) {
            services.revocations.revoke(&ticket_claims, now);
            revoked += 1;
        }
    }

    tracing::info!(subject_id = %claims.subject_id(), revoked, "session revoked");

    (
        services.cookies.clear(CookieJar::new()),
        Json(json!({ "success": true, "revoked": revoked })),
    )
        .into_response()
}

/// Denylist check for sensitive operations.
pub(crate) fn require_unrevoked(
    services: &AppServices,
    principal: &PrincipalContext,
    now: DateTime<Utc>,
) -> Result<SessionClaims, Response> {
    services
        .resolver
        .codec()
        .verify_sensitive_at(
            Some(principal.session().active().as_str()),
            services.revocations.as_ref(),
            now,
        )
        .map_err(|e| {
            tracing::debug!(code = e.code(), "sensitive operation refused");
            errors::verify_error_to_response(&services.cookies, e)
        })
}
