use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use serde_json::json;

use atelier_auth::{AuthzError, VerifyError};
use atelier_core::DomainError;
use atelier_infra::DirectoryError;

use crate::cookies::CookieSettings;

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// 401 that also clears both session cookies.
pub fn unauthenticated(
    cookies: &CookieSettings,
    code: &'static str,
    message: impl Into<String>,
) -> Response {
    (
        cookies.clear(CookieJar::new()),
        json_error(StatusCode::UNAUTHORIZED, code, message),
    )
        .into_response()
}

pub fn verify_error_to_response(cookies: &CookieSettings, err: VerifyError) -> Response {
    unauthenticated(cookies, err.code(), err.to_string())
}

pub fn authz_error_to_response(err: AuthzError) -> Response {
    let message = err.to_string();
    match err {
        AuthzError::TenantMismatch { .. } => {
            json_error(StatusCode::FORBIDDEN, "TENANT_MISMATCH", message)
        }
        AuthzError::TenantRequired => json_error(StatusCode::BAD_REQUEST, "TENANT_REQUIRED", message),
        AuthzError::SuperAdminRequired => {
            json_error(StatusCode::FORBIDDEN, "SUPER_ADMIN_REQUIRED", message)
        }
        AuthzError::NotImpersonating => {
            json_error(StatusCode::BAD_REQUEST, "NOT_IMPERSONATING", message)
        }
        // Cookies stay as they are: the caller keeps the impersonated session.
        AuthzError::ReturnTicketRejected(reason) => {
            json_error(StatusCode::UNAUTHORIZED, reason.code(), message)
        }
        AuthzError::Mint(_) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "TOKEN_MINT_FAILED", message)
        }
    }
}

pub fn directory_error_to_response(err: DirectoryError) -> Response {
    let message = err.to_string();
    match err {
        DirectoryError::TenantNotFound(_) => {
            json_error(StatusCode::NOT_FOUND, "TENANT_NOT_FOUND", message)
        }
        DirectoryError::TenantInactive(_) => {
            json_error(StatusCode::FORBIDDEN, "TENANT_INACTIVE", message)
        }
        DirectoryError::NoActiveUser(_) => {
            json_error(StatusCode::NOT_FOUND, "NO_ACTIVE_USER", message)
        }
        DirectoryError::DuplicateEmail(_) => json_error(StatusCode::CONFLICT, "CONFLICT", message),
        DirectoryError::PasswordHash(_) | DirectoryError::Unavailable => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "DIRECTORY_ERROR", message)
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "INVALID_ID", msg),
    }
}

pub fn invalid_id(field: &'static str, message: impl Into<String>) -> Response {
    json_error(
        StatusCode::BAD_REQUEST,
        "INVALID_ID",
        format!("{field}: {}", message.into()),
    )
}
