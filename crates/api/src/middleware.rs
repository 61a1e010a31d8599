use axum::{extract::State, middleware::Next, response::Response};
use axum_extra::extract::CookieJar;
use chrono::Utc;

use atelier_auth::SessionResolver;

use crate::app::errors;
use crate::context::{PrincipalContext, TenantContext};
use crate::cookies::{CookieSettings, session_cookies};

#[derive(Clone)]
pub struct AuthState {
    pub resolver: SessionResolver,
    pub cookies: CookieSettings,
}

/// Resolve the session cookies into request contexts, or answer 401.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let jar = CookieJar::from_headers(req.headers());
    let (active, return_ticket) = session_cookies(&jar);

    let session = match state
        .resolver
        .resolve_at(active.as_deref(), return_ticket.as_deref(), Utc::now())
    {
        Ok(session) => session,
        Err(e) => {
            tracing::debug!(code = e.code(), path = %req.uri().path(), "session rejected");
            return errors::unauthenticated(&state.cookies, e.code(), e.to_string());
        }
    };

    req.extensions_mut().insert(TenantContext::new(session.scope()));
    req.extensions_mut().insert(PrincipalContext::new(session));

    next.run(req).await
}
