use axum::{
    Router,
    routing::{get, post},
};

pub mod auth;
pub mod bookings;
pub mod impersonation;
pub mod system;

/// Routes reachable without a session.
pub fn public_router() -> Router {
    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
}

/// Routes behind the session middleware.
pub fn router() -> Router {
    Router::new()
        .route("/auth/me", get(system::me))
        .route("/auth/sessions/revoke", post(auth::revoke))
        .route(
            "/super-admin/impersonate",
            post(impersonation::begin).delete(impersonation::end),
        )
        .nest("/bookings", bookings::router())
}
