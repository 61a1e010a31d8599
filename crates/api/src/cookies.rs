//! Session cookie names and attributes.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use time::Duration as TimeDuration;

use atelier_auth::Session;

/// Active session token.
pub const SESSION_COOKIE: &str = "admin_session";

/// Super-admin token preserved while impersonating.
pub const RETURN_TICKET_COOKIE: &str = "super_admin_session_backup";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CookieSettings {
    pub secure: bool,
}

impl CookieSettings {
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    fn build(&self, name: &'static str, value: String, max_age_seconds: i64) -> Cookie<'static> {
        Cookie::build((name, value))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(TimeDuration::seconds(max_age_seconds.max(0)))
            .build()
    }

    fn removal(&self, name: &'static str) -> Cookie<'static> {
        self.build(name, String::new(), 0)
    }

    /// Write `session` to the jar. A direct session also drops any stale
    /// return ticket.
    ///
    /// Both cookies of an impersonated session share the active token's
    /// lifetime, so the ticket is presented for as long as the session is.
    pub fn store_session(&self, jar: CookieJar, session: &Session, now: DateTime<Utc>) -> CookieJar {
        let max_age = session.claims().remaining_seconds(now);
        let jar = jar.add(self.build(
            SESSION_COOKIE,
            session.active().as_str().to_string(),
            max_age,
        ));

        match session.return_ticket() {
            Some(ticket) => jar.add(self.build(
                RETURN_TICKET_COOKIE,
                ticket.as_str().to_string(),
                max_age,
            )),
            None => jar.add(self.removal(RETURN_TICKET_COOKIE)),
        }
    }

    pub fn clear(&self, jar: CookieJar) -> CookieJar {
        jar.add(self.removal(SESSION_COOKIE))
            .add(self.removal(RETURN_TICKET_COOKIE))
    }
}

/// Read the active token and return ticket from request cookies.
pub fn session_cookies(jar: &CookieJar) -> (Option<String>, Option<String>) {
    let read = |name| jar.get(name).map(|cookie| cookie.value().to_string());
    (read(SESSION_COOKIE), read(RETURN_TICKET_COOKIE))
}
