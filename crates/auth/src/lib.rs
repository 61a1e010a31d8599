//! `atelier-auth`: stateless session tokens and tenant scoping.
//!
//! No HTTP and no storage here. Every operation is a function of its inputs
//! (token, secret, current time).

pub mod claims;
pub mod codec;
pub mod resolver;
pub mod revocation;
pub mod roles;
pub mod scope;
pub mod secret;

pub use claims::{Authority, ClaimsError, SessionClaims, SessionPayload};
pub use codec::{DEFAULT_SESSION_TTL_SECONDS, SessionCodec, SessionToken, TokenError, VerifyError};
pub use resolver::{
    ImpersonationConfig, ImpersonationTarget, ReturnTicket, ReturnTicketPolicy, Session,
    SessionError, SessionResolver,
};
pub use revocation::{RevocationKey, RevocationList};
pub use roles::Role;
pub use scope::{AuthzError, TenantFilter, TenantOwned, resolve_scope};
pub use secret::{MIN_SECRET_LEN, SecretError, SessionSecret};
