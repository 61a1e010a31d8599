//! Compact signed session credential: `header.payload.signature`.
//!
//! Each segment is base64url without padding; the signature is HMAC-SHA256
//! over `header + "." + payload`. Nothing is stored server-side.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sha2::Sha256;
use thiserror::Error;

use crate::revocation::RevocationList;
use crate::secret::{SecretError, SessionSecret};
use crate::{SessionClaims, SessionPayload};

type HmacSha256 = Hmac<Sha256>;

/// Default session lifetime: 7 days.
pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 60 * 60 * 24 * 7;

const ALGORITHM: &str = "HS256";
const TOKEN_TYPE: &str = "JWT";

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    #[serde(default)]
    typ: Option<String>,
}

/// Why a presented token was not accepted.
///
/// Returned, never panicked, so a bad cookie can't take down the request
/// pipeline.
#[derive(Debug, Error, Copy, Clone, PartialEq, Eq, Hash)]
pub enum VerifyError {
    #[error("no session token supplied")]
    MissingToken,

    #[error("session token is malformed")]
    InvalidFormat,

    #[error("session token signature does not match")]
    InvalidSignature,

    #[error("session token has expired")]
    ExpiredToken,

    /// Only produced by [`SessionCodec::verify_sensitive_at`].
    #[error("session token has been revoked")]
    RevokedToken,
}

impl VerifyError {
    pub fn code(&self) -> &'static str {
        match self {
            VerifyError::MissingToken => "MISSING_TOKEN",
            VerifyError::InvalidFormat => "INVALID_FORMAT",
            VerifyError::InvalidSignature => "INVALID_SIGNATURE",
            VerifyError::ExpiredToken => "EXPIRED_TOKEN",
            VerifyError::RevokedToken => "REVOKED_TOKEN",
        }
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to encode session token: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("session lifetime overflows the timestamp range")]
    LifetimeOverflow,

    #[error("invalid signing key length")]
    InvalidKey,
}

/// A wire token together with the claims it carries.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken {
    token: String,
    claims: SessionClaims,
}

impl SessionToken {
    pub(crate) fn new(token: String, claims: SessionClaims) -> Self {
        Self { token, claims }
    }

    pub fn as_str(&self) -> &str {
        &self.token
    }

    pub fn claims(&self) -> &SessionClaims {
        &self.claims
    }
}

impl core::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionToken")
            .field("token", &"<redacted>")
            .field("claims", &self.claims)
            .finish()
    }
}

/// Signs and verifies session tokens with one process-wide secret.
#[derive(Debug, Clone)]
pub struct SessionCodec {
    secret: SessionSecret,
}

impl SessionCodec {
    pub fn new(secret: SessionSecret) -> Self {
        Self { secret }
    }

    /// Validate `secret` and build a codec. Fails before any token exists.
    pub fn from_secret(secret: impl Into<Vec<u8>>) -> Result<Self, SecretError> {
        Ok(Self::new(SessionSecret::new(secret)?))
    }

    pub fn sign(&self, payload: &SessionPayload, ttl_seconds: i64) -> Result<SessionToken, TokenError> {
        self.sign_at(payload, ttl_seconds, Utc::now())
    }

    /// Mint a token valid for `ttl_seconds` from `now`.
    ///
    /// A negative TTL yields an already-expired token.
    pub fn sign_at(
        &self,
        payload: &SessionPayload,
        ttl_seconds: i64,
        now: DateTime<Utc>,
    ) -> Result<SessionToken, TokenError> {
        let issued_at = now.timestamp();
        let expires_at = issued_at
            .checked_add(ttl_seconds)
            .ok_or(TokenError::LifetimeOverflow)?;
        let claims = SessionClaims::new(payload.clone(), issued_at, expires_at);

        let header = Header {
            alg: ALGORITHM.to_string(),
            typ: Some(TOKEN_TYPE.to_string()),
        };
        let encoded_header = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?);
        let encoded_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);

        let mac = self
            .mac(&encoded_header, &encoded_payload)
            .ok_or(TokenError::InvalidKey)?;
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(SessionToken::new(
            format!("{encoded_header}.{encoded_payload}.{signature}"),
            claims,
        ))
    }

    pub fn verify(&self, token: Option<&str>) -> Result<SessionClaims, VerifyError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify `token` as of `now`.
    ///
    /// Check order: missing, segment count, signature, payload shape, expiry.
    /// The payload is only parsed once the signature matches, so a tampered
    /// payload always reports `InvalidSignature`.
    pub fn verify_at(
        &self,
        token: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<SessionClaims, VerifyError> {
        let claims = self.verify_signed(token)?;
        if claims.is_expired_at(now) {
            return Err(VerifyError::ExpiredToken);
        }
        Ok(claims)
    }

    /// Every check of [`verify_at`](Self::verify_at) except expiry.
    pub(crate) fn verify_signed(&self, token: Option<&str>) -> Result<SessionClaims, VerifyError> {
        let token = match token {
            Some(token) if !token.is_empty() => token,
            _ => return Err(VerifyError::MissingToken),
        };

        let mut segments = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(VerifyError::InvalidFormat);
        };

        // Strict decoding: non-canonical trailing bits are rejected, so every
        // character of the segment is significant.
        let provided = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| VerifyError::InvalidSignature)?;
        let mac = self
            .mac(header, payload)
            .ok_or(VerifyError::InvalidSignature)?;
        // Length check, then constant-time comparison.
        mac.verify_slice(&provided)
            .map_err(|_| VerifyError::InvalidSignature)?;

        let header: Header = decode_segment(header)?;
        if header.alg != ALGORITHM {
            return Err(VerifyError::InvalidFormat);
        }

        decode_segment(payload)
    }

    /// [`verify_at`](Self::verify_at) plus a denylist lookup.
    ///
    /// Only sensitive operations pay for the lookup.
    pub fn verify_sensitive_at(
        &self,
        token: Option<&str>,
        revocations: &dyn RevocationList,
        now: DateTime<Utc>,
    ) -> Result<SessionClaims, VerifyError> {
        let claims = self.verify_at(token, now)?;
        if revocations.is_revoked(&claims, now) {
            return Err(VerifyError::RevokedToken);
        }
        Ok(claims)
    }

    fn mac(&self, header: &str, payload: &str) -> Option<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes()).ok()?;
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(payload.as_bytes());
        Some(mac)
    }
}

fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T, VerifyError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| VerifyError::InvalidFormat)?;
    serde_json::from_slice(&bytes).map_err(|_| VerifyError::InvalidFormat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Authority, Role};
    use atelier_core::{SubjectId, TenantId};
    use proptest::prelude::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    const SECRET: &str = "development-session-secret-please-change-immediately-123456";

    fn codec() -> SessionCodec {
        SessionCodec::from_secret(SECRET).unwrap()
    }

    fn super_admin() -> SessionPayload {
        SessionPayload::super_admin(SubjectId::parse("sa-1").unwrap(), "admin@example.com", "Admin")
    }

    fn tenant_admin() -> SessionPayload {
        SessionPayload::tenant_admin(
            SubjectId::parse("u-7").unwrap(),
            "staff@example.com",
            "Staff",
            TenantId::parse("t-42").unwrap(),
            Some("salon-42".to_string()),
        )
    }

    /// Replace the character at `index` with a different base64url character.
    fn flip_char(segment: &str, index: usize) -> String {
        let mut chars: Vec<char> = segment.chars().collect();
        chars[index] = if chars[index] == 'A' { 'B' } else { 'A' };
        chars.into_iter().collect()
    }

    fn replace_segment(token: &str, which: usize, segment: &str) -> String {
        let mut parts: Vec<&str> = token.split('.').collect();
        parts[which] = segment;
        parts.join(".")
    }

    fn encode_json(value: &serde_json::Value) -> String {
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(value).unwrap())
    }

    /// Sign an arbitrary header/payload pair with the test secret.
    fn sign_raw(header: &serde_json::Value, payload: &serde_json::Value) -> String {
        let header = encode_json(header);
        let payload = encode_json(payload);
        let mac = codec().mac(&header, &payload).unwrap();
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        format!("{header}.{payload}.{signature}")
    }

    #[test]
    fn signs_and_verifies_a_super_admin_token() {
        let token = codec().sign(&super_admin(), 3600).unwrap();
        let claims = codec().verify(Some(token.as_str())).unwrap();

        assert_eq!(claims.role(), Role::SuperAdmin);
        assert_eq!(claims.subject_id().as_str(), "sa-1");
        assert_eq!(claims.expires_at() - claims.issued_at(), 3600);
        assert_eq!(&claims, token.claims());
    }

    #[test]
    fn token_has_three_unpadded_segments() {
        let token = codec().sign(&tenant_admin(), 60).unwrap();
        let parts: Vec<&str> = token.as_str().split('.').collect();
        assert_eq!(parts.len(), 3);
        assert!(!token.as_str().contains('='));
        assert!(!token.as_str().contains('+'));
        assert!(!token.as_str().contains('/'));

        let header: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[0]).unwrap()).unwrap();
        assert_eq!(header["alg"], "HS256");
        assert_eq!(header["typ"], "JWT");
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let expired = codec().sign(&super_admin(), -1).unwrap();
        assert_eq!(
            codec().verify(Some(expired.as_str())),
            Err(VerifyError::ExpiredToken)
        );

        let expired = codec().sign(&super_admin(), -10).unwrap();
        assert_eq!(
            codec().verify(Some(expired.as_str())).unwrap_err().code(),
            "EXPIRED_TOKEN"
        );
    }

    #[test]
    fn token_expiring_exactly_now_is_expired() {
        let now = Utc::now();
        let token = codec().sign_at(&super_admin(), 0, now).unwrap();
        assert_eq!(
            codec().verify_at(Some(token.as_str()), now),
            Err(VerifyError::ExpiredToken)
        );
    }

    #[test]
    fn missing_tokens_are_reported_as_missing() {
        assert_eq!(codec().verify(None), Err(VerifyError::MissingToken));
        assert_eq!(codec().verify(Some("")), Err(VerifyError::MissingToken));
    }

    #[test]
    fn wrong_segment_counts_are_invalid_format() {
        let token = codec().sign(&super_admin(), 60).unwrap();
        let parts: Vec<&str> = token.as_str().split('.').collect();

        for bad in [
            parts[0].to_string(),
            format!("{}.{}", parts[0], parts[1]),
            format!("{}.x", token.as_str()),
            format!("{}.{}.{}.{}.{}", parts[0], parts[1], parts[2], parts[2], parts[2]),
        ] {
            assert_eq!(codec().verify(Some(&bad)), Err(VerifyError::InvalidFormat), "{bad}");
        }
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let token = codec().sign(&super_admin(), 60).unwrap();
        let signature = token.as_str().split('.').nth(2).unwrap();
        let last = signature.len() - 1;

        let tampered = replace_segment(token.as_str(), 2, &flip_char(signature, last));
        assert_eq!(
            codec().verify(Some(&tampered)),
            Err(VerifyError::InvalidSignature)
        );
    }

    #[test]
    fn truncated_signature_is_rejected_as_signature_mismatch() {
        let token = codec().sign(&super_admin(), 60).unwrap();
        let signature = token.as_str().split('.').nth(2).unwrap();

        let truncated = replace_segment(token.as_str(), 2, &signature[..signature.len() - 4]);
        assert_eq!(
            codec().verify(Some(&truncated)),
            Err(VerifyError::InvalidSignature)
        );
        let empty = replace_segment(token.as_str(), 2, "");
        assert_eq!(codec().verify(Some(&empty)), Err(VerifyError::InvalidSignature));
    }

    #[test]
    fn tampered_payload_is_a_signature_mismatch() {
        let token = codec().sign(&tenant_admin(), 3600).unwrap();
        let payload = token.as_str().split('.').nth(1).unwrap();

        let tampered = replace_segment(token.as_str(), 1, &flip_char(payload, 5));
        assert_eq!(
            codec().verify(Some(&tampered)),
            Err(VerifyError::InvalidSignature)
        );
    }

    #[test]
    fn forged_role_escalation_is_rejected() {
        let token = codec().sign(&tenant_admin(), 3600).unwrap();
        let forged = encode_json(&serde_json::json!({
            "sub": "u-7", "role": "SUPER_ADMIN",
            "iat": token.claims().issued_at(), "exp": token.claims().expires_at(),
        }));

        let tampered = replace_segment(token.as_str(), 1, &forged);
        assert_eq!(
            codec().verify(Some(&tampered)),
            Err(VerifyError::InvalidSignature)
        );
    }

    #[test]
    fn other_secret_cannot_verify() {
        let token = codec().sign(&super_admin(), 60).unwrap();
        let other = SessionCodec::from_secret("another-secret-that-is-also-32-bytes-long").unwrap();
        assert_eq!(
            other.verify(Some(token.as_str())),
            Err(VerifyError::InvalidSignature)
        );
    }

    #[test]
    fn correctly_signed_but_malformed_payloads_are_invalid_format() {
        let header = serde_json::json!({"alg": "HS256", "typ": "JWT"});
        let exp = Utc::now().timestamp() + 3600;

        let no_tenant = sign_raw(
            &header,
            &serde_json::json!({"sub": "u-7", "role": "TENANT_ADMIN", "iat": 0, "exp": exp}),
        );
        assert_eq!(codec().verify(Some(&no_tenant)), Err(VerifyError::InvalidFormat));

        let no_exp = sign_raw(&header, &serde_json::json!({"sub": "sa-1", "role": "SUPER_ADMIN", "iat": 0}));
        assert_eq!(codec().verify(Some(&no_exp)), Err(VerifyError::InvalidFormat));

        let not_an_object = sign_raw(&header, &serde_json::json!([1, 2, 3]));
        assert_eq!(codec().verify(Some(&not_an_object)), Err(VerifyError::InvalidFormat));
    }

    #[test]
    fn other_algorithms_in_the_header_are_invalid_format() {
        let token = sign_raw(
            &serde_json::json!({"alg": "none"}),
            &serde_json::json!({"sub": "sa-1", "role": "SUPER_ADMIN", "iat": 0, "exp": i64::MAX}),
        );
        assert_eq!(codec().verify(Some(&token)), Err(VerifyError::InvalidFormat));
    }

    #[test]
    fn short_secret_is_rejected_before_signing() {
        assert!(SessionCodec::from_secret("too-short").is_err());
        assert!(SessionCodec::from_secret(Vec::new()).is_err());
    }

    #[test]
    fn ttl_overflow_is_an_error() {
        assert!(matches!(
            codec().sign(&super_admin(), i64::MAX),
            Err(TokenError::LifetimeOverflow)
        ));
    }

    #[test]
    fn debug_output_redacts_the_token() {
        let token = codec().sign(&super_admin(), 60).unwrap();
        assert!(!format!("{token:?}").contains(token.as_str()));
    }

    #[derive(Default)]
    struct Denylist(Mutex<HashSet<(String, i64)>>);

    impl RevocationList for Denylist {
        fn revoke(&self, claims: &SessionClaims, _now: DateTime<Utc>) {
            self.0
                .lock()
                .unwrap()
                .insert((claims.subject_id().to_string(), claims.issued_at()));
        }

        fn is_revoked(&self, claims: &SessionClaims, _now: DateTime<Utc>) -> bool {
            self.0
                .lock()
                .unwrap()
                .contains(&(claims.subject_id().to_string(), claims.issued_at()))
        }
    }

    #[test]
    fn sensitive_verification_consults_the_denylist() {
        let denylist = Denylist::default();
        let now = Utc::now();
        let token = codec().sign_at(&super_admin(), 60, now).unwrap();

        assert!(codec().verify_sensitive_at(Some(token.as_str()), &denylist, now).is_ok());

        denylist.revoke(token.claims(), now);
        assert_eq!(
            codec().verify_sensitive_at(Some(token.as_str()), &denylist, now),
            Err(VerifyError::RevokedToken)
        );
        // Non-sensitive paths stay on the stateless fast path.
        assert!(codec().verify_at(Some(token.as_str()), now).is_ok());
    }

    fn arb_payload() -> impl Strategy<Value = SessionPayload> {
        let subject = "[a-z0-9-]{1,24}";
        let email = "[a-z]{1,10}@[a-z]{1,10}\\.test";
        let name = "\\PC{0,20}";
        let tenant = prop::option::of(("[a-z0-9-]{1,24}", prop::option::of("[a-z-]{1,16}")));

        (subject, email, name, tenant).prop_map(|(subject, email, name, tenant)| {
            let subject_id = SubjectId::parse(subject).unwrap();
            match tenant {
                None => SessionPayload::super_admin(subject_id, email, name),
                Some((tenant_id, slug)) => SessionPayload::tenant_admin(
                    subject_id,
                    email,
                    name,
                    TenantId::parse(tenant_id).unwrap(),
                    slug,
                ),
            }
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: verify(sign(payload)) returns the original payload.
        #[test]
        fn round_trip_preserves_payload(
            payload in arb_payload(),
            secret in "[ -~]{32,64}",
            ttl in 1i64..10_000_000,
        ) {
            let codec = SessionCodec::from_secret(secret).unwrap();
            let now = Utc::now();
            let token = codec.sign_at(&payload, ttl, now).unwrap();
            let claims = codec.verify_at(Some(token.as_str()), now).unwrap();

            prop_assert_eq!(claims.payload(), &payload);
            prop_assert_eq!(claims.expires_at(), now.timestamp() + ttl);
            if let Authority::TenantAdmin { tenant_id, .. } = &payload.authority {
                prop_assert_eq!(claims.tenant_id(), Some(tenant_id));
            }
        }

        /// Property: changing any single signature character is detected.
        #[test]
        fn any_signature_char_flip_is_detected(payload in arb_payload(), index in 0usize..43) {
            let now = Utc::now();
            let token = codec().sign_at(&payload, 3600, now).unwrap();
            let signature = token.as_str().split('.').nth(2).unwrap();
            prop_assume!(index < signature.len());

            let tampered = replace_segment(token.as_str(), 2, &flip_char(signature, index));
            prop_assert_eq!(
                codec().verify_at(Some(&tampered), now),
                Err(VerifyError::InvalidSignature)
            );
        }
    }
}
