//! Signed, self-contained session tokens.
//!
//! A token is `base64url(claims JSON) . base64url(HMAC-SHA256(claims))`
//! under a server-held secret. Validity is a pure function of the token
//! and the current time — there is no server-side session record, so
//! logout is client-side discard and a still-live token keeps working
//! until expiry. Tradeoff documented in DESIGN.md; keep lifetimes short
//! where that matters.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    /// No credential was presented at all.
    #[error("session token missing")]
    TokenMissing,
    /// Signature verified but the token is past its expiry.
    #[error("session token expired")]
    TokenExpired,
    /// Signature mismatch: tampered, truncated, or signed with a
    /// different secret.
    #[error("session token invalid")]
    TokenInvalid,
    /// The token does not decode to the expected shape at all.
    #[error("session token malformed")]
    TokenMalformed,
}

/// Tunables for token issuance, passed in once at construction.
#[derive(Clone)]
pub struct SessionConfig {
    /// HMAC key. Any length is accepted; 32 random bytes is the
    /// expected deployment.
    pub secret: Vec<u8>,
    pub lifetime: Duration,
}

impl SessionConfig {
    /// Default token lifetime: 24 hours.
    pub const DEFAULT_LIFETIME_SECS: i64 = 86_400;

    pub fn new(secret: Vec<u8>, lifetime: Duration) -> Self {
        Self { secret, lifetime }
    }
}

#[derive(Serialize, Deserialize)]
struct Claims {
    identity_id: Uuid,
    issued_at: i64,
    expires_at: i64,
}

/// Issues and validates bearer tokens bound to an identity id.
pub struct SessionManager {
    config: SessionConfig,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Issue a token for `identity_id`, valid from now for the
    /// configured lifetime.
    pub fn issue(&self, identity_id: Uuid) -> String {
        self.issue_at(identity_id, Utc::now())
    }

    /// Issue with an explicit clock — issuance is deterministic given
    /// the time.
    pub fn issue_at(&self, identity_id: Uuid, now: DateTime<Utc>) -> String {
        let claims = Claims {
            identity_id,
            issued_at: now.timestamp(),
            expires_at: (now + self.config.lifetime).timestamp(),
        };
        let payload = serde_json::to_vec(&claims).expect("claims serialize");

        let mut mac = HmacSha256::new_from_slice(&self.config.secret)
            .expect("HMAC accepts any key length");
        mac.update(&payload);
        let signature = mac.finalize().into_bytes();

        format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(signature)
        )
    }

    /// Validate a token against the current time and return the
    /// identity it is bound to.
    pub fn validate(&self, token: &str) -> Result<Uuid, SessionError> {
        self.validate_at(token, Utc::now())
    }

    /// Validate with an explicit clock. Signature is checked before the
    /// claims are trusted for anything, including the expiry check.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Uuid, SessionError> {
        let (payload_b64, signature_b64) =
            token.split_once('.').ok_or(SessionError::TokenMalformed)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| SessionError::TokenMalformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| SessionError::TokenMalformed)?;

        let mut mac = HmacSha256::new_from_slice(&self.config.secret)
            .expect("HMAC accepts any key length");
        mac.update(&payload);
        // Constant-time comparison via the Mac trait.
        mac.verify_slice(&signature)
            .map_err(|_| SessionError::TokenInvalid)?;

        let claims: Claims =
            serde_json::from_slice(&payload).map_err(|_| SessionError::TokenMalformed)?;

        if now.timestamp() >= claims.expires_at {
            return Err(SessionError::TokenExpired);
        }

        Ok(claims.identity_id)
    }
}
