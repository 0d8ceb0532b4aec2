//! Signed session tokens
//!
//! A token carries the user ID and an expiry, signed with HMAC-SHA256:
//!
//! ```text
//! token     = "{user_id}.{expires_unix}.{signature}"
//! signature = base64url(HMAC-SHA256(secret, "{user_id}.{expires_unix}"))
//! ```
//!
//! Tokens are stateless: nothing is stored server-side, so logout only
//! clears the client's cookie.

use chrono::{DateTime, Duration, TimeZone, Utc};
use data_encoding::BASE64URL_NOPAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::MAX_TOKEN_TTL_HOURS;

type HmacSha256 = Hmac<Sha256>;

/// Reasons a token is rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Malformed token")]
    Malformed,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token expired")]
    Expired,
}

/// A freshly issued token and when it stops being accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies session tokens
#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
    ttl: Duration,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenSigner {
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            ttl,
        }
    }

    /// Build a signer from the auth section of the configuration
    ///
    /// The lifetime is capped at [`MAX_TOKEN_TTL_HOURS`] even if the config
    /// was never validated.
    pub fn from_config(config: &crate::config::AuthConfig) -> Self {
        let hours = config.token_ttl_hours.min(MAX_TOKEN_TTL_HOURS);
        let ttl = Duration::try_hours(hours).unwrap_or_else(|| Duration::hours(MAX_TOKEN_TTL_HOURS));
        Self::new(config.token_secret.as_bytes(), ttl)
    }

    /// Token lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `user_id` valid from now
    pub fn issue(&self, user_id: i64) -> IssuedToken {
        self.issue_at(user_id, Utc::now())
    }

    pub fn issue_at(&self, user_id: i64, now: DateTime<Utc>) -> IssuedToken {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let payload = format!("{}.{}", user_id, expires_at.timestamp());
        let signature = BASE64URL_NOPAD.encode(&self.sign(&payload));

        IssuedToken {
            token: format!("{}.{}", payload, signature),
            // Truncated to what the token actually encodes
            expires_at: Utc
                .timestamp_opt(expires_at.timestamp(), 0)
                .single()
                .unwrap_or(expires_at),
        }
    }

    /// Verify a token and return the user ID it was issued for
    pub fn verify(&self, token: &str) -> Result<i64, TokenError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<i64, TokenError> {
        let (payload, signature) = token.rsplit_once('.').ok_or(TokenError::Malformed)?;
        let (user_id, expires) = payload.split_once('.').ok_or(TokenError::Malformed)?;

        let user_id: i64 = user_id.parse().map_err(|_| TokenError::Malformed)?;
        let expires: i64 = expires.parse().map_err(|_| TokenError::Malformed)?;
        let signature = BASE64URL_NOPAD
            .decode(signature.as_bytes())
            .map_err(|_| TokenError::Malformed)?;

        // Constant-time comparison
        self.mac(payload)
            .verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        if now.timestamp() >= expires {
            return Err(TokenError::Expired);
        }
        Ok(user_id)
    }

    fn mac(&self, payload: &str) -> HmacSha256 {
        let mut mac = match HmacSha256::new_from_slice(&self.secret) {
            Ok(mac) => mac,
            Err(_) => unreachable!("HMAC accepts keys of any length"),
        };
        mac.update(payload.as_bytes());
        mac
    }

    fn sign(&self, payload: &str) -> Vec<u8> {
        self.mac(payload).finalize().into_bytes().to_vec()
    }
}
