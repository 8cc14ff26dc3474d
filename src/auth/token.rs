use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const TOKEN_TTL_HOURS: i64 = 8;

/// Claims carried inside a signed admin token. Short field names keep the
/// encoded token compact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    #[serde(rename = "u")]
    pub username: String,
    #[serde(rename = "exp")]
    pub expires_at_ms: i64,
}

/// Stateless HMAC-SHA256 token codec. Tokens are `payload.signature` where
/// both halves are base64url (no padding) and the signature covers the
/// encoded payload. No session store; a token is valid until its embedded
/// expiry passes.
#[derive(Debug, Clone)]
pub struct TokenCodec {
    secret: String,
}

impl TokenCodec {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn issue(&self, username: &str) -> String {
        let expires_at_ms = (Utc::now() + Duration::hours(TOKEN_TTL_HOURS)).timestamp_millis();
        self.issue_with_expiry(username, expires_at_ms)
    }

    fn issue_with_expiry(&self, username: &str, expires_at_ms: i64) -> String {
        let claims = TokenClaims {
            username: username.to_string(),
            expires_at_ms,
        };
        let json = serde_json::to_string(&claims).expect("claims serialize to JSON");
        let payload = URL_SAFE_NO_PAD.encode(json.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(self.sign(payload.as_bytes()));
        format!("{payload}.{signature}")
    }

    /// Verifies signature and expiry, returning the claims on success and
    /// `None` for anything malformed, tampered, or expired.
    pub fn verify(&self, token: &str) -> Option<TokenClaims> {
        let mut parts = token.split('.');
        let payload = parts.next()?;
        let signature = parts.next()?;
        if parts.next().is_some() || payload.is_empty() {
            return None;
        }

        let supplied = URL_SAFE_NO_PAD.decode(signature).ok()?;
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(payload.as_bytes());
        mac.verify_slice(&supplied).ok()?;

        let json = URL_SAFE_NO_PAD.decode(payload).ok()?;
        let claims: TokenClaims = serde_json::from_slice(&json).ok()?;
        if Utc::now().timestamp_millis() > claims.expires_at_ms {
            return None;
        }
        Some(claims)
    }

    fn sign(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}
