use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use super::address::EmailAddress;
use crate::workflows::quotes::QuoteAnalysis;

type HmacSha256 = Hmac<Sha256>;

/// Analysis payload bound into a magic link.
pub type AnalysisSnapshot = QuoteAnalysis;

/// Unique identifier of an issued token; keys the result store and the delivery gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(pub Uuid);

impl TokenId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Signed token body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub jti: TokenId,
    pub sub: EmailAddress,
    pub snapshot: AnalysisSnapshot,
    pub iat: DateTime<Utc>,
    pub exp: DateTime<Utc>,
}

/// Encoded token plus the claims it carries.
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedToken {
    pub token: String,
    pub claims: TokenClaims,
}

/// Issues and verifies `base64url(claims).base64url(hmac-sha256)` tokens.
///
/// Verification never mutates state, so the same token can be checked any number of times
/// until it expires.
#[derive(Clone)]
pub struct TokenService {
    key: Vec<u8>,
    ttl: Duration,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("key", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenService {
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Self {
        Self {
            key: secret.as_ref().to_vec(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(
        &self,
        email: &EmailAddress,
        snapshot: AnalysisSnapshot,
    ) -> Result<IssuedToken, TokenError> {
        self.issue_at(email, snapshot, Utc::now())
    }

    pub fn issue_at(
        &self,
        email: &EmailAddress,
        snapshot: AnalysisSnapshot,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let claims = TokenClaims {
            jti: TokenId::random(),
            sub: email.clone(),
            snapshot,
            iat: now,
            exp: now + self.ttl,
        };

        let body = serde_json::to_vec(&claims)
            .map_err(|err| TokenError::Encoding(err.to_string()))?;
        let body = URL_SAFE_NO_PAD.encode(body);
        let signature = URL_SAFE_NO_PAD.encode(self.sign(body.as_bytes())?);

        Ok(IssuedToken {
            token: format!("{body}.{signature}"),
            claims,
        })
    }

    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Signature and structure are checked before expiry, so a tampered token is always
    /// `Invalid` regardless of its claimed expiry.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let (body, signature) = token.trim().split_once('.').ok_or(TokenError::Invalid)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Invalid)?;

        let mut mac = self.mac()?;
        mac.update(body.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::Invalid)?;

        let body = URL_SAFE_NO_PAD.decode(body).map_err(|_| TokenError::Invalid)?;
        let claims: TokenClaims =
            serde_json::from_slice(&body).map_err(|_| TokenError::Invalid)?;

        if now > claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(&self.key).map_err(|err| TokenError::Encoding(err.to_string()))
    }

    fn sign(&self, body: &[u8]) -> Result<Vec<u8>, TokenError> {
        let mut mac = self.mac()?;
        mac.update(body);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
    #[error("failed to encode token: {0}")]
    Encoding(String),
}
