use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

use chrono::{Duration, TimeZone, Utc};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::crypto::SigningKey;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token signature does not match")]
    SignatureMismatch,
    #[error("Token is expired")]
    Expired,
    #[error("Malformed token")]
    Malformed,
}

impl From<base64::DecodeError> for TokenError {
    fn from(_e: base64::DecodeError) -> Self {
        Self::Malformed
    }
}

impl From<serde_json::Error> for TokenError {
    fn from(_e: serde_json::Error) -> Self {
        Self::Malformed
    }
}

pub type TokenResult<T> = Result<T, TokenError>;

/// Claims wrapper carried inside a token
#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    exp: Option<i64>,
    sub: T,
}

/// `<base64 claims>.<base64 signature>`, safe to put in a cookie value
#[derive(Debug, Clone, PartialEq)]
pub struct Token(String);

impl Token {
    /// Sign `subject`, optionally valid only for `ttl`
    pub fn issue<T: Serialize>(
        subject: &T,
        ttl: Option<Duration>,
        key: &SigningKey,
    ) -> TokenResult<Self> {
        let envelope = Envelope {
            exp: ttl.map(|ttl| (Utc::now() + ttl).timestamp()),
            sub: subject,
        };
        let claims = serde_json::to_vec(&envelope)?;
        let signature = key.sign(&claims);

        Ok(Self(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(claims),
            URL_SAFE_NO_PAD.encode(signature)
        )))
    }

    /// Check the signature and expiry, then hand back the subject
    pub fn open<T: DeserializeOwned>(&self, key: &SigningKey) -> TokenResult<T> {
        let (claims, signature) = self.0.split_once('.').ok_or(TokenError::Malformed)?;
        let claims = URL_SAFE_NO_PAD.decode(claims)?;
        let signature = URL_SAFE_NO_PAD.decode(signature)?;

        key.verify(&claims, &signature)?;

        let envelope: Envelope<T> = serde_json::from_slice(&claims)?;
        let expired = envelope
            .exp
            .map(|exp| match Utc.timestamp_opt(exp, 0).earliest() {
                Some(exp) => Utc::now() >= exp,
                None => true,
            })
            .unwrap_or(false);

        if expired {
            Err(TokenError::Expired)
        } else {
            Ok(envelope.sub)
        }
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Token {
    type Err = TokenError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let token = token.trim();
        if token.is_empty() {
            return Err(TokenError::Malformed);
        }
        Ok(Self(token.to_string()))
    }
}
