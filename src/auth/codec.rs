//! Credential codec: signs and verifies time-bounded session tokens.
//!
//! Tokens are compact HS256 JWS strings (`header.payload.signature`). The
//! signing secret is injected at construction; the codec holds no other
//! state, so a single instance is shared read-only across requests.

use std::fmt;

use anyhow::{Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::auth::claims::{Claims, IssueRequest, RESERVED_CLAIMS};

/// Credentials live for one calendar day from issuance.
pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;

/// Minimum accepted length of the signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Problems with the signing secret. Always fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretError {
    Empty,
    TooShort { len: usize },
}

impl fmt::Display for SecretError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "signing secret is empty"),
            Self::TooShort { len } => write!(
                f,
                "signing secret is {} bytes, at least {} required",
                len, MIN_SECRET_LEN
            ),
        }
    }
}

impl std::error::Error for SecretError {}

/// Symmetric signing key. `Debug` never prints the key material.
#[derive(Clone)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, SecretError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(SecretError::Empty);
        }
        if bytes.len() < MIN_SECRET_LEN {
            return Err(SecretError::TooShort { len: bytes.len() });
        }
        Ok(Self(bytes))
    }

    /// Short public fingerprint of the key: the first 16 hex chars of its
    /// SHA-256. Safe to log and to place in the token header.
    pub fn key_id(&self) -> String {
        let digest = Sha256::digest(&self.0);
        format!("{:x}", digest)[..16].to_string()
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SigningSecret").field(&self.key_id()).finish()
    }
}

/// Why a token failed verification.
///
/// These kinds stay distinct for logs; the HTTP boundary collapses them into
/// a single `401`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Wrong structure, undecodable header/payload, or unsupported algorithm.
    Malformed(String),
    /// The signature does not match the payload under this server's key.
    InvalidSignature,
    /// Signature is valid but the credential's `exp` has been reached.
    Expired,
}

impl TokenError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed",
            Self::InvalidSignature => "invalid_signature",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(msg) => write!(f, "Malformed token: {}", msg),
            Self::InvalidSignature => write!(f, "Token signature is invalid"),
            Self::Expired => write!(f, "Token has expired"),
        }
    }
}

impl std::error::Error for TokenError {}

/// Issues and verifies session credentials with a single HS256 key.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    key_id: String,
    ttl: Duration,
}

impl TokenCodec {
    /// Create a codec with the default one-day TTL.
    pub fn new(secret: &SigningSecret) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            key_id: secret.key_id(),
            ttl: Duration::seconds(DEFAULT_TOKEN_TTL_SECONDS),
        }
    }

    /// Override the credential lifetime.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Issue a credential using the host clock.
    pub fn issue(&self, request: &IssueRequest) -> Result<String> {
        self.issue_at(request, Utc::now())
    }

    /// Issue a credential as if the current time were `now`.
    pub fn issue_at(&self, request: &IssueRequest, now: DateTime<Utc>) -> Result<String> {
        let iat = now.timestamp();

        let mut extra = request.extra.clone();
        for name in RESERVED_CLAIMS {
            extra.remove(name);
        }

        let claims = Claims {
            identity: request.identity.clone(),
            extra,
            iat,
            exp: iat + self.ttl.num_seconds(),
        };

        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(self.key_id.clone());

        encode(&header, &claims, &self.encoding_key)
            .map_err(|e| anyhow!("Failed to encode token: {}", e))
    }

    /// Verify a credential against the host clock.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a credential as if the current time were `now`.
    ///
    /// Checks run in order: structure, signature, expiry. Once the header and
    /// payload decode, every remaining failure is attributed to the signature.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let segments: Vec<&str> = token.split('.').collect();
        let [header_segment, payload_segment, _signature] = segments[..] else {
            return Err(TokenError::Malformed(
                "expected three dot-separated segments".to_string(),
            ));
        };

        let header: Header = decode_segment(header_segment)
            .map_err(|e| TokenError::Malformed(format!("invalid header: {}", e)))?;
        if header.alg != Algorithm::HS256 {
            return Err(TokenError::Malformed(format!(
                "unsupported algorithm {:?}",
                header.alg
            )));
        }

        let claims: Claims = decode_segment(payload_segment)
            .map_err(|e| TokenError::Malformed(format!("invalid payload: {}", e)))?;

        // Expiry is checked below against the caller's clock, with no leeway.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            debug!(error = %e, "Credential signature rejected");
            TokenError::InvalidSignature
        })?;

        if claims.is_expired_at(now) {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("key_id", &self.key_id)
            .field("ttl_seconds", &self.ttl.num_seconds())
            .finish()
    }
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str) -> Result<T> {
    let bytes = URL_SAFE_NO_PAD.decode(segment)?;
    Ok(serde_json::from_slice(&bytes)?)
}
