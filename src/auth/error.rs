//! Authentication and authorization failures at the HTTP boundary.

use std::fmt;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::auth::codec::TokenError;

/// Body message for every `401`.
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized Access";
/// Body message for every `403`.
pub const FORBIDDEN_MESSAGE: &str = "Forbidden Access!";

/// Authentication errors.
///
/// Each variant keeps its identity for logging, but the response only says
/// `401` or `403`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No credential on the request
    MissingCredential,
    /// Credential could not be parsed
    Malformed(String),
    /// Credential signature did not verify
    InvalidSignature,
    /// Credential is past its expiry
    Expired,
    /// Valid credential, but for a different identity than the one requested
    IdentityMismatch,
}

impl AuthError {
    /// Stable tag used as the `reason` field in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::Malformed(_) => "malformed",
            Self::InvalidSignature => "invalid_signature",
            Self::Expired => "expired",
            Self::IdentityMismatch => "identity_mismatch",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::IdentityMismatch => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredential => write!(f, "Authentication required"),
            Self::Malformed(msg) => write!(f, "Malformed credential: {}", msg),
            Self::InvalidSignature => write!(f, "Credential signature is invalid"),
            Self::Expired => write!(f, "Credential has expired"),
            Self::IdentityMismatch => write!(f, "Credential identity does not own this resource"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Malformed(msg) => Self::Malformed(msg),
            TokenError::InvalidSignature => Self::InvalidSignature,
            TokenError::Expired => Self::Expired,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status == StatusCode::FORBIDDEN {
            FORBIDDEN_MESSAGE
        } else {
            UNAUTHORIZED_MESSAGE
        };
        (status, Json(serde_json::json!({ "message": message }))).into_response()
    }
}
