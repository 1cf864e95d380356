//! Request-scoped authenticated identity.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::auth::claims::Claims;
use crate::auth::error::AuthError;
use crate::types::Identity;

/// Decoded claims attached to a request after successful verification.
///
/// Lives only as long as the request that produced it; it is never stored or
/// shared with other requests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthContext {
    /// Verified claims from the credential
    claims: Claims,
    /// Client IP address (for audit logging)
    ip_address: Option<String>,
    /// Client user agent (for audit logging)
    user_agent: Option<String>,
}

impl AuthContext {
    pub fn new(claims: Claims) -> Self {
        Self {
            claims,
            ip_address: None,
            user_agent: None,
        }
    }

    /// Set client metadata for audit logging.
    pub fn with_client_info(
        mut self,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }

    pub fn identity(&self) -> &Identity {
        self.claims.identity()
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.claims.expires_at()
    }

    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }
}

/// Handlers behind the verification middleware can take `AuthContext`
/// directly. Anywhere else the extraction fails closed with `401`.
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<AuthContext>().cloned().ok_or_else(|| {
            warn!(
                reason = AuthError::MissingCredential.kind(),
                path = %parts.uri.path(),
                "Handler requires an authenticated context but none was attached"
            );
            AuthError::MissingCredential
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn test_claims() -> Claims {
        Claims {
            identity: Identity::new("a@x.com"),
            extra: Map::new(),
            iat: 1_700_000_000,
            exp: 1_700_086_400,
        }
    }

    #[test]
    fn test_auth_context_new() {
        let ctx = AuthContext::new(test_claims());
        assert_eq!(ctx.identity().as_str(), "a@x.com");
        assert_eq!(ctx.expires_at().unwrap().timestamp(), 1_700_086_400);
        assert_eq!(ctx.ip_address(), None);
    }

    #[test]
    fn test_auth_context_with_client_info() {
        let ctx = AuthContext::new(test_claims()).with_client_info(
            Some("192.168.1.1".to_string()),
            Some("Mozilla/5.0".to_string()),
        );

        assert_eq!(ctx.ip_address(), Some("192.168.1.1"));
        assert_eq!(ctx.user_agent(), Some("Mozilla/5.0"));
    }

    #[tokio::test]
    async fn test_extraction_without_middleware_is_unauthorized() {
        let (mut parts, _) = axum::http::Request::builder()
            .uri("/applications")
            .body(())
            .unwrap()
            .into_parts();

        let result = AuthContext::from_request_parts(&mut parts, &()).await;
        assert_eq!(result.unwrap_err(), AuthError::MissingCredential);
    }

    #[tokio::test]
    async fn test_extraction_reads_extension() {
        let (mut parts, _) = axum::http::Request::builder()
            .uri("/applications")
            .body(())
            .unwrap()
            .into_parts();
        parts.extensions.insert(AuthContext::new(test_claims()));

        let ctx = AuthContext::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ctx.identity().as_str(), "a@x.com");
    }
}
