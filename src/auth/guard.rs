//! Ownership guard for identity-scoped routes.

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::auth::context::AuthContext;
use crate::auth::error::AuthError;
use crate::types::Identity;

/// An authenticated context whose identity matched the requested one.
#[derive(Debug, Clone)]
pub struct Authorized {
    context: AuthContext,
}

impl Authorized {
    pub fn identity(&self) -> &Identity {
        self.context.identity()
    }
}

/// Authenticated -> Authorized.
///
/// Exact byte comparison. An absent requested identity is a mismatch, never a
/// pass-through.
pub fn authorize(context: AuthContext, requested: Option<&str>) -> Result<Authorized, AuthError> {
    match requested {
        Some(requested) if requested == context.identity().as_str() => {
            Ok(Authorized { context })
        }
        _ => Err(AuthError::IdentityMismatch),
    }
}

#[derive(Debug, Deserialize)]
struct OwnerQuery {
    #[serde(alias = "identity")]
    email: Option<String>,
}

/// Extractor for routes scoped to a single identity.
///
/// Reads the identity the caller asked for from the `email` (or `identity`)
/// query parameter and requires it to equal the verified one. Must sit behind
/// [`require_auth`](crate::auth::require_auth); without it the request is
/// rejected with `401`.
#[derive(Debug, Clone)]
pub struct Owner(pub Authorized);

impl Owner {
    pub fn identity(&self) -> &Identity {
        self.0.identity()
    }
}

impl<S> FromRequestParts<S> for Owner
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let context = AuthContext::from_request_parts(parts, state).await?;

        let requested = Query::<OwnerQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(query)| query.email);

        match authorize(context, requested.as_deref()) {
            Ok(authorized) => {
                debug!(identity = %authorized.identity(), "Ownership check passed");
                Ok(Owner(authorized))
            }
            Err(err) => {
                warn!(
                    reason = err.kind(),
                    path = %parts.uri.path(),
                    requested_present = requested.is_some(),
                    "Request rejected: {}",
                    err
                );
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::Claims;
    use serde_json::Map;

    fn context(identity: &str) -> AuthContext {
        AuthContext::new(Claims {
            identity: Identity::new(identity),
            extra: Map::new(),
            iat: 0,
            exp: i64::MAX,
        })
    }

    fn parts(uri: &str) -> Parts {
        axum::http::Request::builder()
            .uri(uri)
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[test]
    fn test_matching_identity_is_authorized() {
        let authorized = authorize(context("a@x.com"), Some("a@x.com")).unwrap();
        assert_eq!(authorized.identity().as_str(), "a@x.com");
    }

    #[test]
    fn test_mismatch_is_forbidden() {
        let result = authorize(context("a@x.com"), Some("b@x.com"));
        assert_eq!(result.unwrap_err(), AuthError::IdentityMismatch);
    }

    #[test]
    fn test_comparison_is_exact() {
        for requested in ["A@x.com", " a@x.com", "a@x.com ", "a@X.COM"] {
            assert!(
                authorize(context("a@x.com"), Some(requested)).is_err(),
                "{:?} should not match",
                requested
            );
        }
    }

    #[test]
    fn test_absent_identity_is_forbidden() {
        let result = authorize(context("a@x.com"), None);
        assert_eq!(result.unwrap_err(), AuthError::IdentityMismatch);
    }

    #[tokio::test]
    async fn test_owner_extractor_reads_email_query() {
        let mut parts = parts("/applications?email=a@x.com");
        parts.extensions.insert(context("a@x.com"));

        let owner = Owner::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(owner.identity().as_str(), "a@x.com");
    }

    #[tokio::test]
    async fn test_owner_extractor_accepts_identity_alias() {
        let mut parts = parts("/applications?identity=a%40x.com");
        parts.extensions.insert(context("a@x.com"));

        assert!(Owner::from_request_parts(&mut parts, &()).await.is_ok());
    }

    #[tokio::test]
    async fn test_owner_extractor_mismatch_and_missing_param() {
        let mut mismatched = parts("/applications?email=b@x.com");
        mismatched.extensions.insert(context("a@x.com"));
        assert_eq!(
            Owner::from_request_parts(&mut mismatched, &()).await.unwrap_err(),
            AuthError::IdentityMismatch
        );

        let mut missing = parts("/applications");
        missing.extensions.insert(context("a@x.com"));
        assert_eq!(
            Owner::from_request_parts(&mut missing, &()).await.unwrap_err(),
            AuthError::IdentityMismatch
        );
    }

    #[tokio::test]
    async fn test_owner_extractor_without_authentication_is_unauthorized() {
        let mut parts = parts("/applications?email=a@x.com");
        assert_eq!(
            Owner::from_request_parts(&mut parts, &()).await.unwrap_err(),
            AuthError::MissingCredential
        );
    }
}
