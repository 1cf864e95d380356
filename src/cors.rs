//! Cross-origin policy: which browser origins may send credentialed requests.

use std::fmt;
use std::time::Duration;

use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use url::Url;

/// Origin used when nothing is configured: the local web client.
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:5173";

const WILDCARD: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsPolicyError {
    /// Credentials were allowed together with a `*` origin
    WildcardWithCredentials,
    /// An origin that is not `scheme://host[:port]`
    InvalidOrigin(String),
    /// No origins at all
    NoOrigins,
}

impl fmt::Display for CorsPolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WildcardWithCredentials => write!(
                f,
                "credentialed CORS requires explicit origins, `*` is not allowed"
            ),
            Self::InvalidOrigin(origin) => write!(f, "invalid CORS origin: {}", origin),
            Self::NoOrigins => write!(f, "no CORS origins configured"),
        }
    }
}

impl std::error::Error for CorsPolicyError {}

/// Declared set of caller origins, evaluated by `tower-http` on every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsPolicy {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self {
            allowed_origins: vec![DEFAULT_ALLOWED_ORIGIN.to_string()],
            allow_credentials: true,
        }
    }
}

impl CorsPolicy {
    pub fn new(allowed_origins: Vec<String>, allow_credentials: bool) -> Self {
        Self {
            allowed_origins,
            allow_credentials,
        }
    }

    /// Credentialed policy from a comma-separated list, e.g.
    /// `http://localhost:5173,https://careers.example.com`. Blank and `null`
    /// entries are skipped; an empty list falls back to the local client.
    pub fn from_list(raw: &str) -> Self {
        let origins: Vec<String> = raw
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty() && *s != "null")
            .map(|s| s.to_string())
            .collect();

        if origins.is_empty() {
            return Self::default();
        }

        Self::new(origins, true)
    }

    fn has_wildcard(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == WILDCARD)
    }

    /// Check the policy and return the normalized origins.
    pub fn validate(&self) -> Result<Vec<String>, CorsPolicyError> {
        if self.allowed_origins.is_empty() {
            return Err(CorsPolicyError::NoOrigins);
        }
        if self.has_wildcard() {
            if self.allow_credentials {
                return Err(CorsPolicyError::WildcardWithCredentials);
            }
            return Ok(vec![WILDCARD.to_string()]);
        }

        self.allowed_origins
            .iter()
            .map(|origin| normalize_origin(origin))
            .collect()
    }

    /// Build the `tower-http` layer for this policy.
    pub fn layer(&self) -> Result<CorsLayer, CorsPolicyError> {
        let origins = self.validate()?;

        let mut layer = CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
            .max_age(Duration::from_secs(3600));

        if origins.iter().any(|o| o == WILDCARD) {
            layer = layer.allow_origin(Any);
        } else {
            let values = origins
                .iter()
                .map(|origin| {
                    HeaderValue::from_str(origin)
                        .map_err(|_| CorsPolicyError::InvalidOrigin(origin.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            layer = layer.allow_origin(AllowOrigin::list(values));
        }

        if self.allow_credentials {
            layer = layer.allow_credentials(true);
        }

        Ok(layer)
    }
}

/// Reduce an origin to `scheme://host[:port]`, rejecting anything with a path,
/// query or credentials.
fn normalize_origin(origin: &str) -> Result<String, CorsPolicyError> {
    let invalid = || CorsPolicyError::InvalidOrigin(origin.to_string());

    let url = Url::parse(origin).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(invalid());
    }
    if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        return Err(invalid());
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(invalid());
    }

    Ok(url.origin().ascii_serialization())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_local_client_with_credentials() {
        let policy = CorsPolicy::default();
        assert_eq!(policy.allowed_origins, vec!["http://localhost:5173"]);
        assert!(policy.allow_credentials);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_from_list_skips_blank_and_null() {
        let policy = CorsPolicy::from_list(" http://a.test , ,null,https://b.test:8443 ");
        assert_eq!(
            policy.allowed_origins,
            vec!["http://a.test", "https://b.test:8443"]
        );
        assert!(policy.allow_credentials);

        assert_eq!(CorsPolicy::from_list(""), CorsPolicy::default());
    }

    #[test]
    fn test_wildcard_with_credentials_is_rejected() {
        let policy = CorsPolicy::new(vec!["*".to_string()], true);
        assert_eq!(
            policy.validate(),
            Err(CorsPolicyError::WildcardWithCredentials)
        );
        assert!(policy.layer().is_err());
    }

    #[test]
    fn test_wildcard_without_credentials_is_allowed() {
        let policy = CorsPolicy::new(vec!["*".to_string()], false);
        assert!(policy.validate().is_ok());
        assert!(policy.layer().is_ok());
    }

    #[test]
    fn test_origins_are_normalized() {
        let policy = CorsPolicy::new(vec!["HTTP://Localhost:5173/".to_string()], true);
        assert_eq!(policy.validate().unwrap(), vec!["http://localhost:5173"]);
    }

    #[test]
    fn test_invalid_origins() {
        for origin in [
            "localhost:5173",
            "ftp://files.test",
            "http://a.test/path",
            "http://a.test/?q=1",
            "http://user:pw@a.test",
        ] {
            let policy = CorsPolicy::new(vec![origin.to_string()], true);
            assert!(
                matches!(policy.validate(), Err(CorsPolicyError::InvalidOrigin(_))),
                "{} should be rejected",
                origin
            );
        }
    }

    #[test]
    fn test_empty_policy_is_rejected() {
        let policy = CorsPolicy::new(Vec::new(), true);
        assert_eq!(policy.validate(), Err(CorsPolicyError::NoOrigins));
    }
}
