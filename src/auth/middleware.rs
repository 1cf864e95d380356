//! Verification middleware gating every protected route.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::auth::codec::TokenCodec;
use crate::auth::context::AuthContext;
use crate::auth::cookie::CookieConfig;
use crate::auth::error::AuthError;

/// Shared, read-only state needed to verify credentials.
#[derive(Debug, Clone)]
pub struct AuthState {
    codec: Arc<TokenCodec>,
    cookies: Arc<CookieConfig>,
}

impl AuthState {
    /// The cookie's `Max-Age` follows the codec's credential lifetime.
    pub fn new(codec: TokenCodec, mut cookies: CookieConfig) -> Self {
        cookies.max_age = Some(codec.ttl().num_seconds());
        Self {
            codec: Arc::new(codec),
            cookies: Arc::new(cookies),
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn cookies(&self) -> &CookieConfig {
        &self.cookies
    }
}

/// Unauthenticated -> Authenticated.
///
/// Pulls the credential out of the request cookies and verifies it. A single
/// attempt; there is no retry or fallback.
pub fn authenticate(
    state: &AuthState,
    headers: &HeaderMap,
    now: DateTime<Utc>,
) -> Result<AuthContext, AuthError> {
    let token = state
        .cookies
        .extract(headers)
        .ok_or(AuthError::MissingCredential)?;

    let claims = state.codec.verify_at(&token, now)?;

    let (ip_address, user_agent) = client_info(headers);
    Ok(AuthContext::new(claims).with_client_info(ip_address, user_agent))
}

fn client_info(headers: &HeaderMap) -> (Option<String>, Option<String>) {
    let ip_address = headers
        .get("X-Forwarded-For")
        .or_else(|| headers.get("X-Real-IP"))
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    (ip_address, user_agent)
}

/// Axum middleware: verify the credential, attach [`AuthContext`] to the
/// request extensions, then hand off to the next stage. Any failure stops the
/// request with `401`.
pub async fn require_auth(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let ctx = match authenticate(&state, req.headers(), Utc::now()) {
        Ok(ctx) => ctx,
        Err(err) => {
            let (ip_address, user_agent) = client_info(req.headers());
            warn!(
                reason = err.kind(),
                method = %req.method(),
                path = %req.uri().path(),
                ip_address = ?ip_address,
                user_agent = ?user_agent,
                "Request rejected: {}",
                err
            );
            return Err(err);
        }
    };

    debug!(
        identity = %ctx.identity(),
        ip_address = ?ctx.ip_address(),
        user_agent = ?ctx.user_agent(),
        "Credential verified"
    );

    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::IssueRequest;
    use crate::auth::codec::SigningSecret;
    use axum::http::{HeaderValue, header};
    use chrono::Duration;

    const SECRET: &str = "test_secret_key_for_testing_purposes_only";

    fn state() -> AuthState {
        let secret = SigningSecret::new(SECRET).unwrap();
        AuthState::new(TokenCodec::new(&secret), CookieConfig::local())
    }

    fn cookie_headers(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("token={}", token)).unwrap(),
        );
        headers
    }

    #[test]
    fn test_cookie_lifetime_follows_codec_ttl() {
        let secret = SigningSecret::new(SECRET).unwrap();
        let codec = TokenCodec::new(&secret).with_ttl(Duration::hours(2));
        let state = AuthState::new(codec, CookieConfig::local());

        assert_eq!(state.cookies().max_age, Some(7200));
        assert!(
            state
                .cookies()
                .build_set_cookie("v")
                .contains("Max-Age=7200")
        );
    }

    #[test]
    fn test_client_info_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Real-IP", HeaderValue::from_static("10.0.0.2"));
        headers.insert("X-Forwarded-For", HeaderValue::from_static("10.0.0.1"));

        let (ip_address, user_agent) = client_info(&headers);
        assert_eq!(ip_address.as_deref(), Some("10.0.0.1"));
        assert!(user_agent.is_none());
    }

    #[test]
    fn test_missing_cookie_is_missing_credential() {
        let result = authenticate(&state(), &HeaderMap::new(), Utc::now());
        assert_eq!(result.unwrap_err(), AuthError::MissingCredential);
    }

    #[test]
    fn test_valid_cookie_authenticates() {
        let state = state();
        let now = Utc::now();
        let token = state
            .codec()
            .issue_at(&IssueRequest::new("a@x.com"), now)
            .unwrap();

        let mut headers = cookie_headers(&token);
        headers.insert("X-Forwarded-For", HeaderValue::from_static("10.0.0.1"));
        headers.insert(header::USER_AGENT, HeaderValue::from_static("test-agent"));

        let ctx = authenticate(&state, &headers, now).unwrap();
        assert_eq!(ctx.identity().as_str(), "a@x.com");
        assert_eq!(ctx.ip_address(), Some("10.0.0.1"));
        assert_eq!(ctx.user_agent(), Some("test-agent"));
    }

    #[test]
    fn test_failure_kinds_stay_distinct() {
        let state = state();
        let now = Utc::now();
        let token = state
            .codec()
            .issue_at(&IssueRequest::new("a@x.com"), now)
            .unwrap();

        let expired = authenticate(&state, &cookie_headers(&token), now + Duration::days(2));
        assert_eq!(expired.unwrap_err(), AuthError::Expired);

        let garbage = authenticate(&state, &cookie_headers("garbage"), now);
        assert!(matches!(garbage.unwrap_err(), AuthError::Malformed(_)));

        let other = SigningSecret::new("another_secret_key_for_testing_purposes").unwrap();
        let foreign = TokenCodec::new(&other)
            .issue_at(&IssueRequest::new("a@x.com"), now)
            .unwrap();
        let wrong_key = authenticate(&state, &cookie_headers(&foreign), now);
        assert_eq!(wrong_key.unwrap_err(), AuthError::InvalidSignature);
    }
}
