//! Credential transport over a browser-managed cookie.
//!
//! This layer only carries the token string; it never looks inside it.

use std::fmt;
use std::str::FromStr;

use http::header::{self, HeaderMap, HeaderValue, InvalidHeaderValue};
use serde::{Deserialize, Serialize};

use crate::auth::codec::DEFAULT_TOKEN_TTL_SECONDS;

/// Default cookie name carrying the credential.
pub const DEFAULT_COOKIE_NAME: &str = "token";

/// Cross-site policy declared on the credential cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax => "Lax",
            Self::None => "None",
        }
    }
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SameSite {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lax" => Ok(Self::Lax),
            "none" => Ok(Self::None),
            other => Err(format!(
                "invalid SameSite value `{}` (expected strict, lax or none)",
                other
            )),
        }
    }
}

/// How the credential cookie is written and read.
///
/// `HttpOnly` is always set and is not configurable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieConfig {
    /// Cookie name
    pub name: String,
    /// Cookie path scope
    pub path: String,
    /// Only send over encrypted transport
    pub secure: bool,
    /// Explicit cross-site policy
    pub same_site: SameSite,
    /// Lifetime hint for the browser, in seconds
    pub max_age: Option<i64>,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_COOKIE_NAME.to_string(),
            path: "/".to_string(),
            secure: true,
            same_site: SameSite::Lax,
            max_age: Some(DEFAULT_TOKEN_TTL_SECONDS),
        }
    }
}

impl CookieConfig {
    /// Config for local development over plain HTTP (`Secure` off).
    pub fn local() -> Self {
        Self {
            secure: false,
            ..Default::default()
        }
    }

    /// Render the `Set-Cookie` value carrying `token`.
    pub fn build_set_cookie(&self, token: &str) -> String {
        self.render(token, self.max_age)
    }

    /// Render a `Set-Cookie` value telling the browser to drop the cookie.
    pub fn build_clear_cookie(&self) -> String {
        self.render("", Some(0))
    }

    fn render(&self, value: &str, max_age: Option<i64>) -> String {
        let mut cookie = format!("{}={}; Path={}", self.name, value, self.path);
        if let Some(max_age) = max_age {
            cookie.push_str(&format!("; Max-Age={}", max_age));
        }
        cookie.push_str("; HttpOnly");
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie.push_str("; SameSite=");
        cookie.push_str(self.same_site.as_str());
        cookie
    }

    /// Attach the credential to an outgoing response.
    pub fn attach(&self, headers: &mut HeaderMap, token: &str) -> Result<(), InvalidHeaderValue> {
        let value = HeaderValue::from_str(&self.build_set_cookie(token))?;
        headers.append(header::SET_COOKIE, value);
        Ok(())
    }

    /// Attach an expired cookie so the browser discards the credential.
    pub fn clear(&self, headers: &mut HeaderMap) -> Result<(), InvalidHeaderValue> {
        let value = HeaderValue::from_str(&self.build_clear_cookie())?;
        headers.append(header::SET_COOKIE, value);
        Ok(())
    }

    /// Read the credential from an incoming request, if present.
    ///
    /// Absence is not an error here; the verification middleware decides.
    pub fn extract(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, value)| *name == self.name && !value.is_empty())
            .map(|(_, value)| value.to_string())
    }
}
