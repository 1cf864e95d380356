//! Claims carried inside a session credential.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::Identity;

/// Claim names owned by the codec. Auxiliary fields with these names are
/// dropped at issuance so they can never shadow the signed values.
pub const RESERVED_CLAIMS: [&str; 3] = ["identity", "iat", "exp"];

/// What a caller asks to have signed: an identity plus optional auxiliary
/// fields. This is also the JSON body accepted by the issuance endpoint.
///
/// The identity is read from `identity`, or from `email` for older clients.
/// When both are present `identity` wins and `email` stays an auxiliary field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct IssueRequest {
    /// Identity the credential is issued for.
    pub identity: Identity,
    /// Any other top-level fields, carried through verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl IssueRequest {
    pub fn new(identity: impl Into<Identity>) -> Self {
        Self {
            identity: identity.into(),
            extra: Map::new(),
        }
    }

    /// Attach an auxiliary field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }
}

impl TryFrom<Map<String, Value>> for IssueRequest {
    type Error = String;

    fn try_from(mut extra: Map<String, Value>) -> Result<Self, Self::Error> {
        let value = match extra.remove("identity") {
            Some(value) => value,
            None => extra
                .remove("email")
                .ok_or_else(|| "missing field `identity` (or `email`)".to_string())?,
        };

        match value {
            Value::String(identity) => Ok(Self {
                identity: Identity::new(identity),
                extra,
            }),
            other => Err(format!("identity must be a string, got {}", other)),
        }
    }
}

/// The signed payload of a credential.
///
/// Immutable once signed: any change to the serialized form invalidates the
/// signature, so the codec is the only place these are constructed from
/// untrusted input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub identity: Identity,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    /// Issued-at (seconds since epoch)
    pub iat: i64,
    /// Expiry (seconds since epoch)
    pub exp: i64,
}

impl Claims {
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Look up an auxiliary field supplied at issuance.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.iat, 0)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// A credential is expired from its `exp` second onwards.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }

    /// The issuance request these claims were signed from, without timestamps.
    pub fn to_request(&self) -> IssueRequest {
        IssueRequest {
            identity: self.identity.clone(),
            extra: self.extra.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_claims() -> Claims {
        Claims {
            identity: Identity::new("a@x.com"),
            extra: Map::new(),
            iat: 1_700_000_000,
            exp: 1_700_086_400,
        }
    }

    #[test]
    fn test_issue_request_accepts_legacy_email_field() {
        let request: IssueRequest =
            serde_json::from_str(r#"{"email": "a@x.com", "name": "Ann"}"#).unwrap();
        assert_eq!(request.identity.as_str(), "a@x.com");
        assert_eq!(request.extra.get("name"), Some(&Value::from("Ann")));
        assert!(!request.extra.contains_key("email"));
    }

    #[test]
    fn test_identity_wins_over_email() {
        let request: IssueRequest = serde_json::from_str(
            r#"{"identity": "a@x.com", "email": "b@x.com", "name": "Ann"}"#,
        )
        .unwrap();
        assert_eq!(request.identity.as_str(), "a@x.com");
        assert_eq!(request.extra.get("email"), Some(&Value::from("b@x.com")));
        assert_eq!(request.extra.get("name"), Some(&Value::from("Ann")));
    }

    #[test]
    fn test_issue_request_rejects_non_string_identity() {
        let err = serde_json::from_str::<IssueRequest>(r#"{"identity": 42}"#).unwrap_err();
        assert!(err.to_string().contains("identity must be a string"));
    }

    #[test]
    fn test_issue_request_requires_identity() {
        let result = serde_json::from_str::<IssueRequest>(r#"{"name": "Ann"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_claims_flatten_auxiliary_fields() {
        let mut claims = sample_claims();
        claims.extra.insert("role".to_string(), Value::from("hr"));

        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["identity"], "a@x.com");
        assert_eq!(json["role"], "hr");
        assert_eq!(json["exp"], 1_700_086_400);

        let back: Claims = serde_json::from_value(json).unwrap();
        assert_eq!(back, claims);
        assert_eq!(back.field("role"), Some(&Value::from("hr")));
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let claims = sample_claims();
        let before = Utc.timestamp_opt(claims.exp - 1, 0).unwrap();
        let at = Utc.timestamp_opt(claims.exp, 0).unwrap();

        assert!(!claims.is_expired_at(before));
        assert!(claims.is_expired_at(at));
    }

    #[test]
    fn test_timestamps_convert_to_datetimes() {
        let claims = sample_claims();
        assert_eq!(claims.issued_at().unwrap().timestamp(), claims.iat);
        assert_eq!(claims.expires_at().unwrap().timestamp(), claims.exp);
    }
}
