//! Caller identity as produced by the external identity provider.
//!
//! The core never verifies identity tokens cryptographically — that is the
//! provider's job, upstream of us. What arrives here is either an already
//! extracted record or a bearer JWT whose payload we *decode* (base64 only)
//! to read the fields this core actually consumes: `email`, `birthdate`,
//! `gender`. No trust decision is re-derived from these fields.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::Gender;

/// The identity fields consumed by history and diagnosis operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserIdentity {
    pub email: String,
    pub birthdate: NaiveDate,
    pub gender: Gender,
}

impl UserIdentity {
    /// Decode the payload of a bearer JWT without verifying its signature.
    ///
    /// Accepts the raw compact token or a full `Bearer <token>` header value.
    /// Signature verification is delegated to the identity provider at the
    /// API boundary; by the time a token reaches this core it is trusted.
    ///
    /// # Errors
    ///
    /// `Validation` if the token is not a three-part JWT, the payload is not
    /// base64url, or the payload JSON lacks the required fields.
    pub fn from_unverified_token(token: &str) -> Result<Self> {
        let token = token.trim().strip_prefix("Bearer ").unwrap_or(token.trim());

        let payload_b64 = token
            .split('.')
            .nth(1)
            .ok_or_else(|| Error::Validation("identity token is not a JWT".to_string()))?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| Error::Validation("identity token payload is not base64url".to_string()))?;

        serde_json::from_slice(&payload)
            .map_err(|e| Error::Validation(format!("identity token payload is malformed: {}", e)))
    }

    /// Age in whole years as of now. Calendar-year difference, matching the
    /// year granularity the knowledge service works with.
    pub fn age_years(&self) -> i32 {
        Utc::now().year() - self.birthdate.year()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_token(payload: &str) -> String {
        let header = URL_SAFE_NO_PAD.encode(b"{\"alg\":\"none\"}");
        let body = URL_SAFE_NO_PAD.encode(payload.as_bytes());
        format!("{}.{}.sig", header, body)
    }

    #[test]
    fn test_decode_valid_token() {
        let token = make_token(
            r#"{"email":"a@x.com","birthdate":"1990-04-02","gender":"female"}"#,
        );
        let id = UserIdentity::from_unverified_token(&token).unwrap();
        assert_eq!(id.email, "a@x.com");
        assert_eq!(id.gender, Gender::Female);
        assert_eq!(id.birthdate.year(), 1990);
    }

    #[test]
    fn test_decode_strips_bearer_prefix() {
        let token = make_token(r#"{"email":"a@x.com","birthdate":"1990-04-02","gender":"male"}"#);
        let id = UserIdentity::from_unverified_token(&format!("Bearer {}", token)).unwrap();
        assert_eq!(id.email, "a@x.com");
    }

    #[test]
    fn test_decode_rejects_non_jwt() {
        let err = UserIdentity::from_unverified_token("not-a-jwt").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_decode_rejects_missing_fields() {
        let token = make_token(r#"{"email":"a@x.com"}"#);
        let err = UserIdentity::from_unverified_token(&token).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
