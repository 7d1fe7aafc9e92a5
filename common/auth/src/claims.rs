use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};

/// Wire representation of the claims carried by every hub token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub aud: String,
    pub exp: i64,
    pub nbf: i64,
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Name identifier read by the service to bind a connection to a user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nameid: Option<String>,
}

/// Application-focused view of decoded hub token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HubClaims {
    pub audience: String,
    pub user_id: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub not_before: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

fn timestamp(claim: &'static str, value: i64) -> AuthResult<DateTime<Utc>> {
    Utc.timestamp_opt(value, 0)
        .single()
        .ok_or_else(|| AuthError::InvalidClaim(claim, value.to_string()))
}

impl TryFrom<TokenClaims> for HubClaims {
    type Error = AuthError;

    fn try_from(value: TokenClaims) -> AuthResult<Self> {
        let expires_at = timestamp("exp", value.exp)?;
        let issued_at = timestamp("iat", value.iat)?;
        let not_before = timestamp("nbf", value.nbf)?;

        if let (Some(sub), Some(nameid)) = (&value.sub, &value.nameid) {
            if sub != nameid {
                return Err(AuthError::InvalidClaim("nameid", nameid.clone()));
            }
        }

        Ok(Self {
            audience: value.aud,
            user_id: value.sub.or(value.nameid),
            issued_at,
            not_before,
            expires_at,
        })
    }
}

/// Decode a token's claims without checking its signature or expiry.
///
/// Only for inspecting tokens this process minted; never use it to authorize anything.
pub fn peek_claims(token: &str) -> AuthResult<HubClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)?;
    HubClaims::try_from(data.claims)
}
