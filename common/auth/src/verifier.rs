use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use tracing::debug;

use crate::claims::{HubClaims, TokenClaims};
use crate::config::AccessKey;
use crate::error::AuthResult;

/// Checks HS256 hub tokens the way the service does: signature, expiry and an exact
/// audience match.
#[derive(Clone)]
pub struct HubTokenVerifier {
    decoding_key: DecodingKey,
    leeway_seconds: u64,
}

impl HubTokenVerifier {
    /// Construct a verifier with no clock leeway.
    pub fn new(access_key: &AccessKey) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(access_key.as_bytes()),
            leeway_seconds: 0,
        }
    }

    /// Adjust the allowed clock skew when validating exp/nbf.
    pub fn with_leeway(mut self, seconds: u64) -> Self {
        self.leeway_seconds = seconds;
        self
    }

    pub fn verify(&self, token: &str, expected_audience: &str) -> AuthResult<HubClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[expected_audience]);
        validation.set_required_spec_claims(&["exp", "aud"]);
        validation.validate_nbf = true;
        validation.leeway = self.leeway_seconds;

        let data = decode::<TokenClaims>(token, &self.decoding_key, &validation)?;
        let claims = HubClaims::try_from(data.claims)?;
        debug!(audience = expected_audience, "verified hub token");
        Ok(claims)
    }
}
