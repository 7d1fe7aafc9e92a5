use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use tracing::debug;

use crate::claims::TokenClaims;
use crate::config::TokenConfig;
use crate::error::{AuthError, AuthResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Client,
    Server,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Client => "client",
            TokenKind::Server => "server",
        }
    }
}

/// Mints HS256 hub tokens bound to a single audience.
///
/// Stateless per call: every token is freshly signed and nothing is cached, so an
/// issuer can be shared freely between concurrent dispatches.
#[derive(Clone)]
pub struct TokenIssuer {
    config: TokenConfig,
    encoding_key: EncodingKey,
    lifetime: Duration,
}

impl TokenIssuer {
    pub fn new(config: TokenConfig) -> AuthResult<Self> {
        let lifetime = Duration::from_std(config.lifetime)
            .map_err(|_| AuthError::InvalidLifetime(config.lifetime))?;
        if lifetime <= Duration::zero() {
            return Err(AuthError::InvalidLifetime(config.lifetime));
        }

        let encoding_key = EncodingKey::from_secret(config.access_key.as_bytes());
        Ok(Self {
            config,
            encoding_key,
            lifetime,
        })
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Token a client presents when connecting to `hub` directly.
    pub fn issue_client_token(&self, hub: &str, user_id: Option<&str>) -> AuthResult<String> {
        let user_id = user_id.filter(|id| !id.is_empty());
        if self.config.identity.is_required() && user_id.is_none() {
            return Err(AuthError::MissingUserId);
        }

        let audience = self.config.client_url(hub);
        debug!(kind = "client", hub, anonymous = user_id.is_none(), "issuing hub token");
        self.sign(audience, user_id, Utc::now())
    }

    /// Token authorizing exactly one management request against `target_uri`.
    pub fn issue_server_token(&self, target_uri: &str) -> AuthResult<String> {
        debug!(kind = "server", audience = target_uri, "issuing hub token");
        self.sign(target_uri.to_string(), None, Utc::now())
    }

    fn sign(
        &self,
        audience: String,
        user_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> AuthResult<String> {
        let issued_at = now.timestamp();
        let claims = TokenClaims {
            aud: audience,
            exp: (now + self.lifetime).timestamp(),
            nbf: issued_at,
            iat: issued_at,
            sub: user_id.map(str::to_string),
            nameid: user_id.map(str::to_string),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|err| AuthError::Signing(err.to_string()))
    }
}
