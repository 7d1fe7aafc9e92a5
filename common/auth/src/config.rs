use std::fmt;
use std::time::Duration;

/// Whether client tokens must be bound to a user identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentityPolicy {
    /// Client tokens without a user id are rejected.
    #[default]
    Required,
    /// Anonymous client tokens are allowed; the identity claims are omitted.
    Optional,
}

impl IdentityPolicy {
    pub fn from_flag(require_identity: bool) -> Self {
        if require_identity {
            Self::Required
        } else {
            Self::Optional
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, Self::Required)
    }
}

/// Shared secret used to sign hub tokens.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessKey(String);

impl AccessKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Raw UTF-8 bytes, used directly as the HMAC key.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for AccessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessKey([REDACTED])")
    }
}

/// Runtime configuration for minting hub tokens.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Base endpoint of the service, without a trailing slash.
    pub endpoint: String,
    pub access_key: AccessKey,
    /// Tokens expire this long after they are minted.
    pub lifetime: Duration,
    pub identity: IdentityPolicy,
}

impl TokenConfig {
    /// Construct config requiring an identity on client tokens.
    pub fn new(endpoint: impl Into<String>, access_key: AccessKey, lifetime: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            access_key,
            lifetime,
            identity: IdentityPolicy::Required,
        }
    }

    pub fn with_identity(mut self, identity: IdentityPolicy) -> Self {
        self.identity = identity;
        self
    }

    /// Connection URL handed to clients for `hub`; also the client token audience.
    pub fn client_url(&self, hub: &str) -> String {
        format!("{}/client/?hub={}", self.endpoint, hub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_key_debug_is_redacted() {
        let key = AccessKey::new("super-secret");
        assert_eq!(format!("{key:?}"), "AccessKey([REDACTED])");
        assert_eq!(key.as_bytes(), b"super-secret");
    }

    #[test]
    fn identity_policy_from_flag() {
        assert_eq!(IdentityPolicy::from_flag(true), IdentityPolicy::Required);
        assert_eq!(IdentityPolicy::from_flag(false), IdentityPolicy::Optional);
        assert!(IdentityPolicy::default().is_required());
    }

    #[test]
    fn client_url_embeds_hub_query() {
        let config = TokenConfig::new(
            "https://hub.example.com",
            AccessKey::new("k"),
            Duration::from_secs(60),
        );
        assert_eq!(
            config.client_url("chat"),
            "https://hub.example.com/client/?hub=chat"
        );
    }
}
