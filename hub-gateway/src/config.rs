use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use common_auth::{AccessKey, IdentityPolicy, TokenConfig};
use reqwest::Url;

use crate::error::{GatewayError, GatewayResult};

pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

/// Service API version announced in the connection string.
///
/// Parsed and retained but not used to build paths or tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ServiceVersion {
    pub major: u32,
    pub minor: u32,
    pub build: Option<u32>,
    pub revision: Option<u32>,
}

impl FromStr for ServiceVersion {
    type Err = GatewayError;

    fn from_str(value: &str) -> GatewayResult<Self> {
        let invalid = || {
            GatewayError::Configuration(format!(
                "Invalid version format in connection string: '{value}'"
            ))
        };

        let parts = value
            .trim()
            .split('.')
            .map(|part| part.parse::<u32>().map_err(|_| invalid()))
            .collect::<GatewayResult<Vec<_>>>()?;

        match parts.as_slice() {
            [major, minor] => Ok(Self {
                major: *major,
                minor: *minor,
                build: None,
                revision: None,
            }),
            [major, minor, build] => Ok(Self {
                major: *major,
                minor: *minor,
                build: Some(*build),
                revision: None,
            }),
            [major, minor, build, revision] => Ok(Self {
                major: *major,
                minor: *minor,
                build: Some(*build),
                revision: Some(*revision),
            }),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for ServiceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if let Some(build) = self.build {
            write!(f, ".{build}")?;
        }
        if let Some(revision) = self.revision {
            write!(f, ".{revision}")?;
        }
        Ok(())
    }
}

/// Parsed `Endpoint=...;AccessKey=...;Version=...;` connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub endpoint: String,
    pub access_key: AccessKey,
    pub version: Option<ServiceVersion>,
}

impl ConnectionString {
    pub fn parse(value: &str) -> GatewayResult<Self> {
        if value.trim().is_empty() {
            return Err(GatewayError::Configuration(
                "Service connection string is empty".to_string(),
            ));
        }

        let mut endpoint = None;
        let mut access_key = None;
        let mut version = None;

        for (key, raw) in value
            .split(';')
            .filter_map(|segment| segment.split_once('='))
        {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let slot = match key.trim().to_ascii_lowercase().as_str() {
                "endpoint" => &mut endpoint,
                "accesskey" => &mut access_key,
                "version" => &mut version,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(raw);
            }
        }

        let endpoint = endpoint.ok_or_else(|| {
            GatewayError::Configuration("No endpoint present in connection string".to_string())
        })?;
        let access_key = access_key.ok_or_else(|| {
            GatewayError::Configuration("No access key present in connection string".to_string())
        })?;
        let version = version.map(ServiceVersion::from_str).transpose()?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            access_key: AccessKey::new(access_key),
            version,
        })
    }
}

/// Immutable service configuration, validated once at startup.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    endpoint: String,
    access_key: AccessKey,
    version: Option<ServiceVersion>,
    token_lifetime: Duration,
    identity: IdentityPolicy,
    http_timeout: Option<Duration>,
}

impl ServiceConfig {
    pub fn new(
        endpoint: &str,
        access_key: AccessKey,
        token_lifetime: Duration,
    ) -> GatewayResult<Self> {
        let endpoint = normalize_endpoint(endpoint)?;
        if access_key.is_empty() {
            return Err(GatewayError::Configuration(
                "Access key must not be empty".to_string(),
            ));
        }
        if token_lifetime.is_zero() {
            return Err(GatewayError::Configuration(
                "Token lifetime must be positive".to_string(),
            ));
        }

        Ok(Self {
            endpoint,
            access_key,
            version: None,
            token_lifetime,
            identity: IdentityPolicy::Required,
            http_timeout: None,
        })
    }

    pub fn from_connection_string(
        connection_string: &str,
        token_lifetime: Duration,
        identity: IdentityPolicy,
    ) -> GatewayResult<Self> {
        let parsed = ConnectionString::parse(connection_string)?;
        let mut config = Self::new(&parsed.endpoint, parsed.access_key, token_lifetime)?
            .with_identity(identity);
        config.version = parsed.version;
        Ok(config)
    }

    pub fn from_env() -> GatewayResult<Self> {
        let connection_string = env::var("HUB_CONNECTION_STRING").map_err(|_| {
            GatewayError::Configuration("HUB_CONNECTION_STRING must be set".to_string())
        })?;
        let token_lifetime = seconds_from_env("HUB_TOKEN_LIFETIME_SECONDS")?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME);
        let identity =
            IdentityPolicy::from_flag(bool_from_env("HUB_REQUIRE_IDENTITY")?.unwrap_or(true));
        let http_timeout = match seconds_from_env("HUB_HTTP_TIMEOUT_SECONDS")? {
            Some(0) => {
                return Err(GatewayError::Configuration(
                    "HUB_HTTP_TIMEOUT_SECONDS must be positive".to_string(),
                ))
            }
            other => other.map(Duration::from_secs),
        };

        let mut config =
            Self::from_connection_string(&connection_string, token_lifetime, identity)?;
        config.http_timeout = http_timeout;
        Ok(config)
    }

    pub fn with_identity(mut self, identity: IdentityPolicy) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = Some(timeout);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn access_key(&self) -> &AccessKey {
        &self.access_key
    }

    pub fn version(&self) -> Option<ServiceVersion> {
        self.version
    }

    pub fn token_lifetime(&self) -> Duration {
        self.token_lifetime
    }

    pub fn identity(&self) -> IdentityPolicy {
        self.identity
    }

    pub fn http_timeout(&self) -> Option<Duration> {
        self.http_timeout
    }

    pub fn token_config(&self) -> TokenConfig {
        TokenConfig::new(
            self.endpoint.clone(),
            self.access_key.clone(),
            self.token_lifetime,
        )
        .with_identity(self.identity)
    }
}

fn normalize_endpoint(value: &str) -> GatewayResult<String> {
    let trimmed = value.trim().trim_end_matches('/');
    let url = Url::parse(trimmed).map_err(|err| {
        GatewayError::Configuration(format!("Invalid service endpoint '{value}': {err}"))
    })?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(GatewayError::Configuration(format!(
            "Service endpoint must be an absolute http(s) URL, got '{value}'"
        )));
    }
    Ok(trimmed.to_string())
}

fn bool_from_env(key: &str) -> GatewayResult<Option<bool>> {
    let Ok(value) = env::var(key) else {
        return Ok(None);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(GatewayError::Configuration(format!(
            "{key} must be one of 1/true/yes/on or 0/false/no/off, got '{value}'"
        ))),
    }
}

fn seconds_from_env(key: &str) -> GatewayResult<Option<u64>> {
    let Ok(value) = env::var(key) else {
        return Ok(None);
    };
    value.trim().parse::<u64>().map(Some).map_err(|_| {
        GatewayError::Configuration(format!(
            "{key} must be a whole number of seconds, got '{value}'"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_connection_string() {
        let parsed = ConnectionString::parse(
            "Endpoint=https://hub.example.com;AccessKey=abc123=;Version=1.0;",
        )
        .expect("parse");
        assert_eq!(parsed.endpoint, "https://hub.example.com");
        assert_eq!(parsed.access_key, AccessKey::new("abc123="));
        assert_eq!(parsed.version.map(|v| v.to_string()).as_deref(), Some("1.0"));
    }

    #[test]
    fn keys_are_case_insensitive_and_unordered() {
        let parsed = ConnectionString::parse("accesskey=k;ENDPOINT=http://localhost:8080")
            .expect("parse");
        assert_eq!(parsed.endpoint, "http://localhost:8080");
        assert!(parsed.version.is_none());
    }

    #[test]
    fn missing_parts_are_configuration_errors() {
        for (input, needle) in [
            ("", "empty"),
            ("AccessKey=k", "No endpoint"),
            ("Endpoint=https://hub.example.com;AccessKey=", "No access key"),
            ("Endpoint=https://hub.example.com;AccessKey=k;Version=one", "Invalid version"),
        ] {
            match ConnectionString::parse(input) {
                Err(GatewayError::Configuration(message)) => {
                    assert!(message.contains(needle), "{input}: {message}")
                }
                other => panic!("unexpected result for {input}: {other:?}"),
            }
        }
    }

    #[test]
    fn version_accepts_two_to_four_components() {
        assert!("1.0".parse::<ServiceVersion>().is_ok());
        assert!("1.0.2".parse::<ServiceVersion>().is_ok());
        let full: ServiceVersion = "1.2.3.4".parse().expect("four parts");
        assert_eq!(full.revision, Some(4));
        assert_eq!(full.to_string(), "1.2.3.4");
        assert!("1".parse::<ServiceVersion>().is_err());
        assert!("1.2.3.4.5".parse::<ServiceVersion>().is_err());
        assert!("1.-2".parse::<ServiceVersion>().is_err());
    }

    #[test]
    fn endpoint_is_validated_and_trimmed() {
        let config = ServiceConfig::new(
            "https://hub.example.com/",
            AccessKey::new("k"),
            DEFAULT_TOKEN_LIFETIME,
        )
        .expect("config");
        assert_eq!(config.endpoint(), "https://hub.example.com");

        for bad in ["not a url", "ftp://hub.example.com", "/relative/path"] {
            assert!(matches!(
                ServiceConfig::new(bad, AccessKey::new("k"), DEFAULT_TOKEN_LIFETIME),
                Err(GatewayError::Configuration(_))
            ));
        }
    }

    #[test]
    fn token_config_carries_policy_and_lifetime() {
        let config = ServiceConfig::from_connection_string(
            "Endpoint=https://hub.example.com;AccessKey=k;Version=1.0",
            Duration::from_secs(120),
            IdentityPolicy::Optional,
        )
        .expect("config");
        let token = config.token_config();
        assert_eq!(token.endpoint, "https://hub.example.com");
        assert_eq!(token.lifetime, Duration::from_secs(120));
        assert_eq!(token.identity, IdentityPolicy::Optional);
        assert_eq!(config.version().map(|v| v.major), Some(1));
    }

    #[test]
    fn bool_from_env_parses() {
        env::set_var("HUB_TEST_BOOL_TRUE", "Yes");
        env::set_var("HUB_TEST_BOOL_ONE", "1");
        env::set_var("HUB_TEST_BOOL_OFF", "off");
        env::set_var("HUB_TEST_BOOL_TYPO", "ture");
        assert_eq!(bool_from_env("HUB_TEST_BOOL_TRUE").expect("valid"), Some(true));
        assert_eq!(bool_from_env("HUB_TEST_BOOL_ONE").expect("valid"), Some(true));
        assert_eq!(bool_from_env("HUB_TEST_BOOL_OFF").expect("valid"), Some(false));
        assert_eq!(bool_from_env("HUB_TEST_BOOL_UNSET").expect("unset"), None);
        assert!(matches!(
            bool_from_env("HUB_TEST_BOOL_TYPO"),
            Err(GatewayError::Configuration(_))
        ));
    }

    // Single test: the HUB_* variables are process-wide.
    #[test]
    fn from_env_reads_and_validates_variables() {
        for key in [
            "HUB_TOKEN_LIFETIME_SECONDS",
            "HUB_REQUIRE_IDENTITY",
            "HUB_HTTP_TIMEOUT_SECONDS",
        ] {
            env::remove_var(key);
        }
        env::set_var(
            "HUB_CONNECTION_STRING",
            "Endpoint=https://hub.example.com;AccessKey=k;",
        );

        let config = ServiceConfig::from_env().expect("defaults");
        assert_eq!(config.token_lifetime(), DEFAULT_TOKEN_LIFETIME);
        assert_eq!(config.identity(), IdentityPolicy::Required);
        assert!(config.http_timeout().is_none());

        env::set_var("HUB_TOKEN_LIFETIME_SECONDS", "120");
        env::set_var("HUB_HTTP_TIMEOUT_SECONDS", "5");
        for (value, expected) in [
            ("true", IdentityPolicy::Required),
            ("ON", IdentityPolicy::Required),
            ("0", IdentityPolicy::Optional),
            ("no", IdentityPolicy::Optional),
        ] {
            env::set_var("HUB_REQUIRE_IDENTITY", value);
            let config = ServiceConfig::from_env().expect("valid env");
            assert_eq!(config.identity(), expected, "{value}");
            assert_eq!(config.token_lifetime(), Duration::from_secs(120));
            assert_eq!(config.http_timeout(), Some(Duration::from_secs(5)));
        }

        for value in ["ture", "required", "Y", "enabled", ""] {
            env::set_var("HUB_REQUIRE_IDENTITY", value);
            assert!(
                matches!(ServiceConfig::from_env(), Err(GatewayError::Configuration(_))),
                "identity flag '{value}' must be rejected"
            );
        }
        env::set_var("HUB_REQUIRE_IDENTITY", "1");

        for value in ["5s", "-1", "0"] {
            env::set_var("HUB_HTTP_TIMEOUT_SECONDS", value);
            assert!(
                matches!(ServiceConfig::from_env(), Err(GatewayError::Configuration(_))),
                "timeout '{value}' must be rejected"
            );
        }
        env::remove_var("HUB_HTTP_TIMEOUT_SECONDS");

        env::set_var("HUB_TOKEN_LIFETIME_SECONDS", "1h");
        assert!(matches!(
            ServiceConfig::from_env(),
            Err(GatewayError::Configuration(_))
        ));

        env::remove_var("HUB_CONNECTION_STRING");
        assert!(matches!(
            ServiceConfig::from_env(),
            Err(GatewayError::Configuration(_))
        ));
        for key in ["HUB_TOKEN_LIFETIME_SECONDS", "HUB_REQUIRE_IDENTITY"] {
            env::remove_var(key);
        }
    }

    #[test]
    fn zero_lifetime_is_rejected() {
        assert!(ServiceConfig::new("https://hub.example.com", AccessKey::new("k"), Duration::ZERO)
            .is_err());
    }
}
