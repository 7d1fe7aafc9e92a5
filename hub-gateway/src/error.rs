use common_auth::AuthError;
use reqwest::StatusCode;
use thiserror::Error;

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(
        "dispatch to {uri} for target '{}' failed with status {status}",
        .target.as_deref().unwrap_or("-")
    )]
    DispatchFailure {
        uri: String,
        target: Option<String>,
        status: StatusCode,
    },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("token error: {0}")]
    Token(AuthError),
}

impl From<AuthError> for GatewayError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::MissingUserId => Self::InvalidArgument(value.to_string()),
            AuthError::InvalidLifetime(_) => Self::Configuration(value.to_string()),
            other => Self::Token(other),
        }
    }
}

impl GatewayError {
    /// Whether the caller can fix the failure by changing its input.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}
