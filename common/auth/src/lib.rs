pub mod claims;
pub mod config;
pub mod error;
pub mod issuer;
pub mod verifier;

pub use claims::{peek_claims, HubClaims, TokenClaims};
pub use config::{AccessKey, IdentityPolicy, TokenConfig};
pub use error::{AuthError, AuthResult};
pub use issuer::{TokenIssuer, TokenKind};
pub use verifier::HubTokenVerifier;
