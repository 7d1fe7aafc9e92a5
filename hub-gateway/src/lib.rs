//! Token issuance and REST dispatch for a managed real-time hub service.
//!
//! [`Dispatcher`] is the entry point: it resolves hub URIs, binds a freshly minted
//! server token to each request and reports non-success responses as
//! [`GatewayError::DispatchFailure`].

pub mod config;
pub mod dispatcher;
pub mod endpoints;
pub mod error;

pub use common_auth::{AccessKey, IdentityPolicy};
pub use config::{ConnectionString, ServiceConfig, ServiceVersion, DEFAULT_TOKEN_LIFETIME};
pub use dispatcher::{ConnectionDescriptor, DispatchMessage, Dispatcher, HubOperation, HubService};
pub use endpoints::EndpointResolver;
pub use error::{GatewayError, GatewayResult};
