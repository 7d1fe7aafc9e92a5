use std::time::Instant;

use async_trait::async_trait;
use common_auth::{TokenIssuer, TokenKind};
use common_observability::DispatchMetrics;
use reqwest::header::{ACCEPT, ACCEPT_CHARSET, CONTENT_TYPE};
use reqwest::{Client, Method, Request, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::ServiceConfig;
use crate::endpoints::EndpointResolver;
use crate::error::{GatewayError, GatewayResult};

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Hub management operations carried over REST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubOperation {
    Broadcast,
    SendToGroup,
    SendToUser,
    AddUserToGroup,
    RemoveUserFromGroup,
}

impl HubOperation {
    pub fn method(&self) -> Method {
        match self {
            HubOperation::Broadcast | HubOperation::SendToGroup | HubOperation::SendToUser => {
                Method::POST
            }
            HubOperation::AddUserToGroup => Method::PUT,
            HubOperation::RemoveUserFromGroup => Method::DELETE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HubOperation::Broadcast => "broadcast",
            HubOperation::SendToGroup => "send_to_group",
            HubOperation::SendToUser => "send_to_user",
            HubOperation::AddUserToGroup => "add_user_to_group",
            HubOperation::RemoveUserFromGroup => "remove_user_from_group",
        }
    }
}

/// Client method invocation delivered to receiving connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchMessage {
    pub target: String,
    pub arguments: Vec<Value>,
}

impl DispatchMessage {
    /// `None` when there are no arguments: such calls are sent without a body.
    pub fn new(target: impl Into<String>, arguments: Vec<Value>) -> Option<Self> {
        if arguments.is_empty() {
            return None;
        }
        Some(Self {
            target: target.into(),
            arguments,
        })
    }

    pub fn to_body(&self) -> GatewayResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|err| {
            GatewayError::InvalidArgument(format!("arguments are not serializable: {err}"))
        })
    }
}

/// What a client needs to connect to a hub directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDescriptor {
    pub url: String,
    pub access_token: String,
}

#[async_trait]
pub trait HubService: Send + Sync {
    async fn broadcast(&self, hub: &str, method: &str, args: Vec<Value>) -> GatewayResult<()>;

    async fn send_to_group(
        &self,
        hub: &str,
        group: &str,
        method: &str,
        args: Vec<Value>,
    ) -> GatewayResult<()>;

    async fn send_to_user(
        &self,
        hub: &str,
        user_id: &str,
        method: &str,
        args: Vec<Value>,
    ) -> GatewayResult<()>;

    async fn add_user_to_group(&self, hub: &str, group: &str, user_id: &str) -> GatewayResult<()>;

    async fn remove_user_from_group(
        &self,
        hub: &str,
        group: &str,
        user_id: &str,
    ) -> GatewayResult<()>;

    fn get_client_connection(
        &self,
        hub: &str,
        user_id: Option<&str>,
    ) -> GatewayResult<ConnectionDescriptor>;
}

/// REST dispatcher for a single service endpoint.
///
/// Every call resolves its URI, mints a server token whose audience is that URI and
/// performs exactly one HTTP request. Nothing is retried.
#[derive(Clone)]
pub struct Dispatcher {
    client: Client,
    issuer: TokenIssuer,
    endpoints: EndpointResolver,
    metrics: Option<DispatchMetrics>,
}

impl Dispatcher {
    pub fn new(config: &ServiceConfig) -> GatewayResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.http_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|err| {
            GatewayError::Configuration(format!("Failed to build HTTP client: {err}"))
        })?;
        Self::with_client(client, config)
    }

    /// Use a shared transport, e.g. one pooled client for the whole process.
    pub fn with_client(client: Client, config: &ServiceConfig) -> GatewayResult<Self> {
        Ok(Self {
            client,
            issuer: TokenIssuer::new(config.token_config())?,
            endpoints: EndpointResolver::new(config.endpoint()),
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: DispatchMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn endpoints(&self) -> &EndpointResolver {
        &self.endpoints
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// Build the authorized request for `operation` without sending it.
    pub fn build_request(
        &self,
        operation: HubOperation,
        uri: Url,
        message: Option<&DispatchMessage>,
    ) -> GatewayResult<Request> {
        let body = message.map(DispatchMessage::to_body).transpose()?;
        let token = self.issuer.issue_server_token(uri.as_str())?;
        self.record_token(TokenKind::Server);

        let mut builder = self
            .client
            .request(operation.method(), uri)
            .header(ACCEPT, "application/json")
            .header(ACCEPT_CHARSET, "UTF-8")
            .bearer_auth(token);
        if let Some(body) = body {
            builder = builder.header(CONTENT_TYPE, JSON_CONTENT_TYPE).body(body);
        }
        Ok(builder.build()?)
    }

    async fn dispatch(
        &self,
        operation: HubOperation,
        uri: Url,
        target: Option<&str>,
        arguments: Vec<Value>,
    ) -> GatewayResult<()> {
        let message = target.and_then(|target| DispatchMessage::new(target, arguments));
        let request = self.build_request(operation, uri.clone(), message.as_ref())?;

        debug!(
            operation = operation.as_str(),
            uri = %uri,
            has_body = message.is_some(),
            "dispatching hub request"
        );
        let started = Instant::now();
        let response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(err) => {
                self.record_dispatch(operation, "transport_error", started);
                return Err(GatewayError::Transport(err));
            }
        };

        let status = response.status();
        debug!(
            operation = operation.as_str(),
            uri = %uri,
            status = status.as_u16(),
            "hub responded"
        );
        if !status.is_success() {
            self.record_dispatch(operation, "failure", started);
            return Err(GatewayError::DispatchFailure {
                uri: uri.to_string(),
                target: target.map(str::to_string),
                status,
            });
        }

        self.record_dispatch(operation, "success", started);
        Ok(())
    }

    fn record_token(&self, kind: TokenKind) {
        if let Some(metrics) = &self.metrics {
            metrics.record_token(kind.as_str());
        }
    }

    fn record_dispatch(&self, operation: HubOperation, outcome: &str, started: Instant) {
        if let Some(metrics) = &self.metrics {
            metrics.record_dispatch(
                operation.as_str(),
                outcome,
                started.elapsed().as_secs_f64(),
            );
        }
    }
}

fn require(value: &str, name: &str) -> GatewayResult<()> {
    if value.is_empty() {
        return Err(GatewayError::InvalidArgument(format!(
            "{name} must have a value provided"
        )));
    }
    Ok(())
}

#[async_trait]
impl HubService for Dispatcher {
    async fn broadcast(&self, hub: &str, method: &str, args: Vec<Value>) -> GatewayResult<()> {
        require(hub, "Hub")?;
        require(method, "TargetMethod")?;

        let uri = self.endpoints.broadcast_uri(hub)?;
        self.dispatch(HubOperation::Broadcast, uri, Some(method), args)
            .await
    }

    async fn send_to_group(
        &self,
        hub: &str,
        group: &str,
        method: &str,
        args: Vec<Value>,
    ) -> GatewayResult<()> {
        require(hub, "Hub")?;
        require(group, "Group")?;
        require(method, "TargetMethod")?;

        let uri = self.endpoints.group_uri(hub, group)?;
        self.dispatch(HubOperation::SendToGroup, uri, Some(method), args)
            .await
    }

    async fn send_to_user(
        &self,
        hub: &str,
        user_id: &str,
        method: &str,
        args: Vec<Value>,
    ) -> GatewayResult<()> {
        require(hub, "Hub")?;
        require(user_id, "UserId")?;
        require(method, "TargetMethod")?;

        let uri = self.endpoints.user_uri(hub, user_id)?;
        self.dispatch(HubOperation::SendToUser, uri, Some(method), args)
            .await
    }

    async fn add_user_to_group(&self, hub: &str, group: &str, user_id: &str) -> GatewayResult<()> {
        require(hub, "Hub")?;
        require(group, "Group")?;
        require(user_id, "UserId")?;

        let uri = self.endpoints.group_membership_uri(hub, group, user_id)?;
        self.dispatch(HubOperation::AddUserToGroup, uri, None, Vec::new())
            .await
    }

    async fn remove_user_from_group(
        &self,
        hub: &str,
        group: &str,
        user_id: &str,
    ) -> GatewayResult<()> {
        require(hub, "Hub")?;
        require(group, "Group")?;
        require(user_id, "UserId")?;

        let uri = self.endpoints.group_membership_uri(hub, group, user_id)?;
        self.dispatch(HubOperation::RemoveUserFromGroup, uri, None, Vec::new())
            .await
    }

    fn get_client_connection(
        &self,
        hub: &str,
        user_id: Option<&str>,
    ) -> GatewayResult<ConnectionDescriptor> {
        require(hub, "Hub")?;

        let access_token = self.issuer.issue_client_token(hub, user_id)?;
        self.record_token(TokenKind::Client);
        Ok(ConnectionDescriptor {
            url: self.issuer.config().client_url(hub),
            access_token,
        })
    }
}
