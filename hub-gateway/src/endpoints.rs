use reqwest::Url;

use crate::error::{GatewayError, GatewayResult};

/// Builds the management REST URIs for hub operations.
///
/// Segments are inserted verbatim; only the URL parser's own normalization applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointResolver {
    base: String,
}

impl EndpointResolver {
    /// `base` is the service endpoint without a trailing slash.
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn broadcast_uri(&self, hub: &str) -> GatewayResult<Url> {
        self.resolve(format!("/api/v1/hubs/{hub}"))
    }

    pub fn group_uri(&self, hub: &str, group: &str) -> GatewayResult<Url> {
        self.resolve(format!("/api/v1/hubs/{hub}/groups/{group}"))
    }

    pub fn user_uri(&self, hub: &str, user_id: &str) -> GatewayResult<Url> {
        self.resolve(format!("/api/v1/hubs/{hub}/users/{user_id}"))
    }

    /// Shared by add and remove; the HTTP method selects the semantics.
    pub fn group_membership_uri(
        &self,
        hub: &str,
        group: &str,
        user_id: &str,
    ) -> GatewayResult<Url> {
        self.resolve(format!("/api/v1/hubs/{hub}/groups/{group}/users/{user_id}"))
    }

    fn resolve(&self, path: String) -> GatewayResult<Url> {
        let raw = format!("{}{}", self.base, path);
        Url::parse(&raw)
            .map_err(|err| GatewayError::Configuration(format!("Invalid hub URI '{raw}': {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> EndpointResolver {
        EndpointResolver::new("https://hub.example.com")
    }

    #[test]
    fn resolves_operation_uris() {
        let resolver = resolver();
        assert_eq!(
            resolver.broadcast_uri("chat").expect("uri").as_str(),
            "https://hub.example.com/api/v1/hubs/chat"
        );
        assert_eq!(
            resolver.group_uri("chat", "team1").expect("uri").as_str(),
            "https://hub.example.com/api/v1/hubs/chat/groups/team1"
        );
        assert_eq!(
            resolver.user_uri("chat", "u1").expect("uri").as_str(),
            "https://hub.example.com/api/v1/hubs/chat/users/u1"
        );
        assert_eq!(
            resolver
                .group_membership_uri("chat", "team1", "u1")
                .expect("uri")
                .as_str(),
            "https://hub.example.com/api/v1/hubs/chat/groups/team1/users/u1"
        );
    }

    #[test]
    fn membership_uri_is_stable_across_calls() {
        let resolver = resolver();
        for (hub, group, user) in [
            ("chat", "team1", "u1"),
            ("Hub", "G-2", "user_3"),
            ("a", "b", "c"),
        ] {
            let add = resolver.group_membership_uri(hub, group, user).expect("add");
            let remove = resolver.group_membership_uri(hub, group, user).expect("remove");
            assert_eq!(add, remove);
        }
    }

    #[test]
    fn segments_keep_their_case() {
        let uri = resolver().group_uri("Chat", "TeamA").expect("uri");
        assert_eq!(uri.path(), "/api/v1/hubs/Chat/groups/TeamA");
    }

    #[test]
    fn base_path_is_preserved() {
        let uri = EndpointResolver::new("http://localhost:8080/signalr")
            .broadcast_uri("chat")
            .expect("uri");
        assert_eq!(uri.as_str(), "http://localhost:8080/signalr/api/v1/hubs/chat");
    }

    #[test]
    fn malformed_base_is_a_configuration_error() {
        let err = EndpointResolver::new("no-scheme")
            .broadcast_uri("chat")
            .expect_err("bad base");
        assert!(matches!(err, GatewayError::Configuration(_)));
    }
}
