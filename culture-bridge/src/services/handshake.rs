//! Classification of requests against the realtime hub's two-phase handshake

use std::collections::HashMap;

use axum::{
    extract::Query,
    http::{Method, Uri},
};

use super::culture_extractor::{path_segments, strip_base_path};
use crate::models::ConnectionToken;
use crate::utils::{ApiError, ApiResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakePhase {
    /// Not part of the handshake; delegated untouched
    PassThrough,
    /// `POST <hub>/negotiate`: the hub mints a connection token
    Negotiate,
    /// `GET|CONNECT <hub>?id=<token>`: transport connection identified only by the token
    Connect,
}

/// Where the hub is mounted
#[derive(Debug, Clone)]
pub struct HandshakeRoute {
    base_path: String,
    hub_path: String,
}

impl HandshakeRoute {
    /// `base_path` is the application prefix ("" or "/app1"), `hub_path` the hub segment ("_blazor")
    pub fn new(base_path: impl Into<String>, hub_path: impl Into<String>) -> Self {
        Self { base_path: base_path.into(), hub_path: hub_path.into() }
    }

    pub fn hub_path(&self) -> &str {
        &self.hub_path
    }

    pub fn classify(&self, method: &Method, uri: &Uri) -> HandshakePhase {
        let path = strip_base_path(uri.path(), &self.base_path);
        let segments: Vec<&str> = path_segments(path).collect();

        match segments.as_slice() {
            [hub, "negotiate"] if *hub == self.hub_path && method == Method::POST => {
                HandshakePhase::Negotiate
            },
            [hub]
                if *hub == self.hub_path
                    && uri.query().is_some()
                    && is_connect_method(method) =>
            {
                HandshakePhase::Connect
            },
            _ => HandshakePhase::PassThrough,
        }
    }
}

/// WebSocket upgrade over HTTP/1.1 is a GET; over HTTP/2 it is an extended CONNECT
fn is_connect_method(method: &Method) -> bool {
    method == Method::GET || method == Method::CONNECT
}

/// Token carried by the `id` query parameter of a connect request
pub fn connection_token(uri: &Uri) -> ApiResult<ConnectionToken> {
    let Query(params) = Query::<HashMap<String, String>>::try_from_uri(uri)
        .map_err(|err| ApiError::invalid_operation(format!("unreadable query string: {}", err)))?;

    match params.get("id") {
        Some(id) if !id.is_empty() => Ok(ConnectionToken::new(id.as_str())),
        _ => Err(ApiError::invalid_operation("connect request carries no 'id' query parameter")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(route: &HandshakeRoute, method: Method, uri: &str) -> HandshakePhase {
        route.classify(&method, &uri.parse().unwrap())
    }

    #[test]
    fn test_classify() {
        let route = HandshakeRoute::new("", "_blazor");

        assert_eq!(classify(&route, Method::POST, "/_blazor/negotiate"), HandshakePhase::Negotiate);
        assert_eq!(
            classify(&route, Method::POST, "/_blazor/negotiate?negotiateVersion=1"),
            HandshakePhase::Negotiate
        );
        assert_eq!(classify(&route, Method::GET, "/_blazor/negotiate"), HandshakePhase::PassThrough);

        assert_eq!(classify(&route, Method::GET, "/_blazor?id=T1"), HandshakePhase::Connect);
        assert_eq!(classify(&route, Method::CONNECT, "/_blazor?id=T1"), HandshakePhase::Connect);
        assert_eq!(classify(&route, Method::GET, "/_blazor"), HandshakePhase::PassThrough);
        assert_eq!(classify(&route, Method::POST, "/_blazor?id=T1"), HandshakePhase::PassThrough);

        assert_eq!(classify(&route, Method::GET, "/fr/home"), HandshakePhase::PassThrough);
        assert_eq!(classify(&route, Method::POST, "/_blazor/disconnect"), HandshakePhase::PassThrough);
        assert_eq!(classify(&route, Method::POST, "/x/_blazor/negotiate"), HandshakePhase::PassThrough);
    }

    #[test]
    fn test_classify_under_base_path() {
        let route = HandshakeRoute::new("/app1", "_blazor");
        assert_eq!(classify(&route, Method::POST, "/app1/_blazor/negotiate"), HandshakePhase::Negotiate);
        assert_eq!(classify(&route, Method::GET, "/app1/_blazor?id=T1"), HandshakePhase::Connect);
    }

    #[test]
    fn test_connection_token() {
        let uri: Uri = "/_blazor?id=LNjX__7I60EexjX7yLB8zA".parse().unwrap();
        assert_eq!(connection_token(&uri).unwrap().as_str(), "LNjX__7I60EexjX7yLB8zA");

        let uri: Uri = "/_blazor?id=a%2Bb".parse().unwrap();
        assert_eq!(connection_token(&uri).unwrap().as_str(), "a+b");

        for missing in ["/_blazor?other=1", "/_blazor?id=", "/_blazor"] {
            let uri: Uri = missing.parse().unwrap();
            assert!(matches!(connection_token(&uri), Err(ApiError::InvalidOperation(_))));
        }
    }
}
