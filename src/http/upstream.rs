//! Backend forwarding.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the resolved backend
//! - Strip hop-by-hop headers, set Host and X-Forwarded-*
//! - Bound the backend exchange with a timeout
//! - Relay the backend response untouched (streamed)
//!
//! # Design Decisions
//! - One pooled client shared by all requests
//! - No retries: a failed exchange is terminal for the request
//! - Dropping the future (client went away) drops the backend call

use std::error::Error as _;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{
        header::{self, HeaderMap, HeaderName, HeaderValue},
        uri::{PathAndQuery, Uri},
        Request, Response, Version,
    },
};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::TimeoutConfig;
use crate::error::GatewayError;
use crate::routing::RouteEntry;

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// Headers meaningful only for a single connection.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// HTTP client for backend calls.
#[derive(Clone)]
pub struct Upstream {
    client: Client<HttpConnector, Body>,
    timeout: Duration,
}

impl Upstream {
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(timeouts.idle_secs))
            .build(connector);

        Self {
            client,
            timeout: Duration::from_secs(timeouts.upstream_secs),
        }
    }

    /// Forward `request` to the backend of `route` and return its response.
    pub async fn forward(
        &self,
        route: &RouteEntry,
        request: Request<Body>,
    ) -> Result<Response<Body>, GatewayError> {
        let outbound = prepare_request(route, request)?;

        let response = match tokio::time::timeout(self.timeout, self.client.request(outbound)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::error!(
                    route = route.name(),
                    backend = %route.backend(),
                    connect = e.is_connect(),
                    error = %e,
                    cause = ?e.source(),
                    "Upstream error"
                );
                let cause = match e.source() {
                    Some(source) => format!("{e}: {source}"),
                    None => e.to_string(),
                };
                return Err(GatewayError::BackendUnreachable(cause));
            }
            Err(_) => {
                tracing::error!(
                    route = route.name(),
                    backend = %route.backend(),
                    timeout_secs = self.timeout.as_secs(),
                    "Upstream timed out"
                );
                return Err(GatewayError::BackendTimeout);
            }
        };

        Ok(relay(response))
    }
}

fn relay(response: Response<Incoming>) -> Response<Body> {
    let (parts, body) = response.into_parts();
    Response::from_parts(parts, Body::new(body))
}

/// Absolute backend URI for an inbound URI that matched `route`.
pub fn target_uri(route: &RouteEntry, inbound: &Uri) -> Result<Uri, GatewayError> {
    let backend = route.backend();
    let mut path = route.forward_path(inbound.path());
    if let Some(query) = inbound.query() {
        path.push('?');
        path.push_str(query);
    }

    let path_and_query = PathAndQuery::try_from(path)
        .map_err(|e| GatewayError::BackendUnreachable(format!("invalid upstream path: {e}")))?;

    Uri::builder()
        .scheme(backend.scheme())
        .authority(backend_authority(route))
        .path_and_query(path_and_query)
        .build()
        .map_err(|e| GatewayError::BackendUnreachable(format!("invalid upstream uri: {e}")))
}

fn backend_authority(route: &RouteEntry) -> String {
    let backend = route.backend();
    let host = backend.host_str().unwrap_or_default();
    match backend.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

/// Rewrite an inbound request into the request sent to the backend.
pub fn prepare_request(route: &RouteEntry, request: Request<Body>) -> Result<Request<Body>, GatewayError> {
    let client_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let (mut parts, body) = request.into_parts();
    parts.uri = target_uri(route, &parts.uri)?;
    parts.version = Version::HTTP_11;

    strip_hop_by_hop(&mut parts.headers);
    add_forwarded_headers(&mut parts.headers, client_addr);

    let authority = backend_authority(route);
    let host = HeaderValue::from_str(&authority)
        .map_err(|e| GatewayError::BackendUnreachable(format!("invalid backend host: {e}")))?;
    parts.headers.insert(header::HOST, host);

    Ok(Request::from_parts(parts, body))
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    let fixed = HOP_BY_HOP;
    for name in named.iter().chain(fixed.iter()) {
        headers.remove(name);
    }
}

fn add_forwarded_headers(headers: &mut HeaderMap, client_addr: Option<SocketAddr>) {
    if let Some(addr) = client_addr {
        let ip = addr.ip().to_string();
        let value = match headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
            Some(existing) => format!("{existing}, {ip}"),
            None => ip,
        };
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(X_FORWARDED_FOR, value);
        }
    }

    if !headers.contains_key(&X_FORWARDED_HOST) {
        if let Some(host) = headers.get(header::HOST).cloned() {
            headers.insert(X_FORWARDED_HOST, host);
        }
    }

    if !headers.contains_key(&X_FORWARDED_PROTO) {
        headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static("http"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn route(backend: &str) -> RouteEntry {
        RouteEntry::new("booking-service", "/api/bookings/", Url::parse(backend).unwrap())
    }

    #[test]
    fn target_keeps_path_and_query() {
        let uri: Uri = "/api/bookings/9?from=2024-01-01&to=2024-02-01".parse().unwrap();
        let target = target_uri(&route("http://localhost:3004"), &uri).unwrap();
        assert_eq!(
            target.to_string(),
            "http://localhost:3004/api/bookings/9?from=2024-01-01&to=2024-02-01"
        );
    }

    #[test]
    fn target_without_port_uses_host_only() {
        let uri: Uri = "/api/bookings/".parse().unwrap();
        let target = target_uri(&route("http://bookings.internal"), &uri).unwrap();
        assert_eq!(target.to_string(), "http://bookings.internal/api/bookings/");
    }

    #[test]
    fn prepare_rewrites_host_and_strips_hop_headers() {
        let mut request = Request::builder()
            .uri("http://gateway.example/api/bookings/1")
            .header(header::HOST, "gateway.example")
            .header(header::CONNECTION, "keep-alive, x-debug-trace")
            .header("keep-alive", "timeout=5")
            .header("x-debug-trace", "1")
            .header(header::PROXY_AUTHORIZATION, "Basic abc")
            .header(header::AUTHORIZATION, "Bearer t")
            .header("x-user-id", "42")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo("10.1.2.3:5555".parse::<SocketAddr>().unwrap()));

        let out = prepare_request(&route("http://127.0.0.1:3004"), request).unwrap();
        let headers = out.headers();

        assert_eq!(out.uri().to_string(), "http://127.0.0.1:3004/api/bookings/1");
        assert_eq!(out.version(), Version::HTTP_11);
        assert_eq!(headers[header::HOST], "127.0.0.1:3004");
        assert!(headers.get(header::CONNECTION).is_none());
        assert!(headers.get("keep-alive").is_none());
        assert!(headers.get("x-debug-trace").is_none());
        assert!(headers.get(header::PROXY_AUTHORIZATION).is_none());
        assert_eq!(headers[header::AUTHORIZATION], "Bearer t");
        assert_eq!(headers["x-user-id"], "42");
        assert_eq!(headers[X_FORWARDED_FOR], "10.1.2.3");
        assert_eq!(headers[X_FORWARDED_HOST], "gateway.example");
        assert_eq!(headers[X_FORWARDED_PROTO], "http");
    }

    #[test]
    fn forwarded_for_is_appended() {
        let mut request = Request::builder()
            .uri("/api/bookings/1")
            .header(X_FORWARDED_FOR, "203.0.113.7")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo("10.0.0.5:4000".parse::<SocketAddr>().unwrap()));

        let out = prepare_request(&route("http://127.0.0.1:3004"), request).unwrap();
        assert_eq!(out.headers()[X_FORWARDED_FOR], "203.0.113.7, 10.0.0.5");
    }
}
