// Common test utilities and helpers

use std::sync::Arc;

use axum::{
    Extension, Router,
    body::{Body, Bytes},
    extract::Request,
    http::{HeaderMap, HeaderValue, Method, header},
    response::{IntoResponse, Response},
    routing::{any, post},
};
use tower::ServiceExt;

use crate::config::{Config, CorrelationStrategy};
use crate::middleware::apply_culture_bridge;
use crate::services::{BufferedRequestBody, CultureBridge, MemoryCorrelationStore};
use crate::utils::current_culture;

pub const COOKIE_NAME: &str = ".App.CircuitCulture";

/// Header the negotiate stub reads the token to mint from; absent means "mint none"
pub const MINT_TOKEN: &str = "x-mint-token";
/// Header the stubs use to report the ambient culture they ran under
pub const AMBIENT: &str = "x-ambient-culture";
/// Header the negotiate stub sets when the body extension matches the body it read
pub const REREADABLE: &str = "x-body-rereadable";

pub fn test_config(strategy: CorrelationStrategy) -> Config {
    let mut config = Config::default();
    config.correlation.strategy = strategy;
    config
}

/// Router over an in-memory store the test can inspect
pub fn memory_router() -> (Router, Arc<MemoryCorrelationStore>) {
    let config = test_config(CorrelationStrategy::Memory);
    let store = Arc::new(MemoryCorrelationStore::new());
    let bridge = CultureBridge::with_store(&config, store.clone()).expect("Failed to build bridge");
    (stub_router(Arc::new(bridge)), store)
}

pub fn cookie_router() -> Router {
    let config = test_config(CorrelationStrategy::Cookie);
    let bridge = CultureBridge::from_config(&config).expect("Failed to build bridge");
    stub_router(Arc::new(bridge))
}

/// Hub stand-ins wrapped by the bridge layers
pub fn stub_router(bridge: Arc<CultureBridge>) -> Router {
    let routes = Router::new()
        .route("/_blazor/negotiate", post(negotiate_stub))
        .route("/_blazor", any(connect_stub))
        .fallback(connect_stub);
    apply_culture_bridge(routes, bridge)
}

pub fn negotiate_body(token: &str) -> String {
    format!(r#"{{"negotiateVersion":1,"connectionToken":"{}","availableTransports":[]}}"#, token)
}

async fn negotiate_stub(
    Extension(BufferedRequestBody(buffered)): Extension<BufferedRequestBody>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let payload = match headers.get(MINT_TOKEN).and_then(|v| v.to_str().ok()) {
        Some(token) => negotiate_body(token),
        None => r#"{"negotiateVersion":1}"#.to_string(),
    };

    let mut response = ([(header::CONTENT_TYPE, "application/json")], payload).into_response();
    tag_ambient(&mut response);
    if buffered == body {
        response.headers_mut().insert(REREADABLE, HeaderValue::from_static("true"));
    }
    response
}

async fn connect_stub() -> Response {
    let culture = current_culture().map(|c| c.to_string()).unwrap_or_default();
    let mut response = culture.into_response();
    tag_ambient(&mut response);
    response
}

fn tag_ambient(response: &mut Response) {
    if let Some(culture) = current_culture()
        && let Ok(value) = HeaderValue::from_str(culture.as_str())
    {
        response.headers_mut().insert(AMBIENT, value);
    }
}

pub fn negotiate_request(referer: Option<&str>, token: Option<&str>, cookie: Option<&str>) -> Request {
    let mut builder = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/_blazor/negotiate?negotiateVersion=1");
    if let Some(referer) = referer {
        builder = builder.header(header::REFERER, referer);
    }
    if let Some(token) = token {
        builder = builder.header(MINT_TOKEN, token);
    }
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from("{}")).expect("Failed to build negotiate request")
}

pub fn connect_request(method: Method, query: &str, cookie: Option<&str>) -> Request {
    let mut builder = axum::http::Request::builder().method(method).uri(format!("/_blazor?{}", query));
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("Failed to build connect request")
}

pub async fn send(router: &Router, req: Request) -> Response {
    router.clone().oneshot(req).await.expect("Router is infallible")
}

pub async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8(bytes.to_vec()).expect("Body is not UTF-8")
}

pub fn header_str<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

/// `name=value` part of the correlation `Set-Cookie`, as a browser would echo it
pub fn echoed_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(COOKIE_NAME))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}
