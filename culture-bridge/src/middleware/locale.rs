//! Request localization middleware
//!
//! Resolves the request culture through the provider pipeline and installs it
//! as the ambient culture for the rest of the chain.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderValue, header::CONTENT_LANGUAGE},
    middleware::Next,
    response::Response,
};

use crate::services::CultureBridge;
use crate::utils::{ApiResult, with_culture};

/// Middleware resolving the culture from the path, Referer or connection token
pub async fn locale_middleware(
    State(bridge): State<Arc<CultureBridge>>,
    req: Request,
    next: Next,
) -> ApiResult<Response> {
    let culture = bridge.localization().resolve(&req)?;

    let mut response = with_culture(culture.clone(), next.run(req)).await;

    if !response.headers().contains_key(CONTENT_LANGUAGE)
        && let Ok(value) = HeaderValue::from_str(culture.as_str())
    {
        response.headers_mut().insert(CONTENT_LANGUAGE, value);
    }

    Ok(response)
}
