use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::services::CultureBridge;
use crate::utils::ApiResult;

/// Negotiate/connect interception; everything else passes straight through
pub async fn handshake_middleware(
    State(bridge): State<Arc<CultureBridge>>,
    req: Request,
    next: Next,
) -> ApiResult<Response> {
    tracing::debug!(
        "Handshake middleware: {} {} -> {:?}",
        req.method(),
        req.uri(),
        bridge.classify(&req)
    );

    bridge.dispatch(req, |req| next.run(req)).await
}
