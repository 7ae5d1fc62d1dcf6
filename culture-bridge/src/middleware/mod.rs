pub mod handshake;
pub mod locale;

use std::sync::Arc;

use axum::{Router, middleware::from_fn_with_state};

pub use handshake::handshake_middleware;
pub use locale::locale_middleware;

use crate::services::CultureBridge;

/// Wire both culture layers around `router`
///
/// The localization layer runs first; the handshake layer inside it may override
/// the ambient culture for negotiate and connect requests.
pub fn apply_culture_bridge<S>(router: Router<S>, bridge: Arc<CultureBridge>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(from_fn_with_state(Arc::clone(&bridge), handshake_middleware))
        .layer(from_fn_with_state(bridge, locale_middleware))
}
