//! Path-segment localization that survives a realtime negotiate/connect handshake
//!
//! Pages pick their culture from the first URL segment (`/fr/home`). The hub's
//! negotiate request still carries that page in its Referer, but the connect
//! request that follows only carries an opaque connection token. The bridge
//! records token→culture on negotiate and restores it on connect.

rust_i18n::i18n!("locales", fallback = "en");

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::{
    Router,
    routing::{any, post},
};

pub use config::Config;
pub use middleware::apply_culture_bridge;
pub use services::CultureBridge;
pub use utils::{ApiError, ApiResult, CultureTag, current_culture, with_culture};

/// Demo application: localized pages plus hub endpoints, wrapped by the bridge
pub fn app(config: &Config, bridge: Arc<CultureBridge>) -> Router {
    let hub = config.localization.normalized_hub_path();

    let routes = Router::new()
        .route(&format!("/{}/negotiate", hub), post(handlers::hub::negotiate))
        .route(&format!("/{}", hub), any(handlers::hub::connect))
        .fallback(handlers::page::render);

    let base_path = config.localization.normalized_base_path();
    let routes = if base_path.is_empty() { routes } else { Router::new().nest(&base_path, routes) };

    apply_culture_bridge(routes, bridge)
}
