//! Minimal hub endpoints standing in for a realtime framework's handshake

use axum::{Extension, Json};
use rust_i18n::t;
use serde::Serialize;

use crate::services::BufferedRequestBody;
use crate::utils::{current_culture, current_locale};

#[derive(Debug, Serialize)]
pub struct NegotiateResponse {
    #[serde(rename = "negotiateVersion")]
    pub negotiate_version: i32,
    #[serde(rename = "connectionToken")]
    pub connection_token: String,
    #[serde(rename = "availableTransports")]
    pub available_transports: Vec<String>,
}

/// Mint a connection token
pub async fn negotiate(body: Option<Extension<BufferedRequestBody>>) -> Json<NegotiateResponse> {
    if let Some(Extension(BufferedRequestBody(bytes))) = body {
        tracing::debug!("Negotiate request body: {} bytes", bytes.len());
    }

    let token = uuid::Uuid::new_v4().simple().to_string();
    tracing::info!(
        "Minted connection token {} under culture {:?}",
        token,
        current_culture().map(|c| c.to_string())
    );

    Json(NegotiateResponse {
        negotiate_version: 1,
        connection_token: token,
        available_transports: vec!["WebSockets".to_string(), "LongPolling".to_string()],
    })
}

/// Accept the transport connection and report the culture it runs under
pub async fn connect() -> String {
    let locale = current_locale();
    let culture = current_culture().map(|c| c.to_string()).unwrap_or_else(|| locale.clone());

    t!("page.circuit_connected", locale = &locale, culture = culture).to_string()
}
