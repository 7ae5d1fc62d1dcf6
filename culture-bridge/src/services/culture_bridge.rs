//! Negotiate/connect orchestration
//!
//! Only the negotiate exchange still carries the page URL (through its Referer).
//! The connect exchange that follows carries nothing but the token the hub minted
//! during negotiate, so the culture is recorded against that token on the way out
//! of negotiate and restored from it on the way into connect.

use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    response::Response,
};

use super::body_capture::{CapturedResponse, buffer_request};
use super::correlation_store::{CorrelationStore, build_store, restore_culture};
use super::culture_extractor::CultureExtractor;
use super::culture_provider::{
    ConnectCultureProvider, NegotiateCultureProvider, RequestLocalization, UrlCultureProvider,
};
use super::handshake::{HandshakePhase, HandshakeRoute, connection_token};
use crate::config::Config;
use crate::utils::{ApiResult, CultureTag, current_culture, with_culture};

pub struct CultureBridge {
    extractor: CultureExtractor,
    route: HandshakeRoute,
    store: Arc<dyn CorrelationStore>,
    localization: RequestLocalization,
    default_culture: CultureTag,
    max_request_body_bytes: usize,
}

impl CultureBridge {
    /// Bridge using the correlation backing selected by `config`
    pub fn from_config(config: &Config) -> ApiResult<Self> {
        Self::with_store(config, build_store(&config.correlation))
    }

    /// Bridge over an explicit correlation backing
    ///
    /// Fails fast on an invalid localization section.
    pub fn with_store(config: &Config, store: Arc<dyn CorrelationStore>) -> ApiResult<Self> {
        let localization_config = &config.localization;
        let supported = localization_config.supported()?;
        let default_culture = localization_config.default_culture()?;
        let base_path = localization_config.normalized_base_path();

        let extractor = CultureExtractor::new(supported, base_path.clone());
        let route = HandshakeRoute::new(base_path, localization_config.normalized_hub_path());

        let localization = RequestLocalization::new(default_culture.clone())
            .with_provider(UrlCultureProvider::new(extractor.clone()))
            .with_provider(NegotiateCultureProvider::new(extractor.clone(), route.clone()))
            .with_provider(ConnectCultureProvider::new(
                route.clone(),
                Arc::clone(&store),
                extractor.supported().clone(),
            ));

        tracing::info!(
            "Culture bridge ready: hub '/{}', {:?} correlation, default culture {}",
            route.hub_path(),
            store.strategy(),
            default_culture
        );

        Ok(Self {
            extractor,
            route,
            store,
            localization,
            default_culture,
            max_request_body_bytes: localization_config.max_request_body_bytes,
        })
    }

    pub fn localization(&self) -> &RequestLocalization {
        &self.localization
    }

    pub fn classify(&self, req: &Request) -> HandshakePhase {
        self.route.classify(req.method(), req.uri())
    }

    /// Run `downstream` for `req`, intercepting the handshake exchanges
    pub async fn dispatch<F, Fut>(&self, req: Request, downstream: F) -> ApiResult<Response>
    where
        F: FnOnce(Request) -> Fut,
        Fut: Future<Output = Response>,
    {
        match self.classify(&req) {
            HandshakePhase::Negotiate => self.negotiate(req, downstream).await,
            HandshakePhase::Connect => self.connect(req, downstream).await,
            HandshakePhase::PassThrough => Ok(downstream(req).await),
        }
    }

    /// Record the page culture against the token the hub mints
    ///
    /// The response reaching the caller carries the downstream bytes unchanged;
    /// the cookie backing only adds a `Set-Cookie` header.
    async fn negotiate<F, Fut>(&self, req: Request, downstream: F) -> ApiResult<Response>
    where
        F: FnOnce(Request) -> Fut,
        Fut: Future<Output = Response>,
    {
        let culture = self
            .extractor
            .from_referer_header(req.headers())
            .or_else(current_culture)
            .unwrap_or_else(|| self.default_culture.clone());
        let request_headers: HeaderMap = req.headers().clone();

        let req = buffer_request(req, self.max_request_body_bytes).await?;

        let mut captured = with_culture(culture.clone(), async move {
            CapturedResponse::capture(downstream(req).await).await
        })
        .await;

        if !captured.status().is_success() {
            tracing::debug!("Negotiate answered {}, nothing to correlate", captured.status());
            return Ok(captured.replay());
        }

        let Some(body) = captured.negotiate_body() else {
            tracing::warn!(
                "Negotiate response carries no readable negotiate payload, culture not correlated"
            );
            return Ok(captured.replay());
        };

        let token = body.require_token()?;
        self.store.put(&request_headers, captured.headers_mut(), token.clone(), culture.clone())?;
        tracing::info!(
            "Correlated connection token {} with culture {} (negotiate v{})",
            token,
            culture,
            body.negotiate_version
        );

        Ok(captured.replay())
    }

    /// Restore the culture recorded for the connect request's token
    async fn connect<F, Fut>(&self, req: Request, downstream: F) -> ApiResult<Response>
    where
        F: FnOnce(Request) -> Fut,
        Fut: Future<Output = Response>,
    {
        let token = connection_token(req.uri())?;

        let restored =
            restore_culture(self.store.as_ref(), self.extractor.supported(), req.headers(), &token)?;

        let response = match restored {
            Some(culture) => {
                tracing::info!("Restoring culture {} for connection token {}", culture, token);
                with_culture(culture, downstream(req)).await
            },
            None => {
                tracing::debug!("No culture recorded for connection token {}", token);
                downstream(req).await
            },
        };

        if is_established(response.status()) {
            self.store.remove(&token);
        }

        Ok(response)
    }
}

/// Transport accepted: WebSocket upgrade, or a plain 200 for non-upgrading transports
fn is_established(status: StatusCode) -> bool {
    status == StatusCode::SWITCHING_PROTOCOLS || status == StatusCode::OK
}
