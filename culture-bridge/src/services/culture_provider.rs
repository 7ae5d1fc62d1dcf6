//! Request culture providers and the localization pipeline they plug into
//!
//! Providers only observe the request. Installing the ambient culture is left to
//! the middleware layers.

use std::sync::Arc;

use axum::extract::Request;

use super::correlation_store::{CorrelationStore, restore_culture};
use super::culture_extractor::CultureExtractor;
use super::handshake::{HandshakePhase, HandshakeRoute, connection_token};
use crate::utils::{ApiResult, CultureTag, SupportedCultures};

/// `(request) -> culture?`; `Ok(None)` means "no opinion"
pub trait RequestCultureProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn determine_culture(&self, req: &Request) -> ApiResult<Option<CultureTag>>;
}

/// Culture from the first segment of the request path, e.g. `/fr/home`
pub struct UrlCultureProvider {
    extractor: CultureExtractor,
}

impl UrlCultureProvider {
    pub fn new(extractor: CultureExtractor) -> Self {
        Self { extractor }
    }
}

impl RequestCultureProvider for UrlCultureProvider {
    fn name(&self) -> &'static str {
        "url"
    }

    fn determine_culture(&self, req: &Request) -> ApiResult<Option<CultureTag>> {
        Ok(self.extractor.from_path(req.uri().path()))
    }
}

/// Culture of the page that opened the hub, read from the negotiate request's Referer
pub struct NegotiateCultureProvider {
    extractor: CultureExtractor,
    route: HandshakeRoute,
}

impl NegotiateCultureProvider {
    pub fn new(extractor: CultureExtractor, route: HandshakeRoute) -> Self {
        Self { extractor, route }
    }
}

impl RequestCultureProvider for NegotiateCultureProvider {
    fn name(&self) -> &'static str {
        "negotiate-referer"
    }

    fn determine_culture(&self, req: &Request) -> ApiResult<Option<CultureTag>> {
        if self.route.classify(req.method(), req.uri()) != HandshakePhase::Negotiate {
            return Ok(None);
        }
        Ok(self.extractor.from_referer_header(req.headers()))
    }
}

/// Culture recorded for the connect request's token; reads the store, never writes it
pub struct ConnectCultureProvider {
    route: HandshakeRoute,
    store: Arc<dyn CorrelationStore>,
    supported: SupportedCultures,
}

impl ConnectCultureProvider {
    pub fn new(
        route: HandshakeRoute,
        store: Arc<dyn CorrelationStore>,
        supported: SupportedCultures,
    ) -> Self {
        Self { route, store, supported }
    }
}

impl RequestCultureProvider for ConnectCultureProvider {
    fn name(&self) -> &'static str {
        "connect-token"
    }

    fn determine_culture(&self, req: &Request) -> ApiResult<Option<CultureTag>> {
        if self.route.classify(req.method(), req.uri()) != HandshakePhase::Connect {
            return Ok(None);
        }
        // A missing id is reported by the handshake middleware, not here
        let Ok(token) = connection_token(req.uri()) else {
            return Ok(None);
        };
        restore_culture(self.store.as_ref(), &self.supported, req.headers(), &token)
    }
}

/// Ordered providers with a default fallback
pub struct RequestLocalization {
    providers: Vec<Box<dyn RequestCultureProvider>>,
    default_culture: CultureTag,
}

impl RequestLocalization {
    pub fn new(default_culture: CultureTag) -> Self {
        Self { providers: Vec::new(), default_culture }
    }

    pub fn with_provider(mut self, provider: impl RequestCultureProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// First provider with an opinion wins; otherwise the default culture
    pub fn resolve(&self, req: &Request) -> ApiResult<CultureTag> {
        for provider in &self.providers {
            if let Some(culture) = provider.determine_culture(req)? {
                tracing::debug!(
                    "Culture {} for {} {} from provider '{}'",
                    culture,
                    req.method(),
                    req.uri().path(),
                    provider.name()
                );
                return Ok(culture);
            }
        }

        Ok(self.default_culture.clone())
    }
}
