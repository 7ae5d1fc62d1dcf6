//! Token→culture correlation between the negotiate and connect exchanges
//!
//! Two interchangeable backings sit behind [`CorrelationStore`]:
//! - [`MemoryCorrelationStore`]: process-wide concurrent map, entries removed once
//!   the connect exchange succeeds
//! - [`CookieCorrelationStore`]: the whole ordered mapping travels in a client-held
//!   cookie and expires through Max-Age; `remove` is a no-op
//!
//! The cookie backing has no cross-request atomicity: two negotiates from the same
//! client that both read the cookie before either response lands can lose one entry.

use std::fmt;
use std::sync::Arc;

use axum::http::{
    HeaderMap, HeaderValue,
    header::{COOKIE, SET_COOKIE},
};
use dashmap::DashMap;

use crate::config::{CorrelationConfig, CorrelationStrategy};
use crate::models::{ConnectionToken, CorrelationMap};
use crate::utils::{ApiError, ApiResult, CultureTag, SupportedCultures};

/// Persistence seam for token→culture correlations
///
/// `request` carries the inbound headers of the current exchange and `response`
/// the headers that will be sent back, so client-held backings can read and
/// rewrite their state; server-held backings ignore both.
pub trait CorrelationStore: Send + Sync + fmt::Debug {
    fn strategy(&self) -> CorrelationStrategy;

    /// Upsert: the last negotiate for a token wins
    fn put(
        &self,
        request: &HeaderMap,
        response: &mut HeaderMap,
        token: ConnectionToken,
        culture: CultureTag,
    ) -> ApiResult<()>;

    /// Look a token up without mutating its mapped culture
    fn get(&self, request: &HeaderMap, token: &ConnectionToken) -> ApiResult<Option<CultureTag>>;

    /// Drop a token after a successful connect; backings that expire on their own do nothing
    fn remove(&self, token: &ConnectionToken);
}

/// Build the backing selected by configuration
pub fn build_store(config: &CorrelationConfig) -> Arc<dyn CorrelationStore> {
    match config.strategy {
        CorrelationStrategy::Memory => Arc::new(MemoryCorrelationStore::new()),
        CorrelationStrategy::Cookie => Arc::new(CookieCorrelationStore::from_config(config)),
    }
}

/// Culture recorded for `token`, restricted to `supported`
///
/// A recorded culture outside the supported set is "no opinion": the client-held
/// backing can carry anything, and the default culture applies instead.
pub fn restore_culture(
    store: &dyn CorrelationStore,
    supported: &SupportedCultures,
    request: &HeaderMap,
    token: &ConnectionToken,
) -> ApiResult<Option<CultureTag>> {
    let Some(recorded) = store.get(request, token)? else {
        return Ok(None);
    };

    match supported.find(recorded.as_str()) {
        Some(culture) => Ok(Some(culture.clone())),
        None => {
            tracing::warn!(
                "Ignoring unsupported culture {} recorded for connection token {}",
                recorded,
                token
            );
            Ok(None)
        },
    }
}

// ============================================================================
// In-memory backing
// ============================================================================

/// Thread-safe token→culture map shared by every in-flight request
///
/// DashMap shards serialize conflicting accesses per key; callers never lock.
#[derive(Debug, Default)]
pub struct MemoryCorrelationStore {
    cultures: DashMap<ConnectionToken, CultureTag>,
}

impl MemoryCorrelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, token: ConnectionToken, culture: CultureTag) {
        if let Some(previous) = self.cultures.insert(token.clone(), culture) {
            tracing::debug!("Connection token {} re-negotiated (was {})", token, previous);
        }
    }

    pub fn lookup(&self, token: &str) -> Option<CultureTag> {
        self.cultures.get(token).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.cultures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cultures.is_empty()
    }
}

impl CorrelationStore for MemoryCorrelationStore {
    fn strategy(&self) -> CorrelationStrategy {
        CorrelationStrategy::Memory
    }

    fn put(
        &self,
        _request: &HeaderMap,
        _response: &mut HeaderMap,
        token: ConnectionToken,
        culture: CultureTag,
    ) -> ApiResult<()> {
        self.insert(token, culture);
        Ok(())
    }

    fn get(&self, _request: &HeaderMap, token: &ConnectionToken) -> ApiResult<Option<CultureTag>> {
        Ok(self.lookup(token.as_str()))
    }

    fn remove(&self, token: &ConnectionToken) {
        if self.cultures.remove(token.as_str()).is_some() {
            tracing::debug!("Released connection token {}", token);
        }
    }
}

// ============================================================================
// Cookie backing
// ============================================================================

/// Client-held correlation map, serialized as a URL-encoded JSON array of
/// `{"Key":token,"Value":culture}` pairs
#[derive(Debug, Clone)]
pub struct CookieCorrelationStore {
    name: String,
    max_age_secs: u64,
    path: String,
    secure: bool,
}

impl CookieCorrelationStore {
    pub fn new(name: impl Into<String>, max_age_secs: u64) -> Self {
        Self { name: name.into(), max_age_secs, path: "/".to_string(), secure: false }
    }

    pub fn from_config(config: &CorrelationConfig) -> Self {
        Self {
            name: config.cookie_name.trim().to_string(),
            max_age_secs: config.cookie_max_age,
            path: config.cookie_path.clone(),
            secure: config.cookie_secure,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mapping carried by the request; no cookie means an empty mapping
    pub fn load(&self, request: &HeaderMap) -> ApiResult<CorrelationMap> {
        match self.raw_value(request) {
            Some(raw) => Self::decode(raw),
            None => Ok(CorrelationMap::new()),
        }
    }

    /// Cookie value for `map`: URL-encoded JSON
    pub fn encode(map: &CorrelationMap) -> ApiResult<String> {
        let json = serde_json::to_string(map)?;
        Ok(urlencoding::encode(&json).into_owned())
    }

    /// Parse a cookie value; a malformed payload is an error, never repaired
    pub fn decode(raw: &str) -> ApiResult<CorrelationMap> {
        let spaced = raw.replace('+', " ");
        let json = urlencoding::decode(&spaced).map_err(ApiError::corrupted_cookie)?;
        serde_json::from_str(&json).map_err(ApiError::corrupted_cookie)
    }

    /// Full `Set-Cookie` header value persisting `map`
    ///
    /// Attributes: Max-Age, Path, SameSite=Strict, HttpOnly and optionally Secure.
    pub fn set_cookie(&self, map: &CorrelationMap) -> ApiResult<HeaderValue> {
        let mut cookie = format!(
            "{}={}; Max-Age={}; Path={}; SameSite=Strict; HttpOnly",
            self.name,
            Self::encode(map)?,
            self.max_age_secs,
            self.path
        );
        if self.secure {
            cookie.push_str("; Secure");
        }

        HeaderValue::from_str(&cookie)
            .map_err(|err| ApiError::internal_error(format!("invalid Set-Cookie value: {}", err)))
    }

    fn raw_value<'a>(&self, request: &'a HeaderMap) -> Option<&'a str> {
        request
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| name.trim() == self.name)
            .map(|(_, value)| value.trim().trim_matches('"'))
    }
}

impl CorrelationStore for CookieCorrelationStore {
    fn strategy(&self) -> CorrelationStrategy {
        CorrelationStrategy::Cookie
    }

    fn put(
        &self,
        request: &HeaderMap,
        response: &mut HeaderMap,
        token: ConnectionToken,
        culture: CultureTag,
    ) -> ApiResult<()> {
        let mut map = self.load(request)?;
        map.upsert(token, culture);
        response.append(SET_COOKIE, self.set_cookie(&map)?);
        tracing::debug!("Correlation cookie now carries {} token(s)", map.len());
        Ok(())
    }

    fn get(&self, request: &HeaderMap, token: &ConnectionToken) -> ApiResult<Option<CultureTag>> {
        Ok(self.load(request)?.get(token.as_str()).cloned())
    }

    fn remove(&self, _token: &ConnectionToken) {}
}
