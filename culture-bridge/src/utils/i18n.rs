//! Culture tags and the request-scoped ambient culture
//!
//! The ambient culture lives in task-local storage: it is installed around the
//! downstream future of a single request and is invisible to every other task,
//! even when they are polled on the same worker thread.

use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::error::{ApiError, ApiResult};

tokio::task_local! {
    static CURRENT_CULTURE: CultureTag;
}

/// Short locale identifier ("en", "fr", "pt-BR")
///
/// Equality and hashing ignore ASCII case; the given spelling is kept for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CultureTag(String);

impl CultureTag {
    /// Validate and wrap a culture name
    ///
    /// Accepts ASCII letters and digits separated by single `-` characters.
    pub fn new(name: impl Into<String>) -> ApiResult<Self> {
        let name = name.into();
        let name = name.trim();

        let well_formed = !name.is_empty()
            && name
                .split('-')
                .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric()));

        if !well_formed {
            return Err(ApiError::invalid_culture(name));
        }

        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Two-letter-or-longer primary language subtag, lower-cased
    pub fn language(&self) -> String {
        self.0
            .split('-')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase()
    }

    pub fn matches(&self, candidate: &str) -> bool {
        self.0.eq_ignore_ascii_case(candidate)
    }
}

impl PartialEq for CultureTag {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for CultureTag {}

impl Hash for CultureTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.0.bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
    }
}

impl fmt::Display for CultureTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CultureTag {
    type Error = ApiError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CultureTag> for String {
    fn from(culture: CultureTag) -> Self {
        culture.0
    }
}

impl std::str::FromStr for CultureTag {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// The configured set of cultures the application can serve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedCultures(Vec<CultureTag>);

impl SupportedCultures {
    pub fn new(cultures: Vec<CultureTag>) -> ApiResult<Self> {
        if cultures.is_empty() {
            return Err(ApiError::configuration("at least one supported culture is required"));
        }
        Ok(Self(cultures))
    }

    /// Parse a list of culture names, rejecting malformed entries
    pub fn parse<I, S>(names: I) -> ApiResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let cultures = names
            .into_iter()
            .map(|name| CultureTag::new(name.as_ref()))
            .collect::<ApiResult<Vec<_>>>()?;
        Self::new(cultures)
    }

    /// Find the configured culture matching `candidate`, ignoring case
    ///
    /// The configured spelling is returned, not the candidate's.
    pub fn find(&self, candidate: &str) -> Option<&CultureTag> {
        self.0.iter().find(|culture| culture.matches(candidate))
    }
}

/// Run `fut` with `culture` as its ambient culture
pub async fn with_culture<F>(culture: CultureTag, fut: F) -> F::Output
where
    F: Future,
{
    CURRENT_CULTURE.scope(culture, fut).await
}

/// Ambient culture of the current request, if one is in scope
pub fn current_culture() -> Option<CultureTag> {
    CURRENT_CULTURE.try_with(|culture| culture.clone()).ok()
}

/// Locale used for rendering messages: the ambient culture's language, or the
/// translation fallback outside any request scope
pub fn current_locale() -> String {
    current_culture()
        .map(|culture| culture.language())
        .unwrap_or_else(|| (*rust_i18n::locale()).to_string())
}
