//! Culture extraction from URL paths and Referer headers
//!
//! The culture is the first path segment after the application's base path,
//! matched case-insensitively against the supported set. A miss is "no opinion",
//! never an error.

use axum::http::{HeaderMap, header::REFERER};
use url::Url;

use crate::utils::{CultureTag, SupportedCultures};

#[derive(Debug, Clone)]
pub struct CultureExtractor {
    supported: SupportedCultures,
    base_path: String,
}

impl CultureExtractor {
    /// `base_path` is the application mount prefix ("" or "/app1")
    pub fn new(supported: SupportedCultures, base_path: impl Into<String>) -> Self {
        Self { supported, base_path: base_path.into() }
    }

    pub fn supported(&self) -> &SupportedCultures {
        &self.supported
    }

    /// Culture carried by the first segment of `path`
    pub fn from_path(&self, path: &str) -> Option<CultureTag> {
        let first = path_segments(self.strip_base_path(path)).next()?;
        self.supported.find(first).cloned()
    }

    /// Culture carried by the path component of a Referer URL
    ///
    /// Query and fragment are ignored. A missing, non-UTF-8 or non-absolute
    /// Referer yields `None`.
    pub fn from_referer(&self, referer: &str) -> Option<CultureTag> {
        let url = match Url::parse(referer.trim()) {
            Ok(url) => url,
            Err(err) => {
                tracing::debug!("Ignoring malformed referer '{}': {}", referer, err);
                return None;
            },
        };

        self.from_path(url.path())
    }

    pub fn from_referer_header(&self, headers: &HeaderMap) -> Option<CultureTag> {
        let referer = headers.get(REFERER)?.to_str().ok()?;
        self.from_referer(referer)
    }

    pub fn strip_base_path<'a>(&self, path: &'a str) -> &'a str {
        strip_base_path(path, &self.base_path)
    }
}

/// Remove the base path prefix (case-insensitive) when present
pub fn strip_base_path<'a>(path: &'a str, base_path: &str) -> &'a str {
    if base_path.is_empty() {
        return path;
    }

    match path.get(..base_path.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(base_path) => {
            let rest = &path[base_path.len()..];
            // "/app10" does not live under "/app1"
            if rest.is_empty() || rest.starts_with('/') { rest } else { path }
        },
        _ => path,
    }
}

/// Non-empty segments of a path
pub fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn extractor(base_path: &str) -> CultureExtractor {
        CultureExtractor::new(SupportedCultures::parse(["en", "fr"]).unwrap(), base_path)
    }

    #[test]
    fn test_from_path() {
        let ex = extractor("");
        assert_eq!(ex.from_path("/fr").map(|c| c.to_string()), Some("fr".into()));
        assert_eq!(ex.from_path("/fr/").map(|c| c.to_string()), Some("fr".into()));
        assert_eq!(ex.from_path("/FR/home").map(|c| c.to_string()), Some("fr".into()));
        assert_eq!(ex.from_path("/en/a/b?x=1").map(|c| c.to_string()), Some("en".into()));
        assert_eq!(ex.from_path("/fra/home"), None);
        assert_eq!(ex.from_path("/home/fr"), None);
        assert_eq!(ex.from_path("/"), None);
        assert_eq!(ex.from_path(""), None);
    }

    #[test]
    fn test_from_path_with_base_path() {
        let ex = extractor("/app1");
        assert_eq!(ex.from_path("/app1/fr/home").map(|c| c.to_string()), Some("fr".into()));
        assert_eq!(ex.from_path("/APP1/en").map(|c| c.to_string()), Some("en".into()));
        assert_eq!(ex.from_path("/fr/home").map(|c| c.to_string()), Some("fr".into()));
        assert_eq!(ex.from_path("/app10/fr"), None);
    }

    #[test]
    fn test_from_referer() {
        let ex = extractor("");
        assert_eq!(
            ex.from_referer("https://x/fr/home").map(|c| c.to_string()),
            Some("fr".into())
        );
        assert_eq!(ex.from_referer("http://example.com/en").map(|c| c.to_string()), Some("en".into()));
        assert_eq!(
            ex.from_referer("http://example.com/home?lang=fr#fr").map(|c| c.to_string()),
            None
        );
        assert_eq!(ex.from_referer("not a url"), None);
        assert_eq!(ex.from_referer(""), None);
    }

    #[test]
    fn test_from_referer_with_base_path() {
        let ex = extractor("/app1");
        assert_eq!(
            ex.from_referer("http://example.com/app1/fr/").map(|c| c.to_string()),
            Some("fr".into())
        );
    }

    #[test]
    fn test_from_referer_header_missing() {
        assert_eq!(extractor("").from_referer_header(&HeaderMap::new()), None);
    }

    proptest! {
        #[test]
        fn prop_leading_supported_segment_is_extracted(
            culture in prop::sample::select(vec!["en", "fr", "EN", "Fr"]),
            rest in "(/[a-z0-9]{1,8}){0,4}",
        ) {
            let path = format!("/{}{}", culture, rest);
            let extracted = extractor("").from_path(&path);
            prop_assert_eq!(extracted.map(|c| c.to_string()), Some(culture.to_lowercase()));
        }

        #[test]
        fn prop_unsupported_leading_segment_yields_none(
            first in "[a-z]{1,6}".prop_filter("not a supported culture", |s| s != "en" && s != "fr"),
            rest in "(/[a-z0-9]{1,8}){0,4}",
        ) {
            let path = format!("/{}{}", first, rest);
            prop_assert_eq!(extractor("").from_path(&path), None);
        }
    }
}
