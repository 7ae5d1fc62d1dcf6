use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::utils::CultureTag;

/// Opaque identifier minted by the hub during negotiate; compared by exact equality
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionToken(String);

impl ConnectionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ConnectionToken {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One token→culture pair, serialized with the `Key`/`Value` member names the
/// cookie format uses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationEntry {
    #[serde(rename = "Key")]
    pub token: ConnectionToken,
    #[serde(rename = "Value")]
    pub culture: CultureTag,
}

/// Insertion-ordered token→culture mapping
///
/// New tokens append; an existing token is updated in place and keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationMap(Vec<CorrelationEntry>);

impl CorrelationMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, token: ConnectionToken, culture: CultureTag) {
        match self.0.iter_mut().find(|entry| entry.token == token) {
            Some(entry) => entry.culture = culture,
            None => self.0.push(CorrelationEntry { token, culture }),
        }
    }

    pub fn get(&self, token: &str) -> Option<&CultureTag> {
        self.0
            .iter()
            .find(|entry| entry.token.as_str() == token)
            .map(|entry| &entry.culture)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn entries(&self) -> &[CorrelationEntry] {
        &self.0
    }
}

impl FromIterator<(ConnectionToken, CultureTag)> for CorrelationMap {
    fn from_iter<I: IntoIterator<Item = (ConnectionToken, CultureTag)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (token, culture) in iter {
            map.upsert(token, culture);
        }
        map
    }
}
