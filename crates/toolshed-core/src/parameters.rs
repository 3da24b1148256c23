use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};
use crate::key_value::KeyValuePair;

/// The three key namespaces shared between a Resource and its Apps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterCategory {
    UrlParameters,
    Headers,
    Body,
}

impl ParameterCategory {
    pub const ALL: [Self; 3] = [Self::UrlParameters, Self::Headers, Self::Body];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UrlParameters => "urlParameters",
            Self::Headers => "headers",
            Self::Body => "body",
        }
    }
}

impl fmt::Display for ParameterCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawParameterSet")]
pub struct ParameterSet {
    url_parameters: Vec<KeyValuePair>,
    headers: Vec<KeyValuePair>,
    body: Vec<KeyValuePair>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawParameterSet {
    #[serde(default)]
    url_parameters: Vec<KeyValuePair>,
    #[serde(default)]
    headers: Vec<KeyValuePair>,
    #[serde(default)]
    body: Vec<KeyValuePair>,
}

impl TryFrom<RawParameterSet> for ParameterSet {
    type Error = DomainError;

    fn try_from(raw: RawParameterSet) -> Result<Self> {
        Self::new(raw.url_parameters, raw.headers, raw.body)
    }
}

impl ParameterSet {
    /// Builds a set, rejecting duplicate keys inside any one category.
    pub fn new(
        url_parameters: Vec<KeyValuePair>,
        headers: Vec<KeyValuePair>,
        body: Vec<KeyValuePair>,
    ) -> Result<Self> {
        let set = Self {
            url_parameters,
            headers,
            body,
        };
        set.ensure_unique_keys()?;
        Ok(set)
    }

    #[must_use]
    pub fn url_parameters(&self) -> &[KeyValuePair] {
        &self.url_parameters
    }

    #[must_use]
    pub fn headers(&self) -> &[KeyValuePair] {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> &[KeyValuePair] {
        &self.body
    }

    #[must_use]
    pub fn category(&self, category: ParameterCategory) -> &[KeyValuePair] {
        match category {
            ParameterCategory::UrlParameters => &self.url_parameters,
            ParameterCategory::Headers => &self.headers,
            ParameterCategory::Body => &self.body,
        }
    }

    #[must_use]
    pub fn keys(&self, category: ParameterCategory) -> BTreeSet<&str> {
        key_set(self.category(category))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        ParameterCategory::ALL
            .iter()
            .all(|category| self.category(*category).is_empty())
    }

    /// Replaces every category the changes supply and keeps the rest.
    pub fn apply(&self, changes: &ParameterChanges) -> Result<Self> {
        let pick = |category: ParameterCategory| {
            changes
                .category(category)
                .unwrap_or_else(|| self.category(category))
                .to_vec()
        };
        Self::new(
            pick(ParameterCategory::UrlParameters),
            pick(ParameterCategory::Headers),
            pick(ParameterCategory::Body),
        )
    }

    fn ensure_unique_keys(&self) -> Result<()> {
        for category in ParameterCategory::ALL {
            let mut seen = BTreeSet::new();
            let duplicates = self
                .category(category)
                .iter()
                .map(KeyValuePair::key)
                .filter(|key| !seen.insert(*key))
                .collect::<BTreeSet<_>>();
            if !duplicates.is_empty() {
                return Err(DomainError::validation(format!(
                    "duplicate {category} keys: {}",
                    duplicates.into_iter().collect::<Vec<_>>().join(", ")
                )));
            }
        }
        Ok(())
    }
}

/// Candidate replacement for some of the categories of a [`ParameterSet`].
///
/// `None` leaves a category untouched and excludes it from conflict checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_parameters: Option<Vec<KeyValuePair>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<KeyValuePair>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Vec<KeyValuePair>>,
}

impl ParameterChanges {
    /// Changes that replace every category with the contents of `set`.
    #[must_use]
    pub fn replace_all(set: &ParameterSet) -> Self {
        Self {
            url_parameters: Some(set.url_parameters.clone()),
            headers: Some(set.headers.clone()),
            body: Some(set.body.clone()),
        }
    }

    #[must_use]
    pub fn with_url_parameters(mut self, pairs: Vec<KeyValuePair>) -> Self {
        self.url_parameters = Some(pairs);
        self
    }

    #[must_use]
    pub fn with_headers(mut self, pairs: Vec<KeyValuePair>) -> Self {
        self.headers = Some(pairs);
        self
    }

    #[must_use]
    pub fn with_body(mut self, pairs: Vec<KeyValuePair>) -> Self {
        self.body = Some(pairs);
        self
    }

    #[must_use]
    pub fn category(&self, category: ParameterCategory) -> Option<&[KeyValuePair]> {
        match category {
            ParameterCategory::UrlParameters => self.url_parameters.as_deref(),
            ParameterCategory::Headers => self.headers.as_deref(),
            ParameterCategory::Body => self.body.as_deref(),
        }
    }

    /// Categories this change set touches, in canonical order.
    #[must_use]
    pub fn categories(&self) -> Vec<ParameterCategory> {
        ParameterCategory::ALL
            .into_iter()
            .filter(|category| self.category(*category).is_some())
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories().is_empty()
    }
}

pub(crate) fn key_set(pairs: &[KeyValuePair]) -> BTreeSet<&str> {
    pairs.iter().map(KeyValuePair::key).collect()
}
