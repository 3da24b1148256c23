use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};

pub const KEY_MAX_CHARS: usize = 100;
pub const VALUE_MAX_CHARS: usize = 1000;

/// Validated key/value pair used for URL parameters, headers and body fields.
///
/// Both sides may carry `{title}` placeholders that are resolved at run time.
/// Keys and values are stored trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawKeyValuePair")]
pub struct KeyValuePair {
    key: String,
    value: String,
}

#[derive(Deserialize)]
struct RawKeyValuePair {
    key: String,
    value: String,
}

impl TryFrom<RawKeyValuePair> for KeyValuePair {
    type Error = DomainError;

    fn try_from(raw: RawKeyValuePair) -> Result<Self> {
        Self::new(raw.key, raw.value)
    }
}

impl KeyValuePair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let key = key.into().trim().to_string();
        let value = value.into().trim().to_string();

        if key.is_empty() {
            return Err(DomainError::validation("key must not be empty"));
        }
        if key.chars().count() > KEY_MAX_CHARS {
            return Err(DomainError::validation(format!(
                "key `{key}` exceeds {KEY_MAX_CHARS} characters"
            )));
        }
        if value.is_empty() {
            return Err(DomainError::validation(format!(
                "value for key `{key}` must not be empty"
            )));
        }
        if value.chars().count() > VALUE_MAX_CHARS {
            return Err(DomainError::validation(format!(
                "value for key `{key}` exceeds {VALUE_MAX_CHARS} characters"
            )));
        }

        Ok(Self { key, value })
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Builds a list of pairs, failing on the first invalid one.
pub fn pairs<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Result<Vec<KeyValuePair>>
where
    K: Into<String>,
    V: Into<String>,
{
    entries
        .into_iter()
        .map(|(key, value)| KeyValuePair::new(key, value))
        .collect()
}
