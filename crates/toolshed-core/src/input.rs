//! Run-time input declarations and the per-type value validators.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};

pub const TITLE_MAX_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputType {
    Text,
    MultilineText,
    Email,
    Date,
    Integer,
    Boolean,
    Currency,
    Radio { options: Vec<String> },
    MultiSelect { options: Vec<String> },
}

impl InputType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::MultilineText => "multiline_text",
            Self::Email => "email",
            Self::Date => "date",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Currency => "currency",
            Self::Radio { .. } => "radio",
            Self::MultiSelect { .. } => "multi_select",
        }
    }

    fn options(&self) -> Option<&[String]> {
        match self {
            Self::Radio { options } | Self::MultiSelect { options } => Some(options),
            _ => None,
        }
    }

    fn ensure_well_formed(&self) -> Result<()> {
        let Some(options) = self.options() else {
            return Ok(());
        };
        if options.is_empty() {
            return Err(DomainError::validation(format!(
                "{} input requires at least one option",
                self.as_str()
            )));
        }
        let mut seen = BTreeSet::new();
        for option in options {
            if option.trim().is_empty() {
                return Err(DomainError::validation("options must not be empty"));
            }
            if !seen.insert(option.as_str()) {
                return Err(DomainError::validation(format!(
                    "duplicate option `{option}`"
                )));
            }
        }
        Ok(())
    }

    /// Checks a raw value against this type. Returns the reason on mismatch.
    pub fn check_value(&self, value: &str) -> std::result::Result<(), String> {
        match self {
            Self::Text | Self::MultilineText => Ok(()),
            Self::Email => {
                if is_email(value) {
                    Ok(())
                } else {
                    Err("is not a valid email address".to_string())
                }
            }
            Self::Date => NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
                .map(|_| ())
                .map_err(|_| "is not a YYYY-MM-DD date".to_string()),
            Self::Integer => value
                .trim()
                .parse::<i64>()
                .map(|_| ())
                .map_err(|_| "is not an integer".to_string()),
            Self::Boolean => match value.trim().to_ascii_lowercase().as_str() {
                "true" | "false" => Ok(()),
                _ => Err("is not true or false".to_string()),
            },
            Self::Currency => {
                if is_currency(value.trim()) {
                    Ok(())
                } else {
                    Err("is not a currency amount".to_string())
                }
            }
            Self::Radio { options } => {
                if options.iter().any(|option| option == value) {
                    Ok(())
                } else {
                    Err(format!("is not one of: {}", options.join(", ")))
                }
            }
            Self::MultiSelect { options } => {
                let mut seen = BTreeSet::new();
                for selected in value.split(',').map(str::trim) {
                    if !options.iter().any(|option| option == selected) {
                        return Err(format!("contains unknown option `{selected}`"));
                    }
                    if !seen.insert(selected) {
                        return Err(format!("selects `{selected}` more than once"));
                    }
                }
                Ok(())
            }
        }
    }
}

fn is_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels = domain.split('.').collect::<Vec<_>>();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}

fn is_currency(value: &str) -> bool {
    let unsigned = value.strip_prefix('-').unwrap_or(value);
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (unsigned, None),
    };
    if whole.is_empty() || !whole.bytes().all(|byte| byte.is_ascii_digit()) {
        return false;
    }
    match fraction {
        Some(fraction) => {
            (1..=2).contains(&fraction.len()) && fraction.bytes().all(|byte| byte.is_ascii_digit())
        }
        None => true,
    }
}

/// One declared run-time parameter of an App.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawInput")]
pub struct Input {
    title: String,
    required: bool,
    input_type: InputType,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_value: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInput {
    title: String,
    #[serde(default)]
    required: bool,
    input_type: InputType,
    #[serde(default)]
    default_value: Option<String>,
}

impl TryFrom<RawInput> for Input {
    type Error = DomainError;

    fn try_from(raw: RawInput) -> Result<Self> {
        Self::new(raw.title, raw.required, raw.input_type, raw.default_value)
    }
}

impl Input {
    pub fn new(
        title: impl Into<String>,
        required: bool,
        input_type: InputType,
        default_value: Option<String>,
    ) -> Result<Self> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(DomainError::validation("input title must not be empty"));
        }
        if title.chars().count() > TITLE_MAX_CHARS {
            return Err(DomainError::validation(format!(
                "input title `{title}` exceeds {TITLE_MAX_CHARS} characters"
            )));
        }
        if title.contains(['{', '}']) {
            return Err(DomainError::validation(format!(
                "input title `{title}` must not contain braces"
            )));
        }
        input_type.ensure_well_formed()?;
        if let Some(default_value) = &default_value {
            input_type.check_value(default_value).map_err(|reason| {
                DomainError::validation(format!(
                    "default value for input `{title}` {reason}"
                ))
            })?;
        }

        Ok(Self {
            title,
            required,
            input_type,
            default_value,
        })
    }

    /// Optional text input with no default.
    pub fn text(title: impl Into<String>) -> Result<Self> {
        Self::new(title, false, InputType::Text, None)
    }

    /// Required input of the given type with no default.
    pub fn required(title: impl Into<String>, input_type: InputType) -> Result<Self> {
        Self::new(title, true, input_type, None)
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    #[must_use]
    pub fn input_type(&self) -> &InputType {
        &self.input_type
    }

    #[must_use]
    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    /// `{title}` as it appears in templates.
    #[must_use]
    pub fn placeholder(&self) -> String {
        placeholder_for(&self.title)
    }
}

pub(crate) fn placeholder_for(title: &str) -> String {
    format!("{{{title}}}")
}

/// Rejects input lists with repeated titles.
pub(crate) fn ensure_unique_titles(inputs: &[Input]) -> Result<()> {
    let mut seen = BTreeSet::new();
    let duplicates = inputs
        .iter()
        .map(Input::title)
        .filter(|title| !seen.insert(*title))
        .collect::<BTreeSet<_>>();
    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(DomainError::validation(format!(
            "duplicate input titles: {}",
            duplicates.into_iter().collect::<Vec<_>>().join(", ")
        )))
    }
}

/// Concrete value supplied for one input when a run is requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputValue {
    pub title: String,
    pub value: String,
}

impl InputValue {
    pub fn new(title: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
        }
    }
}
