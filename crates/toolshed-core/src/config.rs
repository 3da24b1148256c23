use std::env;

use thiserror::Error;

pub const ENV_RUN_VALIDATE_INPUT_TYPES: &str = "TOOLSHED_RUN_VALIDATE_INPUT_TYPES";
pub const ENV_RUN_MAX_INPUT_VALUE_CHARS: &str = "TOOLSHED_RUN_MAX_INPUT_VALUE_CHARS";

const DEFAULT_MAX_INPUT_VALUE_CHARS: usize = 10_000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunConfig {
    /// Check each provided value against its input's declared type at run creation.
    pub validate_input_types: bool,
    pub max_input_value_chars: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            validate_input_types: false,
            max_input_value_chars: DEFAULT_MAX_INPUT_VALUE_CHARS,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid TOOLSHED_RUN_VALIDATE_INPUT_TYPES: {0}")]
    InvalidValidateInputTypes(String),
    #[error("invalid TOOLSHED_RUN_MAX_INPUT_VALUE_CHARS: {0}")]
    InvalidMaxInputValueChars(String),
}

impl RunConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let validate_input_types = match non_empty(ENV_RUN_VALIDATE_INPUT_TYPES) {
            Some(raw) => {
                parse_bool(&raw).ok_or(ConfigError::InvalidValidateInputTypes(raw))?
            }
            None => defaults.validate_input_types,
        };

        let max_input_value_chars = match non_empty(ENV_RUN_MAX_INPUT_VALUE_CHARS) {
            Some(raw) => match raw.parse::<usize>() {
                Ok(value) if value > 0 => value,
                _ => return Err(ConfigError::InvalidMaxInputValueChars(raw)),
            },
            None => defaults.max_input_value_chars,
        };

        Ok(Self {
            validate_input_types,
            max_input_value_chars,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
