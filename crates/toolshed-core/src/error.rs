//! Domain error taxonomy shared by every engine operation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

/// Stable tag forwarded to the API layer alongside the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainErrorKind {
    ValidationError,
    Conflict,
    NotFound,
    InvalidOperation,
}

impl DomainErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ValidationError => "validation_error",
            Self::Conflict => "conflict",
            Self::NotFound => "not_found",
            Self::InvalidOperation => "invalid_operation",
        }
    }
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation(message.into())
    }

    #[must_use]
    pub fn kind(&self) -> DomainErrorKind {
        match self {
            Self::Validation(_) => DomainErrorKind::ValidationError,
            Self::Conflict(_) => DomainErrorKind::Conflict,
            Self::NotFound(_) => DomainErrorKind::NotFound,
            Self::InvalidOperation(_) => DomainErrorKind::InvalidOperation,
        }
    }

    /// Message without the kind prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(message)
            | Self::Conflict(message)
            | Self::NotFound(message)
            | Self::InvalidOperation(message) => message.as_str(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
