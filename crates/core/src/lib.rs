//! Shared primitives for all Rust crates in scriptbind.

#![forbid(unsafe_code)]

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across scriptbind crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

impl Display for NonEmptyString {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Common application error categories.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A provider claimed a binding type but one of its fields is malformed.
    #[error("invalid '{field}' on '{binding_type}' binding: {message}")]
    BindingConfiguration {
        /// Declared binding type name as written in metadata.
        binding_type: String,
        /// Offending metadata field.
        field: String,
        /// Human readable reason.
        message: String,
    },

    /// No registered provider claims the declared binding type.
    #[error("function '{function_name}' declares unsupported binding type '{binding_type}'")]
    UnclaimedBindingType {
        /// Function declaring the binding.
        function_name: String,
        /// Declared binding type name as written in metadata.
        binding_type: String,
    },

    /// Internal unexpected error or broken caller contract.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Builds a binding configuration error for one offending field.
    #[must_use]
    pub fn binding_configuration(
        binding_type: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::BindingConfiguration {
            binding_type: binding_type.into(),
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns the offending field for binding configuration errors.
    #[must_use]
    pub fn offending_field(&self) -> Option<&str> {
        match self {
            Self::BindingConfiguration { field, .. } => Some(field.as_str()),
            _ => None,
        }
    }
}
