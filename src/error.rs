use std::fmt;

use thiserror::Error;

/// Cause category of a [`ConfigError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Storage endpoint unreachable, bucket/object missing, unreadable files.
    Connectivity,
    /// Credentials missing or rejected by the storage endpoint.
    Authentication,
    /// State content that cannot be parsed or does not match the schema.
    MalformedDocument,
    /// Missing or invalid inventory configuration.
    Configuration,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Connectivity => "connectivity",
            ErrorCategory::Authentication => "authentication",
            ErrorCategory::MalformedDocument => "malformed-document",
            ErrorCategory::Configuration => "configuration",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single failure type surfaced by the resolver.
///
/// SECURITY: messages must NEVER contain secret keys or session tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{category} error: {message}")]
pub struct ConfigError {
    pub category: ErrorCategory,
    pub message: String,
}

impl ConfigError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }

    pub fn connectivity(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Connectivity, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Authentication, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::MalformedDocument, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Configuration, message)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::configuration(format!("invalid inventory config: {err}"))
    }
}
