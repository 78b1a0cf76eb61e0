use crate::transport::TransportError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured error context for configuration and validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Configuration key or input field that caused the error (e.g., "base_url", "rate_limit.window_ms")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., the rejected value)
    pub details: Option<String>,
    /// Source of the error (e.g., "config", "service_builder")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Error type for construction-time operations (config loading, client setup).
///
/// Request-time failures never surface as this type; see [`GenerationError`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    #[error("Network transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new validation error with structured context
    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } | Error::Validation { context, .. } => {
                Some(context)
            }
            _ => None,
        }
    }
}

/// Discriminant of a failed generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationErrorKind {
    /// Prompt missing or blank after trimming. Caller must fix the input.
    InvalidInput,
    /// Refused by the sliding window. Recoverable by waiting.
    RateLimited,
    /// Non-2xx status, transport failure or timeout.
    NetworkError,
    /// 2xx status with a blank body.
    EmptyResponse,
}

impl GenerationErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationErrorKind::InvalidInput => "invalid_input",
            GenerationErrorKind::RateLimited => "rate_limited",
            GenerationErrorKind::NetworkError => "network_error",
            GenerationErrorKind::EmptyResponse => "empty_response",
        }
    }
}

impl std::fmt::Display for GenerationErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure carried inside a [`crate::GenerationResult`].
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct GenerationError {
    pub kind: GenerationErrorKind,
    pub message: String,
}

impl GenerationError {
    pub fn new(kind: GenerationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_input() -> Self {
        Self::new(
            GenerationErrorKind::InvalidInput,
            "Prompt is required and must be a non-empty string",
        )
    }

    pub fn rate_limited() -> Self {
        Self::new(
            GenerationErrorKind::RateLimited,
            "Rate limit exceeded. Please wait before trying again.",
        )
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::NetworkError, message)
    }

    pub fn http_status(status: u16, body: &str) -> Self {
        Self::network(format!("HTTP error! status: {} - {}", status, body))
    }

    pub fn empty_response() -> Self {
        Self::new(GenerationErrorKind::EmptyResponse, "Empty response from API")
    }

    /// Whether waiting and trying again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            GenerationErrorKind::RateLimited | GenerationErrorKind::NetworkError
        )
    }
}

impl From<TransportError> for GenerationError {
    fn from(err: TransportError) -> Self {
        GenerationError::network(err.to_string())
    }
}
