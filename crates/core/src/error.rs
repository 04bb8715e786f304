//! Error handling for the PaperSearch core library

use std::fmt;
use thiserror::Error;

/// Result type alias for PaperSearch operations
pub type Result<T> = std::result::Result<T, PaperSearchError>;

/// Main error type for PaperSearch operations
#[derive(Error, Debug)]
pub enum PaperSearchError {
    /// IO-related errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Corpus database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Generic errors
    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),

    /// Corpus store unreachable or empty
    #[error("Corpus data unavailable: {message}")]
    DataUnavailable { message: String },

    /// Embedding backend failure (auth, quota, network)
    #[error("Embedding provider error: {message}")]
    Provider { message: String },

    /// Persisting the embedding cache failed; the in-memory table is still usable
    #[error("Failed to persist embedding cache: {message}")]
    CachePersist { message: String },

    /// Query and corpus vectors differ in size
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Persisted cache was produced by a different embedding model
    #[error("Embedding cache was built with model '{cached}' but provider uses '{current}'")]
    ModelMismatch { cached: String, current: String },

    /// Client-side request errors (empty query, bad parameters)
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Text generation backend failure
    #[error("Text generation unavailable: {message}")]
    Generation { message: String },

    /// Network connectivity errors
    #[error("Network error: {message}")]
    Network { message: String },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Timeout errors
    #[error("Operation timed out: {operation}")]
    Timeout { operation: String },
}

impl PaperSearchError {
    /// Create a data unavailable error
    pub fn data_unavailable<S: Into<String>>(message: S) -> Self {
        Self::DataUnavailable {
            message: message.into(),
        }
    }

    /// Create an embedding provider error
    pub fn provider<S: Into<String>>(message: S) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }

    /// Create a cache persist error
    pub fn cache_persist<S: Into<String>>(message: S) -> Self {
        Self::CachePersist {
            message: message.into(),
        }
    }

    /// Create a dimension mismatch error
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// Create a model mismatch error
    pub fn model_mismatch<S: Into<String>, T: Into<String>>(cached: S, current: T) -> Self {
        Self::ModelMismatch {
            cached: cached.into(),
            current: current.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid_request<S: Into<String>>(message: S) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a text generation error
    pub fn generation<S: Into<String>>(message: S) -> Self {
        Self::Generation {
            message: message.into(),
        }
    }

    /// Create a network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(operation: S) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout { .. } | Self::Http(_) => true,
            Self::Provider { .. } | Self::Generation { .. } => true,
            _ => false,
        }
    }

    /// Whether the caller, not the service, is at fault
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRequest { .. })
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Io(_) | Self::CachePersist { .. } => ErrorCategory::FileSystem,
            Self::Http(_) | Self::Network { .. } => ErrorCategory::Network,
            Self::Json(_) | Self::Yaml(_) => ErrorCategory::Serialization,
            Self::Config(_) | Self::Validation { .. } => ErrorCategory::Configuration,
            Self::Database(_) | Self::DataUnavailable { .. } => ErrorCategory::Corpus,
            Self::Provider { .. } | Self::Generation { .. } => ErrorCategory::Model,
            Self::DimensionMismatch { .. } | Self::ModelMismatch { .. } => {
                ErrorCategory::Embedding
            }
            Self::InvalidRequest { .. } => ErrorCategory::Request,
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::Generic(_) => ErrorCategory::Generic,
        }
    }
}

/// Error categories for logging
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    FileSystem,
    Network,
    Serialization,
    Configuration,
    Corpus,
    Model,
    Embedding,
    Request,
    Timeout,
    Generic,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileSystem => write!(f, "filesystem"),
            Self::Network => write!(f, "network"),
            Self::Serialization => write!(f, "serialization"),
            Self::Configuration => write!(f, "configuration"),
            Self::Corpus => write!(f, "corpus"),
            Self::Model => write!(f, "model"),
            Self::Embedding => write!(f, "embedding"),
            Self::Request => write!(f, "request"),
            Self::Timeout => write!(f, "timeout"),
            Self::Generic => write!(f, "generic"),
        }
    }
}
