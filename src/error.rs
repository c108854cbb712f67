//! Error types for post search and persistence

use thiserror::Error;

/// Result type alias for search operations
pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Comprehensive error types for search operations
#[derive(Error, Debug, Clone)]
pub enum SearchError {
    /// Missing or invalid credentials and settings
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The token endpoint rejected the credential exchange
    #[error("Authentication failed: {message}")]
    AuthenticationError {
        message: String,
        status_code: Option<u16>,
    },

    /// Parsing error (JSON, YAML)
    #[error("Parsing error: {0}")]
    ParseError(String),

    /// The search endpoint rejected the request
    #[error("Query failed: {message}")]
    QueryError {
        message: String,
        status_code: Option<u16>,
        response_body: Option<String>,
    },

    /// Reading or writing local files failed
    #[error("IO error: {0}")]
    IoError(String),

    /// HTTP transport failed before a status was received
    #[error("HTTP request failed: {message}")]
    HttpError {
        message: String,
        status_code: Option<u16>,
        response_body: Option<String>,
    },

    /// Invalid input parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Timeout error
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// An external collaborator (scraper program) failed
    #[error("Provider error: {0}")]
    ProviderError(String),
}

impl SearchError {
    /// HTTP status attached to the error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            SearchError::AuthenticationError { status_code, .. }
            | SearchError::QueryError { status_code, .. }
            | SearchError::HttpError { status_code, .. } => *status_code,
            _ => None,
        }
    }
}

/// Transport failures; `Timeout` is only produced where the configured limit is known
impl From<reqwest::Error> for SearchError {
    fn from(error: reqwest::Error) -> Self {
        let message = if error.is_timeout() {
            format!("Request timed out: {error}")
        } else {
            error.to_string()
        };

        SearchError::HttpError {
            message,
            status_code: error.status().map(|s| s.as_u16()),
            response_body: None,
        }
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(error: serde_json::Error) -> Self {
        SearchError::ParseError(format!("JSON parsing failed: {error}"))
    }
}

impl From<serde_yaml::Error> for SearchError {
    fn from(error: serde_yaml::Error) -> Self {
        SearchError::ConfigError(format!("Invalid key file: {error}"))
    }
}

impl From<url::ParseError> for SearchError {
    fn from(error: url::ParseError) -> Self {
        SearchError::ConfigError(format!("Invalid URL: {error}"))
    }
}

impl From<std::io::Error> for SearchError {
    fn from(error: std::io::Error) -> Self {
        SearchError::IoError(error.to_string())
    }
}
