use thiserror::Error;

/// One failed provider call, with attribution, as carried in partial-failure
/// reports and aggregate errors.
#[derive(Debug, Clone)]
pub struct ProviderFailure {
    pub provider: String,
    pub message: String,
}

impl std::fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.provider, self.message)
    }
}

/// Main error type for the reconciliation engine
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// Connection-level failure
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    /// Configured deadline elapsed
    #[error("Request timed out: {url}")]
    Timeout { url: String },

    /// Non-2xx HTTP response
    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    /// Malformed or unexpected provider payload
    #[error("Provider '{provider}' returned a bad response: {message}")]
    ProviderResponse { provider: String, message: String },

    /// Provider unreachable or rejected credentials
    #[error("Provider '{provider}' unavailable: {message}")]
    ProviderUnavailable { provider: String, message: String },

    /// Resource disappeared between search and fetch
    #[error("Provider '{provider}' no longer has {url}")]
    NotFound { provider: String, url: String },

    /// Dispatch to a provider id that was never registered
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// Malformed configuration, fatal at startup
    #[error("Configuration error: {0}")]
    Config(String),

    /// Every chosen provider failed
    #[error("All providers failed: {}", format_failures(.0))]
    AggregateFailure(Vec<ProviderFailure>),

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

fn format_failures(failures: &[ProviderFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ReconcileError {
    /// Wrap this error with provider attribution for failure reports.
    pub fn into_failure(self, provider: &str) -> ProviderFailure {
        ProviderFailure {
            provider: provider.to_string(),
            message: self.to_string(),
        }
    }
}

impl From<String> for ReconcileError {
    fn from(s: String) -> Self {
        ReconcileError::Other(s)
    }
}

impl From<&str> for ReconcileError {
    fn from(s: &str) -> Self {
        ReconcileError::Other(s.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ReconcileError>;
