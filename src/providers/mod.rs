pub mod giantbomb;
pub mod igdb;
pub mod registry;

use async_trait::async_trait;

use crate::core::{Platform, ProviderFetchResult, ProviderSearchResult};
use crate::error::{ReconcileError, Result};

pub use giantbomb::GiantBombClient;
pub use igdb::IgdbClient;
pub use registry::{ProviderRegistry, SearchReport};

/// Trait for metadata providers (GiantBomb, IGDB, ...).
///
/// Implementations own their base URL, credentials, and response parsing;
/// callers stay provider-agnostic through the shared data model.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Search the provider for candidate matches.
    ///
    /// Results come back in the provider's relevance order, never re-sorted
    /// here. An empty list is a valid outcome meaning "no matches".
    async fn search(&self, name: &str, platform: Platform) -> Result<Vec<ProviderSearchResult>>;

    /// Retrieve full detail for a previously returned search result, keyed by
    /// its `api_url`.
    async fn fetch(&self, result: &ProviderSearchResult) -> Result<ProviderFetchResult>;

    /// Provider identifier used in registry dispatch, priority lists, and logs
    fn id(&self) -> &str;
}

/// Attribute transport-level errors to a provider per the error taxonomy:
/// decode failures become `ProviderResponse`, connectivity and auth failures
/// become `ProviderUnavailable`.
pub(crate) fn attribute_error(provider: &str, err: ReconcileError) -> ReconcileError {
    match err {
        ReconcileError::Json(e) => ReconcileError::ProviderResponse {
            provider: provider.to_string(),
            message: e.to_string(),
        },
        ReconcileError::Network { .. }
        | ReconcileError::Timeout { .. }
        | ReconcileError::HttpStatus { .. } => ReconcileError::ProviderUnavailable {
            provider: provider.to_string(),
            message: err.to_string(),
        },
        other => other,
    }
}
