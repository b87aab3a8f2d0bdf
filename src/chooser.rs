use async_trait::async_trait;
use rapidfuzz::distance::jaro_winkler;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::core::{Platform, ProviderSearchResult};
use crate::error::Result;

/// Outcome of a choice among one provider's candidates.
///
/// `Skip` means "no data from this provider, continue with others".
/// `Exclude` aborts reconciliation for the game entirely.
#[derive(Debug, Clone, PartialEq)]
pub enum Choice {
    Accept(ProviderSearchResult),
    Skip,
    Exclude,
}

/// Everything the external decision-maker sees for one provider's candidates.
///
/// `filtered_results` is the similarity-narrowed subset of `results`; both
/// travel together so the decision-maker can widen the filter without
/// re-querying the provider.
#[derive(Debug, Clone)]
pub struct ChooserRequest {
    pub name: String,
    pub path: PathBuf,
    pub platform: Platform,
    pub provider_id: String,
    pub results: Vec<ProviderSearchResult>,
    pub filtered_results: Vec<ProviderSearchResult>,
}

/// The chooser boundary the excluded UI layer implements.
#[async_trait]
pub trait ChoiceHandler: Send + Sync {
    async fn present(&self, request: ChooserRequest) -> Choice;
}

/// Resolves ambiguity among search candidates for one provider.
///
/// Automatic when the answer is unambiguous; otherwise defers to the external
/// handler, treating non-response within the timeout as `Skip`.
pub struct SearchChooser {
    handler: Arc<dyn ChoiceHandler>,
    /// Similarity threshold, 0-100, for automatic acceptance
    threshold: f64,
    timeout: Duration,
}

impl SearchChooser {
    pub fn new(handler: Arc<dyn ChoiceHandler>, threshold: f64, timeout: Duration) -> Self {
        Self {
            handler,
            threshold,
            timeout,
        }
    }

    /// Jaro-Winkler similarity between query and candidate name, 0-100
    pub fn similarity(query: &str, candidate: &str) -> f64 {
        jaro_winkler::normalized_similarity(
            query.to_lowercase().chars(),
            candidate.to_lowercase().chars(),
        ) * 100.0
    }

    pub async fn choose(
        &self,
        name: &str,
        path: &Path,
        platform: Platform,
        provider_id: &str,
        results: Vec<ProviderSearchResult>,
    ) -> Result<Choice> {
        if results.is_empty() {
            return Ok(Choice::Skip);
        }

        // A lone candidate needs no decision
        if results.len() == 1 {
            tracing::debug!(
                "Auto-accepting sole {} candidate '{}'",
                provider_id,
                results[0].name
            );
            return Ok(Choice::Accept(results[0].clone()));
        }

        let filtered: Vec<ProviderSearchResult> = results
            .iter()
            .filter(|r| Self::similarity(name, &r.name) >= self.threshold)
            .cloned()
            .collect();

        if filtered.len() == 1 {
            tracing::debug!(
                "Auto-accepting {} candidate '{}' ({} of {} above threshold)",
                provider_id,
                filtered[0].name,
                filtered.len(),
                results.len()
            );
            return Ok(Choice::Accept(filtered[0].clone()));
        }

        let request = ChooserRequest {
            name: name.to_string(),
            path: path.to_path_buf(),
            platform,
            provider_id: provider_id.to_string(),
            results,
            filtered_results: filtered,
        };

        match tokio::time::timeout(self.timeout, self.handler.present(request)).await {
            Ok(choice) => Ok(choice),
            Err(_) => {
                tracing::warn!(
                    "Chooser did not answer for {} within {:?}, skipping provider",
                    provider_id,
                    self.timeout
                );
                Ok(Choice::Skip)
            }
        }
    }
}
