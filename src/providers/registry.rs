use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::core::{Platform, ProviderFetchResult, ProviderSearchResult};
use crate::error::{ProviderFailure, ReconcileError, Result};
use crate::providers::ProviderClient;

/// Outcome of a `search_all` fan-out: one `results` entry per registered
/// provider (empty on failure or no matches), plus the partial-failure list.
#[derive(Debug, Default)]
pub struct SearchReport {
    pub results: HashMap<String, Vec<ProviderSearchResult>>,
    pub failures: Vec<ProviderFailure>,
}

/// Immutable provider-id -> client map, built once at startup.
pub struct ProviderRegistry {
    clients: HashMap<String, Arc<dyn ProviderClient>>,
}

impl ProviderRegistry {
    /// Build a registry; duplicate provider ids are a configuration error.
    pub fn new(clients: Vec<Arc<dyn ProviderClient>>) -> Result<Self> {
        let mut map: HashMap<String, Arc<dyn ProviderClient>> = HashMap::new();
        for client in clients {
            let id = client.id().to_string();
            if map.insert(id.clone(), client).is_some() {
                return Err(ReconcileError::Config(format!(
                    "Provider '{}' registered twice",
                    id
                )));
            }
        }
        Ok(Self { clients: map })
    }

    /// Registered provider ids, sorted for stable diagnostics
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.clients.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn contains(&self, provider_id: &str) -> bool {
        self.clients.contains_key(provider_id)
    }

    /// Search every registered provider concurrently, one task per provider,
    /// joined before returning. A failing provider contributes an empty
    /// result list and a recorded failure; it never aborts its siblings.
    pub async fn search_all(&self, name: &str, platform: Platform) -> SearchReport {
        let mut report = SearchReport::default();
        let mut tasks = JoinSet::new();

        for (id, client) in &self.clients {
            // Every provider gets an entry, even before its task runs
            report.results.insert(id.clone(), Vec::new());

            let id = id.clone();
            let client = Arc::clone(client);
            let name = name.to_string();
            tasks.spawn(async move {
                let outcome = client.search(&name, platform).await;
                (id, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((id, Ok(results))) => {
                    tracing::debug!(
                        "Provider {} returned {} search results",
                        id,
                        results.len()
                    );
                    report.results.insert(id, results);
                }
                Ok((id, Err(e))) => {
                    tracing::warn!("Provider {} search failed: {}", id, e);
                    report.failures.push(e.into_failure(&id));
                }
                Err(e) => {
                    // Task panicked or was cancelled; attribute it generically
                    tracing::warn!("Provider search task aborted: {}", e);
                    report.failures.push(ProviderFailure {
                        provider: "unknown".to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        report
    }

    /// Dispatch a fetch to the named provider.
    pub async fn fetch(
        &self,
        provider_id: &str,
        result: &ProviderSearchResult,
    ) -> Result<ProviderFetchResult> {
        let client = self
            .clients
            .get(provider_id)
            .ok_or_else(|| ReconcileError::UnknownProvider(provider_id.to_string()))?;
        client.fetch(result).await
    }
}
