use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::chooser::{ChoiceHandler, SearchChooser};
use crate::error::{ReconcileError, Result};
use crate::http::HttpFetcher;
use crate::providers::{GiantBombClient, IgdbClient, ProviderClient, ProviderRegistry};
use crate::reconcile::ReconciliationService;

fn default_giantbomb_base() -> String {
    "https://www.giantbomb.com/api".to_string()
}

fn default_igdb_base() -> String {
    "https://api.igdb.com/v4".to_string()
}

fn default_threshold() -> f64 {
    90.0
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_chooser_timeout_secs() -> u64 {
    120
}

/// Per-provider endpoint and credentials, supplied at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProviderConfig {
    GiantBomb {
        #[serde(default = "default_giantbomb_base")]
        base_url: String,
        api_key: String,
    },
    Igdb {
        #[serde(default = "default_igdb_base")]
        base_url: String,
        client_id: String,
        token: String,
    },
}

impl ProviderConfig {
    pub fn id(&self) -> &'static str {
        match self {
            ProviderConfig::GiantBomb { .. } => crate::providers::giantbomb::PROVIDER_ID,
            ProviderConfig::Igdb { .. } => crate::providers::igdb::PROVIDER_ID,
        }
    }
}

/// Full engine configuration. Loadable from JSON by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    pub providers: Vec<ProviderConfig>,

    /// Merge-precedence order, highest priority first. Empty means
    /// declaration order of `providers`.
    #[serde(default)]
    pub priority: Vec<String>,

    /// Providers whose Exclude choice must veto the game
    #[serde(default)]
    pub mandatory: Vec<String>,

    /// Similarity threshold, 0-100, for automatic candidate acceptance
    #[serde(default = "default_threshold")]
    pub auto_accept_threshold: f64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_chooser_timeout_secs")]
    pub chooser_timeout_secs: u64,
}

impl ReconcilerConfig {
    /// Priority list with the empty-list default applied
    pub fn effective_priority(&self) -> Vec<String> {
        if self.priority.is_empty() {
            self.providers.iter().map(|p| p.id().to_string()).collect()
        } else {
            self.priority.clone()
        }
    }

    /// Startup validation. Malformed configuration is fatal here, never
    /// recoverable per-request.
    pub fn validate(&self) -> Result<()> {
        if self.providers.is_empty() {
            return Err(ReconcileError::Config(
                "At least one provider must be configured".to_string(),
            ));
        }

        let mut ids = HashSet::new();
        for provider in &self.providers {
            if !ids.insert(provider.id()) {
                return Err(ReconcileError::Config(format!(
                    "Provider '{}' configured twice",
                    provider.id()
                )));
            }
        }

        for id in self.priority.iter().chain(self.mandatory.iter()) {
            if !ids.contains(id.as_str()) {
                return Err(ReconcileError::Config(format!(
                    "'{}' in priority/mandatory list is not a configured provider",
                    id
                )));
            }
        }

        if !(0.0..=100.0).contains(&self.auto_accept_threshold) {
            return Err(ReconcileError::Config(format!(
                "auto_accept_threshold must be within 0-100, got {}",
                self.auto_accept_threshold
            )));
        }

        Ok(())
    }
}

/// Composition root: build the full engine by explicit construction from
/// configuration, no container in sight.
pub fn build_reconciler(
    config: &ReconcilerConfig,
    handler: Arc<dyn ChoiceHandler>,
) -> Result<ReconciliationService> {
    config.validate()?;

    let fetcher = Arc::new(HttpFetcher::new(Duration::from_secs(
        config.request_timeout_secs,
    ))?);

    let mut clients: Vec<Arc<dyn ProviderClient>> = Vec::new();
    for provider in &config.providers {
        let client: Arc<dyn ProviderClient> = match provider {
            ProviderConfig::GiantBomb { base_url, api_key } => Arc::new(GiantBombClient::new(
                Arc::clone(&fetcher),
                base_url.clone(),
                api_key.clone(),
            )),
            ProviderConfig::Igdb {
                base_url,
                client_id,
                token,
            } => Arc::new(IgdbClient::new(
                Arc::clone(&fetcher),
                base_url.clone(),
                client_id.clone(),
                token.clone(),
            )),
        };
        tracing::info!("Configured provider {}", client.id());
        clients.push(client);
    }

    let registry = Arc::new(ProviderRegistry::new(clients)?);
    let chooser = SearchChooser::new(
        handler,
        config.auto_accept_threshold,
        Duration::from_secs(config.chooser_timeout_secs),
    );

    Ok(ReconciliationService::new(
        registry,
        chooser,
        config.effective_priority(),
        config.mandatory.iter().cloned().collect(),
    ))
}
