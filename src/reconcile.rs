use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::chooser::{Choice, SearchChooser};
use crate::core::{merge_fetch_results, Platform, ProviderFetchResult, ProviderGame};
use crate::error::{ProviderFailure, Result};
use crate::providers::ProviderRegistry;

/// One candidate game to reconcile against the configured providers
#[derive(Debug, Clone)]
pub struct ReconcileRequest {
    pub name: String,
    pub path: PathBuf,
    pub platform: Platform,
}

impl ReconcileRequest {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, platform: Platform) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            platform,
        }
    }
}

/// Terminal result of one reconciliation
#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    /// Canonical record, built from every provider that succeeded
    Matched(ProviderGame),
    /// The chooser excluded this game; no record produced
    Excluded,
    /// No provider contributed data; per-provider errors attached
    Failed(Vec<ProviderFailure>),
}

impl ReconcileOutcome {
    /// Collapse into a plain Result: `Excluded` becomes `Ok(None)`, `Failed`
    /// becomes an `AggregateFailure` error.
    pub fn into_game(self) -> crate::error::Result<Option<ProviderGame>> {
        match self {
            ReconcileOutcome::Matched(game) => Ok(Some(game)),
            ReconcileOutcome::Excluded => Ok(None),
            ReconcileOutcome::Failed(failures) => {
                Err(crate::error::ReconcileError::AggregateFailure(failures))
            }
        }
    }
}

/// Lifecycle of one reconciliation request. `Excluded` and `Failed` are
/// reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileState {
    Pending,
    Searching,
    Choosing,
    Fetching,
    Merging,
    Done,
    Excluded,
    Failed,
}

impl std::fmt::Display for ReconcileState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Orchestrates search, choice, fetch, and merge for candidate games.
///
/// One instance serves any number of concurrent reconciliations; requests
/// share no mutable state, so a chooser waiting on one game never blocks
/// another. Cancellation is dropping the returned future; pending provider
/// tasks are released with nothing but a log line left behind.
pub struct ReconciliationService {
    registry: Arc<ProviderRegistry>,
    chooser: SearchChooser,
    /// Provider ids in merge-precedence order, highest priority first
    priority: Vec<String>,
    mandatory: HashSet<String>,
}

impl ReconciliationService {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        chooser: SearchChooser,
        priority: Vec<String>,
        mandatory: HashSet<String>,
    ) -> Self {
        Self {
            registry,
            chooser,
            priority,
            mandatory,
        }
    }

    fn transition(&self, game: &str, from: &mut ReconcileState, to: ReconcileState) {
        tracing::debug!("[{}] {} -> {}", game, from, to);
        *from = to;
    }

    fn priority_index(&self, provider_id: &str) -> usize {
        self.priority
            .iter()
            .position(|p| p == provider_id)
            .unwrap_or(usize::MAX)
    }

    /// Providers ordered by priority; any registered provider missing from
    /// the priority list trails in sorted order.
    fn ordered_providers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .registry
            .ids()
            .into_iter()
            .map(str::to_string)
            .collect();
        ids.sort_by_key(|id| (self.priority_index(id), id.clone()));
        ids
    }

    /// Run one reconciliation to a terminal state.
    pub async fn reconcile(&self, request: ReconcileRequest) -> Result<ReconcileOutcome> {
        let mut state = ReconcileState::Pending;
        let game = request.name.clone();

        self.transition(&game, &mut state, ReconcileState::Searching);
        let report = self
            .registry
            .search_all(&request.name, request.platform)
            .await;
        let mut failures = report.failures;

        self.transition(&game, &mut state, ReconcileState::Choosing);
        let mut chosen = Vec::new();
        for provider_id in self.ordered_providers() {
            let results = match report.results.get(&provider_id) {
                Some(results) if !results.is_empty() => results.clone(),
                _ => continue,
            };

            let choice = self
                .chooser
                .choose(
                    &request.name,
                    &request.path,
                    request.platform,
                    &provider_id,
                    results,
                )
                .await?;

            match choice {
                Choice::Accept(result) => {
                    tracing::info!("[{}] accepted {} candidate '{}'", game, provider_id, result.name);
                    chosen.push((provider_id, result));
                }
                Choice::Skip => {
                    tracing::info!("[{}] skipped provider {}", game, provider_id);
                }
                Choice::Exclude => {
                    // Exclude aborts the whole game, mandatory or not
                    if self.mandatory.contains(&provider_id) {
                        tracing::info!("[{}] excluded by mandatory provider {}", game, provider_id);
                    } else {
                        tracing::info!("[{}] excluded via provider {}", game, provider_id);
                    }
                    self.transition(&game, &mut state, ReconcileState::Excluded);
                    return Ok(ReconcileOutcome::Excluded);
                }
            }
        }

        if chosen.is_empty() {
            if failures.is_empty() {
                failures.push(ProviderFailure {
                    provider: "none".to_string(),
                    message: format!("No provider produced an accepted candidate for '{}'", game),
                });
            }
            self.transition(&game, &mut state, ReconcileState::Failed);
            return Ok(ReconcileOutcome::Failed(failures));
        }

        self.transition(&game, &mut state, ReconcileState::Fetching);
        let mut tasks = JoinSet::new();
        for (provider_id, result) in chosen {
            let registry = Arc::clone(&self.registry);
            tasks.spawn(async move {
                let outcome = registry.fetch(&provider_id, &result).await;
                (provider_id, outcome)
            });
        }

        let mut successes: Vec<ProviderFetchResult> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((provider_id, Ok(fetched))) => {
                    tracing::debug!("[{}] fetched detail from {}", game, provider_id);
                    successes.push(fetched);
                }
                Ok((provider_id, Err(e))) => {
                    tracing::warn!("[{}] fetch from {} failed: {}", game, provider_id, e);
                    failures.push(e.into_failure(&provider_id));
                }
                Err(e) => {
                    tracing::warn!("[{}] fetch task aborted: {}", game, e);
                    failures.push(ProviderFailure {
                        provider: "unknown".to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        if successes.is_empty() {
            self.transition(&game, &mut state, ReconcileState::Failed);
            return Ok(ReconcileOutcome::Failed(failures));
        }

        self.transition(&game, &mut state, ReconcileState::Merging);
        successes.sort_by_key(|f| self.priority_index(&f.provider_data.provider_id));
        // merge_fetch_results only yields None on empty input, guarded above
        let merged = match merge_fetch_results(&successes) {
            Some(merged) => merged,
            None => {
                self.transition(&game, &mut state, ReconcileState::Failed);
                return Ok(ReconcileOutcome::Failed(failures));
            }
        };

        self.transition(&game, &mut state, ReconcileState::Done);
        tracing::info!(
            "[{}] reconciled from {} provider(s), {} recorded failure(s)",
            game,
            merged.provider_data.len(),
            failures.len()
        );
        Ok(ReconcileOutcome::Matched(merged))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chooser::{ChoiceHandler, ChooserRequest};
    use crate::core::{GameData, ImageUrls, ProviderData, ProviderSearchResult};
    use crate::error::{ReconcileError, Result};
    use crate::providers::ProviderClient;
    use async_trait::async_trait;
    use std::time::Duration;

    struct MockProvider {
        id: &'static str,
        search_results: Vec<ProviderSearchResult>,
        fetch_data: Option<GameData>,
        fetch_delay: Duration,
    }

    #[async_trait]
    impl ProviderClient for MockProvider {
        async fn search(
            &self,
            _name: &str,
            _platform: Platform,
        ) -> Result<Vec<ProviderSearchResult>> {
            Ok(self.search_results.clone())
        }

        async fn fetch(&self, result: &ProviderSearchResult) -> Result<ProviderFetchResult> {
            tokio::time::sleep(self.fetch_delay).await;
            let data = self.fetch_data.clone().ok_or_else(|| {
                ReconcileError::ProviderUnavailable {
                    provider: self.id.to_string(),
                    message: "fetch refused".to_string(),
                }
            })?;
            Ok(ProviderFetchResult {
                provider_data: ProviderData {
                    provider_id: self.id.to_string(),
                    api_url: result.api_url.clone(),
                    site_url: None,
                },
                game_data: data,
                image_urls: ImageUrls::default(),
            })
        }

        fn id(&self) -> &str {
            self.id
        }
    }

    struct NeverHandler;

    #[async_trait]
    impl ChoiceHandler for NeverHandler {
        async fn present(&self, request: ChooserRequest) -> Choice {
            panic!("handler should not be consulted for {}", request.provider_id);
        }
    }

    struct ExcludeHandler;

    #[async_trait]
    impl ChoiceHandler for ExcludeHandler {
        async fn present(&self, _request: ChooserRequest) -> Choice {
            Choice::Exclude
        }
    }

    fn one_result(id: &str, name: &str) -> Vec<ProviderSearchResult> {
        vec![ProviderSearchResult::new(
            name,
            format!("https://{}.example/game/1", id),
        )]
    }

    fn service(
        providers: Vec<Arc<dyn ProviderClient>>,
        handler: Arc<dyn ChoiceHandler>,
        priority: &[&str],
        mandatory: &[&str],
    ) -> ReconciliationService {
        let registry = Arc::new(ProviderRegistry::new(providers).unwrap());
        let chooser = SearchChooser::new(handler, 90.0, Duration::from_secs(5));
        ReconciliationService::new(
            registry,
            chooser,
            priority.iter().map(|s| s.to_string()).collect(),
            mandatory.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn request() -> ReconcileRequest {
        ReconcileRequest::new("Half-Life 2", "/games/hl2", Platform::Windows)
    }

    #[tokio::test]
    async fn test_single_match_end_to_end() {
        // GiantBomb has one match, IGDB has none; no chooser interaction
        let giantbomb = Arc::new(MockProvider {
            id: "giantbomb",
            search_results: one_result("giantbomb", "Half-Life 2"),
            fetch_data: Some(GameData {
                name: "Half-Life 2".to_string(),
                description: Some("City 17.".to_string()),
                ..Default::default()
            }),
            fetch_delay: Duration::ZERO,
        });
        let igdb = Arc::new(MockProvider {
            id: "igdb",
            search_results: Vec::new(),
            fetch_data: None,
            fetch_delay: Duration::ZERO,
        });

        let service = service(
            vec![giantbomb, igdb],
            Arc::new(NeverHandler),
            &["giantbomb", "igdb"],
            &[],
        );

        let outcome = service.reconcile(request()).await.unwrap();
        match outcome {
            ReconcileOutcome::Matched(game) => {
                assert_eq!(game.game_data.name, "Half-Life 2");
                assert_eq!(game.provider_data.len(), 1);
                assert_eq!(game.provider_data[0].provider_id, "giantbomb");
            }
            other => panic!("expected Matched, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_merge_priority_independent_of_completion_order() {
        // Both set a description; giantbomb has priority but finishes last
        let giantbomb = Arc::new(MockProvider {
            id: "giantbomb",
            search_results: one_result("giantbomb", "Half-Life 2"),
            fetch_data: Some(GameData {
                name: "Half-Life 2".to_string(),
                description: Some("From GiantBomb".to_string()),
                ..Default::default()
            }),
            fetch_delay: Duration::from_millis(50),
        });
        let igdb = Arc::new(MockProvider {
            id: "igdb",
            search_results: one_result("igdb", "Half-Life 2"),
            fetch_data: Some(GameData {
                name: "Half-Life 2".to_string(),
                description: Some("From IGDB".to_string()),
                critic_score: Some(93.5),
                ..Default::default()
            }),
            fetch_delay: Duration::ZERO,
        });

        let service = service(
            vec![giantbomb, igdb],
            Arc::new(NeverHandler),
            &["giantbomb", "igdb"],
            &[],
        );

        let outcome = service.reconcile(request()).await.unwrap();
        match outcome {
            ReconcileOutcome::Matched(game) => {
                assert_eq!(game.game_data.description.as_deref(), Some("From GiantBomb"));
                assert_eq!(game.game_data.critic_score, Some(93.5));
                assert_eq!(game.provider_data.len(), 2);
                assert_eq!(game.provider_data[0].provider_id, "giantbomb");
            }
            other => panic!("expected Matched, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_mandatory_exclude_wins_over_success() {
        // giantbomb would succeed, but the ambiguous igdb candidates draw an
        // Exclude from the handler
        let giantbomb = Arc::new(MockProvider {
            id: "giantbomb",
            search_results: one_result("giantbomb", "Half-Life 2"),
            fetch_data: Some(GameData::default()),
            fetch_delay: Duration::ZERO,
        });
        let igdb = Arc::new(MockProvider {
            id: "igdb",
            search_results: vec![
                ProviderSearchResult::new("Half-Life 2", "https://igdb.example/1"),
                ProviderSearchResult::new("Half-Life 2 RTX", "https://igdb.example/2"),
            ],
            fetch_data: Some(GameData::default()),
            fetch_delay: Duration::ZERO,
        });

        let service = service(
            vec![giantbomb, igdb],
            Arc::new(ExcludeHandler),
            &["igdb", "giantbomb"],
            &["igdb"],
        );

        let outcome = service.reconcile(request()).await.unwrap();
        assert!(matches!(outcome, ReconcileOutcome::Excluded));
    }

    #[tokio::test]
    async fn test_all_fetches_fail() {
        let giantbomb = Arc::new(MockProvider {
            id: "giantbomb",
            search_results: one_result("giantbomb", "Half-Life 2"),
            fetch_data: None,
            fetch_delay: Duration::ZERO,
        });
        let igdb = Arc::new(MockProvider {
            id: "igdb",
            search_results: one_result("igdb", "Half-Life 2"),
            fetch_data: None,
            fetch_delay: Duration::ZERO,
        });

        let service = service(
            vec![giantbomb, igdb],
            Arc::new(NeverHandler),
            &["giantbomb", "igdb"],
            &[],
        );

        let outcome = service.reconcile(request()).await.unwrap();
        match outcome {
            ReconcileOutcome::Failed(failures) => {
                assert_eq!(failures.len(), 2);
                let providers: Vec<&str> =
                    failures.iter().map(|f| f.provider.as_str()).collect();
                assert!(providers.contains(&"giantbomb"));
                assert!(providers.contains(&"igdb"));
            }
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_partial_fetch_failure_still_matches() {
        let giantbomb = Arc::new(MockProvider {
            id: "giantbomb",
            search_results: one_result("giantbomb", "Half-Life 2"),
            fetch_data: None, // fetch fails after choice
            fetch_delay: Duration::ZERO,
        });
        let igdb = Arc::new(MockProvider {
            id: "igdb",
            search_results: one_result("igdb", "Half-Life 2"),
            fetch_data: Some(GameData {
                name: "Half-Life 2".to_string(),
                ..Default::default()
            }),
            fetch_delay: Duration::ZERO,
        });

        let service = service(
            vec![giantbomb, igdb],
            Arc::new(NeverHandler),
            &["giantbomb", "igdb"],
            &[],
        );

        let outcome = service.reconcile(request()).await.unwrap();
        match outcome {
            ReconcileOutcome::Matched(game) => {
                assert_eq!(game.provider_data.len(), 1);
                assert_eq!(game.provider_data[0].provider_id, "igdb");
            }
            other => panic!("expected Matched, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_outcome_into_game() {
        assert!(ReconcileOutcome::Excluded.into_game().unwrap().is_none());

        let failed = ReconcileOutcome::Failed(vec![ProviderFailure {
            provider: "igdb".to_string(),
            message: "down".to_string(),
        }]);
        assert!(matches!(
            failed.into_game(),
            Err(crate::error::ReconcileError::AggregateFailure(f)) if f.len() == 1
        ));
    }

    #[tokio::test]
    async fn test_no_candidates_anywhere() {
        let giantbomb = Arc::new(MockProvider {
            id: "giantbomb",
            search_results: Vec::new(),
            fetch_data: None,
            fetch_delay: Duration::ZERO,
        });

        let service = service(
            vec![giantbomb],
            Arc::new(NeverHandler),
            &["giantbomb"],
            &[],
        );

        let outcome = service.reconcile(request()).await.unwrap();
        match outcome {
            ReconcileOutcome::Failed(failures) => {
                assert_eq!(failures.len(), 1);
                assert!(failures[0].message.contains("Half-Life 2"));
            }
            other => panic!("expected Failed, got {:?}", other),
        }
    }
}
