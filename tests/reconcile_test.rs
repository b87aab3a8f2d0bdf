use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use ludex::{
    Choice, ChoiceHandler, ChooserRequest, GameData, ImageUrls, LibraryData, PersistenceGateway,
    Platform, ProviderClient, ProviderData, ProviderFetchResult, ProviderGame,
    ProviderRegistry, ProviderSearchResult, ReconcileError, ReconcileOutcome, ReconcileRequest,
    ReconciliationService, Result, SearchChooser, SqliteGateway,
};

struct FakeProvider {
    id: &'static str,
    matches: Vec<&'static str>,
    genres: Vec<&'static str>,
}

#[async_trait]
impl ProviderClient for FakeProvider {
    async fn search(&self, _name: &str, _platform: Platform) -> Result<Vec<ProviderSearchResult>> {
        Ok(self
            .matches
            .iter()
            .map(|name| {
                ProviderSearchResult::new(*name, format!("https://{}.example/{}", self.id, name))
            })
            .collect())
    }

    async fn fetch(&self, result: &ProviderSearchResult) -> Result<ProviderFetchResult> {
        Ok(ProviderFetchResult {
            provider_data: ProviderData {
                provider_id: self.id.to_string(),
                api_url: result.api_url.clone(),
                site_url: None,
            },
            game_data: GameData {
                name: result.name.clone(),
                genres: self.genres.iter().map(|g| g.to_string()).collect(),
                ..Default::default()
            },
            image_urls: ImageUrls::default(),
        })
    }

    fn id(&self) -> &str {
        self.id
    }
}

struct BrokenProvider;

#[async_trait]
impl ProviderClient for BrokenProvider {
    async fn search(&self, _name: &str, _platform: Platform) -> Result<Vec<ProviderSearchResult>> {
        Err(ReconcileError::ProviderUnavailable {
            provider: "broken".to_string(),
            message: "connection refused".to_string(),
        })
    }

    async fn fetch(&self, _result: &ProviderSearchResult) -> Result<ProviderFetchResult> {
        unreachable!("search never succeeds")
    }

    fn id(&self) -> &str {
        "broken"
    }
}

struct NoHandler;

#[async_trait]
impl ChoiceHandler for NoHandler {
    async fn present(&self, request: ChooserRequest) -> Choice {
        panic!("unexpected chooser prompt from {}", request.provider_id);
    }
}

fn build_service(providers: Vec<Arc<dyn ProviderClient>>, priority: &[&str]) -> ReconciliationService {
    let registry = Arc::new(ProviderRegistry::new(providers).unwrap());
    let chooser = SearchChooser::new(Arc::new(NoHandler), 90.0, Duration::from_secs(5));
    ReconciliationService::new(
        registry,
        chooser,
        priority.iter().map(|s| s.to_string()).collect(),
        HashSet::new(),
    )
}

#[tokio::test]
async fn test_reconcile_merges_genres_across_providers() {
    let giantbomb: Arc<dyn ProviderClient> = Arc::new(FakeProvider {
        id: "giantbomb",
        matches: vec!["Half-Life 2"],
        genres: vec!["RPG", "Action"],
    });
    let igdb: Arc<dyn ProviderClient> = Arc::new(FakeProvider {
        id: "igdb",
        matches: vec!["Half-Life 2"],
        genres: vec!["Action", "Indie"],
    });

    let service = build_service(vec![giantbomb, igdb], &["giantbomb", "igdb"]);
    let outcome = service
        .reconcile(ReconcileRequest::new(
            "Half-Life 2",
            "/games/hl2",
            Platform::Windows,
        ))
        .await
        .unwrap();

    let ReconcileOutcome::Matched(game) = outcome else {
        panic!("expected a match");
    };
    assert_eq!(game.game_data.genres, vec!["RPG", "Action", "Indie"]);
    assert_eq!(game.provider_data.len(), 2);
}

#[tokio::test]
async fn test_reconcile_survives_a_broken_provider() {
    let giantbomb: Arc<dyn ProviderClient> = Arc::new(FakeProvider {
        id: "giantbomb",
        matches: vec!["Half-Life 2"],
        genres: vec!["FPS"],
    });
    let broken: Arc<dyn ProviderClient> = Arc::new(BrokenProvider);

    let service = build_service(vec![giantbomb, broken], &["giantbomb", "broken"]);
    let outcome = service
        .reconcile(ReconcileRequest::new(
            "Half-Life 2",
            "/games/hl2",
            Platform::Windows,
        ))
        .await
        .unwrap();

    let ReconcileOutcome::Matched(game) = outcome else {
        panic!("expected a match despite the broken provider");
    };
    assert_eq!(game.provider_data.len(), 1);
    assert_eq!(game.provider_data[0].provider_id, "giantbomb");
}

#[tokio::test]
async fn test_reconcile_then_persist_roundtrip() {
    let giantbomb: Arc<dyn ProviderClient> = Arc::new(FakeProvider {
        id: "giantbomb",
        matches: vec!["Half-Life 2"],
        genres: vec!["FPS"],
    });

    let service = build_service(vec![giantbomb], &["giantbomb"]);
    let outcome = service
        .reconcile(ReconcileRequest::new(
            "Half-Life 2",
            "/games/hl2",
            Platform::Windows,
        ))
        .await
        .unwrap();

    let ReconcileOutcome::Matched(game) = outcome else {
        panic!("expected a match");
    };

    let gateway = SqliteGateway::new(":memory:").unwrap();
    let library = LibraryData::new("/games", "Main", Platform::Windows);
    gateway.save(&game, &library).await.unwrap();

    let saved = gateway.list(&library).await.unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0], game);
}

#[tokio::test]
async fn test_concurrent_reconciliations_are_independent() {
    let giantbomb: Arc<dyn ProviderClient> = Arc::new(FakeProvider {
        id: "giantbomb",
        matches: vec!["Half-Life 2"],
        genres: vec!["FPS"],
    });

    let service = Arc::new(build_service(vec![giantbomb], &["giantbomb"]));

    let mut handles = Vec::new();
    for i in 0..8 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service
                .reconcile(ReconcileRequest::new(
                    "Half-Life 2",
                    format!("/games/hl2-{}", i),
                    Platform::Windows,
                ))
                .await
        }));
    }

    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        assert!(matches!(outcome, ReconcileOutcome::Matched(_)));
    }
}

#[tokio::test]
async fn test_registry_reports_partial_failure() {
    let giantbomb: Arc<dyn ProviderClient> = Arc::new(FakeProvider {
        id: "giantbomb",
        matches: vec!["Half-Life 2"],
        genres: vec![],
    });
    let broken: Arc<dyn ProviderClient> = Arc::new(BrokenProvider);

    let registry = ProviderRegistry::new(vec![giantbomb, broken]).unwrap();
    let report = registry.search_all("half-life 2", Platform::Windows).await;

    assert_eq!(report.results.len(), 2);
    assert_eq!(report.results["giantbomb"].len(), 1);
    assert!(report.results["broken"].is_empty());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].provider, "broken");
}

#[tokio::test]
async fn test_search_result_used_across_registry_fetch() {
    let giantbomb: Arc<dyn ProviderClient> = Arc::new(FakeProvider {
        id: "giantbomb",
        matches: vec!["Portal"],
        genres: vec!["Puzzle"],
    });

    let registry = ProviderRegistry::new(vec![giantbomb]).unwrap();
    let report = registry.search_all("portal", Platform::Windows).await;
    let result = report.results["giantbomb"][0].clone();

    let fetched = registry.fetch("giantbomb", &result).await.unwrap();
    assert_eq!(fetched.game_data.name, "Portal");
    assert_eq!(fetched.provider_data.api_url, result.api_url);

    let err = registry.fetch("rawg", &result).await.unwrap_err();
    assert!(matches!(err, ReconcileError::UnknownProvider(_)));
}

#[tokio::test]
async fn test_saved_game_keeps_provenance() {
    let game = ProviderGame {
        game_data: GameData {
            name: "Portal".to_string(),
            ..Default::default()
        },
        image_urls: ImageUrls::default(),
        provider_data: vec![
            ProviderData {
                provider_id: "giantbomb".to_string(),
                api_url: "https://giantbomb.example/portal".to_string(),
                site_url: Some("https://www.giantbomb.com/portal".to_string()),
            },
            ProviderData {
                provider_id: "igdb".to_string(),
                api_url: "https://igdb.example/portal".to_string(),
                site_url: None,
            },
        ],
    };

    let gateway = SqliteGateway::new(":memory:").unwrap();
    let library = LibraryData::new("/games", "Main", Platform::Windows);
    gateway.save(&game, &library).await.unwrap();

    let saved = &gateway.list(&library).await.unwrap()[0];
    assert_eq!(saved.provider_data.len(), 2);
    assert!(saved.provider_entry("giantbomb").unwrap().site_url.is_some());
}
