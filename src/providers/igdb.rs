use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use std::sync::Arc;

use crate::core::{
    GameData, ImageUrls, Platform, ProviderData, ProviderFetchResult, ProviderSearchResult,
};
use crate::error::{ReconcileError, Result};
use crate::http::HttpFetcher;
use crate::providers::{attribute_error, ProviderClient};

pub const PROVIDER_ID: &str = "igdb";

const IMAGE_BASE: &str = "https://images.igdb.com/igdb/image/upload";
const SEARCH_LIMIT: usize = 20;

/// IGDB API client (v4, Apicalypse query protocol)
pub struct IgdbClient {
    fetcher: Arc<HttpFetcher>,
    base_url: String,
    client_id: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct IgdbGame {
    id: u64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    summary: Option<String>,
    /// Unix timestamp of the first release
    #[serde(default)]
    first_release_date: Option<i64>,
    #[serde(default)]
    aggregated_rating: Option<f64>,
    #[serde(default)]
    rating: Option<f64>,
    #[serde(default)]
    genres: Vec<IgdbGenre>,
    #[serde(default)]
    cover: Option<IgdbImage>,
    #[serde(default)]
    screenshots: Vec<IgdbImage>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IgdbGenre {
    name: String,
}

#[derive(Debug, Deserialize)]
struct IgdbImage {
    image_id: String,
}

impl IgdbClient {
    pub fn new(
        fetcher: Arc<HttpFetcher>,
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            token: token.into(),
        }
    }

    /// IGDB platform ids
    fn platform_id(platform: Platform) -> u32 {
        match platform {
            Platform::Windows => 6,
            Platform::Mac => 14,
            Platform::Linux => 3,
            Platform::Android => 34,
        }
    }

    fn games_url(&self) -> String {
        format!("{}/games", self.base_url)
    }

    /// The api_url stored on search results encodes the game id as the last
    /// path segment; fetch recovers it from there.
    fn game_id_from_url(api_url: &str) -> Result<u64> {
        api_url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| ReconcileError::ProviderResponse {
                provider: PROVIDER_ID.to_string(),
                message: format!("Cannot extract game id from '{}'", api_url),
            })
    }

    fn image_url(image_id: &str, size: &str) -> String {
        format!("{}/t_{}/{}.jpg", IMAGE_BASE, size, image_id)
    }

    fn parse_timestamp(ts: Option<i64>) -> Option<NaiveDate> {
        ts.and_then(|t| DateTime::from_timestamp(t, 0))
            .map(|dt| dt.date_naive())
    }

    async fn query(&self, body: String) -> Result<Vec<IgdbGame>> {
        let auth = format!("Bearer {}", self.token);
        self.fetcher
            .post_json(
                &self.games_url(),
                &[
                    ("Client-ID", self.client_id.as_str()),
                    ("Authorization", auth.as_str()),
                    ("Accept", "application/json"),
                ],
                &body,
            )
            .await
            .map_err(|e| attribute_error(PROVIDER_ID, e))
    }

    fn to_fetch_result(&self, game: IgdbGame, api_url: &str) -> ProviderFetchResult {
        let thumbnail = game
            .cover
            .as_ref()
            .map(|c| Self::image_url(&c.image_id, "thumb"));
        let poster = game
            .cover
            .as_ref()
            .map(|c| Self::image_url(&c.image_id, "1080p"));
        let screenshots = game
            .screenshots
            .iter()
            .map(|s| Self::image_url(&s.image_id, "1080p"))
            .collect();

        ProviderFetchResult {
            provider_data: ProviderData {
                provider_id: PROVIDER_ID.to_string(),
                api_url: api_url.to_string(),
                site_url: game.url,
            },
            game_data: GameData {
                name: game.name,
                description: game.summary,
                release_date: Self::parse_timestamp(game.first_release_date),
                critic_score: game.aggregated_rating,
                user_score: game.rating,
                genres: game.genres.into_iter().map(|g| g.name).collect(),
            },
            image_urls: ImageUrls {
                thumbnail,
                poster,
                screenshots,
            },
        }
    }
}

#[async_trait]
impl ProviderClient for IgdbClient {
    async fn search(&self, name: &str, platform: Platform) -> Result<Vec<ProviderSearchResult>> {
        let escaped = name.replace('"', "\\\"");
        let body = format!(
            "search \"{}\"; \
             fields name,first_release_date,aggregated_rating,cover.image_id; \
             where release_dates.platform = {}; \
             limit {};",
            escaped,
            Self::platform_id(platform),
            SEARCH_LIMIT
        );

        let games = self.query(body).await?;

        let results = games
            .into_iter()
            .map(|game| ProviderSearchResult {
                api_url: format!("{}/{}", self.games_url(), game.id),
                release_date: Self::parse_timestamp(game.first_release_date),
                score: game.aggregated_rating,
                thumbnail_url: game
                    .cover
                    .as_ref()
                    .map(|c| Self::image_url(&c.image_id, "thumb")),
                name: game.name,
            })
            .collect();

        Ok(results)
    }

    async fn fetch(&self, result: &ProviderSearchResult) -> Result<ProviderFetchResult> {
        let id = Self::game_id_from_url(&result.api_url)?;
        let body = format!(
            "fields name,summary,first_release_date,aggregated_rating,rating,\
             genres.name,cover.image_id,screenshots.image_id,url; \
             where id = {};",
            id
        );

        let mut games = self.query(body).await?;
        if games.is_empty() {
            return Err(ReconcileError::NotFound {
                provider: PROVIDER_ID.to_string(),
                url: result.api_url.clone(),
            });
        }

        Ok(self.to_fetch_result(games.remove(0), &result.api_url))
    }

    fn id(&self) -> &str {
        PROVIDER_ID
    }
}
