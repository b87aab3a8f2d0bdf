use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;

use crate::core::{
    GameData, ImageUrls, Platform, ProviderData, ProviderFetchResult, ProviderSearchResult,
};
use crate::error::{ReconcileError, Result};
use crate::http::HttpFetcher;
use crate::providers::{attribute_error, ProviderClient};

pub const PROVIDER_ID: &str = "giantbomb";

/// GiantBomb API client
pub struct GiantBombClient {
    fetcher: Arc<HttpFetcher>,
    base_url: String,
    api_key: String,
}

// GiantBomb envelope status codes
const STATUS_OK: i32 = 1;
const STATUS_INVALID_API_KEY: i32 = 100;
const STATUS_OBJECT_NOT_FOUND: i32 = 101;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status_code: i32,
    #[serde(default)]
    error: String,
    results: Option<T>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    api_detail_url: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    original_release_date: Option<String>,
    #[serde(default)]
    image: Option<Image>,
}

#[derive(Debug, Deserialize)]
struct DetailItem {
    #[serde(default)]
    name: String,
    #[serde(default)]
    deck: Option<String>,
    #[serde(default)]
    original_release_date: Option<String>,
    #[serde(default)]
    genres: Vec<Genre>,
    #[serde(default)]
    image: Option<Image>,
    #[serde(default)]
    images: Vec<Image>,
    #[serde(default)]
    site_detail_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Genre {
    name: String,
}

#[derive(Debug, Deserialize, Default)]
struct Image {
    #[serde(default)]
    thumb_url: Option<String>,
    #[serde(default)]
    super_url: Option<String>,
}

impl GiantBombClient {
    pub fn new(
        fetcher: Arc<HttpFetcher>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// GiantBomb platform ids
    fn platform_id(platform: Platform) -> u32 {
        match platform {
            Platform::Windows => 94,
            Platform::Mac => 17,
            Platform::Linux => 152,
            Platform::Android => 20,
        }
    }

    /// Dates arrive as "YYYY-MM-DD" or "YYYY-MM-DD HH:MM:SS"
    fn parse_date(raw: &Option<String>) -> Option<NaiveDate> {
        let raw = raw.as_deref()?;
        let date_part = raw.get(..10).unwrap_or(raw);
        NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
    }

    fn check_envelope<T>(envelope: Envelope<T>, url: &str) -> Result<Option<T>> {
        match envelope.status_code {
            STATUS_OK => Ok(envelope.results),
            STATUS_INVALID_API_KEY => Err(ReconcileError::ProviderUnavailable {
                provider: PROVIDER_ID.to_string(),
                message: "Invalid API key".to_string(),
            }),
            STATUS_OBJECT_NOT_FOUND => Err(ReconcileError::NotFound {
                provider: PROVIDER_ID.to_string(),
                url: url.to_string(),
            }),
            code => Err(ReconcileError::ProviderResponse {
                provider: PROVIDER_ID.to_string(),
                message: format!("Status {}: {}", code, envelope.error),
            }),
        }
    }
}

#[async_trait]
impl ProviderClient for GiantBombClient {
    async fn search(&self, name: &str, platform: Platform) -> Result<Vec<ProviderSearchResult>> {
        let url = format!("{}/search/", self.base_url);
        let platform_filter = format!("platforms:{}", Self::platform_id(platform));

        let envelope: Envelope<Vec<SearchItem>> = self
            .fetcher
            .get_json(
                &url,
                &[
                    ("api_key", self.api_key.as_str()),
                    ("format", "json"),
                    ("query", name),
                    ("resources", "game"),
                    ("filter", platform_filter.as_str()),
                    (
                        "field_list",
                        "api_detail_url,name,original_release_date,image",
                    ),
                ],
            )
            .await
            .map_err(|e| attribute_error(PROVIDER_ID, e))?;

        let items = Self::check_envelope(envelope, &url)?.unwrap_or_default();

        let results = items
            .into_iter()
            .map(|item| ProviderSearchResult {
                release_date: Self::parse_date(&item.original_release_date),
                score: None, // GiantBomb search exposes no relevance score
                thumbnail_url: item.image.and_then(|i| i.thumb_url),
                api_url: item.api_detail_url,
                name: item.name,
            })
            .collect();

        Ok(results)
    }

    async fn fetch(&self, result: &ProviderSearchResult) -> Result<ProviderFetchResult> {
        let envelope: Envelope<DetailItem> = self
            .fetcher
            .get_json(
                &result.api_url,
                &[
                    ("api_key", self.api_key.as_str()),
                    ("format", "json"),
                    (
                        "field_list",
                        "name,deck,original_release_date,genres,image,images,site_detail_url",
                    ),
                ],
            )
            .await
            .map_err(|e| match e {
                ReconcileError::HttpStatus { url, status: 404 } => ReconcileError::NotFound {
                    provider: PROVIDER_ID.to_string(),
                    url,
                },
                other => attribute_error(PROVIDER_ID, other),
            })?;

        let detail =
            Self::check_envelope(envelope, &result.api_url)?.ok_or_else(|| {
                ReconcileError::ProviderResponse {
                    provider: PROVIDER_ID.to_string(),
                    message: "Missing results object in detail response".to_string(),
                }
            })?;

        let (thumbnail, poster) = match &detail.image {
            Some(image) => (image.thumb_url.clone(), image.super_url.clone()),
            None => (None, None),
        };
        let screenshots = detail
            .images
            .iter()
            .filter_map(|i| i.super_url.clone())
            .collect();

        Ok(ProviderFetchResult {
            provider_data: ProviderData {
                provider_id: PROVIDER_ID.to_string(),
                api_url: result.api_url.clone(),
                site_url: detail.site_detail_url,
            },
            game_data: GameData {
                name: detail.name,
                description: detail.deck,
                release_date: Self::parse_date(&detail.original_release_date),
                critic_score: None,
                user_score: None,
                genres: detail.genres.into_iter().map(|g| g.name).collect(),
            },
            image_urls: ImageUrls {
                thumbnail,
                poster,
                screenshots,
            },
        })
    }

    fn id(&self) -> &str {
        PROVIDER_ID
    }
}
