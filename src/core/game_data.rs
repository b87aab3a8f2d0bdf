use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Platforms a library folder can be registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Linux,
    Mac,
    Android,
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "windows" | "pc" => Ok(Platform::Windows),
            "linux" => Ok(Platform::Linux),
            "mac" | "macos" => Ok(Platform::Mac),
            "android" => Ok(Platform::Android),
            other => Err(format!("Unknown platform: {}", other)),
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Platform::Windows => "windows",
            Platform::Linux => "linux",
            Platform::Mac => "mac",
            Platform::Android => "android",
        };
        write!(f, "{}", name)
    }
}

/// One candidate match returned by a provider's search endpoint.
///
/// `api_url` is the opaque key used to fetch full detail; everything else is
/// display material for the chooser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSearchResult {
    pub name: String,
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
    /// Provider-reported score, 0-100, when the provider exposes one
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    pub api_url: String,
}

impl ProviderSearchResult {
    pub fn new(name: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            release_date: None,
            score: None,
            thumbnail_url: None,
            api_url: api_url.into(),
        }
    }

    /// Display name for logging and chooser prompts
    pub fn display_name(&self) -> String {
        match self.release_date {
            Some(date) => format!("{} ({})", self.name, date.format("%Y")),
            None => self.name.clone(),
        }
    }
}

/// Provenance entry for one provider's contribution to a merged record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderData {
    pub provider_id: String,
    pub api_url: String,
    #[serde(default)]
    pub site_url: Option<String>,
}

/// Canonical per-provider game facts prior to merge
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameData {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
    /// Critic score, 0-100
    #[serde(default)]
    pub critic_score: Option<f64>,
    /// User score, 0-100
    #[serde(default)]
    pub user_score: Option<f64>,
    #[serde(default)]
    pub genres: Vec<String>,
}

/// Image URLs extracted from one provider (or merged across providers)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageUrls {
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default)]
    pub screenshots: Vec<String>,
}

/// Full detail for one chosen candidate from one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderFetchResult {
    pub provider_data: ProviderData,
    pub game_data: GameData,
    pub image_urls: ImageUrls,
}

/// The merged, multi-provider canonical game record.
///
/// Invariant: `provider_data` holds at most one entry per provider id,
/// ordered by the configured provider priority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderGame {
    pub game_data: GameData,
    pub image_urls: ImageUrls,
    pub provider_data: Vec<ProviderData>,
}

impl ProviderGame {
    /// Provenance lookup by provider id
    pub fn provider_entry(&self, provider_id: &str) -> Option<&ProviderData> {
        self.provider_data
            .iter()
            .find(|p| p.provider_id == provider_id)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// A scan root the user registered. Canonical game records reference a
/// library; they do not own it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryData {
    pub path: PathBuf,
    pub name: String,
    pub platform: Platform,
}

impl LibraryData {
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>, platform: Platform) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            platform,
        }
    }
}
