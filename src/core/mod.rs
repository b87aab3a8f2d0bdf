pub mod game_data;
pub mod merge;

pub use game_data::{
    GameData, ImageUrls, LibraryData, Platform, ProviderData, ProviderFetchResult, ProviderGame,
    ProviderSearchResult,
};
pub use merge::merge_fetch_results;
