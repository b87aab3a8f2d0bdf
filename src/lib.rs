//! # Ludex
//!
//! Game-library reconciliation engine with:
//! - Multi-provider metadata aggregation (GiantBomb, IGDB)
//! - Automatic or deferred candidate choice with fuzzy matching
//! - Priority-ordered field merge into one canonical game record
//! - SQLite persistence for curated libraries
//! - Async/await architecture
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use ludex::{build_reconciler, Platform, ReconcileOutcome, ReconcileRequest, ReconcilerConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config: ReconcilerConfig = serde_json::from_str(&std::fs::read_to_string("ludex.json")?)?;
//!     let service = build_reconciler(&config, Arc::new(ludex::policy::SkipAll))?;
//!
//!     let request = ReconcileRequest::new("Half-Life 2", "/games/hl2", Platform::Windows);
//!     match service.reconcile(request).await? {
//!         ReconcileOutcome::Matched(game) => println!("Matched: {}", game.game_data.name),
//!         ReconcileOutcome::Excluded => println!("Excluded"),
//!         ReconcileOutcome::Failed(errors) => println!("Failed: {} error(s)", errors.len()),
//!     }
//!     Ok(())
//! }
//! ```

pub mod chooser;
pub mod config;
pub mod core;
pub mod error;
pub mod http;
pub mod persist;
pub mod providers;
pub mod reconcile;
pub mod scan;

// Re-export primary types
pub use chooser::{Choice, ChoiceHandler, ChooserRequest, SearchChooser};
pub use config::{build_reconciler, ProviderConfig, ReconcilerConfig};
pub use crate::core::{
    GameData, ImageUrls, LibraryData, Platform, ProviderData, ProviderFetchResult, ProviderGame,
    ProviderSearchResult,
};
pub use error::{ProviderFailure, ReconcileError, Result};
pub use http::HttpFetcher;
pub use persist::{PersistenceGateway, SqliteGateway};
pub use providers::{ProviderClient, ProviderRegistry, SearchReport};
pub use reconcile::{ReconcileOutcome, ReconcileRequest, ReconcileState, ReconciliationService};
pub use scan::{scan_library, CandidateGame};

/// Built-in chooser policies for headless use.
pub mod policy {
    use crate::chooser::{Choice, ChoiceHandler, ChooserRequest};
    use async_trait::async_trait;

    /// Skips every ambiguous provider; only unambiguous candidates match.
    pub struct SkipAll;

    #[async_trait]
    impl ChoiceHandler for SkipAll {
        async fn present(&self, _request: ChooserRequest) -> Choice {
            Choice::Skip
        }
    }

    /// Accepts the first filtered candidate, falling back to the first
    /// overall; skips only when nothing is left.
    pub struct FirstMatch;

    #[async_trait]
    impl ChoiceHandler for FirstMatch {
        async fn present(&self, request: ChooserRequest) -> Choice {
            request
                .filtered_results
                .first()
                .or_else(|| request.results.first())
                .map(|r| Choice::Accept(r.clone()))
                .unwrap_or(Choice::Skip)
        }
    }
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
