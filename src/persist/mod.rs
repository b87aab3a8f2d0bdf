pub mod sqlite;

use async_trait::async_trait;

use crate::core::{LibraryData, ProviderGame};
use crate::error::Result;

pub use sqlite::SqliteGateway;

/// Persistence boundary for reconciled games. Durable on return.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Store a canonical game record under a library. Saving the same game
    /// name for the same library replaces the previous record.
    async fn save(&self, game: &ProviderGame, library: &LibraryData) -> Result<()>;

    /// All games saved under a library
    async fn list(&self, library: &LibraryData) -> Result<Vec<ProviderGame>>;

    /// Delete one game from a library; returns whether a record existed
    async fn remove(&self, library: &LibraryData, name: &str) -> Result<bool>;
}
