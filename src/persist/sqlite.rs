use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

use crate::core::{LibraryData, ProviderGame};
use crate::error::Result;
use crate::persist::PersistenceGateway;

/// SQLite-backed persistence gateway.
///
/// Schema:
/// ```sql
/// CREATE TABLE libraries (
///     path TEXT PRIMARY KEY,
///     name TEXT NOT NULL,
///     platform TEXT NOT NULL
/// );
/// CREATE TABLE games (
///     library_path TEXT NOT NULL,
///     name TEXT NOT NULL,
///     game_data TEXT NOT NULL,
///     saved_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
///     PRIMARY KEY (library_path, name)
/// );
/// ```
pub struct SqliteGateway {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteGateway {
    /// Open (or create) the database at `db_path`; ":memory:" works for tests.
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS libraries (
                path TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                platform TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS games (
                library_path TEXT NOT NULL,
                name TEXT NOT NULL,
                game_data TEXT NOT NULL,
                saved_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (library_path, name)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_games_library ON games(library_path)",
            [],
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn library_key(library: &LibraryData) -> String {
        library.path.to_string_lossy().into_owned()
    }
}

#[async_trait]
impl PersistenceGateway for SqliteGateway {
    async fn save(&self, game: &ProviderGame, library: &LibraryData) -> Result<()> {
        let key = Self::library_key(library);
        let game_json = game.to_json()?;
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT OR REPLACE INTO libraries (path, name, platform) VALUES (?1, ?2, ?3)",
            params![key, library.name, library.platform.to_string()],
        )?;

        conn.execute(
            "INSERT OR REPLACE INTO games (library_path, name, game_data, saved_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![key, game.game_data.name, game_json, Utc::now().to_rfc3339()],
        )?;

        Ok(())
    }

    async fn list(&self, library: &LibraryData) -> Result<Vec<ProviderGame>> {
        let key = Self::library_key(library);
        let conn = self.conn.lock().unwrap();

        let mut statement = conn.prepare(
            "SELECT game_data FROM games WHERE library_path = ?1 ORDER BY name",
        )?;
        let rows = statement.query_map(params![key], |row| row.get::<_, String>(0))?;

        let mut games = Vec::new();
        for row in rows {
            games.push(ProviderGame::from_json(&row?)?);
        }
        Ok(games)
    }

    async fn remove(&self, library: &LibraryData, name: &str) -> Result<bool> {
        let key = Self::library_key(library);
        let conn = self.conn.lock().unwrap();

        let deleted = conn.execute(
            "DELETE FROM games WHERE library_path = ?1 AND name = ?2",
            params![key, name],
        )?;

        Ok(deleted > 0)
    }
}
