//! Known Models Store
//!
//! The set of model identifiers the daemon has been seen to serve, used
//! to populate selection menus. Refreshed from the daemon's tag listing
//! and from successful pulls.

use rusqlite::params;

use crate::error::AppResult;
use crate::storage::Db;

/// Persisted set of known model identifiers.
pub struct KnownModelsStore {
    db: Db,
}

impl KnownModelsStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Record one model identifier, updating its last-seen time.
    pub fn record(&self, model: &str) -> AppResult<()> {
        let conn = self.db.lock().expect("database lock poisoned");
        conn.execute(
            "INSERT INTO known_models (name, last_seen) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET last_seen = excluded.last_seen",
            params![model, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Record a whole daemon listing.
    pub fn record_all(&self, models: &[String]) -> AppResult<()> {
        for model in models {
            self.record(model)?;
        }
        Ok(())
    }

    /// All known identifiers, sorted by name.
    pub fn all(&self) -> AppResult<Vec<String>> {
        let conn = self.db.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare("SELECT name FROM known_models ORDER BY name")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut models = Vec::new();
        for row in rows {
            models.push(row?);
        }
        Ok(models)
    }

    pub fn contains(&self, model: &str) -> AppResult<bool> {
        let conn = self.db.lock().expect("database lock poisoned");
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM known_models WHERE name = ?1",
            params![model],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}
