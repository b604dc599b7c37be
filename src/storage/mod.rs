//! Session Persistence
//!
//! Embedded SQLite storage for the two pieces of session state that
//! outlive a process: the bounded conversation history and the set of
//! known model identifiers. Both stores share one connection behind
//! narrow call surfaces; nothing else in the core reads the database.

pub mod conversation;
pub mod known_models;

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::error::AppResult;

pub use conversation::ConversationStore;
pub use known_models::KnownModelsStore;

/// Shared database handle.
pub type Db = Arc<Mutex<Connection>>;

/// Open (or create) the session database and its tables.
pub fn open_database(path: &Path) -> AppResult<Db> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    create_tables(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// In-memory database for tests.
pub fn open_in_memory() -> AppResult<Db> {
    let conn = Connection::open_in_memory()?;
    create_tables(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

fn create_tables(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            role TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS known_models (
            name TEXT PRIMARY KEY,
            last_seen TEXT NOT NULL
        );",
    )?;
    Ok(())
}
