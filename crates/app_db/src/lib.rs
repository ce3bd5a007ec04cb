//! MediaShelf database layer
//!
//! SQLite storage for the small amount of state that outlives a session:
//! - Excluded tag keywords
//! - Saved library roots
//! - The optional per-root directory index

mod sqlite;
mod schema;
mod pool;

pub use sqlite::{ExclusionDb, RootBookmark, RootBookmarks, DirectoryIndexDb};
pub use pool::{DbPool, init_pool, init_memory_pool};
pub use schema::migrate;

use std::path::{Path, PathBuf};
use directories::ProjectDirs;
use thiserror::Error;

/// Database errors
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Get the database directory
pub fn db_dir() -> PathBuf {
    ProjectDirs::from("com", "MediaShelf", "MediaShelf")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./data"))
}

/// Open (creating and migrating if needed) the application database
pub fn init() -> Result<DbPool> {
    let dir = db_dir();
    std::fs::create_dir_all(&dir)?;
    open(&dir.join("media_shelf.db"))
}

/// Open and migrate a database file at an explicit location
pub fn open(path: &Path) -> Result<DbPool> {
    let pool = init_pool(path)?;
    migrate(&pool)?;
    tracing::info!("Database initialized at {:?}", path);
    Ok(pool)
}
