//! SQLite-backed stores

use crate::{DbError, DbPool, Result};
use app_fs::IndexEntry;
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use serde::{Deserialize, Serialize};

type Conn = PooledConnection<SqliteConnectionManager>;

fn checkout(pool: &DbPool) -> Result<Conn> {
    pool.get().map_err(|e| DbError::Pool(e.to_string()))
}

// ===== Excluded tags =====

/// Backing store for the excluded-keyword set
#[derive(Clone)]
pub struct ExclusionDb {
    pool: DbPool,
}

impl ExclusionDb {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// All stored keywords, sorted
    pub fn load(&self) -> Result<Vec<String>> {
        let conn = checkout(&self.pool)?;
        let mut stmt = conn.prepare("SELECT keyword FROM excluded_tags ORDER BY keyword")?;
        let rows = stmt.query_map([], |row| row.get(0))?;

        let mut keywords = Vec::new();
        for row in rows {
            keywords.push(row?);
        }
        Ok(keywords)
    }

    /// Replace the stored set with `keywords`
    pub fn save(&self, keywords: &[String]) -> Result<()> {
        let mut conn = checkout(&self.pool)?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM excluded_tags", [])?;
        {
            let mut stmt = tx.prepare("INSERT OR IGNORE INTO excluded_tags (keyword) VALUES (?1)")?;
            for keyword in keywords {
                stmt.execute([keyword])?;
            }
        }
        tx.commit()?;

        tracing::debug!(count = keywords.len(), "Excluded tags saved");
        Ok(())
    }
}

// ===== Root bookmarks =====

/// A saved library root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootBookmark {
    pub path: String,
    /// Unix seconds
    pub added_at: i64,
}

/// Persisted set of library roots, keyed by path
#[derive(Clone)]
pub struct RootBookmarks {
    pool: DbPool,
}

impl RootBookmarks {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Saved roots in insertion order
    pub fn list(&self) -> Result<Vec<RootBookmark>> {
        let conn = checkout(&self.pool)?;
        let mut stmt = conn.prepare("SELECT path, added_at FROM roots ORDER BY root_id")?;
        let rows = stmt.query_map([], |row| {
            Ok(RootBookmark {
                path: row.get(0)?,
                added_at: row.get(1)?,
            })
        })?;

        let mut roots = Vec::new();
        for row in rows {
            roots.push(row?);
        }
        Ok(roots)
    }

    /// Save a root; returns false if it was already present
    pub fn add(&self, path: &str) -> Result<bool> {
        let conn = checkout(&self.pool)?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO roots (path, added_at) VALUES (?1, ?2)",
            rusqlite::params![path, chrono::Utc::now().timestamp()],
        )?;
        Ok(inserted > 0)
    }

    /// Forget a root; returns false if it was not saved
    pub fn remove(&self, path: &str) -> Result<bool> {
        let conn = checkout(&self.pool)?;
        let removed = conn.execute("DELETE FROM roots WHERE path = ?1", [path])?;
        Ok(removed > 0)
    }
}

// ===== Directory index =====

/// Row-level access to the directory index
#[derive(Clone)]
pub struct DirectoryIndexDb {
    pool: DbPool,
}

impl DirectoryIndexDb {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Mark every row unseen before a rebuild
    pub fn reset_seen(&self) -> Result<()> {
        let conn = checkout(&self.pool)?;
        conn.execute("UPDATE entries SET seen = 0", [])?;
        Ok(())
    }

    /// Insert or refresh a batch of entries, marking them seen
    pub fn upsert_entries(&self, entries: &[IndexEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut conn = checkout(&self.pool)?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO entries (path, parent, is_dir, size, mtime, seen)
                VALUES (?1, ?2, ?3, ?4, ?5, 1)
                ON CONFLICT(path) DO UPDATE SET
                    parent = excluded.parent,
                    is_dir = excluded.is_dir,
                    size = excluded.size,
                    mtime = excluded.mtime,
                    seen = 1
                "#,
            )?;
            for entry in entries {
                stmt.execute(rusqlite::params![
                    entry.path,
                    entry.parent,
                    entry.is_dir,
                    entry.size.map(|s| s as i64),
                    entry.mtime,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Drop rows not seen since the last `reset_seen`; returns how many went
    pub fn remove_unseen(&self) -> Result<usize> {
        let conn = checkout(&self.pool)?;
        Ok(conn.execute("DELETE FROM entries WHERE seen = 0", [])?)
    }

    /// Children of `parent`, folders first, then by path
    pub fn list_directory(&self, parent: &str) -> Result<Vec<IndexEntry>> {
        self.query(
            "SELECT path, parent, is_dir, size, mtime FROM entries
             WHERE parent = ?1 ORDER BY is_dir DESC, path",
            Some(parent),
        )
    }

    /// Every row ordered by path
    pub fn iter_all(&self) -> Result<Vec<IndexEntry>> {
        self.query("SELECT path, parent, is_dir, size, mtime FROM entries ORDER BY path", None)
    }

    pub fn count(&self) -> Result<usize> {
        let conn = checkout(&self.pool)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn query(&self, sql: &str, parent: Option<&str>) -> Result<Vec<IndexEntry>> {
        let conn = checkout(&self.pool)?;
        let mut stmt = conn.prepare(sql)?;
        let map_row = |row: &rusqlite::Row<'_>| {
            Ok(IndexEntry {
                path: row.get(0)?,
                parent: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                is_dir: row.get(2)?,
                size: row.get::<_, Option<i64>>(3)?.map(|s| s as u64),
                mtime: row.get(4)?,
            })
        };

        let rows = match parent {
            Some(parent) => stmt.query_map([parent], map_row)?,
            None => stmt.query_map([], map_row)?,
        };

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }
}
