use std::path::Path;

use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::errors::DatabaseError;

pub type Pool = r2d2::Pool<SqliteConnectionManager>;
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS syndication_mappings (
    ghost_post_id TEXT PRIMARY KEY,
    payload TEXT NOT NULL,
    syndicated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS interaction_data (
    ghost_post_id TEXT PRIMARY KEY,
    payload TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS received_webmentions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source TEXT NOT NULL,
    target TEXT NOT NULL,
    payload TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE(source, target)
);

CREATE TABLE IF NOT EXISTS replies (
    id TEXT PRIMARY KEY,
    target TEXT NOT NULL,
    author_name TEXT NOT NULL,
    author_url TEXT,
    content TEXT NOT NULL,
    ip_hash TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_received_webmentions_target ON received_webmentions(target);
CREATE INDEX IF NOT EXISTS idx_replies_target ON replies(target);
CREATE INDEX IF NOT EXISTS idx_replies_ip_hash ON replies(ip_hash, created_at);
";

/// Opens (creating if absent) the SQLite database at `db_path`, applies the
/// schema, and returns a connection pool. A single pool is shared across
/// all of the stores in this crate, matching the teacher's one-pool-per-
/// service convention.
pub fn init_pool(db_path: &Path) -> Result<Pool, DatabaseError> {
    let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
    });
    let pool = Pool::builder().max_size(8).build(manager)?;
    let conn = pool.get()?;
    apply_schema(&conn)?;
    Ok(pool)
}

fn apply_schema(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_pool_creates_schema() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.sqlite3");
        let pool = init_pool(&db_path).unwrap();
        let conn = pool.get().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type='table' AND name='interaction_data'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }
}
