use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;

use crate::database::Pool;
use crate::errors::DatabaseError;

use super::types::Reply;

/// Owns the `replies` table (spec §4.M).
pub struct ReplyStore {
    pool: Pool,
}

impl ReplyStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn add(&self, reply: &Reply) -> Result<(), DatabaseError> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO replies (id, target, author_name, author_url, content, ip_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                reply.id,
                reply.target,
                reply.author_name,
                reply.author_url,
                reply.content,
                reply.ip_hash,
                reply.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<Reply>, DatabaseError> {
        let conn = self.pool.get()?;
        conn.query_row(
            "SELECT id, target, author_name, author_url, content, ip_hash, created_at
             FROM replies WHERE id = ?1",
            [id],
            |row| {
                let created_at: String = row.get(6)?;
                Ok(Reply {
                    id: row.get(0)?,
                    target: row.get(1)?,
                    author_name: row.get(2)?,
                    author_url: row.get(3)?,
                    content: row.get(4)?,
                    ip_hash: row.get(5)?,
                    created_at: DateTime::parse_from_rfc3339(&created_at)
                        .unwrap_or_else(|_| Utc::now().into())
                        .with_timezone(&Utc),
                })
            },
        )
        .optional()
        .map_err(DatabaseError::from)
    }

    /// Counts replies from `ip_hash` received since `since`, backing the
    /// per-IP rate limit on `/api/webmention/reply` (spec §4.M: 5/hour).
    pub fn count_since(&self, ip_hash: &str, since: DateTime<Utc>) -> Result<i64, DatabaseError> {
        let conn = self.pool.get()?;
        Ok(conn.query_row(
            "SELECT count(*) FROM replies WHERE ip_hash = ?1 AND created_at >= ?2",
            rusqlite::params![ip_hash, since.to_rfc3339()],
            |row| row.get(0),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::init_pool;
    use chrono::Duration;

    fn store() -> (ReplyStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let pool = init_pool(&dir.path().join("test.sqlite3")).unwrap();
        (ReplyStore::new(pool), dir)
    }

    fn sample(id: &str, ip_hash: &str) -> Reply {
        Reply {
            id: id.to_owned(),
            author_name: "Carol".to_owned(),
            author_url: None,
            content: "Nice post!".to_owned(),
            target: "https://blog.example.com/my-post/".to_owned(),
            ip_hash: ip_hash.to_owned(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_add_then_get() {
        let (store, _dir) = store();
        let reply = sample("abcd1234abcd1234", "deadbeefdeadbeef");
        store.add(&reply).unwrap();
        let fetched = store.get(&reply.id).unwrap().unwrap();
        assert_eq!(fetched.author_name, "Carol");
        assert_eq!(fetched.ip_hash, "deadbeefdeadbeef");
    }

    #[test]
    fn test_count_since_scopes_by_ip_hash() {
        let (store, _dir) = store();
        store.add(&sample("id1", "hash-a")).unwrap();
        store.add(&sample("id2", "hash-a")).unwrap();
        store.add(&sample("id3", "hash-b")).unwrap();

        let since = Utc::now() - Duration::hours(1);
        assert_eq!(store.count_since("hash-a", since).unwrap(), 2);
        assert_eq!(store.count_since("hash-b", since).unwrap(), 1);
        assert_eq!(store.count_since("hash-c", since).unwrap(), 0);
    }
}
