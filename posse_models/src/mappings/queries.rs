use std::fs;
use std::path::PathBuf;

use rusqlite::OptionalExtension;
use serde_json::Value;

use crate::database::Pool;
use crate::errors::DatabaseError;

use super::types::{identity_key, MappingEntry, SyndicationMapping};

/// Owns the `syndication_mappings` table plus the legacy-JSON-file
/// fallback/backfill path described in spec §6 "Persisted state".
pub struct MappingStore {
    pool: Pool,
    storage_root: PathBuf,
}

impl MappingStore {
    pub fn new(pool: Pool, storage_root: PathBuf) -> Self {
        Self { pool, storage_root }
    }

    fn legacy_path(&self, id: &str) -> PathBuf {
        self.storage_root
            .join("syndication_mappings")
            .join(format!("{id}.json"))
    }

    /// Reads the mapping for `id`, falling back to a legacy JSON file and
    /// backfilling it into SQLite on success.
    pub fn get_mapping(&self, id: &str) -> Result<Option<SyndicationMapping>, DatabaseError> {
        let conn = self.pool.get()?;
        let row: Option<String> = conn
            .query_row(
                "SELECT payload FROM syndication_mappings WHERE ghost_post_id = ?1",
                [id],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(payload) = row {
            return Ok(Some(serde_json::from_str(&payload)?));
        }

        let legacy_path = self.legacy_path(id);
        if legacy_path.exists() {
            let raw = fs::read_to_string(&legacy_path)?;
            let mapping: SyndicationMapping = serde_json::from_str(&raw)?;
            self.put_mapping(id, &mapping)?;
            return Ok(Some(mapping));
        }

        Ok(None)
    }

    /// Overwrites the whole mapping record for `id`. Used for the legacy
    /// backfill path and by the migration tool; dispatcher code should
    /// prefer `put_mapping_entry` so sibling entries are preserved.
    pub fn put_mapping(&self, id: &str, mapping: &SyndicationMapping) -> Result<(), DatabaseError> {
        let conn = self.pool.get()?;
        let payload = serde_json::to_string(mapping)?;
        conn.execute(
            "INSERT INTO syndication_mappings (ghost_post_id, payload, syndicated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(ghost_post_id) DO UPDATE SET payload = excluded.payload, syndicated_at = excluded.syndicated_at",
            rusqlite::params![id, payload, mapping.syndicated_at.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Read-modify-write of a single `(platform, account)` entry, per
    /// spec §4.G. Never touches entries for any other `(platform, account)`
    /// pair (the sibling-preservation invariant, spec §8 property #2).
    pub fn put_mapping_entry(
        &self,
        id: &str,
        ghost_post_url: &str,
        platform: &str,
        account: &str,
        post_data: Value,
        is_split: bool,
    ) -> Result<SyndicationMapping, DatabaseError> {
        let mut mapping = self
            .get_mapping(id)?
            .unwrap_or_else(|| SyndicationMapping::new(ghost_post_url));

        let platform_map = mapping.platforms.entry(platform.to_owned()).or_default();

        if is_split {
            let new_key = identity_key(&post_data).cloned();
            let mut entries = platform_map
                .remove(account)
                .map(MappingEntry::into_split_vec)
                .unwrap_or_default();
            let already_present = new_key
                .as_ref()
                .is_some_and(|k| entries.iter().any(|e| identity_key(e) == Some(k)));
            if !already_present {
                entries.push(post_data);
            }
            platform_map.insert(account.to_owned(), MappingEntry::Split(entries));
        } else {
            platform_map.insert(account.to_owned(), MappingEntry::Single(post_data));
        }

        self.put_mapping(id, &mapping)?;
        Ok(mapping)
    }

    /// Read-modify-write of just `webmention_links_sent`, per spec §4.K:
    /// never touches `platforms`, mirroring the sibling-preservation
    /// discipline of `put_mapping_entry`.
    pub fn set_webmention_links_sent(
        &self,
        id: &str,
        ghost_post_url: &str,
        links: Vec<String>,
    ) -> Result<(), DatabaseError> {
        let mut mapping = self
            .get_mapping(id)?
            .unwrap_or_else(|| SyndicationMapping::new(ghost_post_url));
        mapping.webmention_links_sent = links;
        self.put_mapping(id, &mapping)
    }

    /// Lists every `ghost_post_id` with a stored mapping, for the
    /// scheduler's `SYNC_ALL` enumeration (spec §4.I).
    pub fn list_ids(&self) -> Result<Vec<String>, DatabaseError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare("SELECT ghost_post_id FROM syndication_mappings")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::init_pool;
    use serde_json::json;

    fn store() -> (MappingStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let pool = init_pool(&dir.path().join("test.sqlite3")).unwrap();
        (MappingStore::new(pool, dir.path().to_path_buf()), dir)
    }

    #[test]
    fn test_put_then_get_roundtrip() {
        let (store, _dir) = store();
        let mut mapping = SyndicationMapping::new("https://blog.example.com/p/");
        mapping
            .platforms
            .entry("mastodon".to_owned())
            .or_default()
            .insert("A".to_owned(), MappingEntry::Single(json!({"status_id": "1"})));
        store.put_mapping("abc123", &mapping).unwrap();
        let fetched = store.get_mapping("abc123").unwrap().unwrap();
        assert_eq!(fetched.ghost_post_url, mapping.ghost_post_url);
        assert!(fetched.platforms.contains_key("mastodon"));
    }

    #[test]
    fn test_sibling_preservation() {
        let (store, _dir) = store();
        store
            .put_mapping_entry(
                "post1",
                "https://blog.example.com/p/",
                "mastodon",
                "A",
                json!({"status_id": "a1"}),
                false,
            )
            .unwrap();
        store
            .put_mapping_entry(
                "post1",
                "https://blog.example.com/p/",
                "mastodon",
                "B",
                json!({"status_id": "b1"}),
                false,
            )
            .unwrap();
        let mapping = store.get_mapping("post1").unwrap().unwrap();
        let mastodon = &mapping.platforms["mastodon"];
        assert_eq!(mastodon.len(), 2);
        assert!(mastodon.contains_key("A"));
        assert!(mastodon.contains_key("B"));
    }

    #[test]
    fn test_split_entry_coerces_prior_single_into_list() {
        let (store, _dir) = store();
        store
            .put_mapping_entry(
                "post1",
                "https://blog.example.com/p/",
                "bluesky",
                "C",
                json!({"post_uri": "at://1"}),
                false,
            )
            .unwrap();
        store
            .put_mapping_entry(
                "post1",
                "https://blog.example.com/p/",
                "bluesky",
                "C",
                json!({"post_uri": "at://2"}),
                true,
            )
            .unwrap();
        let mapping = store.get_mapping("post1").unwrap().unwrap();
        match &mapping.platforms["bluesky"]["C"] {
            MappingEntry::Split(entries) => {
                assert_eq!(entries.len(), 2);
                assert_eq!(entries[0]["post_uri"], "at://1");
                assert_eq!(entries[1]["post_uri"], "at://2");
            }
            _ => panic!("expected split entry"),
        }
    }

    #[test]
    fn test_split_entry_dedup_by_identity_key() {
        let (store, _dir) = store();
        for _ in 0..2 {
            store
                .put_mapping_entry(
                    "post1",
                    "https://blog.example.com/p/",
                    "bluesky",
                    "C",
                    json!({"post_uri": "at://same"}),
                    true,
                )
                .unwrap();
        }
        let mapping = store.get_mapping("post1").unwrap().unwrap();
        match &mapping.platforms["bluesky"]["C"] {
            MappingEntry::Split(entries) => assert_eq!(entries.len(), 1),
            _ => panic!("expected split entry"),
        }
    }

    #[test]
    fn test_legacy_json_backfill() {
        let (store, dir) = store();
        let legacy_dir = dir.path().join("syndication_mappings");
        fs::create_dir_all(&legacy_dir).unwrap();
        let mapping = SyndicationMapping::new("https://blog.example.com/legacy/");
        fs::write(
            legacy_dir.join("legacy1.json"),
            serde_json::to_string(&mapping).unwrap(),
        )
        .unwrap();

        let fetched = store.get_mapping("legacy1").unwrap().unwrap();
        assert_eq!(fetched.ghost_post_url, mapping.ghost_post_url);

        // Backfilled: now readable straight from SQLite without the file.
        fs::remove_file(legacy_dir.join("legacy1.json")).unwrap();
        let fetched_again = store.get_mapping("legacy1").unwrap().unwrap();
        assert_eq!(fetched_again.ghost_post_url, mapping.ghost_post_url);
    }

    #[test]
    fn test_set_webmention_links_sent_preserves_platforms() {
        let (store, _dir) = store();
        store
            .put_mapping_entry(
                "post1",
                "https://blog.example.com/p/",
                "mastodon",
                "A",
                json!({"status_id": "a1"}),
                false,
            )
            .unwrap();
        store
            .set_webmention_links_sent(
                "post1",
                "https://blog.example.com/p/",
                vec!["https://other.example/x".to_owned()],
            )
            .unwrap();
        let mapping = store.get_mapping("post1").unwrap().unwrap();
        assert_eq!(mapping.webmention_links_sent, vec!["https://other.example/x".to_owned()]);
        assert!(mapping.platforms["mastodon"].contains_key("A"));
    }

    #[test]
    fn test_list_ids() {
        let (store, _dir) = store();
        store
            .put_mapping("post1", &SyndicationMapping::new("https://blog.example.com/a/"))
            .unwrap();
        store
            .put_mapping("post2", &SyndicationMapping::new("https://blog.example.com/b/"))
            .unwrap();
        let mut ids = store.list_ids().unwrap();
        ids.sort();
        assert_eq!(ids, vec!["post1".to_owned(), "post2".to_owned()]);
    }
}
