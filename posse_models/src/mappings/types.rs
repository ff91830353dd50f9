use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A per-Ghost-post syndication record: §4.G / spec §3 "Syndication
/// mapping". `platforms` is keyed by platform name, then by account name;
/// each leaf is either a single post's data or, for split multi-image
/// posts, a list of them in `split_index` order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyndicationMapping {
    pub ghost_post_url: String,
    pub syndicated_at: DateTime<Utc>,
    #[serde(default)]
    pub platforms: BTreeMap<String, BTreeMap<String, MappingEntry>>,
    /// Outbound links notified via webmention the last time this post was
    /// published/updated (spec §4.K), used to compute the link-diff on the
    /// next update so removed links still get a final notification.
    #[serde(default)]
    pub webmention_links_sent: Vec<String>,
}

impl SyndicationMapping {
    pub fn new(ghost_post_url: impl Into<String>) -> Self {
        Self {
            ghost_post_url: ghost_post_url.into(),
            syndicated_at: Utc::now(),
            platforms: BTreeMap::new(),
            webmention_links_sent: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MappingEntry {
    Single(Value),
    Split(Vec<Value>),
}

impl MappingEntry {
    /// Coerces this entry into a list, moving a prior single entry into
    /// element 0, per the sibling-preservation invariant (spec §3, §8 #2).
    pub fn into_split_vec(self) -> Vec<Value> {
        match self {
            MappingEntry::Single(v) => vec![v],
            MappingEntry::Split(vs) => vs,
        }
    }
}

/// The identifying field used to deduplicate split entries: `status_id`
/// (Mastodon) or `post_uri` (Bluesky).
pub fn identity_key(value: &Value) -> Option<&Value> {
    value
        .get("status_id")
        .or_else(|| value.get("post_uri"))
        .filter(|v| !v.is_null())
}
