use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored reply submitted via the reply form, per spec §3 "Reply" / §4.M.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reply {
    pub id: String,
    pub author_name: String,
    pub author_url: Option<String>,
    pub content: String,
    pub target: String,
    pub ip_hash: String,
    pub created_at: DateTime<Utc>,
}
