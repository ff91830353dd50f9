use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A received webmention, per spec §3 "Received webmention". `(source,
/// target)` uniquely identifies a record; a second POST for the same
/// pair replaces the prior one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReceivedWebmention {
    pub source: String,
    pub target: String,
    pub status: WebmentionStatus,
    pub mention_type: MentionType,
    pub author_name: Option<String>,
    pub author_url: Option<String>,
    pub author_photo: Option<String>,
    pub content: Option<String>,
    pub received_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
}

impl ReceivedWebmention {
    pub fn pending(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            status: WebmentionStatus::Pending,
            mention_type: MentionType::Mention,
            author_name: None,
            author_url: None,
            author_photo: None,
            content: None,
            received_at: Utc::now(),
            verified_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WebmentionStatus {
    Pending,
    Verified,
    Rejected,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MentionType {
    Mention,
    Reply,
    Like,
    Repost,
    Bookmark,
}
