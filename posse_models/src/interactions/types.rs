use serde_json::Value;

/// The interaction record is an aggregated JSON document (§3 "Interaction
/// record"): `syndication_links`, per-account `platforms` counts, and
/// `reply_previews`. Its shape is built and consumed by the interaction
/// sync service; the store treats it as an opaque document plus an
/// `updated_at` timestamp stamped on every write.
pub type InteractionRecord = Value;
