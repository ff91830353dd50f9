mod queries;
mod types;

pub use queries::WebmentionStore;
pub use types::{MentionType, ReceivedWebmention, WebmentionStatus};
