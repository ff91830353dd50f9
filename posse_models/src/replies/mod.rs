mod queries;
mod types;

pub use queries::ReplyStore;
pub use types::Reply;
