mod queries;
mod types;

pub use queries::InteractionStore;
pub use types::InteractionRecord;
