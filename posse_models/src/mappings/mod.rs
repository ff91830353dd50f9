mod queries;
mod types;

pub use queries::MappingStore;
pub use types::{identity_key, MappingEntry, SyndicationMapping};
