pub mod database;
pub mod errors;
pub mod interactions;
pub mod mappings;
pub mod replies;
pub mod webmentions;

pub use database::{init_pool, Pool};
pub use errors::DatabaseError;
