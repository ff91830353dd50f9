pub mod content;
pub mod discovery;
pub mod dispatcher;
pub mod extractor;
pub mod interactions;
pub mod scheduler;

pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use extractor::{extract_post, ExtractedPost, Tag};
pub use scheduler::{Scheduler, SchedulerConfig, SchedulerHandles, SyncEvent};
