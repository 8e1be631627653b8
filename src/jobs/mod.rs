pub mod dead_letter;
pub mod error;
pub mod queue;
pub mod registry;
pub mod scheduler;
pub mod store;
pub mod tasks;
pub mod types;

#[cfg(test)]
mod tests;

pub use dead_letter::DeadLetterStore;
pub use error::{JobError, JobResult, StoreError};
pub use queue::{EnqueueFn, JobQueue, QueueOptions};
pub use registry::JobRegistry;
pub use scheduler::CronScheduler;
pub use store::{ListStore, MemoryListStore, RedisListStore};
pub use types::{JobContext, JobHandler, Message, Payload, RegisteredJob};
