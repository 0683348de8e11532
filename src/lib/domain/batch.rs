//! Batch dispatch module.

mod coordinator;
mod dispatch;
mod errors;
mod journal;
mod pool;
mod report;
mod request;
mod worker;

pub use coordinator::BatchCoordinator;
pub use dispatch::dispatch_one;
pub use errors::{BatchError, DispatchError};
pub use journal::{Journal, JournalError};
pub use pool::{DispatchJob, ProcessPool, TaskPool, WorkerCommand, WorkerPool};
pub use report::{BatchOutcome, DispatchFailure, DispatchResult, EmailReport};
pub use request::{BatchRequest, DEFAULT_POOL_LIMIT};
pub use worker::WorkerJob;
