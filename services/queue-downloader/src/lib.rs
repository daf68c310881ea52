//! Queue downloader: polls an SQS queue for object notifications delivered
//! through SNS and downloads the objects that pass the filter.

pub mod config;
pub mod poller;
pub mod queue;

pub use config::Args;
pub use poller::{CycleStats, Poller};
pub use queue::{MessageQueue, QueueMessage, SqsQueue, SqsSettings};
