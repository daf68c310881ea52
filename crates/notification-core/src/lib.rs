//! Common types and logic shared by the object notification consumers.
//!
//! The queue downloader, webhook receiver and subscription confirmer all
//! unwrap the same envelope, filter on the same metadata and download the
//! same way. That shared behaviour lives here.

pub mod catalog;
pub mod config;
pub mod confirm;
pub mod dispatch;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod notification;
pub mod telemetry;

pub use catalog::DiagnosticCatalog;
pub use config::{resolve_criteria, FilterOverrides};
pub use confirm::{HttpConfirmer, SubscriptionConfirmer};
pub use dispatch::{Dispatcher, NotificationObserver, Outcome};
pub use error::{NotifyError, NotifyResult, PollAction};
pub use fetch::{FetchConfig, HttpFetcher, ObjectFetcher};
pub use filter::{resolve_diagnostic_aliases, FilterCriteria};
pub use notification::{Envelope, MessageType, Metadata, Notification};
