//! Cron-driven reconciliation scheduling.

pub mod dispatch_scheduler;
pub mod error;

pub use dispatch_scheduler::{DispatchScheduler, DispatchSchedulerConfig};
pub use error::{SchedulerError, SchedulerResult};
