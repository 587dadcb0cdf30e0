//! Cron expression parsing and a scheduler that dispatches due jobs onto a
//! [`kestrel_core::TaskPool`].

mod error;
mod expression;
mod field;
mod job;
mod scheduler;

pub use error::CronError;
pub use expression::CronExpression;
pub use job::{JobAction, JobSummary};
pub use scheduler::CronScheduler;
