use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::expression::CronExpression;

/// The action a job runs each time it fires. Boxed so the scheduler can
/// hold a homogeneous collection of jobs regardless of what each one does.
pub type JobAction = Arc<dyn Fn() + Send + Sync>;

/// A single scheduled job: its expression, whether it currently runs, and
/// the action dispatched to the task pool when it fires.
pub(crate) struct Job {
    pub description: String,
    pub expression: CronExpression,
    pub enabled: bool,
    pub action: JobAction,
    pub next_fire: Option<DateTime<Utc>>,
}

/// A point-in-time snapshot of a job, returned by `CronScheduler::list`.
#[derive(Debug, Clone)]
pub struct JobSummary {
    pub id: String,
    pub description: String,
    pub expression: String,
    pub enabled: bool,
    pub next_fire: Option<DateTime<Utc>>,
}
