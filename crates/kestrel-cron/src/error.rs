/// Errors produced while parsing cron expressions and managing jobs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CronError {
    /// A cron expression could not be parsed.
    #[error("invalid cron expression: {0}")]
    Syntax(String),

    /// A well-formed expression has no satisfying time within the search
    /// horizon (for example, `31` as a day-of-month paired with a month
    /// that never has 31 days is still satisfiable in general, but a
    /// pathological combination may not be).
    #[error("cron expression matches no possible time")]
    Unsatisfiable,

    /// `CronScheduler::add` was called with an id already in use.
    #[error("job id already exists: {0}")]
    DuplicateId(String),

    /// A job id was not found in the scheduler.
    #[error("job id not found: {0}")]
    NotFound(String),
}
