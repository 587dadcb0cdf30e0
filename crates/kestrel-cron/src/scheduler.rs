use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration as StdDuration;

use chrono::Utc;
use kestrel_core::TaskPool;

use crate::error::CronError;
use crate::expression::CronExpression;
use crate::job::{Job, JobAction, JobSummary};

struct Shared {
    jobs: Mutex<HashMap<String, Job>>,
    stop: Mutex<bool>,
    stop_cv: Condvar,
}

/// Holds a set of cron jobs and, once started, dispatches each one to a
/// [`TaskPool`] as it comes due. A single background thread wakes once a
/// second (or immediately on `stop`), checks which jobs are due, submits
/// their actions, and recomputes each job's next fire time.
pub struct CronScheduler {
    shared: Arc<Shared>,
    pool: Arc<TaskPool>,
    thread: Mutex<Option<JoinHandle<()>>>,
    running: AtomicBool,
}

impl CronScheduler {
    /// Creates a scheduler that dispatches jobs onto `pool`.
    pub fn new(pool: Arc<TaskPool>) -> Self {
        Self {
            shared: Arc::new(Shared {
                jobs: Mutex::new(HashMap::new()),
                stop: Mutex::new(false),
                stop_cv: Condvar::new(),
            }),
            pool,
            thread: Mutex::new(None),
            running: AtomicBool::new(false),
        }
    }

    /// Adds a new job under `id`. Fails with `DuplicateId` if `id` is
    /// already registered, or with `Syntax`/`Unsatisfiable` if `expression`
    /// does not parse or can never fire. New jobs start enabled.
    pub fn add(
        &self,
        id: impl Into<String>,
        description: impl Into<String>,
        expression: &str,
        action: JobAction,
    ) -> Result<(), CronError> {
        let id = id.into();
        let expr = CronExpression::parse(expression)?;
        let mut jobs = self.shared.jobs.lock().unwrap();
        if jobs.contains_key(&id) {
            return Err(CronError::DuplicateId(id));
        }
        let next_fire = expr.next_fire(Utc::now()).ok();
        jobs.insert(
            id,
            Job {
                description: description.into(),
                expression: expr,
                enabled: true,
                action,
                next_fire,
            },
        );
        Ok(())
    }

    /// Removes a job. Fails with `NotFound` if `id` is not registered.
    pub fn remove(&self, id: &str) -> Result<(), CronError> {
        let mut jobs = self.shared.jobs.lock().unwrap();
        jobs.remove(id)
            .map(|_| ())
            .ok_or_else(|| CronError::NotFound(id.to_string()))
    }

    /// Enables or disables a job without removing it. Re-enabling a job
    /// whose next fire time had lapsed recomputes it from the current time.
    pub fn set_enabled(&self, id: &str, enabled: bool) -> Result<(), CronError> {
        let mut jobs = self.shared.jobs.lock().unwrap();
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| CronError::NotFound(id.to_string()))?;
        job.enabled = enabled;
        if enabled && job.next_fire.is_none() {
            job.next_fire = job.expression.next_fire(Utc::now()).ok();
        }
        Ok(())
    }

    /// A snapshot of every registered job, ordered by id.
    pub fn list(&self) -> Vec<JobSummary> {
        let jobs = self.shared.jobs.lock().unwrap();
        let mut out: Vec<JobSummary> = jobs
            .iter()
            .map(|(id, job)| JobSummary {
                id: id.clone(),
                description: job.description.clone(),
                expression: job.expression.source().to_string(),
                enabled: job.enabled,
                next_fire: job.next_fire,
            })
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    /// Starts the background tick thread. Idempotent while already running.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.shared.stop.lock().unwrap() = false;
        let shared = Arc::clone(&self.shared);
        let pool = Arc::clone(&self.pool);
        let handle = thread::Builder::new()
            .name("kestrel-cron-tick".to_string())
            .spawn(move || tick_loop(shared, pool))
            .expect("failed to spawn cron tick thread");
        *self.thread.lock().unwrap() = Some(handle);
    }

    /// Stops the background tick thread and waits for it to exit. Idempotent.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        *self.shared.stop.lock().unwrap() = true;
        self.shared.stop_cv.notify_all();
        if let Some(handle) = self.thread.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CronScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn tick_loop(shared: Arc<Shared>, pool: Arc<TaskPool>) {
    loop {
        let stop_guard = shared.stop.lock().unwrap();
        if *stop_guard {
            return;
        }
        let (stop_guard, _timed_out) = shared
            .stop_cv
            .wait_timeout(stop_guard, StdDuration::from_secs(1))
            .unwrap();
        if *stop_guard {
            return;
        }
        drop(stop_guard);

        let now = Utc::now();
        let mut jobs = shared.jobs.lock().unwrap();
        for job in jobs.values_mut() {
            if !job.enabled {
                continue;
            }
            let Some(due) = job.next_fire else {
                continue;
            };
            if due > now {
                continue;
            }
            let action = Arc::clone(&job.action);
            if let Err(err) = pool.submit(move || (action)()) {
                log::error!("failed to dispatch cron job: {err}");
            }
            job.next_fire = job
                .expression
                .next_fire(due + chrono::Duration::seconds(1))
                .ok();
        }
    }
}
