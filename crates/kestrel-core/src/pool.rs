use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use crate::Error;

type Task = Box<dyn FnOnce() + Send + 'static>;

struct Inner {
    queue: Mutex<VecDeque<Task>>,
    queue_cv: Condvar,
    idle_lock: Mutex<()>,
    idle_cv: Condvar,
    outstanding: AtomicUsize,
    shutdown: AtomicBool,
}

/// A fixed-size pool of worker threads that run submitted closures.
///
/// Each worker pulls from a single shared queue protected by one mutex and
/// condition variable. A separate outstanding-task counter tracks tasks that
/// have been submitted but not yet finished running (queued or in-flight);
/// `wait_idle` blocks until that counter returns to zero. A panic inside a
/// task is caught at the worker boundary, logged, and does not take down the
/// worker thread or the caller of `submit`.
pub struct TaskPool {
    inner: Arc<Inner>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskPool {
    /// Creates a pool with `workers` worker threads. `0` is treated as the
    /// number of available CPUs, falling back to `4` if that cannot be
    /// determined.
    pub fn new(workers: usize) -> Self {
        let workers = if workers == 0 {
            thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            workers
        };

        let inner = Arc::new(Inner {
            queue: Mutex::new(VecDeque::new()),
            queue_cv: Condvar::new(),
            idle_lock: Mutex::new(()),
            idle_cv: Condvar::new(),
            outstanding: AtomicUsize::new(0),
            shutdown: AtomicBool::new(false),
        });

        let handles = (0..workers)
            .map(|id| {
                let inner = Arc::clone(&inner);
                thread::Builder::new()
                    .name(format!("kestrel-worker-{id}"))
                    .spawn(move || worker_loop(inner))
                    .expect("failed to spawn pool worker thread")
            })
            .collect();

        Self {
            inner,
            workers: Mutex::new(handles),
        }
    }

    /// Number of worker threads in the pool.
    pub fn worker_count(&self) -> usize {
        self.workers.lock().unwrap().len()
    }

    /// Submits a task for execution. Fails with `PoolShutdown` if `shutdown`
    /// has already been called.
    pub fn submit<F>(&self, task: F) -> Result<(), Error>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.inner.shutdown.load(Ordering::SeqCst) {
            return Err(Error::PoolShutdown);
        }
        self.inner.outstanding.fetch_add(1, Ordering::SeqCst);
        let mut queue = self.inner.queue.lock().unwrap();
        queue.push_back(Box::new(task));
        self.inner.queue_cv.notify_one();
        Ok(())
    }

    /// Blocks until every submitted task has finished running. A task
    /// submitted concurrently from another thread may extend the wait.
    pub fn wait_idle(&self) {
        let mut guard = self.inner.idle_lock.lock().unwrap();
        while self.inner.outstanding.load(Ordering::SeqCst) != 0 {
            guard = self.inner.idle_cv.wait(guard).unwrap();
        }
    }

    /// Stops accepting new tasks and joins every worker thread after it
    /// finishes the task it is currently running. Already-queued tasks still
    /// run before their worker exits. Idempotent.
    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, Ordering::SeqCst);
        self.inner.queue_cv.notify_all();
        let mut handles = self.workers.lock().unwrap();
        for handle in handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(inner: Arc<Inner>) {
    loop {
        let task = {
            let mut queue = inner.queue.lock().unwrap();
            loop {
                if let Some(task) = queue.pop_front() {
                    break Some(task);
                }
                if inner.shutdown.load(Ordering::SeqCst) {
                    break None;
                }
                queue = inner.queue_cv.wait(queue).unwrap();
            }
        };

        let Some(task) = task else {
            break;
        };

        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
            log::error!("task panicked: {}", panic_message(&payload));
        }

        let guard = inner.idle_lock.lock().unwrap();
        let previous = inner.outstanding.fetch_sub(1, Ordering::SeqCst);
        if previous == 1 {
            inner.idle_cv.notify_all();
        }
        drop(guard);
    }
}

fn panic_message(payload: &Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize as StdAtomicUsize;
    use std::sync::Arc as StdArc;
    use std::time::Duration;

    #[test]
    fn runs_submitted_tasks() {
        let pool = TaskPool::new(2);
        let counter = StdArc::new(StdAtomicUsize::new(0));
        for _ in 0..10 {
            let counter = StdArc::clone(&counter);
            pool.submit(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        pool.wait_idle();
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn panicking_task_does_not_kill_worker() {
        let pool = TaskPool::new(1);
        pool.submit(|| panic!("boom")).unwrap();
        pool.wait_idle();

        let ran = StdArc::new(StdAtomicUsize::new(0));
        let flag = StdArc::clone(&ran);
        pool.submit(move || {
            flag.store(1, Ordering::SeqCst);
        })
        .unwrap();
        pool.wait_idle();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn submit_after_shutdown_fails() {
        let pool = TaskPool::new(1);
        pool.shutdown();
        assert_eq!(pool.submit(|| {}), Err(Error::PoolShutdown));
    }

    #[test]
    fn wait_idle_returns_once_queue_drains() {
        let pool = TaskPool::new(4);
        for _ in 0..50 {
            pool.submit(|| {
                thread::sleep(Duration::from_millis(1));
            })
            .unwrap();
        }
        pool.wait_idle();
        assert_eq!(pool.inner.outstanding.load(Ordering::SeqCst), 0);
    }
}
