//! The job dispatch engine
//!
//! A [`Queue`] owns a bag of named tasks, a pool of workers and the map of
//! every job it has dispatched. Dispatch resolves the task, picks the
//! least-loaded worker and schedules the job on that worker's serial lane.

mod job;
mod task;
mod worker;

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::runtime::Handle;
use uuid::Uuid;

use crate::error::EngineError;

pub use job::{CancelFlag, Job};
pub use task::{Task, TaskHandler};
pub use worker::Worker;

/// A named bag of tasks, a worker pool, and all dispatched jobs.
///
/// The three collections are guarded by independent locks and none is held
/// across a suspension point. A queue always has at least one worker from
/// construction until it is dropped.
pub struct Queue {
    id: Uuid,
    runtime: Handle,
    workers: Mutex<BTreeMap<Uuid, Arc<Worker>>>,
    jobs: Mutex<BTreeMap<Uuid, Arc<Job>>>,
    tasks: Mutex<BTreeMap<String, Arc<Task>>>,
}

impl Queue {
    /// Create a queue with one pre-created worker on `runtime`.
    #[must_use]
    pub fn new(runtime: Handle) -> Self {
        let worker = Arc::new(Worker::new(&runtime));
        let mut workers = BTreeMap::new();
        workers.insert(worker.id(), worker);

        Self {
            id: Uuid::new_v4(),
            runtime,
            workers: Mutex::new(workers),
            jobs: Mutex::new(BTreeMap::new()),
            tasks: Mutex::new(BTreeMap::new()),
        }
    }

    /// Queue identity.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Install or replace the task registered under `name`.
    pub fn add_task<H, F>(&self, name: impl Into<String>, handler: H)
    where
        H: Fn(CancelFlag, Arc<Value>) -> F + Send + Sync + 'static,
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let name = name.into();
        let handler: TaskHandler = Arc::new(move |flag, data| Box::pin(handler(flag, data)));
        let task = Arc::new(Task::new(name.clone(), handler));
        self.tasks.lock().insert(name, task);
    }

    /// Dispatch one job for the task registered under `name`.
    ///
    /// The worker with the lowest dispatch count takes the job (ties broken
    /// by iteration order); the job is recorded in the queue's job map
    /// before this returns. Execution is deferred to the worker's lane.
    pub fn dispatch(&self, name: &str, data: Value) -> Result<Arc<Job>, EngineError> {
        let task = self
            .tasks
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::TaskNotFound(name.to_string()))?;

        let worker = {
            let workers = self.workers.lock();
            workers
                .values()
                .min_by_key(|worker| worker.number_of_tasks())
                .cloned()
                .expect("a queue always has at least one worker")
        };

        let job = worker.dispatch(&task, data);
        self.jobs.lock().insert(job.id(), Arc::clone(&job));
        Ok(job)
    }

    /// Bring the pool to exactly `max(1, n)` workers.
    ///
    /// Idempotent. Growing reserves fresh lanes; shrinking erases workers
    /// from the front of the map without waiting for their in-flight jobs -
    /// a released lane finishes whatever was already scheduled on it.
    pub fn set_workers_to(&self, n: usize) {
        let target = n.max(1);
        let mut workers = self.workers.lock();

        while workers.len() < target {
            let worker = Arc::new(Worker::new(&self.runtime));
            workers.insert(worker.id(), worker);
        }
        while workers.len() > target {
            let front = *workers
                .keys()
                .next()
                .expect("pool cannot be empty while len > target");
            workers.remove(&front);
        }
    }

    /// Cancel every currently-recorded job.
    ///
    /// Jobs dispatched after this call are not affected. Valid on an empty
    /// queue.
    pub fn cancel(&self) {
        for job in self.jobs.lock().values() {
            job.cancel();
        }
    }

    /// Number of workers in the pool.
    #[must_use]
    pub fn number_of_workers(&self) -> usize {
        self.workers.lock().len()
    }

    /// Number of jobs ever dispatched through this queue.
    #[must_use]
    pub fn number_of_jobs(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Number of registered tasks.
    #[must_use]
    pub fn number_of_tasks(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Snapshot of the worker pool, in id order.
    #[must_use]
    pub fn workers(&self) -> Vec<Arc<Worker>> {
        self.workers.lock().values().cloned().collect()
    }

    /// Snapshot of all dispatched jobs, in id order.
    #[must_use]
    pub fn jobs(&self) -> Vec<Arc<Job>> {
        self.jobs.lock().values().cloned().collect()
    }

    /// Snapshot of the registered tasks, in name order.
    #[must_use]
    pub fn tasks(&self) -> Vec<Arc<Task>> {
        self.tasks.lock().values().cloned().collect()
    }
}

impl std::fmt::Debug for Queue {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Queue")
            .field("id", &self.id)
            .field("workers", &self.number_of_workers())
            .field("jobs", &self.number_of_jobs())
            .field("tasks", &self.number_of_tasks())
            .finish_non_exhaustive()
    }
}
