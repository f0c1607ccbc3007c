//! Serial execution lanes

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::queue::job::Job;
use crate::queue::task::Task;

/// A worker: a serial lane on the shared runtime plus a load counter.
///
/// Constructing a worker spawns its lane task, which drains dispatched jobs
/// strictly in FIFO order, one at a time; other workers run concurrently.
/// Dropping the worker closes the lane's sender: jobs already queued still
/// run to completion, after which the lane exits.
pub struct Worker {
    id: Uuid,
    lane: mpsc::UnboundedSender<Arc<Job>>,
    number_of_tasks: AtomicU64,
}

impl Worker {
    /// Reserve a serial lane on `runtime`.
    #[must_use]
    pub fn new(runtime: &Handle) -> Self {
        let (lane, mut jobs) = mpsc::unbounded_channel::<Arc<Job>>();
        runtime.spawn(async move {
            while let Some(job) = jobs.recv().await {
                job.run().await;
            }
        });

        Self {
            id: Uuid::new_v4(),
            lane,
            number_of_tasks: AtomicU64::new(0),
        }
    }

    /// Worker identity.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Monotonic count of jobs ever dispatched onto this worker.
    ///
    /// Never decremented on completion; a load-balancing hint, not a live
    /// queue depth.
    #[must_use]
    pub fn number_of_tasks(&self) -> u64 {
        self.number_of_tasks.load(Ordering::Acquire)
    }

    /// Build a job for `task` and schedule it on this worker's lane.
    ///
    /// Returns the job synchronously; execution is deferred to the lane.
    pub fn dispatch(&self, task: &Arc<Task>, data: Value) -> Arc<Job> {
        let job = Arc::new(Job::new(Arc::clone(task), data));
        self.number_of_tasks.fetch_add(1, Ordering::AcqRel);
        // A closed lane means the worker was released mid-dispatch; the job
        // stays recorded but never starts.
        let _ = self.lane.send(Arc::clone(&job));
        job
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Worker")
            .field("id", &self.id)
            .field("number_of_tasks", &self.number_of_tasks())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::task::TaskHandler;
    use serde_json::json;
    use std::time::Duration;

    fn sleepy_task(millis: u64) -> Arc<Task> {
        let handler: TaskHandler = Arc::new(move |_flag, _data| {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(millis)).await;
                Ok(())
            })
        });
        Arc::new(Task::new("sleepy", handler))
    }

    async fn wait_until_finished(job: &Arc<Job>) {
        while !job.finished() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_dispatch_returns_before_execution_completes() {
        let worker = Worker::new(&Handle::current());
        let job = worker.dispatch(&sleepy_task(20), json!({}));

        assert_eq!(worker.number_of_tasks(), 1);
        wait_until_finished(&job).await;
        assert!(job.finished());
        // The load hint stays monotonic after completion
        assert_eq!(worker.number_of_tasks(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_jobs_on_one_worker_finish_in_dispatch_order() {
        let worker = Worker::new(&Handle::current());
        let first = worker.dispatch(&sleepy_task(15), json!({}));
        let second = worker.dispatch(&sleepy_task(1), json!({}));
        let third = worker.dispatch(&sleepy_task(1), json!({}));

        wait_until_finished(&third).await;

        assert!(first.finished_at().unwrap() <= second.finished_at().unwrap());
        assert!(second.finished_at().unwrap() <= third.finished_at().unwrap());
        assert_eq!(worker.number_of_tasks(), 3);
    }
}
