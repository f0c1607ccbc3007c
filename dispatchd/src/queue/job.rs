//! Job lifecycle
//!
//! A [`Job`] is one execution of a named task with a captured payload. Flag
//! reads use acquire ordering and writes use release ordering; `finished` is
//! stored last in every terminal path, so an observer that sees `finished`
//! also sees the outcome flags and timestamps.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use uuid::Uuid;

use crate::error::Cancelled;
use crate::queue::task::Task;

/// Shared cooperative-cancellation flag.
///
/// Cloning is cheap and shares state. Handlers poll it and bail with
/// [`Cancelled`] when set.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    /// A fresh, unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

/// A single execution attempt of a task.
pub struct Job {
    id: Uuid,
    task: Arc<Task>,
    data: Arc<Value>,
    started: AtomicBool,
    finished: AtomicBool,
    failed: AtomicBool,
    cancel_flag: CancelFlag,
    error: Mutex<Option<anyhow::Error>>,
    started_at: Mutex<Option<DateTime<Utc>>>,
    cancelled_at: Mutex<Option<DateTime<Utc>>>,
    finished_at: Mutex<Option<DateTime<Utc>>>,
}

impl Job {
    pub(crate) fn new(task: Arc<Task>, data: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            task,
            data: Arc::new(data),
            started: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            failed: AtomicBool::new(false),
            cancel_flag: CancelFlag::new(),
            error: Mutex::new(None),
            started_at: Mutex::new(None),
            cancelled_at: Mutex::new(None),
            finished_at: Mutex::new(None),
        }
    }

    /// Execute the job once.
    ///
    /// Marks the job started, short-circuits to the cancelled outcome when
    /// the flag is already set, and otherwise invokes the handler with the
    /// flag and the captured payload. A handler returning [`Cancelled`]
    /// yields the cancelled outcome; any other error is captured verbatim
    /// and yields the failed outcome. `finished` is published last.
    pub(crate) async fn run(&self) {
        self.started.store(true, Ordering::Release);
        *self.started_at.lock() = Some(Utc::now());

        let outcome = if self.cancel_flag.is_cancelled() {
            Err(Cancelled.into())
        } else {
            (self.task.handler())(self.cancel_flag.clone(), Arc::clone(&self.data)).await
        };

        match outcome {
            Ok(()) => {}
            Err(error) if error.is::<Cancelled>() => {
                self.cancel_flag.cancel();
                *self.cancelled_at.lock() = Some(Utc::now());
            }
            Err(error) => {
                *self.error.lock() = Some(error);
                self.failed.store(true, Ordering::Release);
            }
        }

        *self.finished_at.lock() = Some(Utc::now());
        self.finished.store(true, Ordering::Release);
    }

    /// Request cancellation.
    ///
    /// Safe before, during, or after [`Job::run`]; once the job has
    /// finished this is a no-op on state.
    pub fn cancel(&self) {
        if self.finished() {
            return;
        }
        self.cancel_flag.cancel();
    }

    /// Job identity.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The task this job executes.
    #[must_use]
    pub fn task(&self) -> &Arc<Task> {
        &self.task
    }

    /// The payload captured at dispatch time.
    #[must_use]
    pub fn data(&self) -> &Arc<Value> {
        &self.data
    }

    /// Whether execution has begun.
    #[must_use]
    pub fn started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Whether execution has reached a terminal state.
    #[must_use]
    pub fn finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Whether the handler failed with a non-cancellation error.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    /// Whether cancellation was requested or took effect.
    #[must_use]
    pub fn cancelled(&self) -> bool {
        self.cancel_flag.is_cancelled()
    }

    /// Take the captured failure, if any.
    #[must_use]
    pub fn take_error(&self) -> Option<anyhow::Error> {
        self.error.lock().take()
    }

    /// Wall-clock start time.
    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        *self.started_at.lock()
    }

    /// Wall-clock cancellation time.
    #[must_use]
    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        *self.cancelled_at.lock()
    }

    /// Wall-clock completion time.
    #[must_use]
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        *self.finished_at.lock()
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Job")
            .field("id", &self.id)
            .field("task", &self.task.name())
            .field("started", &self.started())
            .field("cancelled", &self.cancelled())
            .field("finished", &self.finished())
            .field("failed", &self.failed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::task::TaskHandler;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn task(handler: TaskHandler) -> Arc<Task> {
        Arc::new(Task::new("test", handler))
    }

    #[tokio::test]
    async fn test_run_finishes_successfully() {
        let executed = Arc::new(AtomicBool::new(false));
        let observer = Arc::clone(&executed);
        let job = Job::new(
            task(Arc::new(move |_flag, _data| {
                let executed = Arc::clone(&observer);
                Box::pin(async move {
                    executed.store(true, Ordering::Release);
                    Ok(())
                })
            })),
            json!({}),
        );

        assert!(!job.started());
        assert!(job.started_at().is_none());

        job.run().await;

        assert!(executed.load(Ordering::Acquire));
        assert!(job.started());
        assert!(job.finished());
        assert!(!job.failed());
        assert!(!job.cancelled());
        assert!(job.started_at().unwrap() <= job.finished_at().unwrap());
    }

    #[tokio::test]
    async fn test_run_captures_failures() {
        let job = Job::new(
            task(Arc::new(|_flag, _data| {
                Box::pin(async move { Err(anyhow::anyhow!("disk on fire")) })
            })),
            json!({}),
        );

        job.run().await;

        assert!(job.finished());
        assert!(job.failed());
        assert!(!job.cancelled());
        let error = job.take_error().unwrap();
        assert_eq!(error.to_string(), "disk on fire");
    }

    #[tokio::test]
    async fn test_cancel_before_run_short_circuits() {
        let executed = Arc::new(AtomicUsize::new(0));
        let observer = Arc::clone(&executed);
        let job = Job::new(
            task(Arc::new(move |_flag, _data| {
                let executed = Arc::clone(&observer);
                Box::pin(async move {
                    executed.fetch_add(1, Ordering::AcqRel);
                    Ok(())
                })
            })),
            json!({}),
        );

        job.cancel();
        job.run().await;

        assert_eq!(executed.load(Ordering::Acquire), 0);
        assert!(job.finished());
        assert!(job.cancelled());
        assert!(!job.failed());
        assert!(job.cancelled_at().is_some());
    }

    #[tokio::test]
    async fn test_handler_signals_cancellation_with_marker() {
        let job = Job::new(
            task(Arc::new(|flag: CancelFlag, _data| {
                Box::pin(async move {
                    flag.cancel();
                    if flag.is_cancelled() {
                        return Err(Cancelled.into());
                    }
                    Ok(())
                })
            })),
            json!({}),
        );

        job.run().await;

        assert!(job.finished());
        assert!(job.cancelled());
        assert!(!job.failed());
    }

    #[tokio::test]
    async fn test_cancel_after_finish_is_a_no_op() {
        let job = Job::new(
            task(Arc::new(|_flag, _data| Box::pin(async move { Ok(()) }))),
            json!({}),
        );

        job.run().await;
        assert!(!job.cancelled());

        job.cancel();
        assert!(!job.cancelled());
        assert!(job.finished());
        assert!(!job.failed());
    }

    #[tokio::test]
    async fn test_exactly_one_terminal_outcome() {
        let job = Job::new(
            task(Arc::new(|_flag, _data| Box::pin(async move { Ok(()) }))),
            json!({}),
        );
        job.run().await;

        let plain = job.finished() && !job.failed() && !job.cancelled();
        assert!(plain);
        assert!(job.started_at().unwrap() <= job.finished_at().unwrap());
    }

    #[tokio::test]
    async fn test_handler_receives_payload() {
        let seen = Arc::new(Mutex::new(None));
        let observer = Arc::clone(&seen);
        let job = Job::new(
            task(Arc::new(move |_flag, data: Arc<Value>| {
                let seen = Arc::clone(&observer);
                Box::pin(async move {
                    *seen.lock() = Some(data.as_ref().clone());
                    Ok(())
                })
            })),
            json!({"answer": 42}),
        );

        job.run().await;
        assert_eq!(seen.lock().take(), Some(json!({"answer": 42})));
    }
}
