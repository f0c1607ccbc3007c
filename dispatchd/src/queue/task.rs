//! Named, reusable task handlers

use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::Value;
use uuid::Uuid;

use crate::queue::job::CancelFlag;

/// The callable behind a task registration.
///
/// Handlers receive the job's shared cancellation flag and its captured
/// payload. Returning [`crate::error::Cancelled`] (via `anyhow`) records the
/// cancelled outcome instead of the failed one.
pub type TaskHandler =
    Arc<dyn Fn(CancelFlag, Arc<Value>) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// A task registration: a name bound to a handler.
///
/// Immutable after registration; re-registering a name in a queue replaces
/// the whole entry.
pub struct Task {
    id: Uuid,
    name: String,
    handler: TaskHandler,
}

impl Task {
    /// Create a registration for `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, handler: TaskHandler) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            handler,
        }
    }

    /// Registration identity.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Registered name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The handler invoked for every job dispatched onto this task.
    #[must_use]
    pub fn handler(&self) -> &TaskHandler {
        &self.handler
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Task")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
