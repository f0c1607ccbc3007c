//! Cooperative shutdown
//!
//! A [`ShutdownGroup`] fans cancellation out to every registered sink -
//! the listener loop and each live session. `Total` asks sinks to exit at
//! their next suspension point; `Terminal` forces them out. [`wait`] blocks
//! until every registration has been dropped, which is how the
//! graceful-then-forced sequence knows the process has quiesced.
//!
//! [`wait`]: ShutdownGroup::wait

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// How long `Total` cancellation gets before `Terminal` is emitted.
pub const GRACE_PERIOD: Duration = Duration::from_secs(10);

/// The two cancellation categories a group can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelKind {
    /// Request cooperative exit at the next suspension point.
    Total,
    /// Force exit.
    Terminal,
}

#[derive(Clone)]
struct Sink {
    total: CancellationToken,
    terminal: CancellationToken,
}

#[derive(Default)]
struct Inner {
    sinks: Mutex<HashMap<u64, Sink>>,
    next_id: AtomicU64,
    emptied: Notify,
}

/// A cancellation fan-out with completion tracking.
#[derive(Clone, Default)]
pub struct ShutdownGroup {
    inner: Arc<Inner>,
}

impl ShutdownGroup {
    /// Create an empty group.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cancellation sink.
    ///
    /// The returned guard exposes the sink's tokens; dropping it removes
    /// the sink and, when the set empties, releases [`ShutdownGroup::wait`].
    #[must_use]
    pub fn register(&self) -> Registration {
        let id = self.inner.next_id.fetch_add(1, Ordering::AcqRel);
        let sink = Sink {
            total: CancellationToken::new(),
            terminal: CancellationToken::new(),
        };
        self.inner.sinks.lock().insert(id, sink.clone());
        Registration {
            inner: Arc::clone(&self.inner),
            id,
            sink,
        }
    }

    /// Cancel every registered sink with the given category.
    pub fn emit(&self, kind: CancelKind) {
        let sinks = self.inner.sinks.lock();
        for sink in sinks.values() {
            match kind {
                CancelKind::Total => sink.total.cancel(),
                CancelKind::Terminal => sink.terminal.cancel(),
            }
        }
    }

    /// Number of live registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.sinks.lock().len()
    }

    /// Whether no sinks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.sinks.lock().is_empty()
    }

    /// Wait until every registration has been dropped.
    ///
    /// Callers bound the graceful phase externally:
    /// `tokio::time::timeout(GRACE_PERIOD, group.wait())`.
    pub async fn wait(&self) {
        loop {
            // Arm the notification before checking, so a drop between the
            // check and the await cannot be missed.
            let emptied = self.inner.emptied.notified();
            if self.inner.sinks.lock().is_empty() {
                return;
            }
            emptied.await;
        }
    }
}

/// A live sink registration; dropping it deregisters the sink.
pub struct Registration {
    inner: Arc<Inner>,
    id: u64,
    sink: Sink,
}

impl Registration {
    /// Resolves when `Total` cancellation is emitted.
    pub async fn total_cancelled(&self) {
        self.sink.total.cancelled().await;
    }

    /// Resolves when `Terminal` cancellation is emitted.
    pub async fn terminal_cancelled(&self) {
        self.sink.terminal.cancelled().await;
    }

    /// Whether `Total` has been emitted.
    #[must_use]
    pub fn is_total_cancelled(&self) -> bool {
        self.sink.total.is_cancelled()
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        let mut sinks = self.inner.sinks.lock();
        sinks.remove(&self.id);
        if sinks.is_empty() {
            self.inner.emptied.notify_waiters();
        }
    }
}

/// Run the graceful-then-forced sequence against `group`.
pub async fn graceful_shutdown(group: &ShutdownGroup) {
    group.emit(CancelKind::Total);
    if tokio::time::timeout(GRACE_PERIOD, group.wait()).await.is_err() {
        tracing::warn!("grace period expired, forcing remaining sessions out");
        group.emit(CancelKind::Terminal);
        group.wait().await;
    }
}

/// Wait for a shutdown signal and react per the signal policy.
///
/// `SIGINT` runs the graceful-then-forced sequence and returns once the
/// group is empty. `SIGTERM` returns immediately; the caller tears the
/// runtime down.
pub async fn signal_handler(group: &ShutdownGroup) -> anyhow::Result<()> {
    let mut terminate = signal(SignalKind::terminate())?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("interrupt received, shutting down");
            graceful_shutdown(group).await;
        }
        _ = terminate.recv() => {
            tracing::info!("termination requested, stopping immediately");
        }
    }

    Ok(())
}
