//! Process-wide registry
//!
//! [`State`] carries everything a request or a job might need: the router,
//! the queues by name, the shared runtime handle, the decoded signing key,
//! the optional database pool, and the listener's running/port flags. It is
//! dependency-injected as an `Arc<State>` through every layer - never looked
//! up globally.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use sqlx::PgPool;
use tokio::runtime::Handle;

use crate::config::{EngineConfig, DEFAULT_APP_KEY};
use crate::encoding::base64url_decode;
use crate::queue::Queue;
use crate::routing::Router;

/// Shared application state.
pub struct State {
    router: Router,
    queues: Mutex<BTreeMap<String, Arc<Queue>>>,
    runtime: Handle,
    key: Vec<u8>,
    database_pool: OnceLock<PgPool>,
    running: AtomicBool,
    port: AtomicU16,
}

impl State {
    /// Build state from `config`.
    ///
    /// The app key is base64url-decoded once here and held as raw bytes; it
    /// is never re-encoded. An undecodable `APP_KEY` falls back to the
    /// built-in development secret.
    ///
    /// Must be called from within a Tokio runtime: workers reserve their
    /// serial lanes on the current runtime handle.
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        let key = base64url_decode(&config.app_key).unwrap_or_else(|_| {
            tracing::warn!("APP_KEY is not valid base64url, using the built-in key");
            base64url_decode(DEFAULT_APP_KEY).expect("built-in key decodes")
        });

        Self {
            router: Router::new(),
            queues: Mutex::new(BTreeMap::new()),
            runtime: Handle::current(),
            key,
            database_pool: OnceLock::new(),
            running: AtomicBool::new(false),
            port: AtomicU16::new(0),
        }
    }

    /// The router built at start-up.
    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Fetch the queue registered under `name`, creating it on first access.
    #[must_use]
    pub fn get_queue(&self, name: &str) -> Arc<Queue> {
        let mut queues = self.queues.lock();
        Arc::clone(
            queues
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Queue::new(self.runtime.clone()))),
        )
    }

    /// Whether a queue is registered under `name` (does not create one).
    #[must_use]
    pub fn queue_exists(&self, name: &str) -> bool {
        self.queues.lock().contains_key(name)
    }

    /// Remove the queue registered under `name`.
    ///
    /// Returns whether a queue was actually removed. In-flight jobs on the
    /// removed queue are not cancelled implicitly.
    pub fn remove_queue(&self, name: &str) -> bool {
        self.queues.lock().remove(name).is_some()
    }

    /// Snapshot of the registered queues, in name order.
    #[must_use]
    pub fn queues(&self) -> Vec<(String, Arc<Queue>)> {
        self.queues
            .lock()
            .iter()
            .map(|(name, queue)| (name.clone(), Arc::clone(queue)))
            .collect()
    }

    /// The shared runtime handle.
    #[must_use]
    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    /// The decoded signing key bytes.
    #[must_use]
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// The database pool, when one was configured.
    #[must_use]
    pub fn database_pool(&self) -> Option<&PgPool> {
        self.database_pool.get()
    }

    /// Install the database pool; only the first call takes effect.
    pub fn set_database_pool(&self, pool: PgPool) {
        let _ = self.database_pool.set(pool);
    }

    /// Whether the listener is accepting connections.
    #[must_use]
    pub fn running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Flip the listener flag.
    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }

    /// The port the listener bound, once running.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port.load(Ordering::Acquire)
    }

    /// Publish the bound port.
    pub fn set_port(&self, port: u16) {
        self.port.store(port, Ordering::Release);
    }
}

impl std::fmt::Debug for State {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("State")
            .field("queues", &self.queues.lock().len())
            .field("running", &self.running())
            .field("port", &self.port())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_queues_are_created_lazily() {
        let state = State::new(&EngineConfig::default());
        assert!(!state.queue_exists("notifications"));

        let queue = state.get_queue("notifications");
        assert!(state.queue_exists("notifications"));
        assert_eq!(queue.number_of_workers(), 1);

        // Repeated access returns the same queue
        let again = state.get_queue("notifications");
        assert_eq!(queue.id(), again.id());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_remove_queue() {
        let state = State::new(&EngineConfig::default());
        state.get_queue("ephemeral");
        assert!(state.remove_queue("ephemeral"));
        assert!(!state.remove_queue("ephemeral"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_key_is_decoded_once() {
        let state = State::new(&EngineConfig::default());
        assert_eq!(state.key().len(), 32);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_undecodable_key_falls_back_to_default() {
        let config = EngineConfig {
            app_key: "***not-base64***".to_string(),
            ..EngineConfig::default()
        };
        let state = State::new(&config);
        assert_eq!(
            state.key(),
            base64url_decode(DEFAULT_APP_KEY).unwrap().as_slice()
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_running_and_port_flags() {
        let state = State::new(&EngineConfig::default());
        assert!(!state.running());
        assert_eq!(state.port(), 0);

        state.set_port(4096);
        state.set_running(true);
        assert!(state.running());
        assert_eq!(state.port(), 4096);
    }
}
