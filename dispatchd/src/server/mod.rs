//! The server facade
//!
//! Wires the HTTP surface onto the router, spawns the listener, and drives
//! the signal-controlled shutdown sequence.

mod listener;
mod session;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::config::EngineConfig;
use crate::controllers;
use crate::error::EngineError;
use crate::routing::Route;
use crate::shutdown::{self, ShutdownGroup};
use crate::state::State;

pub use session::READ_TIMEOUT;

/// How long `bind` waits for the listener to come up.
const BIND_TIMEOUT: Duration = Duration::from_secs(5);

/// The running service: shared state plus its shutdown group.
pub struct Server {
    state: Arc<State>,
    group: ShutdownGroup,
}

impl Server {
    /// Build a server from `config`.
    ///
    /// Must be called within a Tokio runtime (see [`State::new`]).
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            state: Arc::new(State::new(config)),
            group: ShutdownGroup::new(),
        }
    }

    /// Install the HTTP surface on the state's router.
    fn install_routes(&self) -> Result<(), EngineError> {
        let router = self.state.router();
        router
            .add(Route::new(
                controllers::status::verbs(),
                "/api/status",
                controllers::status::make(),
            )?)
            .add(Route::new(
                controllers::user::verbs(),
                "/api/user",
                controllers::user::make(),
            )?)
            .add(Route::new(
                controllers::auth::verbs(),
                "/api/auth/attempt",
                controllers::auth::make(),
            )?)
            .add(Route::new(
                controllers::queues::index::verbs(),
                "/api/queues",
                controllers::queues::index::make(),
            )?)
            .add(Route::new(
                controllers::queues::tasks::verbs(),
                "/api/queues/{queue_name}/tasks",
                controllers::queues::tasks::make(),
            )?)
            .add(Route::new(
                controllers::queues::jobs::verbs(),
                "/api/queues/{queue_name}/jobs",
                controllers::queues::jobs::make(),
            )?)
            .add(Route::new(
                controllers::queues::workers::verbs(),
                "/api/queues/{queue_name}/workers",
                controllers::queues::workers::make(),
            )?)
            .add(Route::new(
                controllers::queues::dispatch::verbs(),
                "/api/queues/{queue_name}/dispatch",
                controllers::queues::dispatch::make(),
            )?);
        Ok(())
    }

    /// Install the routes and start the listener on `port`.
    ///
    /// Pass `0` to bind an ephemeral port; the bound port is published via
    /// [`State::port`] once the listener is accepting.
    pub async fn bind(&self, port: u16) -> anyhow::Result<()> {
        self.install_routes()?;

        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let state = Arc::clone(&self.state);
        let group = self.group.clone();
        tokio::spawn(async move {
            if let Err(error) = listener::listener(state, group, addr).await {
                tracing::error!(error = %error, "listener failed");
            }
        });

        tokio::time::timeout(BIND_TIMEOUT, async {
            while !self.state.running() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .map_err(|_| anyhow::anyhow!("listener did not come up within {BIND_TIMEOUT:?}"))
    }

    /// Block until a shutdown signal arrives and the service quiesces.
    pub async fn run(&self) -> anyhow::Result<()> {
        shutdown::signal_handler(&self.group).await
    }

    /// Run the graceful-then-forced shutdown sequence directly.
    pub async fn shutdown(&self) {
        shutdown::graceful_shutdown(&self.group).await;
    }

    /// The shared application state.
    #[must_use]
    pub fn state(&self) -> &Arc<State> {
        &self.state
    }

    /// The shutdown group tracking the listener and live sessions.
    #[must_use]
    pub fn shutdown_group(&self) -> &ShutdownGroup {
        &self.group
    }
}
