//! dispatchd: asynchronous job dispatch engine with an HTTP control surface
//!
//! Named task handlers are registered on in-process queues; remote clients
//! submit dispatch requests over HTTP, and the engine executes them on pools
//! of workers, each worker bound to its own serial execution lane. Operators
//! authenticate with HS256 signed bearer tokens; request bodies pass a
//! declarative validation gate before a controller ever runs.
//!
//! # Architecture
//!
//! - [`queue`] - the scheduler: tasks, jobs, workers, queues, cancellation
//! - [`routing`] + [`kernel`] - the request-to-controller pipeline
//! - [`token`] - the HS256 issuer/verifier behind authentication
//! - [`shutdown`] - graceful-then-forced cancellation fan-out
//! - [`server`] - listener, sessions, and the wiring between all of the above
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use dispatchd::config::EngineConfig;
//! use dispatchd::server::Server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = EngineConfig::from_env();
//!     let server = Server::new(&config);
//!
//!     // Register work before (or after) going live
//!     let queue = server.state().get_queue("notifications");
//!     queue.add_task("send", |_cancel, payload| async move {
//!         tracing::info!(?payload, "sending notification");
//!         Ok(())
//!     });
//!
//!     server.bind(config.port).await?;
//!     server.run().await
//! }
//! ```

#![forbid(unsafe_code)]

pub mod cipher;
pub mod config;
pub mod controller;
pub mod controllers;
pub mod encoding;
pub mod error;
pub mod kernel;
pub mod observability;
pub mod queue;
pub mod routing;
pub mod server;
pub mod shutdown;
pub mod state;
pub mod token;
pub mod validator;
