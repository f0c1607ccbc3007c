//! Per-connection sessions

use std::sync::Arc;
use std::time::Duration;

use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::TcpStream;

use crate::controller::EngineRequest;
use crate::kernel::kernel;
use crate::shutdown::Registration;
use crate::state::State;

/// How long a connection may sit idle between requests.
pub const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Serve one accepted connection until it closes.
///
/// The protocol layer reads one request at a time with a 5-second read
/// expiry and honours keep-alive. `Total` cancellation drains the
/// connection gracefully (the in-flight exchange completes, then the
/// connection closes); `Terminal` drops it outright. End-of-stream returns
/// cleanly.
pub async fn session(
    state: Arc<State>,
    stream: TcpStream,
    registration: Registration,
) -> anyhow::Result<()> {
    let io = TokioIo::new(stream);
    let service = service_fn(move |request: hyper::Request<Incoming>| {
        let state = Arc::clone(&state);
        async move {
            let (parts, body) = request.into_parts();
            let body = body.collect().await?.to_bytes();
            Ok::<_, hyper::Error>(kernel(state, EngineRequest { parts, body }).await)
        }
    });

    let connection = http1::Builder::new()
        .timer(TokioTimer::new())
        .header_read_timeout(READ_TIMEOUT)
        .serve_connection(io, service);
    tokio::pin!(connection);

    let mut draining = false;
    loop {
        tokio::select! {
            result = connection.as_mut() => {
                return match result {
                    Ok(()) => Ok(()),
                    // An idle keep-alive connection hitting the read expiry
                    // is a normal end of session
                    Err(error) if error.is_timeout() => Ok(()),
                    Err(error) => Err(error.into()),
                };
            }
            () = registration.total_cancelled(), if !draining => {
                draining = true;
                connection.as_mut().graceful_shutdown();
            }
            () = registration.terminal_cancelled() => {
                return Ok(());
            }
        }
    }
}
