//! The accept loop

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::server::session::session;
use crate::shutdown::ShutdownGroup;
use crate::state::State;

/// Bind `addr` and accept connections until `Total` cancellation.
///
/// Publishes the bound port and the running flag through `state` before the
/// first accept. Every accepted connection becomes a session task
/// registered with `group`, so shutdown can track and cancel it;
/// per-session errors are logged and swallowed. Accept errors propagate.
pub async fn listener(
    state: Arc<State>,
    group: ShutdownGroup,
    addr: SocketAddr,
) -> anyhow::Result<()> {
    let acceptor = TcpListener::bind(addr).await?;
    let registration = group.register();

    state.set_port(acceptor.local_addr()?.port());
    state.set_running(true);
    tracing::info!(port = state.port(), "listener started");

    loop {
        tokio::select! {
            accepted = acceptor.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        tracing::debug!(%peer, "session accepted");
                        let session_state = Arc::clone(&state);
                        let session_registration = group.register();
                        tokio::spawn(async move {
                            if let Err(error) =
                                session(session_state, stream, session_registration).await
                            {
                                tracing::warn!(%peer, error = %error, "session ended with error");
                            }
                        });
                    }
                    Err(error) => {
                        state.set_running(false);
                        return Err(error.into());
                    }
                }
            }
            () = registration.total_cancelled() => break,
        }
    }

    tracing::info!("listener stopped");
    state.set_running(false);
    Ok(())
}
