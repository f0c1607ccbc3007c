//! Observability (structured logging)

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing stack.
///
/// Pretty formatting in debug builds, JSON in release; log levels come from
/// `RUST_LOG` with a sensible fallback.
///
/// # Example
///
/// ```rust,no_run
/// # fn main() -> anyhow::Result<()> {
/// dispatchd::observability::init()?;
/// tracing::info!("service started");
/// # Ok(())
/// # }
/// ```
pub fn init() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            EnvFilter::new("debug,dispatchd=trace")
        } else {
            EnvFilter::new("info")
        }
    });

    #[cfg(debug_assertions)]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    }

    Ok(())
}
