//! Server binary entry point

use dispatchd::config::EngineConfig;
use dispatchd::observability;
use dispatchd::server::Server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    observability::init()?;

    let config = EngineConfig::from_env();
    let server = Server::new(&config);

    if let Some(database) = &config.database {
        let pool = database.connect().await?;
        server.state().set_database_pool(pool);
        tracing::info!(host = %database.host, "database pool ready");
    }

    server.bind(config.port).await?;
    tracing::info!(port = server.state().port(), "accepting connections");

    server.run().await
}
