use anyhow::Context;
use tracing_subscriber::EnvFilter;

use finance_be::{
    config::Config,
    create_app,
    database::{create_database_connection, run_migrations},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("finance_be=info,tower_http=info")),
        )
        .init();

    // Load environment dari .env file
    let config = Config::from_env().context("failed to load configuration")?;

    let pool = create_database_connection(&config)
        .await
        .context("failed to connect to PostgreSQL")?;
    run_migrations(&pool).await.context("failed to run migrations")?;

    let addr = config.bind_addr.clone();
    let app = create_app(AppState::new(pool, config));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("server running at http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
