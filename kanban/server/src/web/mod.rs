use axum::Router;
use axum::routing::get;
use migration::MigratorTrait;
use sea_orm::Database;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::clock::SystemClock;
use crate::config::Config;
use crate::project::web::{BoardState, create_board_router};

/// Builds the full application router: the board routes, the health check and request tracing.
pub fn create_app(board_state: Arc<BoardState>) -> Router {
    Router::new()
        .route("/health", get(health_check_handler))
        .merge(create_board_router(board_state))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: Config) -> anyhow::Result<()> {
    let server_address = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    let db = Arc::new(Database::connect(&config.db_url).await?);
    migration::Migrator::up(db.as_ref(), None).await?;
    tracing::info!("Database migrations applied successfully");

    let board_state = Arc::new(BoardState {
        db: db.clone(),
        clock: Arc::new(SystemClock),
    });
    let app = create_app(board_state);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Web server stopped");

    match Arc::try_unwrap(db) {
        Ok(db) => db.close().await?,
        Err(_) => tracing::warn!("Database connection still shared at shutdown"),
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
}

#[tracing::instrument]
pub async fn health_check_handler() -> &'static str {
    "OK"
}
