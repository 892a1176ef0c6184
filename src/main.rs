use expense_tracker::config::Config;
use expense_tracker::logging::setup_logging;
use expense_tracker::services::CategoryService;
use expense_tracker::{AppState, build_router, db};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();
    setup_logging();

    let config = Config::from_env()?;

    let pool = db::connect(&config.database_url).await?;
    tracing::info!(database_url = %config.database_url, "Connected to database");

    db::migrate(&pool).await?;
    tracing::info!("Migrations completed");

    let state = AppState::new(pool, config.auth.clone());

    if config.seed_default_categories {
        let inserted = state.category_service.seed_defaults().await?;
        tracing::info!(inserted, "Default categories seeded");
    }

    let app = build_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server running on http://{}", addr);
    tracing::info!("API docs at http://{}/api/docs", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping...");
}
