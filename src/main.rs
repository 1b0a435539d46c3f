use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use movie_finder::{
    api::{create_router, AppState},
    config::Config,
    db::connect_trending_store,
    services::{Notifier, SessionSettings, TmdbCatalog},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "movie_finder=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        backend = ?config.trending_backend,
        debounce_ms = config.debounce_ms,
        "Configuration loaded"
    );

    let store = connect_trending_store(&config).await?;
    let catalog = Arc::new(TmdbCatalog::new(
        config.tmdb_api_key.clone(),
        config.tmdb_api_url.clone(),
        config.video_language.clone(),
    ));

    let settings = SessionSettings {
        quiet_period: config.debounce(),
        trending_limit: config.trending_limit,
    };
    let state = AppState::new(catalog, store, config.tmdb_image_url.clone(), settings).await;
    tokio::spawn(log_notifications(state.notifier.clone()));

    let app = create_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("Server running on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Surfaces user-facing notifications in the server log
async fn log_notifications(notifier: Notifier) {
    let mut rx = notifier.subscribe();
    loop {
        match rx.recv().await {
            Ok(notification) => {
                tracing::info!(?notification, message = notification.message(), "Notification")
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Notification log fell behind")
            }
            Err(RecvError::Closed) => break,
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
