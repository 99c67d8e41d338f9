pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

use anyhow::Context;
use config::AppConfig;
use services::cache::ClassificationCache;
use services::classifier::model_manager::ModelManager;
use services::classifier::ScreenshotClassifier;
use services::gallery::{GalleryService, GallerySettings};
use services::watcher::FolderWatcher;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Load the model and cache, scan the folder, start watching, then serve until Ctrl-C.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    info!("Screenshots folder: {}", config.watch_dir.display());
    info!("Cache file: {}", config.cache_file.display());

    let cache = ClassificationCache::open(&config.cache_file);

    let model_manager = ModelManager::new(&config.model);
    match model_manager.prepare().await {
        Ok(()) => info!("Classifier model ready"),
        Err(e) => warn!("Classifier model unavailable, using filename heuristics: {}", e),
    }
    let classifier = ScreenshotClassifier::new(Arc::new(model_manager));

    let gallery = Arc::new(GalleryService::new(GallerySettings::from(&config), cache, classifier));

    info!("Scanning existing files...");
    if let Err(e) = gallery.rescan().await {
        error!("Initial scan failed: {}", e);
    }

    let _watcher = FolderWatcher::start(gallery.clone(), Duration::from_millis(config.debounce_ms))
        .context("Failed to start folder watcher")?;

    let app = commands::router(gallery, &config.cors_origins);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Server running at http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
