//! HTTP and WebSocket surface.

pub mod admin;
pub mod live;
pub mod screenshots;

use crate::services::gallery::GalleryService;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

pub type SharedGallery = Arc<GalleryService>;

pub fn router(service: SharedGallery, cors_origins: &[String]) -> Router {
    let images = ServeDir::new(service.watch_dir());

    Router::new()
        .route("/api/screenshots", get(screenshots::list_screenshots))
        .route("/api/categories", get(screenshots::get_categories))
        .route("/api/stats", get(screenshots::get_stats))
        .route("/api/rescan", post(admin::rescan))
        .route("/api/clear-cache", post(admin::clear_cache))
        .route("/ws", get(live::live_updates))
        .nest_service("/screenshots", images)
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}
