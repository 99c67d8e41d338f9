use crate::commands::SharedGallery;
use crate::error::AppError;
use crate::models::api_types::ScanResponse;
use axum::extract::State;
use axum::Json;

// Scans run in their own task so a dropped request cannot cancel one halfway.

pub async fn rescan(State(gallery): State<SharedGallery>) -> Result<Json<ScanResponse>, AppError> {
    let svc = gallery.clone();
    tokio::spawn(async move { svc.rescan().await }).await??;

    Ok(Json(ScanResponse {
        message: "Rescan complete".to_string(),
        total: gallery.len(),
    }))
}

pub async fn clear_cache(State(gallery): State<SharedGallery>) -> Result<Json<ScanResponse>, AppError> {
    let svc = gallery.clone();
    tokio::spawn(async move { svc.clear_cache().await }).await??;

    Ok(Json(ScanResponse {
        message: "Cache cleared and rescanned".to_string(),
        total: gallery.len(),
    }))
}
