use crate::commands::SharedGallery;
use crate::models::api_types::{CategoryQuery, GalleryStats, ScreenshotList};
use axum::extract::{Query, State};
use axum::Json;

pub async fn list_screenshots(
    State(gallery): State<SharedGallery>,
    Query(query): Query<CategoryQuery>,
) -> Json<ScreenshotList> {
    let screenshots = gallery.list(query.category.as_deref());
    Json(ScreenshotList {
        total: screenshots.len(),
        screenshots,
    })
}

pub async fn get_categories(State(gallery): State<SharedGallery>) -> Json<Vec<String>> {
    Json(gallery.categories())
}

pub async fn get_stats(State(gallery): State<SharedGallery>) -> Json<GalleryStats> {
    Json(gallery.stats())
}
