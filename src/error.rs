use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::path::PathBuf;
use thiserror::Error;

/// Failure inside the classification backend. Never leaves the classifier adapter.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("Failed to open image {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("Model not loaded")]
    NotLoaded,
    #[error("Inference failed: {0}")]
    Inference(String),
    #[error("Model produced {got} logits, expected {expected}")]
    Shape { got: usize, expected: usize },
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Cache file {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Watched folder not found: {}", .0.display())]
    WatchedFolderMissing(PathBuf),
    #[error("A scan is already in progress")]
    ScanInProgress,
    #[error("Watcher error: {0}")]
    Watch(#[from] notify::Error),
    #[error("Model error: {0}")]
    Model(String),
    #[error("Download error: {0}")]
    Download(#[from] reqwest::Error),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ScanInProgress => StatusCode::CONFLICT,
            AppError::WatchedFolderMissing(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "message": self.to_string() }));
        (self.status(), body).into_response()
    }
}
