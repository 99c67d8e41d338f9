use crate::models::classify_types::ClassificationResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A classified image as served by the API and stored in the cache.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotRecord {
    pub id: String,
    pub file_name: String,
    pub file_path: String,
    pub url: String,
    pub title: String,
    #[serde(flatten)]
    pub classification: ClassificationResult,
    /// File modification time.
    pub date_added: DateTime<Utc>,
    pub file_size: u64,
}

impl ScreenshotRecord {
    pub fn category(&self) -> &str {
        &self.classification.category
    }
}
