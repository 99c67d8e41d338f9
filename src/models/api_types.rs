use crate::models::screenshot_types::ScreenshotRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ScreenshotList {
    pub total: usize,
    pub screenshots: Vec<ScreenshotRecord>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GalleryStats {
    pub total_screenshots: usize,
    pub watched_folder: String,
    pub cache_size: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ScanResponse {
    pub message: String,
    pub total: usize,
}

#[derive(Debug, Deserialize, Default)]
pub struct CategoryQuery {
    pub category: Option<String>,
}

/// Per-file outcome counts of a bulk scan.
#[derive(Debug, Serialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub files: usize,
    pub accepted: usize,
    pub rejected_anime: usize,
    pub rejected_code: usize,
    pub rejected_other: usize,
    pub failed: usize,
}

impl ScanReport {
    pub fn rejected(&self) -> usize {
        self.rejected_anime + self.rejected_code + self.rejected_other
    }
}
