use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub confidence: f32,
}

/// Output of the classifier adapter for one file version.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub is_game_screenshot: bool,
    pub confidence: f32,
    pub game_score: f32,
    pub non_game_score: f32,
    #[serde(default)]
    pub anime_score: f32,
    #[serde(default)]
    pub code_score: f32,
    #[serde(default)]
    pub browser_score: f32,
    #[serde(rename = "game")]
    pub detected_game: String,
    pub category: String,
    pub top_predictions: Vec<Prediction>,
    #[serde(default = "default_resolution")]
    pub resolution: String,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: f32,
}

fn default_resolution() -> String {
    "unknown".to_string()
}

fn default_aspect_ratio() -> f32 {
    1.78
}

/// Why a file was kept out of the gallery, for logs and scan summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    Anime,
    Code,
    Other,
}

impl ClassificationResult {
    pub fn rejection_reason(&self) -> Option<RejectionReason> {
        if self.is_game_screenshot {
            None
        } else if self.anime_score > 0.2 {
            Some(RejectionReason::Anime)
        } else if self.code_score > 0.2 {
            Some(RejectionReason::Code)
        } else {
            Some(RejectionReason::Other)
        }
    }
}
