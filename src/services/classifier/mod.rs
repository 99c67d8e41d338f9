//! Game-screenshot classification on top of a zero-shot image backend.

pub mod inference;
pub mod labels;
pub mod model_manager;

use crate::error::OracleError;
use crate::models::classify_types::{ClassificationResult, Prediction};
use labels::{
    PromptSet, ANIME_LABELS, BROWSER_LABEL, CATEGORY_PROMPTS, CODE_LABELS, DEFAULT_CATEGORY,
    DEFAULT_GAME, GAME_LABEL_COUNT, GENRES, KNOWN_GAME_PATTERNS,
};
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

const TOP_K: usize = 5;
const MIN_CONFIDENCE: f32 = 0.10;
const MAX_CONFIDENCE: f32 = 0.99;

/// Probabilities over one prompt set, plus the source image size.
#[derive(Debug, Clone)]
pub struct LabelProbs {
    pub probs: Vec<f32>,
    pub width: u32,
    pub height: u32,
}

/// The black-box image scorer. Implemented by the ONNX model and by test stubs.
pub trait ClassificationBackend: Send + Sync {
    fn probabilities(&self, path: &Path, prompts: PromptSet) -> Result<LabelProbs, OracleError>;
}

/// Aggregated category scores the decision rule works on.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CategoryScores {
    pub game: f32,
    pub non_game: f32,
    pub anime: f32,
    pub code: f32,
    pub browser: f32,
}

impl CategoryScores {
    pub fn from_probs(probs: &[f32]) -> Self {
        let at = |i: usize| probs.get(i).copied().unwrap_or(0.0);
        Self {
            game: probs.iter().take(GAME_LABEL_COUNT).sum(),
            non_game: probs.iter().skip(GAME_LABEL_COUNT).sum(),
            anime: ANIME_LABELS.iter().map(|&i| at(i)).sum(),
            code: CODE_LABELS.iter().map(|&i| at(i)).sum(),
            browser: at(BROWSER_LABEL),
        }
    }

    /// Primary ratio rule, overridden by the false-positive guards.
    pub fn is_game_screenshot(&self) -> bool {
        let primary = self.game > self.non_game * 1.5 && self.game > 0.3;
        let suppressed = self.anime > 0.25 || self.code > 0.25 || self.browser > 0.2;
        primary && !suppressed
    }

    pub fn confidence(&self, accepted: bool) -> f32 {
        let raw = if accepted { self.game } else { self.non_game };
        raw.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
    }
}

/// Turns backend output into a [`ClassificationResult`], falling back to a
/// filename heuristic when the backend fails.
#[derive(Clone)]
pub struct ScreenshotClassifier {
    backend: Arc<dyn ClassificationBackend>,
}

impl ScreenshotClassifier {
    pub fn new(backend: Arc<dyn ClassificationBackend>) -> Self {
        Self { backend }
    }

    pub fn classify(&self, path: &Path) -> ClassificationResult {
        match self.try_classify(path) {
            Ok(result) => result,
            Err(e) => {
                warn!("Error classifying {}: {}, using filename fallback", path.display(), e);
                fallback_classification(path)
            }
        }
    }

    fn try_classify(&self, path: &Path) -> Result<ClassificationResult, OracleError> {
        let categories = self.backend.probabilities(path, PromptSet::Categories)?;
        let scores = CategoryScores::from_probs(&categories.probs);
        let accepted = scores.is_game_screenshot();

        let (category, detected_game) = if accepted {
            let genres = self.backend.probabilities(path, PromptSet::Genres)?;
            pick_genre(&genres.probs)
        } else {
            (DEFAULT_CATEGORY, DEFAULT_GAME)
        };

        let aspect_ratio = if categories.height > 0 {
            categories.width as f32 / categories.height as f32
        } else {
            0.0
        };

        Ok(ClassificationResult {
            is_game_screenshot: accepted,
            confidence: scores.confidence(accepted),
            game_score: scores.game,
            non_game_score: scores.non_game,
            anime_score: scores.anime,
            code_score: scores.code,
            browser_score: scores.browser,
            detected_game: detected_game.to_string(),
            category: category.to_string(),
            top_predictions: top_predictions(&categories.probs),
            resolution: format!("{}x{}", categories.width, categories.height),
            aspect_ratio,
        })
    }
}

fn top_predictions(probs: &[f32]) -> Vec<Prediction> {
    let mut indexed: Vec<(usize, f32)> = probs.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    indexed
        .into_iter()
        .take(TOP_K)
        .map(|(idx, confidence)| Prediction {
            label: CATEGORY_PROMPTS
                .get(idx)
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("class_{}", idx)),
            confidence,
        })
        .collect()
}

fn pick_genre(probs: &[f32]) -> (&'static str, &'static str) {
    probs
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .and_then(|(idx, _)| GENRES.get(idx))
        .map(|(key, game, _)| (*key, *game))
        .unwrap_or((DEFAULT_CATEGORY, DEFAULT_GAME))
}

pub fn fallback_classification(path: &Path) -> ClassificationResult {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let is_game = KNOWN_GAME_PATTERNS.iter().any(|p| file_name.contains(p));

    ClassificationResult {
        is_game_screenshot: is_game,
        confidence: 0.5,
        game_score: if is_game { 0.5 } else { 0.2 },
        non_game_score: if is_game { 0.2 } else { 0.5 },
        anime_score: 0.0,
        code_score: 0.0,
        browser_score: 0.0,
        detected_game: "Unknown Game".to_string(),
        category: DEFAULT_CATEGORY.to_string(),
        top_predictions: vec![Prediction {
            label: "Fallback classification".to_string(),
            confidence: 0.5,
        }],
        resolution: "unknown".to_string(),
        aspect_ratio: 1.78,
    }
}
