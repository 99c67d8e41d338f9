#![allow(dead_code)]

use screenshot_gallery::error::OracleError;
use screenshot_gallery::services::cache::ClassificationCache;
use screenshot_gallery::services::classifier::labels::{PromptSet, CATEGORY_PROMPTS, GENRES};
use screenshot_gallery::services::classifier::{ClassificationBackend, LabelProbs, ScreenshotClassifier};
use screenshot_gallery::services::gallery::{GalleryService, GallerySettings};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Scores files by name: "game" is accepted, "anime" and "code" trip the
/// guards, anything else looks like a photo. Genre is racing for "racing"
/// names and rpg otherwise.
pub struct StubBackend {
    calls: AtomicUsize,
    delay: Duration,
    /// Bump the file's mtime during every classification.
    touching: AtomicBool,
}

impl StubBackend {
    pub fn new() -> Arc<Self> {
        Self::slow(Duration::ZERO)
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
            touching: AtomicBool::new(false),
        })
    }

    /// Category-level invocations, one per classified file version.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_touching(&self, on: bool) {
        self.touching.store(on, Ordering::SeqCst);
    }
}

impl ClassificationBackend for StubBackend {
    fn probabilities(&self, path: &Path, prompts: PromptSet) -> Result<LabelProbs, OracleError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let probs = match prompts {
            PromptSet::Categories => {
                let call = self.calls.fetch_add(1, Ordering::SeqCst) as u64;
                std::thread::sleep(self.delay);
                if self.touching.load(Ordering::SeqCst) {
                    set_mtime(path, SystemTime::now() + Duration::from_secs(60 + call));
                }

                let mut p = vec![0.0; CATEGORY_PROMPTS.len()];
                if name.contains("game") {
                    p[..4].fill(0.175);
                    p[11] = 0.3;
                } else if name.contains("anime") {
                    p[..4].fill(0.1);
                    p[6] = 0.3;
                    p[11] = 0.3;
                } else if name.contains("code") {
                    p[4] = 0.5;
                    p[5] = 0.3;
                    p[11] = 0.2;
                } else {
                    p[0] = 0.1;
                    p[11] = 0.9;
                }
                p
            }
            PromptSet::Genres => {
                let mut p = vec![0.05; GENRES.len()];
                let pick = if name.contains("racing") { 4 } else { 0 };
                p[pick] = 0.65;
                p
            }
        };

        Ok(LabelProbs {
            probs,
            width: 1920,
            height: 1080,
        })
    }
}

pub fn gallery_in(dir: &Path, backend: Arc<StubBackend>) -> Arc<GalleryService> {
    let settings = GallerySettings {
        watch_dir: dir.to_path_buf(),
        extensions: ["png", "jpg"].into_iter().map(String::from).collect::<BTreeSet<_>>(),
        scan_concurrency: 4,
    };
    let cache = ClassificationCache::new(dir.join("cache").join("classification_cache.json"));
    Arc::new(GalleryService::new(settings, cache, ScreenshotClassifier::new(backend)))
}

pub fn write_image(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"not really a png").unwrap();
    path
}

pub fn set_mtime(path: &Path, mtime: SystemTime) {
    File::options().write(true).open(path).unwrap().set_modified(mtime).unwrap();
}
