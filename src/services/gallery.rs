//! The ingestion pipeline and the single owner of the cache and index.

use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::api_types::{GalleryStats, ScanReport};
use crate::models::classify_types::RejectionReason;
use crate::models::screenshot_types::ScreenshotRecord;
use crate::services::cache::ClassificationCache;
use crate::services::classifier::ScreenshotClassifier;
use crate::services::fingerprint::FileVersion;
use crate::services::fs_service;
use crate::services::index::ScreenshotIndex;
use crate::services::live::{LiveChannel, LiveEvent};
use crate::services::title::generate_title;
use chrono::Utc;
use futures::StreamExt;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

const MAX_INGEST_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
pub struct GallerySettings {
    pub watch_dir: PathBuf,
    pub extensions: BTreeSet<String>,
    pub scan_concurrency: usize,
}

impl From<&AppConfig> for GallerySettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            watch_dir: config.watch_dir.clone(),
            extensions: config.extensions.clone(),
            scan_concurrency: config.scan_concurrency,
        }
    }
}

/// Mints `img_{millis}_{md5(name)[..8]}` ids, strictly increasing in millis.
struct IdMinter {
    last_ms: Mutex<i64>,
}

impl IdMinter {
    fn new() -> Self {
        Self {
            last_ms: Mutex::new(0),
        }
    }

    fn mint(&self, file_name: &str) -> String {
        let now = Utc::now().timestamp_millis();
        let ms = {
            let mut last = self.last_ms.lock().unwrap();
            *last = if now > *last { now } else { *last + 1 };
            *last
        };
        let digest = format!("{:x}", md5::compute(file_name.as_bytes()));
        format!("img_{}_{}", ms, &digest[..8])
    }
}

/// Result of classifying one file version.
enum Attempt {
    Ready(ScreenshotRecord),
    /// The file changed underneath the classification.
    Changed,
    Failed,
}

/// Clears the scan flag when a rescan ends, however it ends.
struct ScanGuard<'a>(&'a AtomicBool);

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct GalleryService {
    settings: GallerySettings,
    cache: Arc<ClassificationCache>,
    index: RwLock<ScreenshotIndex>,
    classifier: ScreenshotClassifier,
    live: LiveChannel,
    /// Serializes index mutations and their broadcasts.
    mutation: tokio::sync::Mutex<()>,
    /// Per-fingerprint locks so each file version reaches the oracle once.
    ingest_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    ids: IdMinter,
    scanning: AtomicBool,
}

impl GalleryService {
    pub fn new(settings: GallerySettings, cache: ClassificationCache, classifier: ScreenshotClassifier) -> Self {
        Self {
            settings,
            cache: Arc::new(cache),
            index: RwLock::new(ScreenshotIndex::new()),
            classifier,
            live: LiveChannel::new(),
            mutation: tokio::sync::Mutex::new(()),
            ingest_locks: Mutex::new(HashMap::new()),
            ids: IdMinter::new(),
            scanning: AtomicBool::new(false),
        }
    }

    pub fn watch_dir(&self) -> &Path {
        &self.settings.watch_dir
    }

    pub fn extensions(&self) -> &BTreeSet<String> {
        &self.settings.extensions
    }

    pub fn cache(&self) -> &ClassificationCache {
        &self.cache
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.live.subscribe()
    }

    // ---- reads ----

    pub fn list(&self, category: Option<&str>) -> Vec<ScreenshotRecord> {
        self.index.read().unwrap().list(category)
    }

    pub fn categories(&self) -> Vec<String> {
        self.index.read().unwrap().categories().into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.index.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> GalleryStats {
        GalleryStats {
            total_screenshots: self.len(),
            watched_folder: self.settings.watch_dir.to_string_lossy().to_string(),
            cache_size: self.cache.len(),
        }
    }

    // ---- ingestion ----

    /// Classify `path` (or return its cached record) and store the result in the cache.
    ///
    /// A file that changes while it is classified is retried with its new
    /// version, a bounded number of times.
    pub async fn ingest(&self, path: &Path) -> Option<ScreenshotRecord> {
        for attempt in 1..=MAX_INGEST_ATTEMPTS {
            let version = match FileVersion::read(path) {
                Ok(v) => v,
                Err(e) => {
                    warn!("Cannot read {}: {}", path.display(), e);
                    return None;
                }
            };

            match self.ingest_version(path, &version).await {
                Attempt::Ready(record) => return Some(record),
                Attempt::Failed => return None,
                Attempt::Changed => debug!(
                    "{} changed during classification, retrying ({}/{})",
                    version.fingerprint.file_name, attempt, MAX_INGEST_ATTEMPTS
                ),
            }
        }

        warn!("{} kept changing, giving up for now", path.display());
        None
    }

    async fn ingest_version(&self, path: &Path, version: &FileVersion) -> Attempt {
        let key = version.cache_key();
        if let Some(hit) = self.cache.get(&key) {
            return Attempt::Ready(hit);
        }

        let key_lock = {
            let mut locks = self.ingest_locks.lock().unwrap();
            locks.entry(key.clone()).or_default().clone()
        };

        let result = {
            let _held = key_lock.lock().await;
            self.classify_version(path, version, &key).await
        };

        {
            let mut locks = self.ingest_locks.lock().unwrap();
            // Map entry plus ours: nobody else is waiting on this key
            if Arc::strong_count(&key_lock) <= 2 {
                locks.remove(&key);
            }
        }

        result
    }

    async fn classify_version(&self, path: &Path, version: &FileVersion, key: &str) -> Attempt {
        // Another caller may have finished this fingerprint while we waited
        if let Some(hit) = self.cache.get(key) {
            return Attempt::Ready(hit);
        }

        let file_name = version.fingerprint.file_name.clone();
        let classifier = self.classifier.clone();
        let owned_path = path.to_path_buf();
        let classification = match tokio::task::spawn_blocking(move || classifier.classify(&owned_path)).await {
            Ok(c) => c,
            Err(e) => {
                error!("Classification task for {} failed: {}", file_name, e);
                return Attempt::Failed;
            }
        };

        // The file must still be the version we classified
        match FileVersion::read(path) {
            Ok(now) if now.fingerprint == version.fingerprint => {}
            Ok(_) => return Attempt::Changed,
            Err(e) => {
                warn!("{} vanished during classification: {}", file_name, e);
                return Attempt::Failed;
            }
        }

        let record = ScreenshotRecord {
            id: self.ids.mint(&file_name),
            file_path: path.to_string_lossy().to_string(),
            url: format!("/screenshots/{}", file_name),
            title: generate_title(&file_name),
            classification,
            date_added: version.modified,
            file_size: version.size,
            file_name,
        };

        // Persisting rewrites the whole cache file
        let cache = self.cache.clone();
        let (key, stored) = (key.to_string(), record.clone());
        if let Err(e) = tokio::task::spawn_blocking(move || cache.put(key, stored)).await {
            error!("Cache write task failed: {}", e);
        }
        Attempt::Ready(record)
    }

    // ---- watcher-driven mutations ----

    /// Ingest a newly created file and add it to the gallery if it is a game screenshot.
    pub async fn handle_created(&self, path: &Path) -> Option<ScreenshotRecord> {
        let record = self.ingest(path).await?;

        if let Some(reason) = record.classification.rejection_reason() {
            let c = &record.classification;
            let why = match reason {
                RejectionReason::Anime => format!("anime={:.1}%", c.anime_score * 100.0),
                RejectionReason::Code => format!("code={:.1}%", c.code_score * 100.0),
                RejectionReason::Other => "low game score".to_string(),
            };
            info!("Not a game ({}), skipping {}", why, record.file_name);
            return None;
        }

        let _guard = self.mutation.lock().await;
        if !path.exists() {
            debug!("{} was removed before it could be indexed", record.file_name);
            return None;
        }
        let already_indexed = {
            let mut index = self.index.write().unwrap();
            let present = index.contains_id(&record.id);
            index.insert_or_replace(record.clone());
            present
        };
        if already_indexed {
            debug!("{} is already in the gallery", record.file_name);
            return Some(record);
        }
        self.live.publish(LiveEvent::Added(Box::new(record.clone())));

        info!(
            "Game screenshot: {} ({:.1}% confidence)",
            record.classification.detected_game,
            record.classification.confidence * 100.0
        );
        Some(record)
    }

    /// Drop a deleted file from the gallery. The cache entry is kept.
    pub async fn handle_deleted(&self, path: &Path) -> Option<String> {
        let file_name = fs_service::file_name_of(path)?;

        let _guard = self.mutation.lock().await;
        let removed = self.index.write().unwrap().remove_by_filename(&file_name);
        if let Some(id) = &removed {
            info!("File removed: {}", file_name);
            self.live.publish(LiveEvent::Removed { id: id.clone() });
        }
        removed
    }

    // ---- bulk rebuilds ----

    /// Rebuild the index from the watched folder, reusing cached classifications.
    pub async fn rescan(&self) -> Result<ScanReport, AppError> {
        let _scan = self.begin_scan()?;
        info!("Rescanning {}", self.settings.watch_dir.display());
        let report = self.rebuild().await?;
        self.live.publish(LiveEvent::Refresh);
        Ok(report)
    }

    /// Forget every cached classification and rebuild from scratch.
    pub async fn clear_cache(&self) -> Result<ScanReport, AppError> {
        let _scan = self.begin_scan()?;
        info!("Clearing classification cache");
        let cache = self.cache.clone();
        tokio::task::spawn_blocking(move || cache.clear()).await?;
        let report = self.rebuild().await?;
        self.live.publish(LiveEvent::Refresh);
        Ok(report)
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::Acquire)
    }

    fn begin_scan(&self) -> Result<ScanGuard<'_>, AppError> {
        self.scanning
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AppError::ScanInProgress)?;
        Ok(ScanGuard(&self.scanning))
    }

    async fn rebuild(&self) -> Result<ScanReport, AppError> {
        let files = fs_service::list_image_files(&self.settings.watch_dir, &self.settings.extensions)?;
        let total = files.len();
        info!("Found {} images to process", total);

        let mut report = ScanReport {
            files: total,
            ..Default::default()
        };
        let mut accepted = Vec::new();
        let mut failed_names = HashSet::new();

        let mut results = futures::stream::iter(files.clone())
            .map(|path| async move {
                let outcome = self.ingest(&path).await;
                (path, outcome)
            })
            .buffer_unordered(self.settings.scan_concurrency.max(1));

        let mut processed = 0;
        while let Some((path, result)) = results.next().await {
            processed += 1;
            match result {
                Some(record) => match record.classification.rejection_reason() {
                    None => {
                        report.accepted += 1;
                        accepted.push(record);
                    }
                    Some(RejectionReason::Anime) => report.rejected_anime += 1,
                    Some(RejectionReason::Code) => report.rejected_code += 1,
                    Some(RejectionReason::Other) => report.rejected_other += 1,
                },
                None => {
                    report.failed += 1;
                    failed_names.extend(fs_service::file_name_of(&path));
                }
            }

            if processed % 25 == 0 || processed == total {
                info!(
                    "Progress: {}/{} | Games: {} | Rejected - Anime: {}, Code: {}, Other: {} | Failed: {}",
                    processed,
                    total,
                    report.accepted,
                    report.rejected_anime,
                    report.rejected_code,
                    report.rejected_other,
                    report.failed
                );
            }
        }
        drop(results);

        let scanned: HashSet<String> = files.iter().filter_map(|p| fs_service::file_name_of(p)).collect();
        let mut fresh = ScreenshotIndex::from_records(accepted);

        {
            let _guard = self.mutation.lock().await;
            let mut index = self.index.write().unwrap();

            // Reconcile with watcher activity that happened during the scan.
            // Files that could not be classified this time keep their old record.
            fresh.retain(|r| Path::new(&r.file_path).exists());
            for record in index.records() {
                let unresolved = !scanned.contains(&record.file_name) || failed_names.contains(&record.file_name);
                if unresolved && !fresh.contains(&record.file_name) && Path::new(&record.file_path).exists() {
                    fresh.insert_or_replace(record.clone());
                }
            }
            *index = fresh;
        }

        info!(
            "Scan complete: {} game screenshots, rejected {} (anime {}, code {}, other {}), {} failed",
            report.accepted,
            report.rejected(),
            report.rejected_anime,
            report.rejected_code,
            report.rejected_other,
            report.failed
        );
        Ok(report)
    }
}
