use crate::error::CacheError;
use crate::models::screenshot_types::ScreenshotRecord;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Fingerprint-keyed classification results, mirrored to a JSON file.
///
/// Every mutation rewrites the file while the map lock is held, so the disk
/// copy never falls behind by more than the write in progress.
pub struct ClassificationCache {
    path: PathBuf,
    entries: Mutex<HashMap<String, ScreenshotRecord>>,
}

impl ClassificationCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Open the cache at `path`, starting empty if the file is missing or unreadable.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let cache = Self::new(path);
        if let Err(e) = cache.load() {
            warn!("Could not load cache, starting empty: {}", e);
        }
        cache
    }

    pub fn load(&self) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().unwrap();
        entries.clear();

        if !self.path.exists() {
            debug!("No cache file at {}", self.path.display());
            return Ok(());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|source| CacheError::Io {
            path: self.path.clone(),
            source,
        })?;
        let loaded: HashMap<String, ScreenshotRecord> =
            serde_json::from_str(&content).map_err(|source| CacheError::Json {
                path: self.path.clone(),
                source,
            })?;

        info!("Loaded {} cached classifications", loaded.len());
        *entries = loaded;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<ScreenshotRecord> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn put(&self, key: String, record: ScreenshotRecord) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key, record);
        if let Err(e) = write_atomic(&self.path, &entries) {
            warn!("Could not save cache: {}", e);
        }
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap();
        entries.clear();
        if let Err(e) = write_atomic(&self.path, &entries) {
            warn!("Could not save cache: {}", e);
        }
    }

    pub fn persist(&self) -> Result<(), CacheError> {
        let entries = self.entries.lock().unwrap();
        write_atomic(&self.path, &entries)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Write to a sibling temp file, then rename over the target.
fn write_atomic(path: &Path, entries: &HashMap<String, ScreenshotRecord>) -> Result<(), CacheError> {
    let io_err = |source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(io_err)?;
    }

    let json = serde_json::to_vec_pretty(entries).map_err(|source| CacheError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, json).map_err(io_err)?;
    std::fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}
