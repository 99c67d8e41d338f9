use chrono::{DateTime, Utc};
use std::fmt;
use std::path::Path;
use std::time::UNIX_EPOCH;

/// Identity of one version of a file: basename plus nanosecond mtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileFingerprint {
    pub file_name: String,
    pub mtime_ns: u128,
}

impl fmt::Display for FileFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.file_name, self.mtime_ns)
    }
}

/// Metadata snapshot taken when a file is touched by the watcher or a scan.
#[derive(Debug, Clone)]
pub struct FileVersion {
    pub fingerprint: FileFingerprint,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

impl FileVersion {
    pub fn read(path: &Path) -> std::io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        if !meta.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("{} has no file name", path.display()),
                )
            })?;

        let modified = meta.modified()?;
        let mtime_ns = modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);

        Ok(Self {
            fingerprint: FileFingerprint { file_name, mtime_ns },
            size: meta.len(),
            modified: DateTime::<Utc>::from(modified),
        })
    }

    pub fn cache_key(&self) -> String {
        self.fingerprint.to_string()
    }
}
