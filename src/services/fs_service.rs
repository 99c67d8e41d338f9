use crate::error::AppError;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

pub fn is_image_file(path: &Path, extensions: &BTreeSet<String>) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.contains(&ext.to_lowercase()))
        .unwrap_or(false)
}

pub fn file_name_of(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().to_string())
}

/// List the supported image files directly inside `dir` (no recursion),
/// sorted by lowercase file name.
pub fn list_image_files(dir: &Path, extensions: &BTreeSet<String>) -> Result<Vec<PathBuf>, AppError> {
    if !dir.is_dir() {
        return Err(AppError::WatchedFolderMissing(dir.to_path_buf()));
    }

    let mut images = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };

        let ft = match entry.file_type() {
            Ok(ft) => ft,
            Err(_) => continue,
        };

        if !ft.is_file() {
            continue;
        }

        let path = entry.path();
        if is_image_file(&path, extensions) {
            images.push(path);
        }
    }

    images.sort_by_key(|p| {
        p.file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_lowercase()
    });

    Ok(images)
}
