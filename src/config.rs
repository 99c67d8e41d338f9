//! Server configuration.
//!
//! Values come from an optional TOML file, then individual command-line flags
//! (each with an environment variable fallback) override them. Everything is
//! fixed at startup.

use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Local ONNX model file.
    #[serde(default = "default_model_path")]
    pub path: PathBuf,
    /// Downloaded into `path` when the file is missing.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_use_gpu")]
    pub use_gpu: bool,
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models").join("clip-game-screenshots.onnx")
}
fn default_use_gpu() -> bool {
    true
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
            url: None,
            use_gpu: default_use_gpu(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_watch_dir")]
    pub watch_dir: PathBuf,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Lowercase, without the leading dot.
    #[serde(default = "default_extensions")]
    pub extensions: BTreeSet<String>,
    #[serde(default = "default_cache_file")]
    pub cache_file: PathBuf,
    /// Wait after a create event before reading the file.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_scan_concurrency")]
    pub scan_concurrency: usize,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
    #[serde(default)]
    pub model: ModelConfig,
}

fn default_watch_dir() -> PathBuf {
    dirs::picture_dir()
        .map(|p| p.join("Screenshots"))
        .unwrap_or_else(|| PathBuf::from("screenshots"))
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3001
}
fn default_extensions() -> BTreeSet<String> {
    ["png", "jpg", "jpeg", "webp", "bmp", "gif"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_cache_file() -> PathBuf {
    PathBuf::from("classification_cache.json")
}
fn default_debounce_ms() -> u64 {
    2000
}
fn default_scan_concurrency() -> usize {
    4
}
fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://127.0.0.1:5173".to_string(),
    ]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            watch_dir: default_watch_dir(),
            host: default_host(),
            port: default_port(),
            extensions: default_extensions(),
            cache_file: default_cache_file(),
            debounce_ms: default_debounce_ms(),
            scan_concurrency: default_scan_concurrency(),
            cors_origins: default_cors_origins(),
            model: ModelConfig::default(),
        }
    }
}

impl AppConfig {
    /// Read a TOML config file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading config from: {}", path.display());
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.extensions = normalize_extensions(config.extensions);
        info!("Config loaded from: {}", path.display());
        Ok(config)
    }
}

pub fn normalize_extensions<I, S>(exts: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    exts.into_iter()
        .map(|e| e.as_ref().trim().trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

/// Command-line flags. Each one overrides the matching config file value.
#[derive(Debug, Parser, Default)]
#[command(name = "screenshot-gallery", version, about)]
pub struct Cli {
    /// TOML config file
    #[arg(long, env = "GALLERY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Folder to watch for new screenshots
    #[arg(long, env = "SCREENSHOTS_FOLDER")]
    pub watch_dir: Option<PathBuf>,

    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Comma-separated list, e.g. "png,jpg"
    #[arg(long, env = "SUPPORTED_EXTENSIONS", value_delimiter = ',')]
    pub extensions: Option<Vec<String>>,

    #[arg(long, env = "CACHE_FILE")]
    pub cache_file: Option<PathBuf>,

    #[arg(long, env = "DEBOUNCE_MS")]
    pub debounce_ms: Option<u64>,

    #[arg(long, env = "MODEL_PATH")]
    pub model_path: Option<PathBuf>,

    #[arg(long, env = "MODEL_URL")]
    pub model_url: Option<String>,

    /// Run inference on the CPU only
    #[arg(long)]
    pub cpu: bool,
}

impl Cli {
    pub fn load_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_file(path)?,
            None => AppConfig::default(),
        };
        self.apply(&mut config);
        Ok(config)
    }

    fn apply(&self, config: &mut AppConfig) {
        if let Some(dir) = &self.watch_dir {
            config.watch_dir = dir.clone();
        }
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(exts) = &self.extensions {
            config.extensions = normalize_extensions(exts);
        }
        if let Some(cache_file) = &self.cache_file {
            config.cache_file = cache_file.clone();
        }
        if let Some(ms) = self.debounce_ms {
            config.debounce_ms = ms;
        }
        if let Some(path) = &self.model_path {
            config.model.path = path.clone();
        }
        if let Some(url) = &self.model_url {
            config.model.url = Some(url.clone());
        }
        if self.cpu {
            config.model.use_gpu = false;
        }
    }
}
