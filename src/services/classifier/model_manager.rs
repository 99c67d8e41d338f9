use crate::config::ModelConfig;
use crate::error::{AppError, OracleError};
use crate::services::classifier::inference::{self, CROP_SIZE};
use crate::services::classifier::labels::PromptSet;
use crate::services::classifier::{ClassificationBackend, LabelProbs};
use futures::StreamExt;
use ort::session::Session;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Owns the ONNX session of the zero-shot screenshot model.
#[derive(Clone)]
pub struct ModelManager {
    model_path: PathBuf,
    model_url: Option<String>,
    use_gpu: bool,
    model: Arc<Mutex<Option<Session>>>,
}

impl ModelManager {
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            model_path: config.path.clone(),
            model_url: config.url.clone(),
            use_gpu: config.use_gpu,
            model: Arc::new(Mutex::new(None)),
        }
    }

    pub fn is_downloaded(&self) -> bool {
        self.model_path.exists()
    }

    pub fn is_ready(&self) -> bool {
        self.model.lock().unwrap().is_some()
    }

    /// Download the model if it is missing and a URL is configured, then load it.
    pub async fn prepare(&self) -> Result<(), AppError> {
        if !self.is_downloaded() {
            match &self.model_url {
                Some(url) => download_file(url, &self.model_path).await?,
                None => {
                    return Err(AppError::Model(format!(
                        "Model file {} not found and no download URL configured",
                        self.model_path.display()
                    )))
                }
            }
        }
        self.load_model().await
    }

    pub async fn load_model(&self) -> Result<(), AppError> {
        if self.is_ready() {
            return Ok(());
        }

        let model_path = self.model_path.clone();
        let use_gpu = self.use_gpu;

        let session = tokio::task::spawn_blocking(move || -> Result<Session, AppError> {
            let _ = ort::init().with_name("screenshot-gallery").commit();

            let mut builder = Session::builder()
                .map_err(|e| AppError::Model(format!("Failed to create session builder: {}", e)))?
                .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
                .map_err(|e| AppError::Model(format!("Failed to set optimization level: {}", e)))?
                .with_intra_threads(4)
                .map_err(|e| AppError::Model(format!("Failed to set intra threads: {}", e)))?;

            if use_gpu {
                builder = builder.with_execution_providers([
                    ort::execution_providers::DirectMLExecutionProvider::default().build(),
                    ort::execution_providers::CoreMLExecutionProvider::default().build(),
                    ort::execution_providers::CUDAExecutionProvider::default().build(),
                    ort::execution_providers::CPUExecutionProvider::default().build(),
                ]).map_err(|e| AppError::Model(format!("Failed to register GPU execution providers: {}", e)))?;
            } else {
                builder = builder.with_execution_providers([
                    ort::execution_providers::CPUExecutionProvider::default().build(),
                ]).map_err(|e| AppError::Model(format!("Failed to register CPU execution provider: {}", e)))?;
            }

            let session = builder.commit_from_file(&model_path).map_err(|e| {
                AppError::Model(format!("Failed to load ONNX model {}: {}", model_path.display(), e))
            })?;
            Ok(session)
        })
        .await??;

        *self.model.lock().unwrap() = Some(session);
        info!("Model loaded from {}", self.model_path.display());
        Ok(())
    }
}

impl ClassificationBackend for ModelManager {
    fn probabilities(&self, path: &Path, prompts: PromptSet) -> Result<LabelProbs, OracleError> {
        // Decode outside the session lock
        let pre = inference::preprocess_image(path, CROP_SIZE)?;

        let logits = {
            let mut guard = self.model.lock().unwrap();
            let session = guard.as_mut().ok_or(OracleError::NotLoaded)?;
            inference::run_inference(session, pre.tensor)?
        };

        if logits.len() != PromptSet::total_logits() {
            return Err(OracleError::Shape {
                got: logits.len(),
                expected: PromptSet::total_logits(),
            });
        }

        let start = prompts.offset();
        let probs = inference::softmax(&logits[start..start + prompts.len()]);

        Ok(LabelProbs {
            probs,
            width: pre.width,
            height: pre.height,
        })
    }
}

async fn download_file(url: &str, dest: &Path) -> Result<(), AppError> {
    if let Some(dir) = dest.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await?;
    }

    info!("Downloading model from {}", url);
    let response = reqwest::Client::new().get(url).send().await?.error_for_status()?;

    let total_size = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;
    let mut last_logged = 0;

    // Partial downloads stay in `.part` until complete
    let partial = dest.with_extension("part");
    let mut file = tokio::fs::File::create(&partial).await?;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                drop(file);
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(e.into());
            }
        };
        downloaded += chunk.len() as u64;
        tokio::io::AsyncWriteExt::write_all(&mut file, &chunk).await?;

        if total_size > 0 {
            let progress = (downloaded * 100) / total_size;
            if progress >= last_logged + 10 {
                info!("Model download {}%", progress);
                last_logged = progress;
            }
        }
    }
    tokio::io::AsyncWriteExt::flush(&mut file).await?;
    drop(file);

    if let Err(e) = tokio::fs::rename(&partial, dest).await {
        warn!("Failed to move downloaded model into place: {}", e);
        return Err(e.into());
    }
    info!("Model saved to {}", dest.display());
    Ok(())
}
