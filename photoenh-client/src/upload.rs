//! Upload pipeline
//!
//! Submits files to the enhancement backend one at a time. Each file moves
//! through the display stages in `UploadStage`; a failure is recorded against
//! that file and the batch carries on with the next one.

use crate::api::EnhancementBackend;
use crate::error::{ClientError, ClientResult};
use photoenh_common::events::{EventBus, UploadEvent, UploadStage};
use photoenh_common::models::{ConversionKind, EnhanceSettings};
use photoenh_common::EnhancedPhoto;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// An image file selected for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bytes,
            mime: mime.into(),
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension
    pub async fn from_path(path: &Path) -> ClientResult<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ClientError::InvalidState(format!("Not a file: {}", path.display())))?;
        let mime = mime_for_name(&name);
        Ok(Self::new(name, bytes, mime))
    }

    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }
}

fn mime_for_name(name: &str) -> &'static str {
    let ext = name.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "heic" => "image/heic",
        "tif" | "tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
}

/// Display state of one file in a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadJob {
    pub file_name: String,
    pub stage: UploadStage,
    pub progress_percent: u8,
    pub status_text: String,
}

impl UploadJob {
    fn new(file_name: String) -> Self {
        Self {
            file_name,
            stage: UploadStage::Queued,
            progress_percent: 0,
            status_text: UploadStage::Queued.status_text().to_string(),
        }
    }

    fn advance(&mut self, stage: UploadStage) {
        self.stage = stage;
        if let Some(percent) = stage.percent() {
            self.progress_percent = self.progress_percent.max(percent);
        }
        self.status_text = stage.status_text().to_string();
    }

    /// Progress stays where it was
    fn fail(&mut self, message: &str) {
        self.stage = UploadStage::Failed;
        self.status_text = format!("Error: {}", message);
    }

    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }
}

/// Result of processing one file
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Completed(EnhancedPhoto),
    Failed { file_name: String, error: String },
}

/// A finished upload batch
#[derive(Debug, Clone)]
pub struct UploadBatch {
    pub batch_id: Uuid,
    /// Same order as the submitted files
    pub jobs: Vec<UploadJob>,
    pub outcomes: Vec<FileOutcome>,
    /// Login flag of the last successful response
    pub requires_login: bool,
}

impl UploadBatch {
    /// Successfully processed photos in submission order
    pub fn photos(&self) -> Vec<EnhancedPhoto> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                FileOutcome::Completed(photo) => Some(photo.clone()),
                FileOutcome::Failed { .. } => None,
            })
            .collect()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, FileOutcome::Completed(_)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Sequential submission to the enhancement backend
pub struct UploadPipeline {
    backend: Arc<dyn EnhancementBackend>,
    events: EventBus,
}

impl UploadPipeline {
    pub fn new(backend: Arc<dyn EnhancementBackend>, events: EventBus) -> Self {
        Self { backend, events }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Process `files` strictly in order
    ///
    /// The request for file N+1 is only issued once file N's outcome has been
    /// recorded. Per-file failures never abort the batch.
    pub async fn submit(&self, files: Vec<UploadFile>, settings: &EnhanceSettings) -> UploadBatch {
        let batch_id = Uuid::new_v4();
        let mut jobs: Vec<UploadJob> = files.iter().map(|f| UploadJob::new(f.name.clone())).collect();
        let mut outcomes = Vec::with_capacity(files.len());
        let mut requires_login = false;

        info!(%batch_id, files = files.len(), night_mode = settings.night_mode, "Starting upload batch");
        self.events.emit_lossy(UploadEvent::BatchStarted {
            batch_id,
            file_count: files.len(),
            timestamp: chrono::Utc::now(),
        });

        for (index, (file, job)) in files.iter().zip(jobs.iter_mut()).enumerate() {
            match self.process_file(batch_id, index, file, job, settings).await {
                Ok((photo, login)) => {
                    requires_login = login;
                    info!(file = %file.name, "Enhancement completed");
                    self.events.emit_lossy(UploadEvent::FileCompleted {
                        batch_id,
                        index,
                        file_name: file.name.clone(),
                    });
                    outcomes.push(FileOutcome::Completed(photo));
                }
                Err(e) => {
                    let message = error_message(&e);
                    warn!(file = %file.name, error = %e, "Enhancement failed, continuing with next file");
                    job.fail(&message);
                    self.events.emit_lossy(UploadEvent::FileFailed {
                        batch_id,
                        index,
                        file_name: file.name.clone(),
                        error: message.clone(),
                    });
                    outcomes.push(FileOutcome::Failed {
                        file_name: file.name.clone(),
                        error: message,
                    });
                }
            }
        }

        let batch = UploadBatch {
            batch_id,
            jobs,
            outcomes,
            requires_login,
        };

        info!(
            %batch_id,
            succeeded = batch.succeeded(),
            failed = batch.failed(),
            "Upload batch finished"
        );
        self.events.emit_lossy(UploadEvent::BatchCompleted {
            batch_id,
            succeeded: batch.succeeded(),
            failed: batch.failed(),
            timestamp: chrono::Utc::now(),
        });

        batch
    }

    async fn process_file(
        &self,
        batch_id: Uuid,
        index: usize,
        file: &UploadFile,
        job: &mut UploadJob,
        settings: &EnhanceSettings,
    ) -> ClientResult<(EnhancedPhoto, bool)> {
        if !file.is_image() {
            return Err(ClientError::InvalidState(format!(
                "{} is not an image file",
                file.name
            )));
        }

        self.progress(batch_id, index, job, UploadStage::Uploading);
        self.progress(batch_id, index, job, UploadStage::Analyzing);

        let (response, kind) = if settings.night_mode {
            (self.backend.convert_to_night(file).await?, ConversionKind::Night)
        } else {
            (self.backend.enhance(file, settings).await?, ConversionKind::Standard)
        };

        self.progress(batch_id, index, job, UploadStage::Enhancing);
        let requires_login = response.requires_login();
        let photo = response.into_photo(file.name.clone(), kind);
        self.progress(batch_id, index, job, UploadStage::Completed);

        Ok((photo, requires_login))
    }

    fn progress(&self, batch_id: Uuid, index: usize, job: &mut UploadJob, stage: UploadStage) {
        job.advance(stage);
        self.events.emit_lossy(UploadEvent::FileProgress {
            batch_id,
            index,
            file_name: job.file_name.clone(),
            stage,
            percent: job.progress_percent,
            status_text: job.status_text.clone(),
        });
    }
}

/// Message shown next to a failed file
fn error_message(err: &ClientError) -> String {
    match err {
        ClientError::Api { message, .. } => message.clone(),
        other => other.to_string(),
    }
}
