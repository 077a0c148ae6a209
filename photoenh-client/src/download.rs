//! Saving enhanced images to disk
//!
//! Inline `data:` URIs are decoded locally; anything else is fetched from the
//! backend. Batches are started with a fixed delay between each item and are
//! not awaited by the caller.

use crate::api::AssetFetcher;
use crate::error::{ClientError, ClientResult};
use async_trait::async_trait;
use base64::Engine;
use photoenh_common::EnhancedPhoto;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// One asset to save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadItem {
    /// `data:` URI, backend path or absolute URL
    pub source: String,
    pub file_name: String,
}

impl From<&EnhancedPhoto> for DownloadItem {
    fn from(photo: &EnhancedPhoto) -> Self {
        Self {
            source: photo.enhanced_url.clone(),
            file_name: photo.download_file_name(),
        }
    }
}

/// Saves a single asset
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, item: &DownloadItem) -> ClientResult<PathBuf>;
}

/// Downloader writing into a directory
pub struct FsDownloader {
    dir: PathBuf,
    fetcher: Arc<dyn AssetFetcher>,
}

impl FsDownloader {
    pub fn new(dir: impl Into<PathBuf>, fetcher: Arc<dyn AssetFetcher>) -> Self {
        Self {
            dir: dir.into(),
            fetcher,
        }
    }
}

#[async_trait]
impl Downloader for FsDownloader {
    async fn download(&self, item: &DownloadItem) -> ClientResult<PathBuf> {
        let bytes = if item.source.starts_with("data:") {
            decode_data_uri(&item.source)?
        } else {
            self.fetcher.fetch_asset(&item.source).await?
        };

        tokio::fs::create_dir_all(&self.dir).await?;
        let target = self.dir.join(sanitize_file_name(&item.file_name));
        tokio::fs::write(&target, &bytes).await?;

        debug!(path = %target.display(), bytes = bytes.len(), "Saved asset");
        Ok(target)
    }
}

/// Decode a `data:[<mime>][;base64],<payload>` URI
pub fn decode_data_uri(uri: &str) -> ClientResult<Vec<u8>> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| ClientError::Download("Not a data URI".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| ClientError::Download("Data URI has no payload".to_string()))?;

    if header.ends_with(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| ClientError::Download(format!("Invalid base64 payload: {}", e)))
    } else {
        Ok(payload.as_bytes().to_vec())
    }
}

/// Keep only the last path component
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(|c| c == '/' || c == '\\').next().unwrap_or_default();
    if base.is_empty() || base == "." || base == ".." {
        "download.jpg".to_string()
    } else {
        base.to_string()
    }
}

/// Outcome of one started download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadReport {
    pub item: DownloadItem,
    pub result: Result<PathBuf, String>,
}

/// Downloads started by one request
#[derive(Debug, Default)]
pub struct DownloadBatch {
    handles: Vec<JoinHandle<DownloadReport>>,
}

impl DownloadBatch {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every download to finish
    pub async fn join(self) -> Vec<DownloadReport> {
        let mut reports = Vec::with_capacity(self.handles.len());
        for handle in self.handles {
            match handle.await {
                Ok(report) => reports.push(report),
                Err(e) => warn!(error = %e, "Download task did not complete"),
            }
        }
        reports
    }
}

/// Start one download per item, `stagger` apart
///
/// The first starts immediately. Returns without waiting for any of them;
/// a failed item is logged with its source so it can be opened by hand.
pub fn start_staggered(
    downloader: Arc<dyn Downloader>,
    items: Vec<DownloadItem>,
    stagger: Duration,
) -> DownloadBatch {
    info!(count = items.len(), stagger_ms = stagger.as_millis() as u64, "Starting downloads");

    let handles = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let downloader = downloader.clone();
            let delay = stagger * index as u32;
            tokio::spawn(async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let result = match downloader.download(&item).await {
                    Ok(path) => {
                        info!(file = %item.file_name, path = %path.display(), "Downloaded");
                        Ok(path)
                    }
                    Err(e) => {
                        warn!(
                            file = %item.file_name,
                            url = %item.source,
                            error = %e,
                            "Download failed, open the URL manually"
                        );
                        Err(e.to_string())
                    }
                };
                DownloadReport { item, result }
            })
        })
        .collect();

    DownloadBatch { handles }
}
