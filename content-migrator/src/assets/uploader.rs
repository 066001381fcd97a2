//! Asset upload pipeline.
//!
//! Every harvested asset is downloaded from the source into a scratch
//! directory, then published in two steps: an upload slot is requested from
//! the destination and the bytes are posted to the signed target it returns.
//!
//! Scratch files live in a directory owned by the run, created inside the
//! configured scratch directory. Each attempt gets its own subdirectory, so
//! assets sharing a file name never overwrite each other.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use content_migrator_repository::DestinationService;
use content_migrator_shared::utils::{asset_key, AssetKey};
use content_migrator_shared::{AssetReference, UploadedAsset};
use content_migrator_source::SourceAdapter;
use futures::future::join_all;
use tokio::fs;
use tempfile::{Builder, TempDir};
use tokio::sync::{Mutex, Semaphore};
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::{debug, error, info, instrument, warn};

use crate::config::settings::{DEFAULT_ASSET_CONCURRENCY, DEFAULT_ASSET_RETRY_LIMIT};
use crate::errors::AssetError;

/// Upload pool settings.
#[derive(Debug, Clone)]
pub struct UploaderConfig {
    /// Number of assets processed at the same time.
    pub concurrency: usize,
    /// Attempts of one upload, the first one included.
    pub retry_limit: usize,
    /// Base of the exponential delay between attempts.
    pub retry_base: Duration,
    /// Parent of the run's scratch directory. Only the run directory is
    /// removed on cleanup.
    pub scratch_dir: PathBuf,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_ASSET_CONCURRENCY,
            retry_limit: DEFAULT_ASSET_RETRY_LIMIT,
            retry_base: Duration::from_millis(500),
            scratch_dir: PathBuf::from("./temp"),
        }
    }
}

/// Uploads assets with bounded concurrency.
pub struct AssetUploader {
    source: Arc<SourceAdapter>,
    destination: Arc<DestinationService>,
    config: UploaderConfig,
    run_dir: Mutex<Option<TempDir>>,
}

impl AssetUploader {
    pub fn new(
        source: Arc<SourceAdapter>,
        destination: Arc<DestinationService>,
        config: UploaderConfig,
    ) -> Self {
        Self {
            source,
            destination,
            config,
            run_dir: Mutex::new(None),
        }
    }

    /// Scratch directory of this run, created on first use.
    pub async fn run_dir(&self) -> Result<PathBuf, AssetError> {
        let mut run_dir = self.run_dir.lock().await;
        if let Some(dir) = run_dir.as_ref() {
            return Ok(dir.path().to_path_buf());
        }
        fs::create_dir_all(&self.config.scratch_dir).await?;
        let dir = Builder::new()
            .prefix("assets-")
            .tempdir_in(&self.config.scratch_dir)?;
        debug!(dir = %dir.path().display(), "Created asset scratch directory");
        let path = dir.path().to_path_buf();
        *run_dir = Some(dir);
        Ok(path)
    }

    /// Upload every asset and return the ones that succeeded.
    ///
    /// Failed assets are logged once each and left out of the result, so
    /// their original URLs stay in the content.
    #[instrument(skip(self, assets), fields(asset_count = assets.len()))]
    pub async fn upload_all(&self, assets: &[AssetReference]) -> Vec<UploadedAsset> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));

        let uploads = assets.iter().map(|asset| {
            let semaphore = semaphore.clone();
            async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return None;
                };
                match self.upload(asset).await {
                    Ok(uploaded) => {
                        debug!(
                            original_url = %uploaded.original_url,
                            new_url = %uploaded.new_url,
                            "Asset uploaded"
                        );
                        Some(uploaded)
                    }
                    Err(e) => {
                        error!(url = %asset.original_url, error = %e, "Asset upload failed");
                        None
                    }
                }
            }
        });

        let uploaded: Vec<UploadedAsset> = join_all(uploads).await.into_iter().flatten().collect();
        info!(
            uploaded = uploaded.len(),
            failed = assets.len() - uploaded.len(),
            "Asset uploads finished"
        );
        uploaded
    }

    /// Upload one asset, retrying the whole upload while slot allocation is
    /// rate limited or times out.
    pub async fn upload(&self, asset: &AssetReference) -> Result<UploadedAsset, AssetError> {
        let key = asset_key(&asset.resolved_url);
        let base_ms = u64::try_from(self.config.retry_base.as_millis()).unwrap_or(u64::MAX);
        // Delays of 2, 4, 8... times the base.
        let strategy = ExponentialBackoff::from_millis(2)
            .factor(base_ms)
            .max_delay(Duration::from_secs(60))
            .map(jitter)
            .take(self.config.retry_limit.saturating_sub(1));

        RetryIf::spawn(
            strategy,
            || self.attempt(asset, &key),
            |e: &AssetError| {
                if e.is_retryable() {
                    warn!(url = %asset.original_url, error = %e, "Upload slot unavailable, retrying");
                }
                e.is_retryable()
            },
        )
        .await
    }

    async fn attempt(
        &self,
        asset: &AssetReference,
        key: &AssetKey,
    ) -> Result<UploadedAsset, AssetError> {
        let bytes = self.source.download(&asset.resolved_url).await?;

        let scratch = attempt_dir(&self.run_dir().await?)?;
        let path = scratch.path().join(key.relative_path());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, &bytes).await?;

        let slot = self
            .destination
            .request_upload_slot(&key.filename)
            .await
            .map_err(AssetError::Slot)?;

        let bytes = fs::read(&path).await?;
        self.destination
            .submit_upload(&slot, &key.filename, bytes)
            .await
            .map_err(AssetError::Transfer)?;

        let new_url = if slot.pretty_url.starts_with("//") {
            format!("https:{}", slot.pretty_url)
        } else {
            slot.pretty_url.clone()
        };
        Ok(UploadedAsset {
            original_url: asset.original_url.clone(),
            new_url,
            id: slot.id,
        })
    }

    /// Remove the run's scratch directory. The configured scratch directory
    /// itself is left in place.
    pub async fn cleanup(&self) {
        let Some(dir) = self.run_dir.lock().await.take() else {
            return;
        };
        let path = dir.path().to_path_buf();
        if let Err(e) = dir.close() {
            warn!(
                dir = %path.display(),
                error = %e,
                "Could not remove asset scratch directory"
            );
        }
    }
}

/// Private directory of one upload attempt, removed when dropped.
fn attempt_dir(run_dir: &Path) -> Result<TempDir, AssetError> {
    Ok(Builder::new().prefix("upload-").tempdir_in(run_dir)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use content_migrator_repository::MockDestination;
    use content_migrator_source::MockSource;

    fn uploader(
        source: MockSource,
        destination: Arc<MockDestination>,
        scratch: &std::path::Path,
    ) -> AssetUploader {
        AssetUploader::new(
            Arc::new(SourceAdapter::new(Arc::new(source))),
            Arc::new(DestinationService::new(destination)),
            UploaderConfig {
                retry_base: Duration::ZERO,
                scratch_dir: scratch.to_path_buf(),
                ..UploaderConfig::default()
            },
        )
    }

    const URL: &str = "https://example.com/uploads/2023/07/a.png";

    #[tokio::test]
    async fn test_upload_publishes_asset() {
        let scratch = tempfile::tempdir().unwrap();
        let destination = Arc::new(MockDestination::new());
        let uploader = uploader(
            MockSource::new().with_file(URL, vec![1, 2, 3]),
            destination.clone(),
            scratch.path(),
        );

        let uploaded = uploader
            .upload_all(&[AssetReference::new("/uploads/2023/07/a.png", URL)])
            .await;

        assert_eq!(uploaded.len(), 1);
        assert_eq!(uploaded[0].original_url, "/uploads/2023/07/a.png");
        assert!(uploaded[0].new_url.ends_with("/a.png"));
        assert_eq!(destination.uploads(), vec!["a.png".to_string()]);
        assert_eq!(destination.uploaded_bytes("a.png"), vec![vec![1, 2, 3]]);

        let run_dir = uploader.run_dir().await.unwrap();
        assert!(run_dir.starts_with(scratch.path()));
        assert_eq!(std::fs::read_dir(&run_dir).unwrap().count(), 0);

        uploader.cleanup().await;
        assert!(!run_dir.exists());
        assert!(scratch.path().exists());
    }

    #[tokio::test]
    async fn test_cleanup_keeps_existing_scratch_contents() {
        let scratch = tempfile::tempdir().unwrap();
        std::fs::write(scratch.path().join("notes.txt"), "keep me").unwrap();
        let destination = Arc::new(MockDestination::new());
        let uploader = uploader(
            MockSource::new().with_file(URL, vec![1]),
            destination,
            scratch.path(),
        );

        uploader.upload(&AssetReference::new(URL, URL)).await.unwrap();
        uploader.cleanup().await;

        assert!(scratch.path().join("notes.txt").exists());
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_same_file_name_in_different_folders_keeps_its_bytes() {
        let scratch = tempfile::tempdir().unwrap();
        let first = "https://example.com/uploads/2023/07/a.png";
        let second = "https://example.com/uploads/2024/07/a.png";
        let destination =
            Arc::new(MockDestination::new().with_slot_delay(Duration::from_millis(50)));
        let source = MockSource::new()
            .with_file(first, vec![1, 1, 1])
            .with_file(second, vec![2, 2, 2]);
        let uploader = uploader(source, destination.clone(), scratch.path());

        let uploaded = uploader
            .upload_all(&[
                AssetReference::new("/uploads/2023/07/a.png", first),
                AssetReference::new("/uploads/2024/07/a.png", second),
            ])
            .await;

        assert_eq!(uploaded.len(), 2);
        let mut contents = destination.uploaded_bytes("a.png");
        contents.sort();
        assert_eq!(contents, vec![vec![1, 1, 1], vec![2, 2, 2]]);
    }

    #[tokio::test]
    async fn test_upload_pool_is_bounded() {
        let scratch = tempfile::tempdir().unwrap();
        let destination =
            Arc::new(MockDestination::new().with_slot_delay(Duration::from_millis(20)));
        let mut source = MockSource::new();
        let mut assets = Vec::new();
        for i in 0..12 {
            let url = format!("https://example.com/uploads/2023/07/{}.png", i);
            source = source.with_file(&url, vec![i as u8]);
            assets.push(AssetReference::new(url.clone(), url));
        }
        let uploader = uploader(source, destination.clone(), scratch.path());

        let uploaded = uploader.upload_all(&assets).await;

        assert_eq!(uploaded.len(), 12);
        assert_eq!(destination.uploads().len(), 12);
        assert_eq!(destination.max_concurrent_slots(), DEFAULT_ASSET_CONCURRENCY);
    }

    #[tokio::test]
    async fn test_rate_limited_slot_is_retried_until_limit() {
        let scratch = tempfile::tempdir().unwrap();
        let destination = Arc::new(MockDestination::new().with_rate_limited_slot("a.png", usize::MAX));
        let uploader = uploader(
            MockSource::new().with_file(URL, vec![1]),
            destination.clone(),
            scratch.path(),
        );

        let result = uploader.upload(&AssetReference::new(URL, URL)).await;
        assert!(matches!(result, Err(AssetError::Slot(_))));
        assert_eq!(destination.slot_requests("a.png"), DEFAULT_ASSET_RETRY_LIMIT);
        assert!(destination.uploads().is_empty());
    }

    #[tokio::test]
    async fn test_rate_limited_slot_recovers() {
        let scratch = tempfile::tempdir().unwrap();
        let destination = Arc::new(MockDestination::new().with_rate_limited_slot("a.png", 2));
        let uploader = uploader(
            MockSource::new().with_file(URL, vec![1]),
            destination.clone(),
            scratch.path(),
        );

        let uploaded = uploader.upload(&AssetReference::new(URL, URL)).await.unwrap();
        assert!(uploaded.new_url.ends_with("/a.png"));
        assert_eq!(destination.slot_requests("a.png"), 3);
    }

    #[tokio::test]
    async fn test_other_failures_are_not_retried() {
        let scratch = tempfile::tempdir().unwrap();
        let destination = Arc::new(MockDestination::new().with_failing_transfer("a.png"));
        let source = MockSource::new()
            .with_file(URL, vec![1])
            .with_failing_file("https://example.com/missing.png");
        let uploader = uploader(source, destination.clone(), scratch.path());

        let uploaded = uploader
            .upload_all(&[
                AssetReference::new(URL, URL),
                AssetReference::new(
                    "https://example.com/missing.png",
                    "https://example.com/missing.png",
                ),
            ])
            .await;

        assert!(uploaded.is_empty());
        assert_eq!(destination.slot_requests("a.png"), 1);
        assert_eq!(destination.slot_requests("missing.png"), 0);
    }
}
