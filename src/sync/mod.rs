//! Favorites sync pipeline.
//!
//! One sequential pass: list the remote favorites, reconcile the target
//! directory (stale deletion), truncate the work list, then plan, download,
//! and validate one item at a time. Per-item failures are recorded and the
//! run continues; only listing errors, config errors, and invariant
//! violations abort. Sequential on purpose: one in-flight request avoids
//! rate-limit contention and keeps progress reporting ordered.

pub mod error;
pub mod file;
pub mod plan;
pub mod reconcile;
pub mod validate;

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::flickr::{self, ApiSession, Favorite, USER_AGENT};
use crate::progress::{emit, Phase, ProgressSender, SyncEvent};
use self::error::{DownloadError, SyncError};
use self::plan::{plan_item, target_filename, ItemOutcome, ItemPlan};
use self::validate::Validation;

/// Subset of application config consumed by the pipeline. Decoupled from
/// CLI parsing so the pipeline can be driven and tested without clap.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub directory: PathBuf,
    pub download_photos: bool,
    pub download_videos: bool,
    pub overwrite_existing: bool,
    pub min_dimension_px: u32,
    pub max_items: Option<u32>,
    pub delete_stale_files: bool,
    pub download_timeout_secs: u64,
}

impl SyncConfig {
    /// Pre-flight validation; fails fast before any network call.
    pub fn validate(&self) -> Result<(), SyncError> {
        if !self.download_photos && !self.download_videos {
            return Err(SyncError::InvalidConfig(
                "at least one of photos and videos must be enabled".into(),
            ));
        }
        if self.max_items == Some(0) {
            return Err(SyncError::InvalidConfig(
                "maximum item count must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Terminal accounting for one run. A non-zero `failed` is reported but
/// does not make the run itself a failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// Favorites returned by the lister, before truncation.
    pub total_listed: usize,
    /// Work-list items evaluated (after truncation).
    pub attempted: usize,
    pub downloaded: usize,
    pub skipped_disabled_media_kind: usize,
    pub skipped_excluded: usize,
    pub skipped_already_present: usize,
    pub skipped_same_size: usize,
    pub rejected_too_small: usize,
    pub failed: usize,
    pub stale_deleted: usize,
    /// True when a shutdown request stopped the run early.
    pub interrupted: bool,
}

impl SyncSummary {
    fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Downloaded => self.downloaded += 1,
            ItemOutcome::SkippedDisabledMediaKind => self.skipped_disabled_media_kind += 1,
            ItemOutcome::SkippedExcluded => self.skipped_excluded += 1,
            ItemOutcome::SkippedAlreadyPresent => self.skipped_already_present += 1,
            ItemOutcome::SkippedSameSize => self.skipped_same_size += 1,
            ItemOutcome::FailedAfterRetry => self.failed += 1,
            ItemOutcome::RejectedTooSmall => self.rejected_too_small += 1,
        }
    }
}

/// HTTP client for media downloads, with connect and read timeouts both set
/// to the configured value.
pub fn download_client(timeout_secs: u64) -> reqwest::Result<Client> {
    let timeout = Duration::from_secs(timeout_secs);
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(timeout)
        .read_timeout(timeout)
        .build()
}

/// Run one full sync pass. See the module docs for the pipeline shape.
pub async fn sync_favorites(
    session: &dyn ApiSession,
    client: &Client,
    config: &SyncConfig,
    events: Option<&ProgressSender>,
    shutdown: CancellationToken,
) -> Result<SyncSummary, SyncError> {
    config.validate()?;

    std::fs::create_dir_all(&config.directory).map_err(|e| SyncError::TargetDirectory {
        path: config.directory.display().to_string(),
        source: e,
    })?;

    tracing::info!("Retrieving list of favorites...");
    let mut favorites = flickr::list_favorites(session).await?;

    let mut summary = SyncSummary {
        total_listed: favorites.len(),
        ..SyncSummary::default()
    };

    if config.delete_stale_files {
        emit(events, SyncEvent::DeletingStale);
        let remote_ids: HashSet<&str> = favorites.iter().map(|f| f.id.as_str()).collect();
        summary.stale_deleted = reconcile::delete_stale_files(&config.directory, &remote_ids);
    }

    // Truncation is by listing position, before any skip evaluation; later
    // skips never pull extra items into the run.
    if let Some(max) = config.max_items {
        if favorites.len() > max as usize {
            tracing::info!(
                "Truncating work list from {} to {} items",
                favorites.len(),
                max
            );
            favorites.truncate(max as usize);
        }
    }

    let total = favorites.len();
    emit(events, SyncEvent::Started { total_items: total });

    for (index, favorite) in favorites.iter().enumerate() {
        if shutdown.is_cancelled() {
            tracing::info!("Shutdown requested, stopping before next item");
            summary.interrupted = true;
            break;
        }

        summary.attempted += 1;
        let outcome = process_item(favorite, client, config, index, total, events, &shutdown).await?;
        if let Some(outcome) = outcome {
            summary.record(outcome);
        }
        emit(
            events,
            SyncEvent::Item {
                index,
                total,
                phase: Phase::Done,
                bytes_so_far: 0,
                bytes_total: None,
            },
        );
    }

    emit(
        events,
        SyncEvent::Finished {
            summary: summary.clone(),
        },
    );
    Ok(summary)
}

/// Process one work-list item end to end.
///
/// Returns `Ok(None)` when there is nothing to record: no candidate URL, or
/// the download was interrupted by shutdown. Only invariant violations
/// escalate as errors.
async fn process_item(
    favorite: &Favorite,
    client: &Client,
    config: &SyncConfig,
    index: usize,
    total: usize,
    events: Option<&ProgressSender>,
    shutdown: &CancellationToken,
) -> Result<Option<ItemOutcome>, SyncError> {
    let url = match plan_item(favorite, config)? {
        ItemPlan::Skip(outcome) => return Ok(Some(outcome)),
        ItemPlan::NoCandidateUrl => return Ok(None),
        ItemPlan::Fetch { url } => url,
    };

    let filename = target_filename(favorite)?;
    let destination = config.directory.join(&filename);

    // Only meaningful with overwrite enabled: without it, an existing file
    // was already skipped by the planner.
    let existing_len = std::fs::metadata(&destination).ok().map(|m| m.len());

    emit(
        events,
        SyncEvent::Item {
            index,
            total,
            phase: Phase::Connecting,
            bytes_so_far: 0,
            bytes_total: None,
        },
    );
    tracing::info!("{}/{}: downloading {} from {}", index + 1, total, filename, url);

    let result = file::download(client, &url, &destination, existing_len, shutdown, |bytes, bytes_total| {
        emit(
            events,
            SyncEvent::Item {
                index,
                total,
                phase: Phase::Downloading,
                bytes_so_far: bytes,
                bytes_total,
            },
        );
    })
    .await;

    match result {
        Ok(file::DownloadStatus::AlreadyComplete) => Ok(Some(ItemOutcome::SkippedSameSize)),
        Ok(file::DownloadStatus::Fetched { bytes_written }) => {
            tracing::debug!("Downloaded {} ({} bytes)", filename, bytes_written);

            let media = favorite.media;
            let min_dimension = config.min_dimension_px;
            let path = destination.clone();
            let validation =
                tokio::task::spawn_blocking(move || validate::validate_download(&path, media, min_dimension))
                    .await;
            match validation {
                Ok(Validation::Accepted) => Ok(Some(ItemOutcome::Downloaded)),
                Ok(Validation::RejectedTooSmall) => Ok(Some(ItemOutcome::RejectedTooSmall)),
                Err(e) => {
                    tracing::warn!("Validation task panicked for {}: {}", filename, e);
                    Ok(Some(ItemOutcome::Downloaded))
                }
            }
        }
        Err(DownloadError::Cancelled) => {
            tracing::info!("Download of {} interrupted by shutdown", filename);
            Ok(None)
        }
        Err(e) => {
            tracing::error!("Download of {} failed: {}", filename, e);
            Ok(Some(ItemOutcome::FailedAfterRetry))
        }
    }
}
