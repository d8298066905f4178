//! Per-item fetch planning: decides skip vs download, and which URL,
//! before any network traffic for the item.

use std::path::{Path, PathBuf};

use super::error::SyncError;
use super::SyncConfig;
use crate::flickr::Favorite;
use crate::types::MediaKind;

/// Final disposition of one work-list item, for summary accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemOutcome {
    Downloaded,
    SkippedDisabledMediaKind,
    SkippedExcluded,
    SkippedAlreadyPresent,
    SkippedSameSize,
    FailedAfterRetry,
    RejectedTooSmall,
}

/// What to do with an item, decided before connecting.
/// The same-size check (which needs the remote Content-Length) happens
/// later, inside the download step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemPlan {
    Skip(ItemOutcome),
    Fetch { url: String },
    /// The API exposed no variant URL at all. Tolerated silently; not a
    /// download, not a failure.
    NoCandidateUrl,
}

/// `<id>.jpg` for photos, `<id>.mp4` for videos.
pub fn target_filename(favorite: &Favorite) -> Result<String, SyncError> {
    match favorite.media.extension() {
        Some(ext) => Ok(format!("{}.{}", favorite.id, ext)),
        None => Err(SyncError::UnknownMediaKind {
            id: favorite.id.clone(),
        }),
    }
}

/// Hidden sidecar marking an item as permanently excluded:
/// `.<filename>.exclude`, empty, existence-only.
pub fn exclusion_marker_path(directory: &Path, filename: &str) -> PathBuf {
    directory.join(format!(".{filename}.exclude"))
}

pub fn plan_item(favorite: &Favorite, config: &SyncConfig) -> Result<ItemPlan, SyncError> {
    let directory = config.directory.as_path();
    match favorite.media {
        MediaKind::Photo if !config.download_photos => {
            tracing::debug!(id = %favorite.id, "Skipping photo, photo downloads disabled");
            return Ok(ItemPlan::Skip(ItemOutcome::SkippedDisabledMediaKind));
        }
        MediaKind::Video if !config.download_videos => {
            tracing::debug!(id = %favorite.id, "Skipping video, video downloads disabled");
            return Ok(ItemPlan::Skip(ItemOutcome::SkippedDisabledMediaKind));
        }
        _ => {}
    }

    let filename = target_filename(favorite)?;

    if exclusion_marker_path(directory, &filename).exists() {
        tracing::debug!(%filename, "Skipping excluded item");
        return Ok(ItemPlan::Skip(ItemOutcome::SkippedExcluded));
    }

    // Saves the network round trip entirely; with overwrite enabled the
    // same-size check downstream needs the connection anyway.
    if !config.overwrite_existing && directory.join(&filename).exists() {
        tracing::debug!(%filename, "Skipping, already downloaded and overwrite disabled");
        return Ok(ItemPlan::Skip(ItemOutcome::SkippedAlreadyPresent));
    }

    match favorite.best_candidate() {
        Some((tier, url)) => {
            tracing::debug!(id = %favorite.id, %tier, "Selected download variant");
            Ok(ItemPlan::Fetch {
                url: url.to_string(),
            })
        }
        None => {
            tracing::debug!(id = %favorite.id, "No variant URL available, nothing to download");
            Ok(ItemPlan::NoCandidateUrl)
        }
    }
}
