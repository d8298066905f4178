use thiserror::Error;

use crate::flickr::ApiError;

/// Fatal conditions that abort the whole run. Per-item failures never
/// surface here; they are recorded in the summary instead.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Error while retrieving list of favorites")]
    RemoteList(#[from] ApiError),

    #[error("Favorite {id} has unknown media kind; cannot derive a filename")]
    UnknownMediaKind { id: String },

    #[error("Cannot prepare target directory {path}: {source}")]
    TargetDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Typed per-item download errors enabling retry classification.
///
/// `is_retryable()` separates transient transport failures (worth a
/// whole-item restart) from permanent ones like a full disk.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("HTTP error {status} fetching {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Connection error fetching {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Stream error after {bytes_written} bytes: {source}")]
    ChunkRead {
        bytes_written: u64,
        #[source]
        source: reqwest::Error,
    },

    #[error("Disk error: {0}")]
    Disk(#[from] std::io::Error),

    #[error("Cancelled by shutdown request")]
    Cancelled,
}

impl DownloadError {
    /// Whether a fresh connection attempt for the whole item is worthwhile.
    pub fn is_retryable(&self) -> bool {
        match self {
            DownloadError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            DownloadError::Connect { .. } => true,
            DownloadError::ChunkRead { .. } => true,
            DownloadError::Disk(_) => false,
            DownloadError::Cancelled => false,
        }
    }
}
