use std::path::PathBuf;

use crate::cli::Cli;
use crate::flickr::Credentials;
use crate::sync::error::SyncError;
use crate::sync::SyncConfig;
use crate::types::LogLevel;

/// Application configuration assembled from CLI flags and environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub directory: PathBuf,
    pub config_directory: PathBuf,
    pub credentials: Credentials,
    pub download_photos: bool,
    pub download_videos: bool,
    pub overwrite_existing: bool,
    pub min_dimension_px: u32,
    pub max_items: Option<u32>,
    pub delete_stale_files: bool,
    pub download_timeout_secs: u64,
    #[allow(dead_code)] // mirrored from the CLI; main reads cli.log_level before config exists
    pub log_level: LogLevel,
    pub no_progress_bar: bool,
    pub auth_only: bool,
}

pub(crate) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Result<Self, SyncError> {
        let config = Self {
            directory: cli
                .directory
                .as_deref()
                .map(expand_tilde)
                .unwrap_or_default(),
            config_directory: expand_tilde(&cli.config_directory),
            credentials: Credentials {
                api_key: cli.api_key.clone(),
                api_secret: cli.api_secret.clone(),
                oauth_token: cli.oauth_token.clone(),
                oauth_token_secret: cli.oauth_token_secret.clone(),
                user_id: None,
            },
            download_photos: !cli.skip_photos,
            download_videos: !cli.skip_videos,
            overwrite_existing: cli.overwrite,
            min_dimension_px: cli.min_dimension,
            max_items: cli.max_faves,
            delete_stale_files: cli.delete_stale,
            download_timeout_secs: cli.download_timeout,
            log_level: cli.log_level,
            no_progress_bar: cli.no_progress_bar,
            auth_only: cli.auth_only,
        };
        config.sync_config().validate()?;
        Ok(config)
    }

    /// The subset the pipeline consumes.
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            directory: self.directory.clone(),
            download_photos: self.download_photos,
            download_videos: self.download_videos,
            overwrite_existing: self.overwrite_existing,
            min_dimension_px: self.min_dimension_px,
            max_items: self.max_items,
            delete_stale_files: self.delete_stale_files,
            download_timeout_secs: self.download_timeout_secs,
        }
    }
}
