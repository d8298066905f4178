use clap::Parser;

use crate::types::LogLevel;

#[derive(Parser, Debug)]
#[command(name = "flickrfaves-rs", version, about = "Download your Flickr favorites")]
pub struct Cli {
    /// Local directory for downloads
    #[arg(short = 'd', long)]
    pub directory: Option<String>,

    /// Flickr API key.
    #[arg(long, env = "FLICKR_API_KEY")]
    pub api_key: Option<String>,

    /// Flickr API shared secret.
    /// WARNING: passing via --api-secret is visible in process listings.
    /// Prefer the FLICKR_API_SECRET environment variable instead.
    #[arg(long, env = "FLICKR_API_SECRET")]
    pub api_secret: Option<String>,

    /// OAuth access token (obtain one with any Flickr OAuth 1.0a helper)
    #[arg(long, env = "FLICKR_OAUTH_TOKEN")]
    pub oauth_token: Option<String>,

    /// OAuth access token secret
    #[arg(long, env = "FLICKR_OAUTH_TOKEN_SECRET")]
    pub oauth_token_secret: Option<String>,

    /// Directory for the persisted credential file
    #[arg(long, default_value = "~/.flickrfaves-rs")]
    pub config_directory: String,

    /// Only validate credentials (and persist any passed on the command
    /// line), then exit without syncing
    #[arg(long)]
    pub auth_only: bool,

    /// Forget persisted credentials and exit
    #[arg(long)]
    pub forget_credentials: bool,

    /// Don't download photos
    #[arg(long)]
    pub skip_photos: bool,

    /// Don't download videos
    #[arg(long)]
    pub skip_videos: bool,

    /// Re-download and overwrite favorites already on disk
    #[arg(long)]
    pub overwrite: bool,

    /// Delete downloaded photos, and permanently exclude them, when both
    /// dimensions are below this many pixels (0 disables the check)
    #[arg(long, default_value_t = 0)]
    pub min_dimension: u32,

    /// Download at most N favorites per run
    #[arg(long)]
    pub max_faves: Option<u32>,

    /// Delete local files that are no longer favorites
    #[arg(long)]
    pub delete_stale: bool,

    /// Connect/read timeout for downloads, in seconds
    #[arg(long, default_value_t = 20)]
    pub download_timeout: u64,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Disable progress bars
    #[arg(long)]
    pub no_progress_bar: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_invocation() {
        let cli = Cli::try_parse_from(["flickrfaves-rs", "--directory", "/tmp/faves"]).unwrap();
        assert_eq!(cli.directory.as_deref(), Some("/tmp/faves"));
        assert!(!cli.overwrite);
        assert_eq!(cli.download_timeout, 20);
        assert_eq!(cli.min_dimension, 0);
        assert!(cli.max_faves.is_none());
    }

    #[test]
    fn parses_all_sync_flags() {
        let cli = Cli::try_parse_from([
            "flickrfaves-rs",
            "-d",
            "/tmp/faves",
            "--skip-videos",
            "--overwrite",
            "--min-dimension",
            "1024",
            "--max-faves",
            "50",
            "--delete-stale",
            "--download-timeout",
            "5",
        ])
        .unwrap();
        assert!(cli.skip_videos);
        assert!(!cli.skip_photos);
        assert!(cli.overwrite);
        assert_eq!(cli.min_dimension, 1024);
        assert_eq!(cli.max_faves, Some(50));
        assert!(cli.delete_stale);
        assert_eq!(cli.download_timeout, 5);
    }
}
