//! flickrfaves-rs — Rust rewrite of FlickrFaves.
//!
//! Downloads the favorites of a Flickr account into a flat directory,
//! skipping what is already there, cleaning up un-favorited items, and
//! filtering out photos below a minimum resolution. Authentication uses
//! pre-obtained OAuth 1.0a tokens; the interactive exchange is left to any
//! external helper.

#![warn(clippy::all)]

mod cli;
mod config;
mod flickr;
mod progress;
mod shutdown;
mod sync;
mod types;

use std::io::IsTerminal;

use clap::Parser;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use progress::{Phase, ProgressReceiver, SyncEvent};
use sync::SyncSummary;

/// Render pipeline events as an overall item bar plus a per-file byte bar.
fn spawn_progress_renderer(mut rx: ProgressReceiver) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let multi = MultiProgress::new();
        let overall = multi.add(ProgressBar::no_length());
        overall.set_style(
            ProgressStyle::with_template("[{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("valid template")
                .progress_chars("=> "),
        );
        let file_bar = multi.add(ProgressBar::no_length());
        file_bar.set_style(
            ProgressStyle::with_template("  {bytes}/{total_bytes} {bytes_per_sec} {msg}")
                .expect("valid template"),
        );

        while let Some(event) = rx.recv().await {
            match event {
                SyncEvent::Started { total_items } => {
                    overall.set_length(total_items as u64);
                    overall.set_position(0);
                }
                SyncEvent::DeletingStale => {
                    overall.set_message("deleting stale favorites...");
                }
                SyncEvent::Item {
                    index,
                    total,
                    phase,
                    bytes_so_far,
                    bytes_total,
                } => match phase {
                    Phase::Connecting => {
                        overall.set_message(format!("{}/{}: connecting...", index + 1, total));
                        file_bar.set_position(0);
                        file_bar.unset_length();
                    }
                    Phase::Downloading => {
                        overall.set_message(format!("{}/{}: downloading...", index + 1, total));
                        if let Some(total_bytes) = bytes_total {
                            file_bar.set_length(total_bytes);
                        }
                        file_bar.set_position(bytes_so_far);
                    }
                    Phase::Done => {
                        overall.set_position(index as u64 + 1);
                    }
                },
                SyncEvent::Finished { .. } => break,
            }
        }
        overall.finish_and_clear();
        file_bar.finish_and_clear();
    })
}

fn log_summary(summary: &SyncSummary) {
    tracing::info!("── Summary ──");
    tracing::info!(
        "  {} favorites listed, {} evaluated",
        summary.total_listed,
        summary.attempted
    );
    tracing::info!(
        "  {} downloaded, {} failed",
        summary.downloaded,
        summary.failed
    );
    for (count, what) in [
        (summary.skipped_already_present, "already present"),
        (summary.skipped_same_size, "already complete (same size)"),
        (summary.skipped_disabled_media_kind, "disabled media kind"),
        (summary.skipped_excluded, "excluded"),
        (summary.rejected_too_small, "rejected as too small"),
        (summary.stale_deleted, "stale files deleted"),
    ] {
        if count > 0 {
            tracing::info!("  {} {}", count, what);
        }
    }
    if summary.interrupted {
        tracing::info!("  run was interrupted by a shutdown request");
    }
    if summary.failed > 0 {
        tracing::warn!(
            "{} of your favorites could not be downloaded because they could \
             not be accessed or because of a network error; the other {} were \
             processed successfully",
            summary.failed,
            summary.attempted - summary.failed
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    let filter = match cli.log_level {
        types::LogLevel::Debug => "debug",
        types::LogLevel::Info => "info",
        types::LogLevel::Warn => "warn",
        types::LogLevel::Error => "error",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    if cli.forget_credentials {
        let config_dir = config::expand_tilde(&cli.config_directory);
        if flickr::Session::forget(&config_dir).await? {
            tracing::info!("Stored credentials deleted");
        } else {
            tracing::info!("No stored credentials found");
        }
        return Ok(());
    }

    let config = config::Config::from_cli(&cli)?;

    let mut session = flickr::Session::load(&config.config_directory, &config.credentials).await?;
    if !session.is_authenticated() {
        anyhow::bail!(
            "Not authenticated. Pass --api-key/--api-secret and \
             --oauth-token/--oauth-token-secret once (or set the FLICKR_* \
             environment variables); they are persisted under {}.",
            config.config_directory.display()
        );
    }

    tracing::info!("Validating credentials...");
    let user_id = session.validate().await?;
    tracing::info!("Authenticated as {}", user_id);

    if config.auth_only {
        tracing::info!("Authentication completed successfully");
        return Ok(());
    }

    if config.directory.as_os_str().is_empty() {
        anyhow::bail!("--directory is required for downloading");
    }

    let client = sync::download_client(config.download_timeout_secs)?;
    let shutdown_token = shutdown::install_signal_handler();

    let (events, renderer) = if config.no_progress_bar || !std::io::stdout().is_terminal() {
        (None, None)
    } else {
        let (tx, rx) = progress::channel();
        (Some(tx), Some(spawn_progress_renderer(rx)))
    };

    let summary = sync::sync_favorites(
        &session,
        &client,
        &config.sync_config(),
        events.as_ref(),
        shutdown_token,
    )
    .await?;

    drop(events);
    if let Some(renderer) = renderer {
        let _ = renderer.await;
    }

    log_summary(&summary);
    Ok(())
}
