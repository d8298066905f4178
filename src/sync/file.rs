//! Chunked download with a two-level retry policy: transient chunk-read
//! errors are retried in place, and once that budget is exhausted the whole
//! item is restarted from byte zero on a fresh connection, once.

use std::path::Path;

use futures_util::{Stream, StreamExt};
use reqwest::Client;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use super::error::DownloadError;

/// Extra attempts to read the current chunk before escalating.
pub(crate) const CHUNK_READ_RETRIES: u32 = 2;
/// Whole-item restarts after the first attempt fails.
pub(crate) const ITEM_RETRIES: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStatus {
    /// Body streamed to disk.
    Fetched { bytes_written: u64 },
    /// Remote Content-Length matched the existing local file; nothing
    /// transferred.
    AlreadyComplete,
}

/// Download `url` to `destination`.
///
/// `existing_len` is the size of a local file already at the destination
/// (only passed when overwrite is enabled): when it equals the remote
/// Content-Length the transfer is skipped, otherwise the local file is
/// deleted before the rewrite.
///
/// `on_progress` receives cumulative bytes written and the remote
/// Content-Length after the connection opens and again after every chunk.
pub async fn download(
    client: &Client,
    url: &str,
    destination: &Path,
    existing_len: Option<u64>,
    shutdown: &CancellationToken,
    mut on_progress: impl FnMut(u64, Option<u64>),
) -> Result<DownloadStatus, DownloadError> {
    let mut same_size_check = existing_len;
    let mut attempt = 0u32;
    loop {
        let result = attempt_once(
            client,
            url,
            destination,
            same_size_check,
            shutdown,
            &mut on_progress,
        )
        .await;
        match result {
            Ok(status) => return Ok(status),
            Err(e) if e.is_retryable() && attempt < ITEM_RETRIES => {
                attempt += 1;
                tracing::warn!("Download of {url} failed ({e}), retrying whole item from scratch");
                // A retry rewrites from byte zero; comparing the remote
                // size against our own partial file would be meaningless.
                same_size_check = None;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn attempt_once(
    client: &Client,
    url: &str,
    destination: &Path,
    same_size_check: Option<u64>,
    shutdown: &CancellationToken,
    on_progress: &mut impl FnMut(u64, Option<u64>),
) -> Result<DownloadStatus, DownloadError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| DownloadError::Connect {
            url: url.to_string(),
            source: e,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let bytes_total = response.content_length();

    if let Some(local_len) = same_size_check {
        if bytes_total == Some(local_len) {
            tracing::debug!(
                "{} already fully downloaded ({} bytes), skipping",
                destination.display(),
                local_len
            );
            return Ok(DownloadStatus::AlreadyComplete);
        }
        // Size mismatch: stale or incomplete copy. Delete before rewrite so
        // there is never more than one file per item on disk.
        tracing::debug!("Deleting and re-downloading {}", destination.display());
        match fs::remove_file(destination).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(DownloadError::Disk(e)),
        }
    }

    on_progress(0, bytes_total);

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(destination)
        .await?;

    let mut stream = response.bytes_stream();
    let written = copy_chunks(&mut stream, &mut file, shutdown, |n| {
        on_progress(n, bytes_total)
    })
    .await?;

    file.flush().await?;
    Ok(DownloadStatus::Fetched {
        bytes_written: written,
    })
}

/// Pump chunks from `stream` into `writer`, tolerating up to
/// [`CHUNK_READ_RETRIES`] consecutive read errors before giving up.
/// A partial file is left in place on failure; the caller either restarts
/// from scratch or leaves it for the next run's size-mismatch repair.
async fn copy_chunks<S, B, W>(
    stream: &mut S,
    writer: &mut W,
    shutdown: &CancellationToken,
    mut on_progress: impl FnMut(u64),
) -> Result<u64, DownloadError>
where
    S: Stream<Item = Result<B, reqwest::Error>> + Unpin,
    B: AsRef<[u8]>,
    W: tokio::io::AsyncWrite + Unpin,
{
    let mut written: u64 = 0;
    let mut consecutive_failures: u32 = 0;

    loop {
        if shutdown.is_cancelled() {
            return Err(DownloadError::Cancelled);
        }
        match stream.next().await {
            Some(Ok(chunk)) => {
                consecutive_failures = 0;
                let chunk = chunk.as_ref();
                writer.write_all(chunk).await?;
                written += chunk.len() as u64;
                on_progress(written);
            }
            Some(Err(e)) => {
                consecutive_failures += 1;
                if consecutive_failures > CHUNK_READ_RETRIES {
                    return Err(DownloadError::ChunkRead {
                        bytes_written: written,
                        source: e,
                    });
                }
                tracing::warn!(
                    "Chunk read error #{consecutive_failures} after {written} bytes, retrying: {e}"
                );
            }
            None => break,
        }
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Manufacture a real `reqwest::Error` the way the connection layer
    /// would: by failing to connect to a closed port.
    async fn connect_error() -> reqwest::Error {
        reqwest::Client::new()
            .get("http://127.0.0.1:1/")
            .send()
            .await
            .expect_err("port 1 must refuse connections")
    }

    #[tokio::test]
    async fn copy_chunks_writes_all_bytes_and_reports_progress() {
        let chunks: Vec<Result<&[u8], reqwest::Error>> =
            vec![Ok(b"hello".as_slice()), Ok(b" "), Ok(b"world")];
        let mut stream = stream::iter(chunks);
        let mut sink: Vec<u8> = Vec::new();
        let mut seen = Vec::new();

        let written = copy_chunks(&mut stream, &mut sink, &CancellationToken::new(), |n| {
            seen.push(n)
        })
        .await
        .unwrap();

        assert_eq!(written, 11);
        assert_eq!(sink, b"hello world");
        assert_eq!(seen, vec![5, 6, 11]);
    }

    #[tokio::test]
    async fn copy_chunks_recovers_from_two_consecutive_errors() {
        let chunks: Vec<Result<&[u8], reqwest::Error>> = vec![
            Ok(b"abc".as_slice()),
            Err(connect_error().await),
            Err(connect_error().await),
            Ok(b"def"),
        ];
        let mut stream = stream::iter(chunks);
        let mut sink: Vec<u8> = Vec::new();

        let written = copy_chunks(&mut stream, &mut sink, &CancellationToken::new(), |_| {})
            .await
            .unwrap();

        assert_eq!(written, 6);
        assert_eq!(sink, b"abcdef");
    }

    #[tokio::test]
    async fn copy_chunks_escalates_on_third_consecutive_error() {
        let chunks: Vec<Result<&[u8], reqwest::Error>> = vec![
            Ok(b"abc".as_slice()),
            Err(connect_error().await),
            Err(connect_error().await),
            Err(connect_error().await),
            Ok(b"never reached"),
        ];
        let mut stream = stream::iter(chunks);
        let mut sink: Vec<u8> = Vec::new();

        let err = copy_chunks(&mut stream, &mut sink, &CancellationToken::new(), |_| {})
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DownloadError::ChunkRead {
                bytes_written: 3,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn copy_chunks_resets_budget_after_successful_chunk() {
        // err, err, ok, err, err, ok — never three in a row, must succeed.
        let chunks: Vec<Result<&[u8], reqwest::Error>> = vec![
            Err(connect_error().await),
            Err(connect_error().await),
            Ok(b"ab".as_slice()),
            Err(connect_error().await),
            Err(connect_error().await),
            Ok(b"cd"),
        ];
        let mut stream = stream::iter(chunks);
        let mut sink: Vec<u8> = Vec::new();

        let written = copy_chunks(&mut stream, &mut sink, &CancellationToken::new(), |_| {})
            .await
            .unwrap();
        assert_eq!(written, 4);
    }

    #[tokio::test]
    async fn copy_chunks_stops_on_cancellation() {
        let chunks: Vec<Result<&[u8], reqwest::Error>> = vec![Ok(b"abc".as_slice())];
        let mut stream = stream::iter(chunks);
        let mut sink: Vec<u8> = Vec::new();
        let token = CancellationToken::new();
        token.cancel();

        let err = copy_chunks(&mut stream, &mut sink, &token, |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::Cancelled));
    }

    #[tokio::test]
    async fn download_fetches_body_to_destination() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1234567_o.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"imagebytes".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("1234567.jpg");
        let status = download(
            &Client::new(),
            &format!("{}/1234567_o.jpg", server.uri()),
            &dest,
            None,
            &CancellationToken::new(),
            |_, _| {},
        )
        .await
        .unwrap();

        assert_eq!(status, DownloadStatus::Fetched { bytes_written: 10 });
        assert_eq!(std::fs::read(&dest).unwrap(), b"imagebytes");
    }

    #[tokio::test]
    async fn download_skips_when_remote_size_matches_local() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1234567_o.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"same-bytes".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("1234567.jpg");
        std::fs::write(&dest, b"same-bytes").unwrap();

        let status = download(
            &Client::new(),
            &format!("{}/1234567_o.jpg", server.uri()),
            &dest,
            Some(10),
            &CancellationToken::new(),
            |_, _| {},
        )
        .await
        .unwrap();

        assert_eq!(status, DownloadStatus::AlreadyComplete);
        assert_eq!(std::fs::read(&dest).unwrap(), b"same-bytes");
    }

    #[tokio::test]
    async fn download_replaces_local_file_on_size_mismatch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1234567_o.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"full content".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("1234567.jpg");
        std::fs::write(&dest, b"partial").unwrap();

        let status = download(
            &Client::new(),
            &format!("{}/1234567_o.jpg", server.uri()),
            &dest,
            Some(7),
            &CancellationToken::new(),
            |_, _| {},
        )
        .await
        .unwrap();

        assert_eq!(status, DownloadStatus::Fetched { bytes_written: 12 });
        assert_eq!(std::fs::read(&dest).unwrap(), b"full content");
    }

    #[tokio::test]
    async fn download_retries_whole_item_once_after_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1234567_o.jpg"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/1234567_o.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"recovered".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("1234567.jpg");
        let status = download(
            &Client::new(),
            &format!("{}/1234567_o.jpg", server.uri()),
            &dest,
            None,
            &CancellationToken::new(),
            |_, _| {},
        )
        .await
        .unwrap();

        assert_eq!(status, DownloadStatus::Fetched { bytes_written: 9 });
        assert_eq!(std::fs::read(&dest).unwrap(), b"recovered");
    }

    #[tokio::test]
    async fn download_gives_up_after_second_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1234567_o.jpg"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("1234567.jpg");
        let err = download(
            &Client::new(),
            &format!("{}/1234567_o.jpg", server.uri()),
            &dest,
            None,
            &CancellationToken::new(),
            |_, _| {},
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DownloadError::HttpStatus { status: 503, .. }));
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn download_does_not_retry_client_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("gone.jpg");
        let err = download(
            &Client::new(),
            &format!("{}/gone.jpg", server.uri()),
            &dest,
            None,
            &CancellationToken::new(),
            |_, _| {},
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DownloadError::HttpStatus { status: 404, .. }));
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }
}
