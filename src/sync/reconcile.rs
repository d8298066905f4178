//! Stale-file cleanup: removes local downloads whose ids have dropped out
//! of the remote favorites set.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

/// Only files this tool could have written are candidates for deletion:
/// a numeric id of at least 7 digits plus a jpg/mp4 extension.
static DOWNLOADED_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{7,})\.(jpg|mp4)$").expect("valid regex"));

/// Id stem of a filename matching the download naming scheme.
pub(crate) fn downloaded_id(filename: &str) -> Option<&str> {
    DOWNLOADED_NAME
        .captures(filename)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Delete files in `directory` that match the download naming scheme but
/// whose id is absent from `remote_ids`. Returns the number deleted.
///
/// Individual failures (unreadable entry, delete denied) are logged and
/// skipped; cleanup never aborts the run. Must complete before the fetch
/// loop so its already-downloaded checks see a consistent directory.
pub fn delete_stale_files(directory: &Path, remote_ids: &HashSet<&str>) -> usize {
    let entries = match std::fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Could not scan {} for stale files: {}", directory.display(), e);
            return 0;
        }
    };

    let mut deleted = 0;
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Could not read directory entry: {}", e);
                continue;
            }
        };
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(id) = downloaded_id(name) else {
            continue;
        };
        if remote_ids.contains(id) {
            continue;
        }

        tracing::info!("Deleting stale favorite {}", name);
        match std::fs::remove_file(entry.path()) {
            Ok(()) => deleted += 1,
            Err(e) => tracing::warn!("Could not delete {}: {}", entry.path().display(), e),
        }
    }
    deleted
}
