//! Post-download resolution check for photos.
//!
//! Rejected items are deleted and permanently excluded via a sidecar
//! marker, so no future run wastes bandwidth re-fetching them.

use std::path::Path;

use image::ImageReader;

use super::plan::exclusion_marker_path;
use crate::types::MediaKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Accepted,
    RejectedTooSmall,
}

/// Header-only dimension probe. Format is guessed from content, so a
/// mislabeled extension still decodes. `None` when no decoder understood
/// the file.
fn probe_dimensions(path: &Path) -> Option<(u32, u32)> {
    let reader = match ImageReader::open(path).and_then(|r| r.with_guessed_format()) {
        Ok(reader) => reader,
        Err(e) => {
            tracing::debug!("Could not open {} for probing: {}", path.display(), e);
            return None;
        }
    };
    match reader.into_dimensions() {
        Ok(dims) => Some(dims),
        Err(e) => {
            tracing::debug!("Could not decode dimensions of {}: {}", path.display(), e);
            None
        }
    }
}

/// Validate a downloaded file against the minimum-resolution policy.
///
/// Videos always pass; so do photos whose dimensions cannot be determined
/// (an unreadable format is no reason to reject the item). A photo is
/// rejected only when width AND height are both below `min_dimension_px`;
/// the file is then deleted and an exclusion marker created.
pub fn validate_download(path: &Path, media: MediaKind, min_dimension_px: u32) -> Validation {
    if media != MediaKind::Photo || min_dimension_px == 0 {
        return Validation::Accepted;
    }

    let Some((width, height)) = probe_dimensions(path) else {
        return Validation::Accepted;
    };

    if width >= min_dimension_px || height >= min_dimension_px {
        return Validation::Accepted;
    }

    tracing::info!(
        "{} is {}x{}, below the {}px minimum; deleting and excluding",
        path.display(),
        width,
        height,
        min_dimension_px
    );

    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!("Could not delete rejected file {}: {}", path.display(), e);
    }

    let marker = match (path.parent(), path.file_name().and_then(|n| n.to_str())) {
        (Some(dir), Some(name)) => exclusion_marker_path(dir, name),
        _ => return Validation::RejectedTooSmall,
    };
    if let Err(e) = std::fs::write(&marker, b"") {
        tracing::warn!("Could not create exclusion marker {}: {}", marker.display(), e);
    }

    Validation::RejectedTooSmall
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_image(path: &Path, width: u32, height: u32) {
        image::RgbImage::new(width, height).save(path).unwrap();
    }

    #[test]
    fn videos_skip_dimension_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1234567.mp4");
        std::fs::write(&path, b"not a real video").unwrap();
        assert_eq!(
            validate_download(&path, MediaKind::Video, 1024),
            Validation::Accepted
        );
        assert!(path.exists());
    }

    #[test]
    fn zero_minimum_accepts_everything() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1234567.jpg");
        write_image(&path, 1, 1);
        assert_eq!(
            validate_download(&path, MediaKind::Photo, 0),
            Validation::Accepted
        );
    }

    #[test]
    fn undecodable_photo_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1234567.jpg");
        std::fs::write(&path, b"definitely not an image").unwrap();
        assert_eq!(
            validate_download(&path, MediaKind::Photo, 1024),
            Validation::Accepted
        );
        assert!(path.exists());
    }

    #[test]
    fn small_photo_is_deleted_and_excluded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("9999999.jpg");
        write_image(&path, 400, 300);
        assert_eq!(
            validate_download(&path, MediaKind::Photo, 1024),
            Validation::RejectedTooSmall
        );
        assert!(!path.exists());
        assert!(dir.path().join(".9999999.jpg.exclude").exists());
    }

    #[test]
    fn one_large_dimension_is_enough() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1234567.jpg");
        write_image(&path, 2000, 10);
        assert_eq!(
            validate_download(&path, MediaKind::Photo, 1024),
            Validation::Accepted
        );
        assert!(path.exists());
    }

    #[test]
    fn exactly_minimum_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1234567.jpg");
        write_image(&path, 1024, 100);
        assert_eq!(
            validate_download(&path, MediaKind::Photo, 1024),
            Validation::Accepted
        );
    }
}
