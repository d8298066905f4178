//! Favorites listing — pages through `flickr.favorites.getList` and
//! captures, per item, whichever size-variant URLs the API exposed.

use serde::Deserialize;

use super::error::ApiError;
use super::session::ApiSession;
use crate::types::{MediaKind, SizeTier};

/// Page size for listing calls; the API maximum.
pub const PAGE_SIZE: u32 = 500;

/// Extra fields requested per photo: media kind plus the four size-variant
/// URLs in descending preference (original, large, medium, small).
const EXTRAS: &str = "media,url_o,url_b,url_m,url_s";

/// One remote favorite. Immutable once fetched.
#[derive(Debug, Clone)]
pub struct Favorite {
    pub id: String,
    pub media: MediaKind,
    /// Available variants, largest first. Absent tiers are simply omitted.
    pub candidate_urls: Vec<(SizeTier, String)>,
}

impl Favorite {
    /// Best available variant by the fixed preference order, if any.
    pub fn best_candidate(&self) -> Option<(SizeTier, &str)> {
        self.candidate_urls
            .first()
            .map(|(tier, url)| (*tier, url.as_str()))
    }
}

#[derive(Deserialize)]
struct FavoritesEnvelope {
    photos: PhotosPage,
}

#[derive(Deserialize)]
struct PhotosPage {
    #[serde(default)]
    photo: Vec<PhotoEntry>,
}

#[derive(Deserialize)]
struct PhotoEntry {
    id: String,
    #[serde(default)]
    media: Option<String>,
    #[serde(default)]
    url_o: Option<String>,
    #[serde(default)]
    url_b: Option<String>,
    #[serde(default)]
    url_m: Option<String>,
    #[serde(default)]
    url_s: Option<String>,
}

impl PhotoEntry {
    fn into_favorite(self) -> Favorite {
        let tiers = [
            (SizeTier::Original, self.url_o),
            (SizeTier::Large, self.url_b),
            (SizeTier::Medium, self.url_m),
            (SizeTier::Small, self.url_s),
        ];
        let candidate_urls = tiers
            .into_iter()
            .filter_map(|(tier, url)| url.map(|u| (tier, u)))
            .collect();
        Favorite {
            media: MediaKind::from_api(self.media.as_deref().unwrap_or("")),
            id: self.id,
            candidate_urls,
        }
    }
}

/// Fetch the complete favorites list, handling pagination.
///
/// Stops at the first page returning zero items. Any error mid-listing
/// propagates immediately; the caller aborts the run rather than work from
/// a partial list.
pub async fn list_favorites(session: &dyn ApiSession) -> Result<Vec<Favorite>, ApiError> {
    let mut favorites: Vec<Favorite> = Vec::new();
    let mut page: u32 = 1;

    loop {
        tracing::debug!(page, "Fetching favorites page");
        let body = session
            .call(
                "flickr.favorites.getList",
                &[
                    ("per_page", PAGE_SIZE.to_string()),
                    ("page", page.to_string()),
                    ("extras", EXTRAS.to_string()),
                ],
            )
            .await?;

        let envelope: FavoritesEnvelope =
            serde_json::from_value(body).map_err(|e| ApiError::InvalidResponse {
                method: "flickr.favorites.getList".into(),
                detail: e.to_string(),
            })?;

        if envelope.photos.photo.is_empty() {
            break;
        }

        tracing::debug!(
            page,
            count = envelope.photos.photo.len(),
            "Got favorites page"
        );
        favorites.extend(envelope.photos.photo.into_iter().map(PhotoEntry::into_favorite));
        page += 1;
    }

    tracing::info!(total = favorites.len(), "Favorites list complete");
    Ok(favorites)
}
