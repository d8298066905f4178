//! Flickr REST client: OAuth 1.0a signing, session persistence, and the
//! paginated favorites lister.

pub mod error;
pub mod favorites;
pub mod oauth;
pub mod session;

pub use self::error::ApiError;
pub use self::favorites::{list_favorites, Favorite};
pub use self::session::{ApiSession, Credentials, Session};

/// User agent for all outbound requests.
pub const USER_AGENT: &str = concat!("flickrfaves-rs/", env!("CARGO_PKG_VERSION"));
