use thiserror::Error;

/// Errors from the Flickr REST layer.
///
/// Any of these during favorites listing aborts the whole run; there is no
/// partial-result recovery at that stage.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error calling {method}: {source}")]
    Http {
        method: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("API call {method} failed with HTTP status {status}")]
    HttpStatus { method: String, status: u16 },

    #[error("API call {method} rejected: {message} (code {code})")]
    Api {
        method: String,
        code: i64,
        message: String,
    },

    #[error("Unexpected response shape from {method}: {detail}")]
    InvalidResponse { method: String, detail: String },

    #[error("Not authenticated; pass --oauth-token/--oauth-token-secret or run with credentials persisted")]
    NotAuthenticated,
}
