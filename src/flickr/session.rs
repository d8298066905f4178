//! Signed Flickr REST session with on-disk credential persistence.
//!
//! The interactive OAuth exchange is out of scope; tokens arrive via CLI
//! flags or environment and survive restarts in a JSON credential file
//! under the config directory.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs;

use super::error::ApiError;
use super::oauth;
use super::USER_AGENT;

pub const REST_ENDPOINT: &str = "https://api.flickr.com/services/rest/";
const CREDENTIALS_FILE: &str = "credentials.json";

/// API key pair plus OAuth access token, as persisted between runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub oauth_token: Option<String>,
    pub oauth_token_secret: Option<String>,
    /// NSID reported by the last successful `flickr.test.login`.
    #[serde(default)]
    pub user_id: Option<String>,
}

impl Credentials {
    /// Overlay values from `other` (CLI/env) onto persisted ones.
    /// Returns true when anything changed.
    pub fn merge(&mut self, other: &Credentials) -> bool {
        let mut changed = false;
        for (mine, theirs) in [
            (&mut self.api_key, &other.api_key),
            (&mut self.api_secret, &other.api_secret),
            (&mut self.oauth_token, &other.oauth_token),
            (&mut self.oauth_token_secret, &other.oauth_token_secret),
        ] {
            if theirs.is_some() && *mine != *theirs {
                mine.clone_from(theirs);
                changed = true;
            }
        }
        changed
    }

    pub fn is_complete(&self) -> bool {
        self.api_key.is_some()
            && self.api_secret.is_some()
            && self.oauth_token.is_some()
            && self.oauth_token_secret.is_some()
    }
}

/// Minimal async session used by the favorites lister.
/// The concrete implementation lives below; tests substitute canned pages.
#[async_trait]
pub trait ApiSession: Send + Sync {
    /// Perform one signed REST call and return the parsed JSON body.
    /// The `stat: fail` envelope is already converted to an error.
    async fn call(&self, method: &str, params: &[(&str, String)]) -> Result<Value, ApiError>;
}

pub struct Session {
    client: reqwest::Client,
    credentials: Credentials,
    config_dir: PathBuf,
}

fn credentials_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CREDENTIALS_FILE)
}

impl Session {
    /// Load persisted credentials, overlay any supplied ones, and persist
    /// the merged result so the next run needs no flags.
    pub async fn load(config_dir: &Path, supplied: &Credentials) -> Result<Self> {
        fs::create_dir_all(config_dir).await.with_context(|| {
            format!("Failed to create config directory {}", config_dir.display())
        })?;

        let path = credentials_path(config_dir);
        let mut credentials = match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("Corrupt credential file {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Credentials::default(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read {}", path.display()))
            }
        };

        let changed = credentials.merge(supplied);

        let session = Self {
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .context("Failed to build API client")?,
            credentials,
            config_dir: config_dir.to_path_buf(),
        };
        if changed {
            session.save().await?;
        }
        Ok(session)
    }

    /// Delete the persisted credential file, if any.
    pub async fn forget(config_dir: &Path) -> Result<bool> {
        let path = credentials_path(config_dir);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to delete {}", path.display())),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_complete()
    }

    async fn save(&self) -> Result<()> {
        let path = credentials_path(&self.config_dir);
        let json = serde_json::to_vec_pretty(&self.credentials)?;
        fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Round-trip `flickr.test.login` to confirm the token is still valid,
    /// remembering the account NSID on success.
    pub async fn validate(&mut self) -> Result<String, ApiError> {
        let body = self.call("flickr.test.login", &[]).await?;
        let user_id = body["user"]["id"].as_str().unwrap_or("").to_string();
        if user_id.is_empty() {
            return Err(ApiError::InvalidResponse {
                method: "flickr.test.login".into(),
                detail: "missing user.id".into(),
            });
        }
        if self.credentials.user_id.as_deref() != Some(&user_id) {
            self.credentials.user_id = Some(user_id.clone());
            if let Err(e) = self.save().await {
                tracing::warn!("Could not persist credentials: {e:#}");
            }
        }
        Ok(user_id)
    }

    /// Assemble the full signed parameter set for one REST call.
    fn signed_params(&self, method: &str, extra: &[(&str, String)]) -> Result<Vec<(String, String)>, ApiError> {
        let (Some(api_key), Some(api_secret), Some(token), Some(token_secret)) = (
            self.credentials.api_key.as_deref(),
            self.credentials.api_secret.as_deref(),
            self.credentials.oauth_token.as_deref(),
            self.credentials.oauth_token_secret.as_deref(),
        ) else {
            return Err(ApiError::NotAuthenticated);
        };

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let mut params: Vec<(String, String)> = vec![
            ("method".into(), method.to_string()),
            ("format".into(), "json".into()),
            ("nojsoncallback".into(), "1".into()),
            ("api_key".into(), api_key.to_string()),
            ("oauth_consumer_key".into(), api_key.to_string()),
            ("oauth_token".into(), token.to_string()),
            ("oauth_signature_method".into(), "HMAC-SHA1".into()),
            ("oauth_version".into(), "1.0".into()),
            ("oauth_timestamp".into(), timestamp.to_string()),
            ("oauth_nonce".into(), uuid::Uuid::new_v4().to_string()),
        ];
        params.extend(extra.iter().map(|(k, v)| (k.to_string(), v.clone())));

        oauth::sign_get(REST_ENDPOINT, &mut params, api_secret, token_secret);
        Ok(params)
    }
}

#[async_trait]
impl ApiSession for Session {
    async fn call(&self, method: &str, params: &[(&str, String)]) -> Result<Value, ApiError> {
        let signed = self.signed_params(method, params)?;

        let response = self
            .client
            .get(REST_ENDPOINT)
            .query(&signed)
            .send()
            .await
            .map_err(|e| ApiError::Http {
                method: method.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::HttpStatus {
                method: method.to_string(),
                status: status.as_u16(),
            });
        }

        let body: Value = response.json().await.map_err(|e| ApiError::Http {
            method: method.to_string(),
            source: e,
        })?;

        if body["stat"].as_str() == Some("fail") {
            return Err(ApiError::Api {
                method: method.to_string(),
                code: body["code"].as_i64().unwrap_or(0),
                message: body["message"].as_str().unwrap_or("unknown error").to_string(),
            });
        }

        Ok(body)
    }
}
