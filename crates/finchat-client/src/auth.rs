//! Password login against the backend auth endpoint, plus the on-disk
//! token cache that lets a restart skip the login prompt.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use finchat_core::{LoginRequest, LoginResponse};

use crate::error::ClientError;

/// HTTP client for the auth endpoint.
pub struct AuthClient {
    inner: reqwest::Client,
    base_url: String,
}

impl AuthClient {
    /// Create a new auth client against the backend base URL.
    pub fn new(base_url: &str) -> Self {
        Self {
            inner: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Exchange the password for a connection token.
    ///
    /// A rejected login surfaces as [`ClientError::AuthRejected`]; nothing
    /// is retried automatically, the caller prompts again.
    pub async fn login(&self, password: &str) -> Result<String, ClientError> {
        let url = format!("{}/auth/login", self.base_url);
        debug!(url = %url, "logging in");

        let response = self
            .inner
            .post(&url)
            .json(&LoginRequest {
                password: password.to_string(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::AuthRejected);
        }

        let body: LoginResponse = response.json().await?;
        match body.token {
            Some(token) if body.success => {
                info!("login accepted");
                Ok(token)
            }
            _ => Err(ClientError::AuthRejected),
        }
    }
}

/// On-disk cache for the auth token.
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    /// Create a cache over the given file path. No I/O happens here.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Persist the token for the next session.
    pub fn save(&self, token: &str) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, token)?;
        Ok(())
    }

    /// The cached token, if a non-empty one is stored.
    pub fn load(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(token) => {
                let token = token.trim().to_string();
                if token.is_empty() {
                    None
                } else {
                    Some(token)
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(error = %e, "failed to read cached token");
                None
            }
        }
    }

    /// Forget the cached token (logout). Idempotent.
    pub fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("cached token cleared"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(error = %e, "failed to clear cached token"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_cache_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path().join("token"));

        assert!(cache.load().is_none());
        cache.save("tok-123").unwrap();
        assert_eq!(cache.load().as_deref(), Some("tok-123"));

        cache.clear();
        cache.clear();
        assert!(cache.load().is_none());
    }

    #[test]
    fn test_empty_token_is_treated_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path().join("token"));
        cache.save("  \n").unwrap();
        assert!(cache.load().is_none());
    }
}
