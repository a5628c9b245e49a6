//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Environment variable overriding the backend base URL.
pub const SERVER_URL_ENV: &str = "FINCHAT_SERVER_URL";

/// Client configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend base URL (http or https).
    pub server_url: String,

    /// Directory holding the message history and the cached token.
    pub storage_dir: PathBuf,

    /// Fixed delay between reconnection attempts.
    pub reconnect_delay: Duration,

    /// Consecutive failed attempts before the connection task gives up.
    pub max_reconnect_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        let server_url = std::env::var(SERVER_URL_ENV)
            .unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());
        let storage_dir = dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("finchat");
        Self {
            server_url,
            storage_dir,
            reconnect_delay: Duration::from_secs(1),
            max_reconnect_attempts: 5,
        }
    }
}

impl Config {
    /// WebSocket endpoint derived from the base URL, carrying the token as
    /// the authentication parameter of the handshake.
    pub fn ws_url(&self, token: &str) -> String {
        let base = self
            .server_url
            .replacen("https://", "wss://", 1)
            .replacen("http://", "ws://", 1);
        format!("{}/ws?token={}", base.trim_end_matches('/'), token)
    }

    /// Path of the persisted message history.
    pub fn history_path(&self) -> PathBuf {
        self.storage_dir.join("messages.json")
    }

    /// Path of the cached auth token.
    pub fn token_path(&self) -> PathBuf {
        self.storage_dir.join("token")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_url(url: &str) -> Config {
        Config {
            server_url: url.to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn test_ws_url_swaps_scheme() {
        let config = config_with_url("http://127.0.0.1:3000");
        assert_eq!(
            config.ws_url("tok"),
            "ws://127.0.0.1:3000/ws?token=tok"
        );

        let config = config_with_url("https://bot.example.com/");
        assert_eq!(
            config.ws_url("tok"),
            "wss://bot.example.com/ws?token=tok"
        );
    }

    #[test]
    fn test_storage_paths_share_the_dir() {
        let config = Config::default();
        assert_eq!(
            config.history_path().parent(),
            config.token_path().parent()
        );
    }
}
