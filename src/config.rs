//! Client configuration.

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Client;
use tracing::{info, warn};

use crate::error::{Result, SongfeedError};

const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_LOGIN_PATH: &str = "/api/token/";
const DEFAULT_REFRESH_PATH: &str = "/api/token/refresh/";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = concat!("songfeed/", env!("CARGO_PKG_VERSION"));

/// Settings for talking to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Backend origin, e.g. `https://api.example.com`.
    pub base_url: String,
    /// Path of the login (token obtain) endpoint.
    pub login_path: String,
    /// Path of the token refresh endpoint.
    pub refresh_path: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
    /// Where the CLI keeps credentials between runs.
    pub credentials_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: USER_AGENT.to_string(),
            credentials_path: default_credentials_path(),
        }
    }
}

impl ClientConfig {
    /// Load settings from `SONGFEED_*` environment variables.
    ///
    /// Unset variables fall back to defaults; unparsable ones are logged and
    /// also fall back.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: load("SONGFEED_BASE_URL", defaults.base_url),
            login_path: load("SONGFEED_LOGIN_PATH", defaults.login_path),
            refresh_path: load("SONGFEED_REFRESH_PATH", defaults.refresh_path),
            timeout: Duration::from_secs(load("SONGFEED_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)),
            user_agent: defaults.user_agent,
            credentials_path: load("SONGFEED_CREDENTIALS", defaults.credentials_path),
        }
    }

    /// Full URL for an endpoint path.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Build the HTTP client described by this config.
    pub fn http_client(&self) -> Result<Client> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(SongfeedError::Config(format!(
                "base URL must start with http:// or https://: {}",
                self.base_url
            )));
        }

        Client::builder()
            .user_agent(&self.user_agent)
            .timeout(self.timeout)
            .build()
            .map_err(|e| SongfeedError::Config(format!("Failed to create client: {}", e)))
    }
}

/// `$HOME/.config/songfeed/credentials.json`, or a relative path without `HOME`.
fn default_credentials_path() -> PathBuf {
    let base = env::var("HOME").map(PathBuf::from).unwrap_or_default();
    base.join(".config").join("songfeed").join("credentials.json")
}

fn load<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value {raw:?}: {e}, using default: {default:?}");
            default
        }),
        Err(_) => {
            info!("{key} not set, using default: {default:?}");
            default
        }
    }
}
