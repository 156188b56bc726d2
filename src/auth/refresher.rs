//! Exchange of a refresh token for a new access token.

use std::future::Future;

use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{Result, SongfeedError};

/// Fields the refresh endpoint may use for the new access token.
const ACCESS_FIELDS: [&str; 2] = ["access", "access_token"];

/// Obtains a new access token from a refresh token.
pub trait TokenRefresher: Send + Sync {
    /// Return the new access token. Any error is treated as a failed refresh.
    fn refresh(&self, refresh_token: &str) -> impl Future<Output = Result<String>> + Send;
}

/// Refresher calling the backend's token refresh endpoint.
///
/// Sends `POST <url>` with `{"refresh": "<token>"}` and expects a JSON body
/// carrying the new token under `access` (or `access_token`).
#[derive(Debug, Clone)]
pub struct HttpTokenRefresher {
    client: Client,
    url: String,
}

impl HttpTokenRefresher {
    /// Create a refresher posting to `url`.
    pub fn new<S: Into<String>>(client: Client, url: S) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// The refresh endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<String> {
        debug!("POST {}", self.url);

        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "refresh": refresh_token }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Token refresh rejected with status {}", status);
            return Err(SongfeedError::Domain {
                status: status.as_u16(),
                message: "Token refresh rejected".to_string(),
            });
        }

        let body: Value = response.json().await?;
        parse_access_token(&body)
    }
}

/// Read the new access token out of a refresh response body.
pub fn parse_access_token(body: &Value) -> Result<String> {
    ACCESS_FIELDS
        .iter()
        .find_map(|key| body.get(*key).and_then(|v| v.as_str()))
        .filter(|token| !token.is_empty())
        .map(|token| token.to_string())
        .ok_or_else(|| SongfeedError::Domain {
            status: 200,
            message: "Refresh response carried no access token".to_string(),
        })
}
