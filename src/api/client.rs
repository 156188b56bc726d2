//! High-level client for the songfeed backend.
//!
//! Every authenticated call goes through [`TokenGuard`], and every song list
//! goes through the normalizer, so callers only ever see
//! [`CanonicalSong`] records or a tagged [`SongfeedError`].

use std::sync::Arc;

use reqwest::{Client, Method, Response, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, error, info};

use crate::auth::refresher::parse_access_token;
use crate::auth::{CredentialStore, HttpTokenRefresher, TokenGuard};
use crate::config::ClientConfig;
use crate::converters::{self, SongFilter};
use crate::error::{Result, SongfeedError};
use crate::models::{CanonicalSong, Credentials};

const RECOMMENDATIONS_PATH: &str = "/api/recommendations/";
const LIKED_SONGS_PATH: &str = "/api/songs/liked/";
const PLAYLIST_SONGS_PATH: &str = "/api/playlists/{id}/songs/";

/// Body fields that may carry a human-readable error message.
const MESSAGE_FIELDS: [&str; 3] = ["detail", "message", "error"];

/// Longest error body echoed back verbatim.
const MAX_MESSAGE_LEN: usize = 200;

/// Client for the song endpoints.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use songfeed::{ClientConfig, MemoryCredentialStore, SongFilter, SongfeedApi};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let api = SongfeedApi::new(ClientConfig::from_env(), Arc::new(MemoryCredentialStore::new()))?;
///     api.login("listener", "hunter2").await?;
///     for song in api.recommendations(SongFilter::Playable).await? {
///         println!("{} - {}", song.artist, song.title);
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct SongfeedApi {
    client: Client,
    config: ClientConfig,
    guard: TokenGuard<HttpTokenRefresher>,
}

impl SongfeedApi {
    /// Create a client using `store` for credentials.
    pub fn new(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self> {
        let client = config.http_client()?;
        let refresher = HttpTokenRefresher::new(client.clone(), config.endpoint(&config.refresh_path));

        Ok(Self {
            client,
            guard: TokenGuard::new(store, refresher),
            config,
        })
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Whether an access token is currently stored.
    pub fn is_logged_in(&self) -> bool {
        self.guard.store().access_token().is_some()
    }

    /// Log in and store the issued tokens.
    ///
    /// # Errors
    ///
    /// Returns `Domain` with the server's message if the credentials are
    /// rejected.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let url = self.config.endpoint(&self.config.login_path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;
        let body = read_json(response).await?;
        let credentials = parse_login_response(&body)?;

        self.guard.store().set_credentials(credentials);
        info!("Logged in as {}", username);
        Ok(())
    }

    /// Forget stored credentials.
    pub fn logout(&self) {
        self.guard.store().clear();
        info!("Logged out");
    }

    /// Songs recommended for the current user.
    pub async fn recommendations(&self, filter: SongFilter) -> Result<Vec<CanonicalSong>> {
        self.get_songs(RECOMMENDATIONS_PATH, filter).await
    }

    /// Songs the current user has liked.
    pub async fn liked_songs(&self, filter: SongFilter) -> Result<Vec<CanonicalSong>> {
        self.get_songs(LIKED_SONGS_PATH, filter).await
    }

    /// Songs in one of the user's playlists.
    pub async fn playlist_songs(
        &self,
        playlist_id: &str,
        filter: SongFilter,
    ) -> Result<Vec<CanonicalSong>> {
        let path = PLAYLIST_SONGS_PATH.replace("{id}", playlist_id);
        self.get_songs(&path, filter).await
    }

    /// Save a track to the user's liked songs.
    pub async fn like_song(&self, track_id: &str) -> Result<()> {
        self.send(Method::POST, LIKED_SONGS_PATH, Some(json!({ "track_id": track_id })))
            .await
            .map(|_| ())
    }

    /// Remove a track from the user's liked songs.
    pub async fn unlike_song(&self, track_id: &str) -> Result<()> {
        self.send(Method::DELETE, LIKED_SONGS_PATH, Some(json!({ "track_id": track_id })))
            .await
            .map(|_| ())
    }

    /// Authenticated GET returning the raw JSON body.
    pub async fn get_json(&self, path: &str) -> Result<Value> {
        self.send(Method::GET, path, None).await
    }

    /// Fetch any song-list endpoint and normalize its payload.
    pub async fn get_songs(&self, path: &str, filter: SongFilter) -> Result<Vec<CanonicalSong>> {
        let payload = self.get_json(path).await?;
        let songs = converters::normalize_with(&payload, filter);
        debug!("{} returned {} songs", path, songs.len());
        Ok(songs)
    }

    /// Make an authenticated request.
    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = self.config.endpoint(path);
        debug!("{} {}", method, url);

        let response = self
            .guard
            .execute(|token| {
                let mut request = self
                    .client
                    .request(method.clone(), &url)
                    .bearer_auth(token);
                if let Some(body) = &body {
                    request = request.json(body);
                }
                request.send()
            })
            .await?;

        read_json(response).await
    }
}

/// Read a response body as JSON, turning non-2xx statuses into `Domain` errors.
///
/// An empty success body reads as `null`.
async fn read_json(response: Response) -> Result<Value> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(domain_error(status, &text));
    }
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&text).map_err(|e| {
        error!(
            "Failed to parse response (status {}): {}",
            status,
            preview(&text)
        );
        e.into()
    })
}

/// Build a `Domain` error from an error response body.
///
/// The message is taken from `detail`, `message` or `error` (string or
/// `{"message": ...}`), else the body text, else the status reason.
pub fn domain_error(status: StatusCode, body: &str) -> SongfeedError {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|json| {
        MESSAGE_FIELDS.iter().find_map(|key| match json.get(*key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Object(obj) => obj.get("message")?.as_str().map(|s| s.to_string()),
            _ => None,
        })
    });

    let message = from_json.unwrap_or_else(|| {
        let text = body.trim();
        if text.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        } else {
            preview(text)
        }
    });

    SongfeedError::Domain {
        status: status.as_u16(),
        message,
    }
}

/// Read the token pair out of a login response.
pub fn parse_login_response(body: &Value) -> Result<Credentials> {
    let access = parse_access_token(body)?;
    let refresh = ["refresh", "refresh_token"]
        .iter()
        .find_map(|key| body.get(*key).and_then(|v| v.as_str()))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string());
    Ok(Credentials::new(access, refresh))
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(MAX_MESSAGE_LEN) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}
