//! # songfeed
//!
//! A client library for the song recommendation backend.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use songfeed::{ClientConfig, FileCredentialStore, SongFilter, SongfeedApi};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::from_env();
//!     let store = Arc::new(FileCredentialStore::open(&config.credentials_path));
//!     let api = SongfeedApi::new(config, store)?;
//!
//!     // Tokens are refreshed once on a 401, then the request is retried.
//!     let songs = api.liked_songs(SongFilter::All).await?;
//!     println!("{} liked songs", songs.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Building Blocks
//!
//! - [`TokenGuard`] - bearer-authenticated requests with one refresh-and-retry
//! - [`CredentialStore`] - pluggable token storage (memory or file)
//! - [`converters`] - total normalization of arbitrary song payloads into
//!   [`CanonicalSong`] records

pub mod api;
pub mod auth;
pub mod config;
pub mod converters;
pub mod error;
pub mod models;

pub use api::SongfeedApi;
pub use auth::{
    CredentialStore, FileCredentialStore, HttpTokenRefresher, MemoryCredentialStore,
    TokenGuard, TokenRefresher,
};
pub use config::ClientConfig;
pub use converters::{normalize, SongFilter};
pub use error::{Result, SongfeedError};
pub use models::{CanonicalSong, Credentials};
