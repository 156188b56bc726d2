//! API client for the songfeed backend.
//!
//! [`SongfeedApi`] wraps the authenticated song endpoints: recommendations,
//! liked songs and playlists.

pub mod client;

pub use client::SongfeedApi;
