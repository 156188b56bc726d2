//! Data models for songfeed.
//!
//! This module contains the canonical song record produced by the
//! normalizer and the credentials held by the session store.

pub mod credentials;
pub mod song;

// Re-exports for convenience
pub use credentials::Credentials;
pub use song::CanonicalSong;
