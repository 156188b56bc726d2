//! Authentication for the songfeed API.
//!
//! This module provides:
//! - [`CredentialStore`]: where access and refresh tokens live
//! - [`TokenRefresher`]: how an expired access token is renewed
//! - [`TokenGuard`]: bearer-authenticated requests with one refresh-and-retry

pub mod guard;
pub mod refresher;
pub mod store;

pub use guard::{GuardState, HttpStatus, TokenGuard};
pub use refresher::{HttpTokenRefresher, TokenRefresher};
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
