//! Stored session credentials.

use serde::{Deserialize, Serialize};

/// An access token and, when the backend issued one, a refresh token.
///
/// Both are opaque bearer strings. The `Debug` impl never prints them.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    /// Short-lived access token.
    pub access: String,

    /// Longer-lived refresh token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
}

impl Credentials {
    /// Create credentials from an access token and optional refresh token.
    pub fn new<S: Into<String>>(access: S, refresh: Option<String>) -> Self {
        Self {
            access: access.into(),
            refresh,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access", &"<redacted>")
            .field("refresh", &self.refresh.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
