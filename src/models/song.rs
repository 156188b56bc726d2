//! Canonical song record.

use serde::{Deserialize, Serialize};

/// Title used when the backend sends neither `name` nor `title`.
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Artist used when no artist shape could be resolved.
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Popularity used when the backend omits it.
pub const DEFAULT_POPULARITY: u8 = 50;

/// External URL placeholder when no link is available.
pub const NO_EXTERNAL_URL: &str = "#";

const SPOTIFY_EMBED_TEMPLATE: &str = "https://open.spotify.com/embed/track/{id}";

/// A normalized song, produced from whatever shape the backend returned.
///
/// Every field is always populated; missing data degrades to the defaults
/// above or to an empty string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalSong {
    /// The record's own id, or its 1-based position in the source list.
    pub id: i64,

    /// Song title.
    pub title: String,

    /// Display artist.
    pub artist: String,

    /// Popularity score, 0 to 100.
    pub popularity: u8,

    /// Link to the song on the streaming service, or `"#"`.
    pub external_url: String,

    /// Platform track identifier used for playback. May be empty.
    pub track_id: String,

    /// Cover art URL. May be empty.
    pub cover_url: String,
}

impl CanonicalSong {
    /// Whether the song has a track identifier to play.
    pub fn has_track(&self) -> bool {
        !self.track_id.is_empty()
    }

    /// Whether the song has both a track identifier and cover art.
    pub fn is_playable(&self) -> bool {
        self.has_track() && !self.cover_url.is_empty()
    }

    /// Embeddable player URL for this track.
    pub fn spotify_embed_url(&self) -> Option<String> {
        if self.has_track() {
            Some(SPOTIFY_EMBED_TEMPLATE.replace("{id}", &self.track_id))
        } else {
            None
        }
    }
}

impl Default for CanonicalSong {
    fn default() -> Self {
        Self {
            id: 0,
            title: UNKNOWN_TITLE.to_string(),
            artist: UNKNOWN_ARTIST.to_string(),
            popularity: DEFAULT_POPULARITY,
            external_url: NO_EXTERNAL_URL.to_string(),
            track_id: String::new(),
            cover_url: String::new(),
        }
    }
}
