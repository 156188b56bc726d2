//! JSON to song converters.
//!
//! The backend does not commit to a response shape: the song list may be the
//! top-level value or sit under one of several keys, and each song spells its
//! fields in several ways. The functions here turn any of those shapes into
//! [`CanonicalSong`] records. They never fail; missing or wrongly typed
//! fields degrade to defaults.

use serde_json::Value;

use crate::models::song::{
    CanonicalSong, DEFAULT_POPULARITY, NO_EXTERNAL_URL, UNKNOWN_ARTIST, UNKNOWN_TITLE,
};

/// Keys checked, in order, for the song list inside an object payload.
pub const LIST_KEYS: [&str; 5] = ["recommendations", "songs", "data", "items", "results"];

/// Marker preceding the track identifier in a streaming-service URL.
const TRACK_PATH_MARKER: &str = "/track/";

/// Which normalized songs a caller wants to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SongFilter {
    /// Keep every record.
    #[default]
    All,
    /// Drop records without a track identifier or cover art.
    Playable,
}

impl SongFilter {
    /// Apply the filter to a list of normalized songs.
    pub fn apply(self, songs: Vec<CanonicalSong>) -> Vec<CanonicalSong> {
        match self {
            SongFilter::All => songs,
            SongFilter::Playable => filter_playable(songs),
        }
    }
}

/// Normalize an arbitrary payload into an ordered list of songs.
pub fn normalize(payload: &Value) -> Vec<CanonicalSong> {
    locate_song_list(payload)
        .iter()
        .enumerate()
        .map(|(index, raw)| parse_song(raw, index + 1))
        .collect()
}

/// Normalize a payload and apply a post-filter.
pub fn normalize_with(payload: &Value, filter: SongFilter) -> Vec<CanonicalSong> {
    filter.apply(normalize(payload))
}

/// Keep only songs that have both a track identifier and cover art.
pub fn filter_playable(songs: Vec<CanonicalSong>) -> Vec<CanonicalSong> {
    songs.into_iter().filter(|s| s.is_playable()).collect()
}

/// Find the song list inside a payload.
///
/// A top-level array is used as-is. For objects, the [`LIST_KEYS`] are tried
/// in priority order, then the first array-valued property in document order.
/// Anything else yields an empty slice.
pub fn locate_song_list(payload: &Value) -> &[Value] {
    match payload {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => LIST_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(|v| v.as_array()))
            .or_else(|| map.values().find_map(|v| v.as_array()))
            .map(|items| items.as_slice())
            .unwrap_or(&[]),
        _ => &[],
    }
}

/// Convert one raw song entry. `position` is 1-based.
pub fn parse_song(raw: &Value, position: usize) -> CanonicalSong {
    let external_url = extract_external_url(raw);

    let track_id = first_str(raw, &["spotifyTrackId", "spotify_id", "track_id", "trackId"])
        .or_else(|| extract_track_id(&external_url))
        .unwrap_or_default()
        .to_string();

    CanonicalSong {
        id: get_id(raw).unwrap_or(position as i64),
        title: first_str(raw, &["name", "title"])
            .unwrap_or(UNKNOWN_TITLE)
            .to_string(),
        artist: extract_artist(raw).unwrap_or(UNKNOWN_ARTIST).to_string(),
        popularity: get_popularity(raw).unwrap_or(DEFAULT_POPULARITY),
        track_id,
        cover_url: first_str(raw, &["album_cover", "cover", "image", "coverUrl"])
            .unwrap_or_default()
            .to_string(),
        external_url,
    }
}

/// Pull the track identifier out of a URL like `https://host/track/<id>?si=...`.
pub fn extract_track_id(url: &str) -> Option<&str> {
    let start = url.find(TRACK_PATH_MARKER)? + TRACK_PATH_MARKER.len();
    let rest = &url[start..];
    let end = rest.find(['?', '#', '/']).unwrap_or(rest.len());
    let id = &rest[..end];
    (!id.is_empty()).then_some(id)
}

/// Resolve the display artist from the shapes the backend uses.
fn extract_artist(raw: &Value) -> Option<&str> {
    if let Some(artist) = non_empty_str(raw.get("artist")) {
        return Some(artist);
    }

    match raw.get("artists")? {
        Value::Array(artists) => match artists.first()? {
            Value::Object(first) => non_empty_str(first.get("name")),
            Value::String(name) if !name.is_empty() => Some(name.as_str()),
            _ => None,
        },
        Value::String(name) if !name.is_empty() => Some(name.as_str()),
        Value::Object(artist) => non_empty_str(artist.get("name")),
        _ => None,
    }
}

fn extract_external_url(raw: &Value) -> String {
    non_empty_str(raw.get("external_urls").and_then(|u| u.get("spotify")))
        .or_else(|| first_str(raw, &["spotifyUrl", "spotify_url", "url", "externalUrl"]))
        .unwrap_or(NO_EXTERNAL_URL)
        .to_string()
}

/// Get the record's id (handles both numeric and numeric-string ids).
fn get_id(raw: &Value) -> Option<i64> {
    match raw.get("id")? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Get popularity clamped to 0-100.
fn get_popularity(raw: &Value) -> Option<u8> {
    let value = match raw.get("popularity")? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    if value.is_nan() {
        return None;
    }
    Some(value.round().clamp(0.0, 100.0) as u8)
}

/// First non-empty string among `keys`.
fn first_str<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| non_empty_str(raw.get(*key)))
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(|v| v.as_str()).filter(|s| !s.is_empty())
}
