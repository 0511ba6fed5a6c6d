//! Catalog search response models.
//!
//! The gateway passes the upstream provider's payload through untouched, so
//! these types follow the Deezer `search` schema: a `data` array of tracks with
//! nested `artist` and `album` objects.

use serde::{Deserialize, Deserializer, Serialize};

/// Root object returned by `GET /api/search`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub data: Vec<Track>,
    /// Providers report some failures in-band with a success status.
    pub error: Option<serde_json::Value>,
}

/// A single track descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    /// Full track length in seconds (not the preview length).
    #[serde(default)]
    pub duration: Option<u32>,
    /// Preview clip URL; empty or absent when the provider has none.
    #[serde(default)]
    pub preview: Option<String>,
    pub artist: ArtistRef,
    #[serde(default)]
    pub album: Option<AlbumRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlbumRef {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub cover_medium: Option<String>,
}

impl Track {
    /// Preview URL, if the track has a usable one.
    pub fn preview_url(&self) -> Option<&str> {
        self.preview
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Cover image URL, preferring the medium rendition.
    pub fn cover_url(&self) -> Option<&str> {
        let album = self.album.as_ref()?;
        album
            .cover_medium
            .as_deref()
            .or(album.cover.as_deref())
            .filter(|url| !url.is_empty())
    }

    pub fn display_artist(&self) -> &str {
        if self.artist.name.is_empty() {
            "Unknown Artist"
        } else {
            &self.artist.name
        }
    }

    pub fn display_album(&self) -> &str {
        self.album
            .as_ref()
            .and_then(|a| a.title.as_deref())
            .unwrap_or("Unknown Album")
    }
}

/// Accept ids encoded either as JSON numbers or strings.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Number(i64),
        Text(String),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Number(n) => n.to_string(),
        Id::Text(s) => s,
    })
}
