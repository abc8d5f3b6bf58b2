//! Catalog entities and mirror payload parsing
//!
//! Mirror payloads are parsed leniently: a malformed item is skipped and
//! logged, while a payload that is not JSON at all fails the whole sub-query.

use crate::failover::AttemptError;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;

/// Audio quality flags the UI displays; all other tags are discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum QualityTag {
    Lossless,
    HiResLossless,
    DolbyAtmos,
}

impl QualityTag {
    /// Map a mirror tag string to a known flag
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "LOSSLESS" => Some(QualityTag::Lossless),
            "HI_RES_LOSSLESS" | "HIRES_LOSSLESS" | "HI_RES" => Some(QualityTag::HiResLossless),
            "DOLBY_ATMOS" | "ATMOS" | "SPATIAL" => Some(QualityTag::DolbyAtmos),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTag::Lossless => "Lossless",
            QualityTag::HiResLossless => "Hi-Res",
            QualityTag::DolbyAtmos => "Dolby Atmos",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    /// Primary artist display name
    pub artist: String,
    pub album: Option<String>,
    /// Opaque cover-art identifier (see [`crate::art`])
    pub cover: Option<String>,
    pub duration_secs: Option<u32>,
    pub explicit: bool,
    pub quality: BTreeSet<QualityTag>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Album {
    pub id: String,
    pub title: String,
    /// Primary artist display name
    pub artist: String,
    pub cover: Option<String>,
    pub release_date: Option<String>,
    pub track_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
    pub picture: Option<String>,
}

/// One mirror's answer to the three sub-queries
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPage {
    pub tracks: Vec<Track>,
    pub albums: Vec<Album>,
    pub artists: Vec<Artist>,
}

// ============================================================================
// Parsing
// ============================================================================

pub fn parse_tracks(body: &str) -> Result<Vec<Track>, AttemptError> {
    parse_section(body, "tracks", parse_track)
}

pub fn parse_albums(body: &str) -> Result<Vec<Album>, AttemptError> {
    parse_section(body, "albums", parse_album)
}

pub fn parse_artists(body: &str) -> Result<Vec<Artist>, AttemptError> {
    parse_section(body, "artists", parse_artist)
}

fn parse_section<T>(
    body: &str,
    section: &str,
    parse_item: fn(&Value) -> Option<T>,
) -> Result<Vec<T>, AttemptError> {
    let payload: Value = serde_json::from_str(body)
        .map_err(|e| AttemptError::Invalid(format!("{} payload: {}", section, e)))?;

    let Some(items) = find_items(&payload, section) else {
        return Ok(Vec::new());
    };

    let mut parsed = Vec::with_capacity(items.len());
    for item in items {
        match parse_item(item) {
            Some(value) => parsed.push(value),
            None => debug!(section, "Skipping malformed item"),
        }
    }

    Ok(parsed)
}

/// Locate the item array inside the envelopes mirrors are known to use
fn find_items<'a>(payload: &'a Value, section: &str) -> Option<&'a Vec<Value>> {
    if let Some(items) = payload.as_array() {
        return Some(items);
    }

    let roots = [Some(payload), payload.get("data")];
    for root in roots.into_iter().flatten() {
        let candidates = [
            root.get("items"),
            root.get(section).and_then(|s| s.get("items")),
            root.get(section),
        ];
        if let Some(items) = candidates.into_iter().flatten().find_map(Value::as_array) {
            return Some(items);
        }
    }

    None
}

/// Ids arrive as strings or numbers depending on the mirror
fn id_field(item: &Value) -> Option<String> {
    match item.get("id")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn str_field(item: &Value, key: &str) -> Option<String> {
    item.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn u32_field(item: &Value, key: &str) -> Option<u32> {
    item.get(key)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
}

/// `artist.name`, else the first entry of `artists[]`
fn primary_artist(item: &Value) -> Option<String> {
    item.get("artist")
        .and_then(|a| str_field(a, "name"))
        .or_else(|| {
            item.get("artists")
                .and_then(Value::as_array)
                .and_then(|list| list.iter().find_map(|a| str_field(a, "name")))
        })
}

/// Quality flags from `audioQuality`, `audioModes` and `mediaMetadata.tags`
fn quality_tags(item: &Value) -> BTreeSet<QualityTag> {
    let mut tags = BTreeSet::new();

    if let Some(quality) = item.get("audioQuality").and_then(Value::as_str) {
        tags.extend(QualityTag::from_tag(quality));
    }

    let nested = item.get("mediaMetadata").and_then(|m| m.get("tags"));
    for list in [item.get("audioModes"), nested].into_iter().flatten() {
        if let Some(values) = list.as_array() {
            tags.extend(values.iter().filter_map(Value::as_str).filter_map(QualityTag::from_tag));
        }
    }

    tags
}

fn parse_track(item: &Value) -> Option<Track> {
    let album = item.get("album");
    Some(Track {
        id: id_field(item)?,
        title: str_field(item, "title")?,
        artist: primary_artist(item).unwrap_or_default(),
        album: album.and_then(|a| str_field(a, "title")),
        cover: album.and_then(|a| str_field(a, "cover")),
        duration_secs: u32_field(item, "duration"),
        explicit: item.get("explicit").and_then(Value::as_bool).unwrap_or(false),
        quality: quality_tags(item),
    })
}

fn parse_album(item: &Value) -> Option<Album> {
    Some(Album {
        id: id_field(item)?,
        title: str_field(item, "title")?,
        artist: primary_artist(item).unwrap_or_default(),
        cover: str_field(item, "cover"),
        release_date: str_field(item, "releaseDate"),
        track_count: u32_field(item, "numberOfTracks"),
    })
}

fn parse_artist(item: &Value) -> Option<Artist> {
    Some(Artist {
        id: id_field(item)?,
        name: str_field(item, "name")?,
        picture: str_field(item, "picture"),
    })
}
