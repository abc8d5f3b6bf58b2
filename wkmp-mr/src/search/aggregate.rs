//! Deduplicating search result aggregate

use super::model::{Album, Artist, SearchPage, Track};
use std::collections::HashSet;

/// Results of one (or several merged) catalog searches
///
/// Tracks keep the order mirrors returned them in and are never deduplicated;
/// ordering carries ranking signal from the backend. Albums and artists are
/// deduplicated on insert by normalized key, first occurrence wins.
#[derive(Debug, Clone, Default)]
pub struct SearchAggregate {
    tracks: Vec<Track>,
    albums: Vec<Album>,
    artists: Vec<Artist>,
    album_keys: HashSet<String>,
    artist_keys: HashSet<String>,
}

impl SearchAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn albums(&self) -> &[Album] {
        &self.albums
    }

    pub fn artists(&self) -> &[Artist] {
        &self.artists
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty() && self.albums.is_empty() && self.artists.is_empty()
    }

    pub fn push_track(&mut self, track: Track) {
        self.tracks.push(track);
    }

    /// Insert unless an album with the same key exists; true if inserted
    pub fn push_album(&mut self, album: Album) -> bool {
        let inserted = self.album_keys.insert(album_key(&album.title, &album.artist));
        if inserted {
            self.albums.push(album);
        }
        inserted
    }

    /// Insert unless an artist with the same key exists; true if inserted
    pub fn push_artist(&mut self, artist: Artist) -> bool {
        let inserted = self.artist_keys.insert(artist_key(&artist.name));
        if inserted {
            self.artists.push(artist);
        }
        inserted
    }

    /// Merge one mirror's page
    pub fn absorb(&mut self, page: SearchPage) {
        for track in page.tracks {
            self.push_track(track);
        }
        for album in page.albums {
            self.push_album(album);
        }
        for artist in page.artists {
            self.push_artist(artist);
        }
    }
}

/// Lowercase with runs of whitespace collapsed
fn normalize(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// `title:primary artist`, normalized
pub fn album_key(title: &str, artist: &str) -> String {
    format!("{}:{}", normalize(title), normalize(artist))
}

pub fn artist_key(name: &str) -> String {
    normalize(name)
}
