use std::sync::Arc;

use arrow::datatypes::{DataType, Field, FieldRef};
use serde::{Deserialize, Serialize};

use crate::ProducerError;

// Catalog search payload, only the parts the producer projects

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub tracks: Page<CatalogTrack>
}

#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: Option<u32>
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogArtist {
    pub name: String
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogAlbum {
    pub name: String,
    pub release_date: String
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogTrack {
    pub id: String,
    pub name: String,
    pub popularity: u32,
    pub duration_ms: u64,
    pub artists: Vec<CatalogArtist>,
    pub album: CatalogAlbum
}

/// One row of the raw batch. Field order is the column order of the csv
/// and must line up with the loader's Id, Artist, Song_Name, Plays, Album,
/// Duration, Release_Date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub id: String,
    pub artist: String,
    pub song_name: String,
    pub plays: i64,
    pub album: String,
    pub duration: i64,
    pub release_date: String
}

pub const TRACK_COLUMNS: [&str; 7] = [
    "id", "artist", "song_name", "plays", "album", "duration", "release_date"
];

impl TrackRecord {
    /// Projects a search hit, keeping the first artist and whole seconds
    pub fn from_catalog(track: &CatalogTrack) -> Result<Self, ProducerError> {
        let artist = track.artists.first()
            .map(|a| a.name.clone())
            .ok_or_else(|| ProducerError::Parse(
                format!("track {} has no artists", track.id)
            ))?;

        Ok( Self {
            id: track.id.clone(),
            artist,
            song_name: track.name.clone(),
            plays: i64::from(track.popularity),
            album: track.album.name.clone(),
            duration: (track.duration_ms / 1000) as i64,
            release_date: track.album.release_date.clone()
        })
    }

    /// Arrow fields in csv column order
    pub fn fields() -> Vec<FieldRef> {
        TRACK_COLUMNS.iter()
            .map(|name| {
                let data_type = match *name {
                    "plays" | "duration" => DataType::Int64,
                    _ => DataType::Utf8
                };
                Arc::new(Field::new(*name, data_type, false))
            })
            .collect()
    }
}

/// What a run hands back to its caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationResult {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String
}

impl InvocationResult {
    pub fn success(body: impl Into<String>) -> Self {
        Self { status_code: 200, body: body.into() }
    }
}
