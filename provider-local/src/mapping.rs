//! Index rows to domain entities.
//!
//! Rows are loosely typed; a row without a usable `_id` is skipped with a
//! warning rather than failing the whole snapshot.

use bridge_traits::media_index::{columns, IndexCollection, IndexRow, IndexValue};
use core_library::models::{Album, Artist, Audio, AudioType, Genre, Reference};
use core_library::Result;
use tracing::warn;

use crate::uri::entity_uri;

pub const ALBUM_PROJECTION: &[&str] = &[
    columns::ID,
    columns::ALBUM,
    columns::ARTIST,
    columns::ARTIST_ID,
    columns::YEAR,
    columns::NUMBER_OF_TRACKS,
];

pub const ARTIST_PROJECTION: &[&str] = &[columns::ID, columns::ARTIST];

pub const GENRE_PROJECTION: &[&str] = &[columns::ID, columns::NAME];

pub const AUDIO_PROJECTION: &[&str] = &[
    columns::ID,
    columns::TITLE,
    columns::ALBUM,
    columns::ALBUM_ID,
    columns::ARTIST,
    columns::ARTIST_ID,
    columns::GENRE,
    columns::GENRE_ID,
    columns::MIME_TYPE,
    columns::DURATION,
    columns::TRACK,
    columns::YEAR,
    columns::IS_PODCAST,
    columns::IS_AUDIOBOOK,
    columns::IS_RECORDING,
];

const FALLBACK_MIME_TYPE: &str = "audio/*";

pub fn int(row: &IndexRow, column: &str) -> Option<i64> {
    row.get(column).and_then(IndexValue::as_i64)
}

pub fn text(row: &IndexRow, column: &str) -> Option<String> {
    row.get(column)
        .and_then(IndexValue::as_str)
        .map(str::to_string)
}

fn flag(row: &IndexRow, column: &str) -> bool {
    row.get(column)
        .and_then(IndexValue::as_bool)
        .unwrap_or(false)
}

fn year(row: &IndexRow) -> Option<i32> {
    int(row, columns::YEAR)
        .and_then(|year| i32::try_from(year).ok())
        .filter(|year| *year > 0)
}

fn id(collection: IndexCollection, row: &IndexRow) -> Option<i64> {
    let id = int(row, columns::ID);
    if id.is_none() {
        warn!(collection = collection.as_str(), "Skipping index row without an id");
    }
    id
}

fn reference(
    collection: IndexCollection,
    id: Option<i64>,
    name: Option<String>,
) -> Result<Option<Reference>> {
    id.map(|id| entity_uri(collection, id).map(|uri| Reference::new(uri, name)))
        .transpose()
}

/// Album without thumbnail; artwork is attached by the source.
pub fn album(row: &IndexRow) -> Result<Option<Album>> {
    let Some(id) = id(IndexCollection::Albums, row) else {
        return Ok(None);
    };
    Ok(Some(Album {
        uri: entity_uri(IndexCollection::Albums, id)?,
        title: text(row, columns::ALBUM).unwrap_or_default(),
        artist_uri: int(row, columns::ARTIST_ID)
            .map(|artist_id| entity_uri(IndexCollection::Artists, artist_id))
            .transpose()?,
        artist_name: text(row, columns::ARTIST),
        year: year(row),
        thumbnail: None,
    }))
}

pub fn artist(row: &IndexRow) -> Result<Option<Artist>> {
    let Some(id) = id(IndexCollection::Artists, row) else {
        return Ok(None);
    };
    Ok(Some(Artist {
        uri: entity_uri(IndexCollection::Artists, id)?,
        name: text(row, columns::ARTIST).unwrap_or_default(),
        thumbnail: None,
    }))
}

pub fn genre(row: &IndexRow) -> Result<Option<Genre>> {
    let Some(id) = id(IndexCollection::Genres, row) else {
        return Ok(None);
    };
    Ok(Some(Genre {
        uri: entity_uri(IndexCollection::Genres, id)?,
        name: text(row, columns::NAME).filter(|name| !name.is_empty()),
    }))
}

fn audio_type(row: &IndexRow) -> AudioType {
    if flag(row, columns::IS_PODCAST) {
        AudioType::Podcast
    } else if flag(row, columns::IS_AUDIOBOOK) {
        AudioType::Audiobook
    } else if flag(row, columns::IS_RECORDING) {
        AudioType::Recording
    } else {
        AudioType::Music
    }
}

/// Local audio plays from its identity URI.
pub fn audio(row: &IndexRow) -> Result<Option<Audio>> {
    let Some(id) = id(IndexCollection::Audio, row) else {
        return Ok(None);
    };
    let uri = entity_uri(IndexCollection::Audio, id)?;
    Ok(Some(Audio {
        playable_uri: uri.clone(),
        uri,
        mime_type: text(row, columns::MIME_TYPE).unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string()),
        title: text(row, columns::TITLE).unwrap_or_default(),
        audio_type: audio_type(row),
        duration_ms: int(row, columns::DURATION)
            .and_then(|ms| u64::try_from(ms).ok())
            .unwrap_or(0),
        artist: reference(
            IndexCollection::Artists,
            int(row, columns::ARTIST_ID),
            text(row, columns::ARTIST),
        )?,
        album: reference(
            IndexCollection::Albums,
            int(row, columns::ALBUM_ID),
            text(row, columns::ALBUM),
        )?,
        genre: reference(
            IndexCollection::Genres,
            int(row, columns::GENRE_ID),
            text(row, columns::GENRE),
        )?,
        track_number: int(row, columns::TRACK).and_then(|track| u32::try_from(track).ok()),
        year: year(row),
    }))
}

/// Map every row, dropping the ones without an id.
pub fn all<T>(rows: &[IndexRow], map: fn(&IndexRow) -> Result<Option<T>>) -> Result<Vec<T>> {
    let mut mapped = Vec::with_capacity(rows.len());
    for row in rows {
        if let Some(entity) = map(row)? {
            mapped.push(entity);
        }
    }
    Ok(mapped)
}
