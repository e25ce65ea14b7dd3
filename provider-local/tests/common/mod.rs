//! In-memory media index used by the local source tests.
#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::media_index::{
    columns, IndexCollection, IndexQuery, IndexRow, IndexValue, MediaIndex,
};
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::broadcast;

#[derive(Default)]
struct State {
    rows: HashMap<IndexCollection, Vec<IndexRow>>,
    thumbnails: HashMap<String, Bytes>,
    queries: Vec<IndexQuery>,
    thumbnail_loads: usize,
    failing: bool,
}

pub struct MemoryIndex {
    state: Mutex<State>,
    changes: broadcast::Sender<IndexCollection>,
}

fn row(pairs: Vec<(&str, IndexValue)>) -> IndexRow {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn sort_key(row: &IndexRow, column: &str) -> (Option<i64>, Option<String>) {
    match row.get(column) {
        Some(value) => (value.as_i64(), value.as_str().map(str::to_lowercase)),
        None => (None, None),
    }
}

impl MemoryIndex {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            state: Mutex::new(State::default()),
            changes,
        }
    }

    fn insert(&self, collection: IndexCollection, row: IndexRow) {
        self.state
            .lock()
            .unwrap()
            .rows
            .entry(collection)
            .or_default()
            .push(row);
    }

    pub fn add_album(&self, id: i64, title: &str, artist_id: i64, artist: &str, tracks: i64) {
        self.insert(
            IndexCollection::Albums,
            row(vec![
                (columns::ID, id.into()),
                (columns::ALBUM, title.into()),
                (columns::ARTIST_ID, artist_id.into()),
                (columns::ARTIST, artist.into()),
                (columns::NUMBER_OF_TRACKS, tracks.into()),
            ]),
        );
    }

    pub fn add_artist(&self, id: i64, name: &str) {
        self.insert(
            IndexCollection::Artists,
            row(vec![(columns::ID, id.into()), (columns::ARTIST, name.into())]),
        );
    }

    pub fn add_genre(&self, id: i64, name: &str) {
        self.insert(
            IndexCollection::Genres,
            row(vec![(columns::ID, id.into()), (columns::NAME, name.into())]),
        );
    }

    pub fn add_audio(
        &self,
        id: i64,
        title: &str,
        album_id: i64,
        artist_id: i64,
        genre_id: i64,
        track: i64,
    ) {
        self.insert(
            IndexCollection::Audio,
            row(vec![
                (columns::ID, id.into()),
                (columns::TITLE, title.into()),
                (columns::ALBUM_ID, album_id.into()),
                (columns::ARTIST_ID, artist_id.into()),
                (columns::GENRE_ID, genre_id.into()),
                (columns::TRACK, track.into()),
                (columns::DURATION, (track * 1000).into()),
                (columns::MIME_TYPE, "audio/mpeg".into()),
            ]),
        );
    }

    pub fn remove(&self, collection: IndexCollection, id: i64) {
        let mut state = self.state.lock().unwrap();
        if let Some(rows) = state.rows.get_mut(&collection) {
            rows.retain(|row| row.get(columns::ID) != Some(&IndexValue::Integer(id)));
        }
    }

    pub fn set_thumbnail(&self, uri: &str, bytes: Vec<u8>) {
        self.state
            .lock()
            .unwrap()
            .thumbnails
            .insert(uri.to_string(), Bytes::from(bytes));
    }

    pub fn notify(&self, collection: IndexCollection) {
        let _ = self.changes.send(collection);
    }

    pub fn fail_queries(&self) {
        self.state.lock().unwrap().failing = true;
    }

    pub fn queries(&self, collection: IndexCollection) -> usize {
        self.state
            .lock()
            .unwrap()
            .queries
            .iter()
            .filter(|query| query.collection == collection)
            .count()
    }

    pub fn thumbnail_loads(&self) -> usize {
        self.state.lock().unwrap().thumbnail_loads
    }
}

#[async_trait]
impl MediaIndex for MemoryIndex {
    async fn query(&self, query: IndexQuery) -> BridgeResult<Vec<IndexRow>> {
        let mut state = self.state.lock().unwrap();
        state.queries.push(query.clone());
        if state.failing {
            return Err(BridgeError::Index("cursor closed".into()));
        }

        let mut rows: Vec<IndexRow> = state
            .rows
            .get(&query.collection)
            .into_iter()
            .flatten()
            .filter(|row| query.selection.as_ref().map_or(true, |s| s.matches(row)))
            .map(|row| {
                row.iter()
                    .filter(|(column, _)| query.projection.contains(&column.as_str()))
                    .map(|(column, value)| (column.clone(), value.clone()))
                    .collect()
            })
            .collect();

        if let Some(sort) = &query.sort {
            rows.sort_by(|a, b| sort_key(a, &sort.column).cmp(&sort_key(b, &sort.column)));
            if sort.descending {
                rows.reverse();
            }
        }
        Ok(rows)
    }

    fn subscribe_changes(&self) -> broadcast::Receiver<IndexCollection> {
        self.changes.subscribe()
    }

    async fn load_thumbnail(&self, uri: &str) -> BridgeResult<Option<Bytes>> {
        let mut state = self.state.lock().unwrap();
        state.thumbnail_loads += 1;
        Ok(state.thumbnails.get(uri).cloned())
    }
}
