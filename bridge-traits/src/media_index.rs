//! Device Media Index Abstraction
//!
//! The host exposes its on-device media catalogue (a content index maintained
//! by the platform) as four queryable collections. Rows are projected into
//! loosely typed column maps, mirroring a cursor over a content provider.
//!
//! Hosts also publish a change notification per collection so that the core
//! can re-query when the index is rescanned.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::broadcast;

use crate::error::Result;

/// Column names every host index must understand.
pub mod columns {
    pub const ID: &str = "_id";
    pub const TITLE: &str = "title";
    pub const NAME: &str = "name";
    pub const ALBUM: &str = "album";
    pub const ALBUM_ID: &str = "album_id";
    pub const ARTIST: &str = "artist";
    pub const ARTIST_ID: &str = "artist_id";
    pub const GENRE: &str = "genre";
    pub const GENRE_ID: &str = "genre_id";
    pub const MIME_TYPE: &str = "mime_type";
    pub const DURATION: &str = "duration";
    pub const TRACK: &str = "track";
    pub const YEAR: &str = "year";
    pub const NUMBER_OF_TRACKS: &str = "number_of_tracks";
    pub const IS_MUSIC: &str = "is_music";
    pub const IS_PODCAST: &str = "is_podcast";
    pub const IS_AUDIOBOOK: &str = "is_audiobook";
    pub const IS_RECORDING: &str = "is_recording";
}

/// One of the collections maintained by the host index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexCollection {
    Albums,
    Artists,
    Genres,
    Audio,
}

impl IndexCollection {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexCollection::Albums => "albums",
            IndexCollection::Artists => "artists",
            IndexCollection::Genres => "genres",
            IndexCollection::Audio => "media",
        }
    }
}

/// A single cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IndexValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl IndexValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            IndexValue::Integer(i) => Some(*i),
            IndexValue::Real(r) => Some(*r as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            IndexValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Non-zero integers are true, like SQLite booleans.
    pub fn as_bool(&self) -> Option<bool> {
        self.as_i64().map(|v| v != 0)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, IndexValue::Null)
    }

    fn compare(&self, other: &IndexValue) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (IndexValue::Integer(a), IndexValue::Integer(b)) => Some(a.cmp(b)),
            (IndexValue::Text(a), IndexValue::Text(b)) => Some(a.cmp(b)),
            (a, b) => {
                let a = match a {
                    IndexValue::Integer(i) => *i as f64,
                    IndexValue::Real(r) => *r,
                    _ => return None,
                };
                let b = match b {
                    IndexValue::Integer(i) => *i as f64,
                    IndexValue::Real(r) => *r,
                    _ => return None,
                };
                a.partial_cmp(&b)
            }
        }
    }
}

impl From<i64> for IndexValue {
    fn from(value: i64) -> Self {
        IndexValue::Integer(value)
    }
}

impl From<&str> for IndexValue {
    fn from(value: &str) -> Self {
        IndexValue::Text(value.to_string())
    }
}

impl From<String> for IndexValue {
    fn from(value: String) -> Self {
        IndexValue::Text(value)
    }
}

impl From<bool> for IndexValue {
    fn from(value: bool) -> Self {
        IndexValue::Integer(value as i64)
    }
}

/// A projected row
pub type IndexRow = HashMap<String, IndexValue>;

/// Typed filter applied by the host when evaluating a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Eq(String, IndexValue),
    NotEq(String, IndexValue),
    In(String, Vec<IndexValue>),
    /// Case-insensitive substring match on a text column.
    Contains(String, String),
    GreaterThan(String, IndexValue),
    And(Vec<Selection>),
}

impl Selection {
    pub fn eq(column: &str, value: impl Into<IndexValue>) -> Self {
        Selection::Eq(column.to_string(), value.into())
    }

    pub fn not_eq(column: &str, value: impl Into<IndexValue>) -> Self {
        Selection::NotEq(column.to_string(), value.into())
    }

    pub fn contains(column: &str, needle: impl Into<String>) -> Self {
        Selection::Contains(column.to_string(), needle.into())
    }

    pub fn and(self, other: Selection) -> Self {
        match self {
            Selection::And(mut all) => {
                all.push(other);
                Selection::And(all)
            }
            first => Selection::And(vec![first, other]),
        }
    }

    /// Evaluate the selection against a row.
    ///
    /// Hosts backed by SQL translate the selection instead; this is the
    /// reference semantics for in-memory indexes. A missing column never
    /// matches.
    pub fn matches(&self, row: &IndexRow) -> bool {
        match self {
            Selection::Eq(column, value) => row.get(column).is_some_and(|v| v == value),
            Selection::NotEq(column, value) => row.get(column).is_some_and(|v| v != value),
            Selection::In(column, values) => row
                .get(column)
                .is_some_and(|v| values.iter().any(|candidate| candidate == v)),
            Selection::Contains(column, needle) => row
                .get(column)
                .and_then(IndexValue::as_str)
                .is_some_and(|text| text.to_lowercase().contains(&needle.to_lowercase())),
            Selection::GreaterThan(column, value) => row
                .get(column)
                .and_then(|v| v.compare(value))
                .is_some_and(|ordering| ordering.is_gt()),
            Selection::And(all) => all.iter().all(|selection| selection.matches(row)),
        }
    }
}

/// Sort order for a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub descending: bool,
}

impl SortKey {
    pub fn ascending(column: &str) -> Self {
        Self {
            column: column.to_string(),
            descending: false,
        }
    }
}

/// A query against one collection
#[derive(Debug, Clone, PartialEq)]
pub struct IndexQuery {
    pub collection: IndexCollection,
    pub projection: Vec<&'static str>,
    pub selection: Option<Selection>,
    pub sort: Option<SortKey>,
}

impl IndexQuery {
    pub fn new(collection: IndexCollection, projection: &[&'static str]) -> Self {
        Self {
            collection,
            projection: projection.to_vec(),
            selection: None,
            sort: None,
        }
    }

    pub fn select(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn sort_by(mut self, column: &str) -> Self {
        self.sort = Some(SortKey::ascending(column));
        self
    }
}

/// Host media index
///
/// # Example
///
/// ```ignore
/// use bridge_traits::media_index::{columns, IndexCollection, IndexQuery, MediaIndex, Selection};
///
/// async fn album_titles(index: &dyn MediaIndex) -> Result<Vec<String>> {
///     let rows = index
///         .query(IndexQuery::new(IndexCollection::Albums, &[columns::ID, columns::ALBUM]))
///         .await?;
///     Ok(rows.iter().filter_map(|r| r.get(columns::ALBUM)?.as_str().map(String::from)).collect())
/// }
/// ```
#[async_trait]
pub trait MediaIndex: Send + Sync {
    /// Run a one-shot query and return the projected rows.
    async fn query(&self, query: IndexQuery) -> Result<Vec<IndexRow>>;

    /// Subscribe to change notifications. Each message names the collection
    /// that changed; receivers that lag may miss intermediate messages.
    fn subscribe_changes(&self) -> broadcast::Receiver<IndexCollection>;

    /// Load the encoded artwork referenced by `uri`, if any.
    async fn load_thumbnail(&self, uri: &str) -> Result<Option<Bytes>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, IndexValue)]) -> IndexRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_index_value_accessors() {
        assert_eq!(IndexValue::Integer(42).as_i64(), Some(42));
        assert_eq!(IndexValue::Real(3.9).as_i64(), Some(3));
        assert_eq!(IndexValue::from("hello").as_str(), Some("hello"));
        assert_eq!(IndexValue::Integer(0).as_bool(), Some(false));
        assert_eq!(IndexValue::from(true).as_bool(), Some(true));
        assert!(IndexValue::Null.is_null());
        assert_eq!(IndexValue::Null.as_str(), None);
    }

    #[test]
    fn test_selection_contains_is_case_insensitive() {
        let r = row(&[(columns::TITLE, "Kind of Blue".into())]);
        assert!(Selection::contains(columns::TITLE, "kind OF").matches(&r));
        assert!(!Selection::contains(columns::TITLE, "green").matches(&r));
        assert!(!Selection::contains(columns::ALBUM, "kind").matches(&r));
    }

    #[test]
    fn test_selection_in_and_not_eq() {
        let r = row(&[
            (columns::ALBUM_ID, 7.into()),
            (columns::ARTIST_ID, 2.into()),
        ]);
        let selection = Selection::In(columns::ALBUM_ID.into(), vec![5.into(), 7.into()])
            .and(Selection::not_eq(columns::ARTIST_ID, 3));
        assert!(selection.matches(&r));

        let excluded = Selection::In(columns::ALBUM_ID.into(), vec![7.into()])
            .and(Selection::not_eq(columns::ARTIST_ID, 2));
        assert!(!excluded.matches(&r));
    }

    #[test]
    fn test_selection_greater_than_mixes_numeric_types() {
        let r = row(&[(columns::DURATION, IndexValue::Real(1500.5))]);
        assert!(Selection::GreaterThan(columns::DURATION.into(), 1500.into()).matches(&r));
        assert!(!Selection::GreaterThan(columns::DURATION.into(), 2000.into()).matches(&r));
        assert!(!Selection::GreaterThan(columns::DURATION.into(), "x".into()).matches(&r));
    }

    #[test]
    fn test_query_builder() {
        let query = IndexQuery::new(IndexCollection::Audio, &[columns::ID, columns::TITLE])
            .select(Selection::eq(columns::ALBUM_ID, 1))
            .sort_by(columns::TRACK);
        assert_eq!(query.collection.as_str(), "media");
        assert_eq!(query.projection, vec![columns::ID, columns::TITLE]);
        assert_eq!(query.sort, Some(SortKey::ascending(columns::TRACK)));
        assert!(query.selection.is_some());
    }
}
