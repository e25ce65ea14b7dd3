//! Identity URIs for entities of the device media index.
//!
//! `content://media/external/audio/{albums|artists|genres|media}/{id}`

use bridge_traits::media_index::IndexCollection;
use core_library::{LibraryError, Result};
use url::Url;

pub const SCHEME: &str = "content";
pub const AUTHORITY: &str = "media";
pub const BASE_PATH: &str = "/external/audio/";

const COLLECTIONS: [IndexCollection; 4] = [
    IndexCollection::Albums,
    IndexCollection::Artists,
    IndexCollection::Genres,
    IndexCollection::Audio,
];

pub fn entity_uri(collection: IndexCollection, id: i64) -> Result<Url> {
    let raw = format!(
        "{}://{}{}{}/{}",
        SCHEME,
        AUTHORITY,
        BASE_PATH,
        collection.as_str(),
        id
    );
    Url::parse(&raw).map_err(|e| LibraryError::invalid_input("uri", e.to_string()))
}

/// True for any URI under the local index prefix.
pub fn owns(uri: &Url) -> bool {
    uri.scheme() == SCHEME
        && uri.host_str() == Some(AUTHORITY)
        && uri.path().starts_with(BASE_PATH)
}

pub fn parse(uri: &Url) -> Option<(IndexCollection, i64)> {
    if !owns(uri) {
        return None;
    }
    let rest = &uri.path()[BASE_PATH.len()..];
    let (segment, id) = rest.split_once('/')?;
    let collection = COLLECTIONS
        .into_iter()
        .find(|collection| collection.as_str() == segment)?;
    let id = id.parse().ok()?;
    Some((collection, id))
}

/// Numeric id of `uri` when it names an entity of `collection`.
pub fn id_of(uri: &Url, collection: IndexCollection) -> Option<i64> {
    parse(uri)
        .filter(|(found, _)| *found == collection)
        .map(|(_, id)| id)
}
