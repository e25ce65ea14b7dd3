//! Identity URIs for remote entities: `{server}/{kind}/{id}`.
//!
//! The id is percent-encoded into a single path segment, so genre names
//! containing `/` or spaces survive the round trip.

use crate::error::{Result, SubsonicError};
use std::fmt;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Album,
    Artist,
    Audio,
    Genre,
    Playlist,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Album => "album",
            EntityKind::Artist => "artist",
            EntityKind::Audio => "audio",
            EntityKind::Genre => "genre",
            EntityKind::Playlist => "playlist",
        }
    }

    fn parse(segment: &str) -> Option<Self> {
        match segment {
            "album" => Some(EntityKind::Album),
            "artist" => Some(EntityKind::Artist),
            "audio" => Some(EntityKind::Audio),
            "genre" => Some(EntityKind::Genre),
            "playlist" => Some(EntityKind::Playlist),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds and parses identity URIs under one server base.
#[derive(Debug, Clone)]
pub struct UriScheme {
    /// Server URL without trailing slash
    base: String,
}

impl UriScheme {
    pub fn new(server: &Url) -> Self {
        Self {
            base: server.as_str().trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn entity_uri(&self, kind: EntityKind, id: &str) -> Result<Url> {
        let raw = format!("{}/{}/{}", self.base, kind, urlencoding::encode(id));
        Url::parse(&raw).map_err(|e| SubsonicError::InvalidUrl(format!("{}: {}", raw, e)))
    }

    /// True when `uri` is an entity identity under this server base.
    ///
    /// Only full identities count, so a server mounted below another one
    /// (`http://host` and `http://host/sub`) never claims the other's URIs.
    pub fn owns(&self, uri: &Url) -> bool {
        self.parse(uri).is_some()
    }

    /// Kind and decoded remote id, or `None` for foreign or malformed URIs.
    pub fn parse(&self, uri: &Url) -> Option<(EntityKind, String)> {
        let rest = uri.as_str().strip_prefix(self.base.as_str())?;
        let rest = rest.strip_prefix('/')?;
        let (kind, id) = rest.split_once('/')?;
        let kind = EntityKind::parse(kind)?;
        // Servers report untagged songs under a genre with an empty name.
        if (id.is_empty() && kind != EntityKind::Genre) || id.contains(['/', '?', '#']) {
            return None;
        }
        let id = urlencoding::decode(id).ok()?.into_owned();
        Some((kind, id))
    }

    /// Remote id of `uri` if it is an entity of `kind`.
    pub fn id_of(&self, uri: &Url, kind: EntityKind) -> Option<String> {
        match self.parse(uri) {
            Some((parsed, id)) if parsed == kind => Some(id),
            _ => None,
        }
    }
}
