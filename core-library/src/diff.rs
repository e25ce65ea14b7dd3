//! # Identity / Content Diffing
//!
//! List consumers match rows across refreshes with `same_identity` and only
//! then ask `same_content` whether the matched row needs re-rendering.
//! Identity looks at the URI alone; content looks at every displayed field.

use crate::models::{
    Album, AlbumDetail, Artist, ArtistDetail, Audio, Genre, GenreDetail, MediaItem, Playlist,
    PlaylistDetail, PlaylistMembership,
};

pub trait Diffable {
    fn same_identity(&self, other: &Self) -> bool;
    fn same_content(&self, other: &Self) -> bool;
}

macro_rules! diff_by_uri {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Diffable for $ty {
                fn same_identity(&self, other: &Self) -> bool {
                    self.uri == other.uri
                }

                fn same_content(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

diff_by_uri!(Album, Artist, Audio, Genre, Playlist);

impl Diffable for MediaItem {
    fn same_identity(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other) && self.uri() == other.uri()
    }

    fn same_content(&self, other: &Self) -> bool {
        self == other
    }
}

impl Diffable for AlbumDetail {
    fn same_identity(&self, other: &Self) -> bool {
        self.album.same_identity(&other.album)
    }

    fn same_content(&self, other: &Self) -> bool {
        self == other
    }
}

impl Diffable for ArtistDetail {
    fn same_identity(&self, other: &Self) -> bool {
        self.artist.same_identity(&other.artist)
    }

    fn same_content(&self, other: &Self) -> bool {
        self == other
    }
}

impl Diffable for GenreDetail {
    fn same_identity(&self, other: &Self) -> bool {
        self.genre.same_identity(&other.genre)
    }

    fn same_content(&self, other: &Self) -> bool {
        self == other
    }
}

impl Diffable for PlaylistDetail {
    fn same_identity(&self, other: &Self) -> bool {
        self.playlist.same_identity(&other.playlist)
    }

    fn same_content(&self, other: &Self) -> bool {
        self == other
    }
}

impl Diffable for PlaylistMembership {
    fn same_identity(&self, other: &Self) -> bool {
        self.playlist.same_identity(&other.playlist)
    }

    fn same_content(&self, other: &Self) -> bool {
        self == other
    }
}

/// One row-level change between two list snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListChange {
    /// `new[index]` has no counterpart in the old list.
    Inserted { index: usize },
    /// `old[index]` has no counterpart in the new list.
    Removed { index: usize },
    /// Same identity, different content.
    Changed { old_index: usize, new_index: usize },
    Unchanged { old_index: usize, new_index: usize },
}

/// Compare two snapshots row by row.
///
/// Each new row is matched against the first unmatched old row with the same
/// identity, so duplicate entries (a track listed twice) pair up in order.
/// `same_content` is only consulted for matched pairs. Removals are reported
/// last, in old-list order.
pub fn diff_lists<T: Diffable>(old: &[T], new: &[T]) -> Vec<ListChange> {
    let mut matched = vec![false; old.len()];
    let mut changes = Vec::with_capacity(new.len());

    for (new_index, item) in new.iter().enumerate() {
        let counterpart = old
            .iter()
            .enumerate()
            .find(|(old_index, candidate)| !matched[*old_index] && candidate.same_identity(item));

        match counterpart {
            Some((old_index, candidate)) => {
                matched[old_index] = true;
                if candidate.same_content(item) {
                    changes.push(ListChange::Unchanged {
                        old_index,
                        new_index,
                    });
                } else {
                    changes.push(ListChange::Changed {
                        old_index,
                        new_index,
                    });
                }
            }
            None => changes.push(ListChange::Inserted { index: new_index }),
        }
    }

    changes.extend(
        matched
            .iter()
            .enumerate()
            .filter(|(_, was_matched)| !**was_matched)
            .map(|(index, _)| ListChange::Removed { index }),
    );

    changes
}
