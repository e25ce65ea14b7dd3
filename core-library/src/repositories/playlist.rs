//! Device-side playlists, independent of any remote server.
//!
//! Items are stored once and referenced by position from each playlist that
//! contains them, so the same audio may appear several times in one list.
//! Items that are no longer referenced and were never played are dropped in
//! the same transaction that orphaned them.

use crate::error::{LibraryError, Result};
use crate::models::Audio;
use async_trait::async_trait;
use bridge_traits::Clock;
use sqlx::{query, query_as, FromRow, Sqlite, SqlitePool, Transaction};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct LocalPlaylist {
    pub id: i64,
    pub name: String,
    pub track_count: i64,
    pub created_at: i64,
    pub last_modified: i64,
}

/// A playlist entry's display data, keyed by the audio URI.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct PlaylistItem {
    pub uri: String,
    pub title: String,
    pub artist_name: Option<String>,
    pub album_name: Option<String>,
    pub duration_ms: i64,
    pub last_played: Option<i64>,
}

impl PlaylistItem {
    pub fn from_audio(audio: &Audio) -> Self {
        Self {
            uri: audio.uri.to_string(),
            title: audio.title.clone(),
            artist_name: audio.artist.as_ref().and_then(|r| r.name.clone()),
            album_name: audio.album.as_ref().and_then(|r| r.name.clone()),
            duration_ms: i64::try_from(audio.duration_ms).unwrap_or(i64::MAX),
            last_played: None,
        }
    }
}

#[async_trait]
pub trait PlaylistStore: Send + Sync {
    /// # Errors
    /// `AlreadyExists` when another playlist has this name.
    async fn create(&self, name: &str) -> Result<LocalPlaylist>;

    async fn rename(&self, playlist_id: i64, name: &str) -> Result<()>;

    /// Returns `false` when the playlist did not exist.
    async fn delete(&self, playlist_id: i64) -> Result<bool>;

    /// Append `item` at the end of the playlist.
    async fn add_item(&self, playlist_id: i64, item: &PlaylistItem) -> Result<()>;

    /// Remove every occurrence of `uri`. Returns how many entries went away.
    async fn remove_item(&self, playlist_id: i64, uri: &str) -> Result<u64>;

    /// Entries in playlist order.
    async fn items(&self, playlist_id: i64) -> Result<Vec<PlaylistItem>>;

    async fn playlists(&self) -> Result<Vec<LocalPlaylist>>;

    /// Record a play. Played items outlive the playlists that held them.
    async fn mark_played(&self, uri: &str) -> Result<()>;
}

pub struct SqlitePlaylistStore {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl SqlitePlaylistStore {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }
}

fn validate_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(LibraryError::invalid_input(
            "name",
            "playlist name must not be empty",
        ));
    }
    Ok(trimmed)
}

fn map_unique_violation(err: sqlx::Error, name: &str) -> LibraryError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => LibraryError::AlreadyExists {
            entity_type: "Playlist".to_string(),
            id: name.to_string(),
        },
        _ => LibraryError::Database(err),
    }
}

async fn ensure_playlist(tx: &mut Transaction<'_, Sqlite>, playlist_id: i64) -> Result<()> {
    let found: Option<(i64,)> = query_as("SELECT id FROM local_playlists WHERE id = ?")
        .bind(playlist_id)
        .fetch_optional(&mut **tx)
        .await?;
    match found {
        Some(_) => Ok(()),
        None => Err(LibraryError::not_found("Playlist", playlist_id)),
    }
}

/// Recount entries and bump the modification time.
async fn touch(tx: &mut Transaction<'_, Sqlite>, playlist_id: i64, now: i64) -> Result<()> {
    query(
        r#"
        UPDATE local_playlists
        SET track_count = (SELECT COUNT(*) FROM local_playlist_entries WHERE playlist_id = ?),
            last_modified = ?
        WHERE id = ?
        "#,
    )
    .bind(playlist_id)
    .bind(now)
    .bind(playlist_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn remove_orphans(tx: &mut Transaction<'_, Sqlite>) -> Result<u64> {
    let result = query(
        r#"
        DELETE FROM local_playlist_items
        WHERE last_played IS NULL
          AND uri NOT IN (SELECT item_uri FROM local_playlist_entries)
        "#,
    )
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected())
}

#[async_trait]
impl PlaylistStore for SqlitePlaylistStore {
    async fn create(&self, name: &str) -> Result<LocalPlaylist> {
        let name = validate_name(name)?;
        let now = self.clock.unix_timestamp_millis();

        let result = query(
            "INSERT INTO local_playlists (name, track_count, created_at, last_modified) VALUES (?, 0, ?, ?)",
        )
        .bind(name)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, name))?;

        Ok(LocalPlaylist {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            track_count: 0,
            created_at: now,
            last_modified: now,
        })
    }

    async fn rename(&self, playlist_id: i64, name: &str) -> Result<()> {
        let name = validate_name(name)?;
        let result = query("UPDATE local_playlists SET name = ?, last_modified = ? WHERE id = ?")
            .bind(name)
            .bind(self.clock.unix_timestamp_millis())
            .bind(playlist_id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, name))?;

        if result.rows_affected() == 0 {
            return Err(LibraryError::not_found("Playlist", playlist_id));
        }
        Ok(())
    }

    async fn delete(&self, playlist_id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let result = query("DELETE FROM local_playlists WHERE id = ?")
            .bind(playlist_id)
            .execute(&mut *tx)
            .await?;
        let orphans = remove_orphans(&mut tx).await?;
        tx.commit().await?;

        debug!(playlist_id, orphans, "Deleted local playlist");
        Ok(result.rows_affected() > 0)
    }

    async fn add_item(&self, playlist_id: i64, item: &PlaylistItem) -> Result<()> {
        let now = self.clock.unix_timestamp_millis();
        let mut tx = self.pool.begin().await?;
        ensure_playlist(&mut tx, playlist_id).await?;

        // Refresh display data but keep any recorded play.
        query(
            r#"
            INSERT INTO local_playlist_items (uri, title, artist_name, album_name, duration_ms)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(uri) DO UPDATE SET
                title = excluded.title,
                artist_name = excluded.artist_name,
                album_name = excluded.album_name,
                duration_ms = excluded.duration_ms
            "#,
        )
        .bind(&item.uri)
        .bind(&item.title)
        .bind(&item.artist_name)
        .bind(&item.album_name)
        .bind(item.duration_ms)
        .execute(&mut *tx)
        .await?;

        query(
            r#"
            INSERT INTO local_playlist_entries (playlist_id, position, item_uri)
            VALUES (?, (SELECT COALESCE(MAX(position), -1) + 1 FROM local_playlist_entries WHERE playlist_id = ?), ?)
            "#,
        )
        .bind(playlist_id)
        .bind(playlist_id)
        .bind(&item.uri)
        .execute(&mut *tx)
        .await?;

        touch(&mut tx, playlist_id, now).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn remove_item(&self, playlist_id: i64, uri: &str) -> Result<u64> {
        let now = self.clock.unix_timestamp_millis();
        let mut tx = self.pool.begin().await?;
        ensure_playlist(&mut tx, playlist_id).await?;

        let removed = query("DELETE FROM local_playlist_entries WHERE playlist_id = ? AND item_uri = ?")
            .bind(playlist_id)
            .bind(uri)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        touch(&mut tx, playlist_id, now).await?;
        remove_orphans(&mut tx).await?;
        tx.commit().await?;

        debug!(playlist_id, uri, removed, "Removed playlist entries");
        Ok(removed)
    }

    async fn items(&self, playlist_id: i64) -> Result<Vec<PlaylistItem>> {
        let items = query_as::<_, PlaylistItem>(
            r#"
            SELECT i.uri, i.title, i.artist_name, i.album_name, i.duration_ms, i.last_played
            FROM local_playlist_entries e
            JOIN local_playlist_items i ON i.uri = e.item_uri
            WHERE e.playlist_id = ?
            ORDER BY e.position
            "#,
        )
        .bind(playlist_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn playlists(&self) -> Result<Vec<LocalPlaylist>> {
        let playlists = query_as::<_, LocalPlaylist>(
            "SELECT id, name, track_count, created_at, last_modified FROM local_playlists ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(playlists)
    }

    async fn mark_played(&self, uri: &str) -> Result<()> {
        let result = query("UPDATE local_playlist_items SET last_played = ? WHERE uri = ?")
            .bind(self.clock.unix_timestamp_millis())
            .bind(uri)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(LibraryError::not_found("PlaylistItem", uri));
        }
        Ok(())
    }
}
