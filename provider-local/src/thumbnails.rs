//! Decoded artwork for local entities.
//!
//! The host hands out encoded image bytes; they are decoded once, scaled down
//! to thumbnail size and kept in an LRU cache keyed by entity URI. Every
//! failure along the way means "no thumbnail".

use bridge_traits::media_index::MediaIndex;
use core_library::models::{Bitmap, PictureType, Thumbnail};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

/// Longest edge of a decoded thumbnail, in pixels
pub const THUMBNAIL_DIMENSION: u32 = 300;

pub const DEFAULT_CACHE_CAPACITY: usize = 256;

pub struct ThumbnailLoader {
    index: Arc<dyn MediaIndex>,
    cache: Mutex<LruCache<String, Bitmap>>,
}

impl ThumbnailLoader {
    pub fn new(index: Arc<dyn MediaIndex>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            index,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub async fn load(&self, uri: &Url, picture_type: PictureType) -> Option<Thumbnail> {
        let key = uri.as_str();
        if let Some(bitmap) = self.cache.lock().await.get(key) {
            return Some(Thumbnail::from_bitmap(bitmap.clone(), picture_type));
        }

        let bytes = match self.index.load_thumbnail(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                debug!(uri = key, error = %e, "Thumbnail load failed");
                return None;
            }
        };

        let bitmap = decode(&bytes)?;
        self.cache.lock().await.put(key.to_string(), bitmap.clone());
        Some(Thumbnail::from_bitmap(bitmap, picture_type))
    }
}

/// Decode to RGBA, shrinking anything larger than a thumbnail.
pub fn decode(bytes: &[u8]) -> Option<Bitmap> {
    let image = match image::load_from_memory(bytes) {
        Ok(image) => image,
        Err(e) => {
            debug!(error = %e, "Thumbnail decode failed");
            return None;
        }
    };
    let image = if image.width() > THUMBNAIL_DIMENSION || image.height() > THUMBNAIL_DIMENSION {
        image.thumbnail(THUMBNAIL_DIMENSION, THUMBNAIL_DIMENSION)
    } else {
        image
    };

    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    Bitmap::new(width, height, rgba.into_raw()).ok()
}
