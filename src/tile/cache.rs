//! Tile cache gateway.
//!
//! The orchestrator talks to the cache through the [`TileStore`] trait. Cache
//! entries are advisory: a miss or an unavailable store always falls back to
//! rendering.
//!
//! # Cache Key
//!
//! The key is deliberately coarse:
//! - Image identifier
//! - Server (backend) identifier
//! - Z plane
//! - Timepoint
//!
//! It carries no region or zoom, so one cached entry answers every tile of a
//! plane. That is only used in [`CacheMode::PlaneKeyed`] on the native pyramid
//! path; geometry-precise requests use [`CacheMode::Bypass`].
//!
//! # Size-Based Eviction
//!
//! [`TileCache`] tracks the total size of cached bytes and evicts
//! least-recently-used entries when the capacity is exceeded.

use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use tokio::sync::RwLock;

use crate::error::CacheError;

/// Default cache capacity: 100MB
pub const DEFAULT_TILE_CACHE_CAPACITY: usize = 100 * 1024 * 1024;

/// Default maximum number of entries
pub const DEFAULT_TILE_CACHE_ENTRIES: usize = 10_000;

// =============================================================================
// Cache Key & Mode
// =============================================================================

/// Cache key for rendered planes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileCacheKey {
    /// Image identifier
    pub image_id: Arc<str>,

    /// Identifier of the backend server the image lives on
    pub server_id: Arc<str>,

    /// Z plane index
    pub plane_z: u32,

    /// Timepoint index
    pub timepoint: u32,
}

impl TileCacheKey {
    /// Create a new cache key.
    pub fn new(
        image_id: impl Into<Arc<str>>,
        server_id: impl Into<Arc<str>>,
        plane_z: u32,
        timepoint: u32,
    ) -> Self {
        Self {
            image_id: image_id.into(),
            server_id: server_id.into(),
            plane_z,
            timepoint,
        }
    }
}

/// How a tile request uses the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    /// Look up and populate with the per-plane key (native pyramid path only)
    PlaneKeyed,

    /// Always render fresh
    Bypass,
}

// =============================================================================
// Store Trait
// =============================================================================

/// A keyed store for rendered tile bytes.
#[async_trait]
pub trait TileStore: Send + Sync {
    /// Look up an entry. `Ok(None)` is a plain miss.
    async fn get(&self, key: &TileCacheKey) -> Result<Option<Bytes>, CacheError>;

    /// Store an entry, replacing any previous value.
    async fn put(&self, key: TileCacheKey, data: Bytes) -> Result<(), CacheError>;
}

// =============================================================================
// Tile Cache
// =============================================================================

/// In-memory LRU cache with size-based capacity.
///
/// # Thread Safety
///
/// The cache is thread-safe and can be shared across async tasks via `Arc`.
///
/// # Example
///
/// ```
/// use pyramid_tiler::tile::{TileCache, TileCacheKey};
/// use bytes::Bytes;
///
/// #[tokio::main]
/// async fn main() {
///     let cache = TileCache::new();
///
///     let key = TileCacheKey::new("101", "1", 0, 0);
///     let tile_data = Bytes::from(vec![0xFF, 0xD8, 0xFF, 0xE0]);
///
///     cache.put(key.clone(), tile_data.clone()).await;
///     assert_eq!(cache.get(&key).await, Some(tile_data));
/// }
/// ```
pub struct TileCache {
    cache: RwLock<LruCache<TileCacheKey, Bytes>>,

    /// Maximum total size in bytes
    max_size: usize,

    current_size: RwLock<usize>,
}

impl TileCache {
    /// Create a new tile cache with default capacity (100MB).
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_TILE_CACHE_CAPACITY)
    }

    /// Create a new tile cache with the specified capacity in bytes.
    pub fn with_capacity(max_size: usize) -> Self {
        Self::with_capacity_and_entries(max_size, DEFAULT_TILE_CACHE_ENTRIES)
    }

    /// Create a new tile cache with specified capacity and maximum entries.
    ///
    /// A `max_entries` of zero is treated as one.
    pub fn with_capacity_and_entries(max_size: usize, max_entries: usize) -> Self {
        let entries = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: RwLock::new(LruCache::new(entries)),
            max_size,
            current_size: RwLock::new(0),
        }
    }

    /// Get an entry and mark it as recently used.
    pub async fn get(&self, key: &TileCacheKey) -> Option<Bytes> {
        let mut cache = self.cache.write().await;
        cache.get(key).cloned()
    }

    /// Check if an entry is cached without updating LRU order.
    pub async fn contains(&self, key: &TileCacheKey) -> bool {
        let cache = self.cache.read().await;
        cache.contains(key)
    }

    /// Store an entry, evicting least-recently-used entries while over capacity.
    pub async fn put(&self, key: TileCacheKey, data: Bytes) {
        let data_size = data.len();
        let mut cache = self.cache.write().await;
        let mut current_size = self.current_size.write().await;

        if let Some(old_data) = cache.peek(&key) {
            *current_size = current_size.saturating_sub(old_data.len());
        }

        // The entry-count bound may push out an LRU entry on its own.
        if let Some((evicted_key, evicted)) = cache.push(key.clone(), data) {
            if evicted_key != key {
                *current_size = current_size.saturating_sub(evicted.len());
            }
        }
        *current_size += data_size;

        while *current_size > self.max_size {
            match cache.pop_lru() {
                Some((_, evicted)) => {
                    *current_size = current_size.saturating_sub(evicted.len());
                }
                None => break,
            }
        }
    }

    /// Remove an entry, returning it if it existed.
    pub async fn remove(&self, key: &TileCacheKey) -> Option<Bytes> {
        let mut cache = self.cache.write().await;
        let mut current_size = self.current_size.write().await;

        let data = cache.pop(key)?;
        *current_size = current_size.saturating_sub(data.len());
        Some(data)
    }

    /// Clear all entries.
    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        let mut current_size = self.current_size.write().await;
        cache.clear();
        *current_size = 0;
    }

    /// Number of cached entries.
    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Check if the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.cache.read().await.is_empty()
    }

    /// Current total size of cached bytes.
    pub async fn size(&self) -> usize {
        *self.current_size.read().await
    }

    /// Maximum capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.max_size
    }
}

impl Default for TileCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TileStore for TileCache {
    async fn get(&self, key: &TileCacheKey) -> Result<Option<Bytes>, CacheError> {
        Ok(TileCache::get(self, key).await)
    }

    async fn put(&self, key: TileCacheKey, data: Bytes) -> Result<(), CacheError> {
        TileCache::put(self, key, data).await;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
