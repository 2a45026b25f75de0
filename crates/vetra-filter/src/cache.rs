//! The filter result cache: a byte-budgeted, process-shared LRU store.
//!
//! Results are memoized under a structural fingerprint of everything
//! that determines them: the node's identity, the transform and clip
//! they were evaluated under, and the identity and live subset of the
//! source image. A single mutex guards the store; lookups mutate
//! recency, so even `get` takes it.

use std::sync::Arc;
use std::sync::OnceLock;

use kurbo::Affine;
use lru::LruCache;
use parking_lot::Mutex;

use vetra_core::geom::{IPoint, IRect};

use crate::image::RasterImage;

/// Default byte cap for the process-wide cache.
#[cfg(any(target_os = "ios", target_arch = "wasm32"))]
const DEFAULT_CACHE_BYTES: usize = 2 * 1024 * 1024;
#[cfg(not(any(target_os = "ios", target_arch = "wasm32")))]
const DEFAULT_CACHE_BYTES: usize = 128 * 1024 * 1024;

/// The fingerprint a filter result is memoized under.
///
/// The transform is stored as coefficient bit patterns so equality and
/// hashing are structural (no NaN or -0.0 surprises in the map).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    node_id: u32,
    ctm: [u64; 6],
    clip_bounds: IRect,
    src_id: u32,
    src_subset: IRect,
}

impl CacheKey {
    pub fn new(
        node_id: u32,
        ctm: &Affine,
        clip_bounds: IRect,
        src_id: u32,
        src_subset: IRect,
    ) -> Self {
        let c = ctm.as_coeffs();
        CacheKey {
            node_id,
            ctm: [
                c[0].to_bits(),
                c[1].to_bits(),
                c[2].to_bits(),
                c[3].to_bits(),
                c[4].to_bits(),
                c[5].to_bits(),
            ],
            clip_bounds,
            src_id,
            src_subset,
        }
    }
}

struct CacheEntry {
    image: Arc<RasterImage>,
    offset: IPoint,
}

struct CacheState {
    lookup: LruCache<CacheKey, CacheEntry>,
    current_bytes: usize,
}

/// Bounded LRU store for filter results.
///
/// All operations take the internal mutex for their whole duration.
pub struct FilterCache {
    state: Mutex<CacheState>,
    max_bytes: usize,
}

impl FilterCache {
    pub fn new(max_bytes: usize) -> Self {
        FilterCache {
            state: Mutex::new(CacheState {
                lookup: LruCache::unbounded(),
                current_bytes: 0,
            }),
            max_bytes,
        }
    }

    /// The process-wide default cache, created on first touch.
    ///
    /// `VETRA_FILTER_CACHE_BYTES` overrides the platform default at
    /// that first touch; later changes have no effect.
    pub fn global() -> &'static FilterCache {
        static GLOBAL: OnceLock<FilterCache> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            let max_bytes = std::env::var("VETRA_FILTER_CACHE_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CACHE_BYTES);
            if max_bytes != DEFAULT_CACHE_BYTES {
                log::info!("filter cache byte cap overridden to {max_bytes} via env");
            }
            FilterCache::new(max_bytes)
        })
    }

    /// Look up a result, marking it most recently used on a hit.
    pub fn get(&self, key: &CacheKey) -> Option<(Arc<RasterImage>, IPoint)> {
        let mut state = self.state.lock();
        state
            .lookup
            .get(key)
            .map(|entry| (entry.image.clone(), entry.offset))
    }

    /// Insert or replace, then evict least-recently-used entries until
    /// the byte budget holds. The entry just inserted is never evicted,
    /// even when it alone exceeds the budget.
    pub fn set(&self, key: CacheKey, image: Arc<RasterImage>, offset: IPoint) {
        let mut state = self.state.lock();

        if let Some(old) = state.lookup.pop(&key) {
            state.current_bytes -= old.image.byte_size();
        }
        state.current_bytes += image.byte_size();
        state.lookup.put(key, CacheEntry { image, offset });

        while state.current_bytes > self.max_bytes {
            let tail_is_newest = match state.lookup.peek_lru() {
                Some((tail_key, _)) => *tail_key == key,
                None => true,
            };
            if tail_is_newest {
                log::debug!(
                    "filter cache over budget: {} of {} bytes held by one entry",
                    state.current_bytes,
                    self.max_bytes
                );
                break;
            }
            if let Some((_, evicted)) = state.lookup.pop_lru() {
                state.current_bytes -= evicted.image.byte_size();
            }
        }
    }

    /// Evict everything.
    pub fn purge(&self) {
        let mut state = self.state.lock();
        state.lookup.clear();
        state.current_bytes = 0;
    }

    /// Evict the listed keys where present.
    pub fn purge_by_keys(&self, keys: &[CacheKey]) {
        let mut state = self.state.lock();
        for key in keys {
            if let Some(entry) = state.lookup.pop(key) {
                state.current_bytes -= entry.image.byte_size();
            }
        }
    }

    pub fn count(&self) -> usize {
        self.state.lock().lookup.len()
    }

    pub fn current_bytes(&self) -> usize {
        self.state.lock().current_bytes
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }
}
