use arbor_buffer::ByteBuffer;
use arbor_error::ArborUnwrap;
use dashmap::DashMap;
use moka::policy::EvictionPolicy;
use moka::sync::{Cache, CacheBuilder};
use rustc_hash::FxBuildHasher;

use crate::FileId;

/// Key uniquely identifying one basket's decompressed payload.
///
/// Within one file, an absolute byte offset uniquely and permanently
/// identifies one basket, which is what makes this key collision-free across
/// the file's lifetime and across re-reads by different consumers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BasketId {
    file: FileId,
    offset: u64,
}

impl BasketId {
    /// Key for the basket at absolute byte `offset` within `file`.
    pub fn new(file: FileId, offset: u64) -> Self {
        Self { file, offset }
    }

    /// The file identity component.
    pub fn file(&self) -> &str {
        &self.file
    }

    /// The absolute byte offset component.
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

/// A cache for storing and retrieving individual basket payloads.
///
/// Payload buffers are immutable, so a cached buffer is safe for
/// unsynchronized concurrent reads. The cache itself is check-then-fill:
/// concurrent misses on one key may both decompress and both store, and the
/// guarantee is only that a returned value is never wrong, not that the work
/// happens exactly once. Implementations may evict; a miss just costs one
/// re-materialization.
pub trait BasketCache: Send + Sync {
    /// Look up the payload cached for `id`.
    fn get(&self, id: &BasketId) -> Option<ByteBuffer>;

    /// Store `buffer` as the payload for `id`.
    fn put(&self, id: BasketId, buffer: ByteBuffer);
}

/// Unbounded concurrent-map cache holding at most one entry per basket key.
#[derive(Debug, Default)]
pub struct InMemoryBasketCache(DashMap<BasketId, ByteBuffer, FxBuildHasher>);

impl BasketCache for InMemoryBasketCache {
    fn get(&self, id: &BasketId) -> Option<ByteBuffer> {
        self.0.get(id).map(|entry| entry.clone())
    }

    fn put(&self, id: BasketId, buffer: ByteBuffer) {
        // First fill wins on a race; both fills hold identical bytes anyway.
        self.0.entry(id).or_insert(buffer);
    }
}

/// A [`BasketCache`] bounded by total payload bytes, backed by a Moka cache.
pub struct MokaBasketCache(Cache<BasketId, ByteBuffer, FxBuildHasher>);

impl MokaBasketCache {
    /// Cache at most `max_capacity_bytes` of payload.
    pub fn new(max_capacity_bytes: u64) -> Self {
        Self(
            CacheBuilder::new(max_capacity_bytes)
                .name("arbor-basket-cache")
                // Weight each basket by the number of bytes in its payload.
                .weigher(|_, buffer: &ByteBuffer| {
                    u32::try_from(buffer.len().min(u32::MAX as usize)).arbor_unwrap()
                })
                // LFU over LRU: the cache earns its keep when the same file is
                // re-read, not within a single scan of a branch.
                .eviction_policy(EvictionPolicy::tiny_lfu())
                .build_with_hasher(FxBuildHasher),
        )
    }
}

impl BasketCache for MokaBasketCache {
    fn get(&self, id: &BasketId) -> Option<ByteBuffer> {
        self.0.get(id)
    }

    fn put(&self, id: BasketId, buffer: ByteBuffer) {
        self.0.insert(id, buffer);
    }
}

/// Disables caching; every fetch re-materializes.
#[derive(Debug, Default)]
pub struct NoOpBasketCache;

impl BasketCache for NoOpBasketCache {
    fn get(&self, _id: &BasketId) -> Option<ByteBuffer> {
        None
    }

    fn put(&self, _id: BasketId, _buffer: ByteBuffer) {}
}
