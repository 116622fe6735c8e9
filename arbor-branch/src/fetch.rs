use std::sync::Arc;

use arbor_buffer::ByteBuffer;
use arbor_error::ArborResult;

use crate::{BasketCache, BasketId, BranchDescriptor, FileSource};

/// Header-interpretation metadata for one basket. Pure metadata, no I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasketKey {
    /// Bytes of per-record header to strip from each entry.
    pub header_len: u64,
    /// Boundary between entry data and the trailing offset table within the
    /// decompressed payload.
    pub last: u64,
    /// Decompressed payload length in bytes.
    pub uncompressed_len: u64,
}

/// The contract a branch exposes to the downstream array builder: per basket
/// index, header metadata and a cached, decompressed payload. The builder
/// never sees the cache or the basket descriptors directly.
pub trait BasketFetch {
    /// Header metadata for basket `index`, without touching the file.
    fn basket_key(&self, index: usize) -> ArborResult<BasketKey>;

    /// Decompressed payload for basket `index`, resolved through the
    /// offset-keyed cache.
    fn payload(&self, index: usize) -> ArborResult<ByteBuffer>;
}

/// [`BasketFetch`] over a branch descriptor, a shared payload cache, and the
/// external file collaborator.
pub struct BranchFetcher {
    branch: Arc<BranchDescriptor>,
    cache: Arc<dyn BasketCache>,
    files: Arc<dyn FileSource>,
}

impl BranchFetcher {
    /// Fetch protocol for `branch`, caching payloads in `cache` and resolving
    /// file handles through `files`.
    pub fn new(
        branch: Arc<BranchDescriptor>,
        cache: Arc<dyn BasketCache>,
        files: Arc<dyn FileSource>,
    ) -> Self {
        Self {
            branch,
            cache,
            files,
        }
    }
}

impl BasketFetch for BranchFetcher {
    fn basket_key(&self, index: usize) -> ArborResult<BasketKey> {
        let basket = self.branch.basket(index)?;
        Ok(BasketKey {
            header_len: basket.header_len(),
            last: basket.last(),
            uncompressed_len: basket.uncompressed_len(),
        })
    }

    fn payload(&self, index: usize) -> ArborResult<ByteBuffer> {
        let basket = self.branch.basket(index)?;
        let file = self.files.open(self.branch.path())?;
        let id = BasketId::new(file.id(), basket.offset());
        if let Some(payload) = self.cache.get(&id) {
            log::debug!(
                "resolved basket {} of {} from cache",
                index,
                self.branch.path()
            );
            return Ok(payload);
        }
        // Check-then-fill: a concurrent miss may decompress twice, but the
        // offset keys exactly one payload, so both fills agree. A failed
        // materialization is never stored.
        let payload = basket.read_full_payload(file.as_ref())?;
        self.cache.put(id, payload.clone());
        Ok(payload)
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::Ordering;

    use arbor_buffer::ItemLayout;
    use arbor_error::ArborError;

    use super::*;
    use crate::testing::{TestFile, TestSource};
    use crate::{BasketDescriptor, InMemoryBasketCache, NoOpBasketCache};

    fn two_basket_branch() -> Arc<BranchDescriptor> {
        Arc::new(
            BranchDescriptor::try_new(
                "tree.root",
                vec![0, 100, 250],
                vec![
                    BasketDescriptor::new(1000, 50, 200, 0, 200),
                    BasketDescriptor::new(1050, 80, 300, 0, 300),
                ],
                ItemLayout::fixed(2, 1),
            )
            .unwrap(),
        )
    }

    fn source_for(branch: &BranchDescriptor) -> Arc<TestSource> {
        Arc::new(TestSource::default().with_file(
            branch.path(),
            TestFile::new(branch.path())
                .with_payload(1000, (0u8..200).collect())
                .with_payload(1050, (0u8..=255).cycle().take(300).collect()),
        ))
    }

    #[test]
    fn basket_key_is_pure_metadata() {
        let branch = two_basket_branch();
        let source = source_for(&branch);
        let fetcher = branch.fetcher(Arc::new(InMemoryBasketCache::default()), source.clone());

        let key = fetcher.basket_key(0).unwrap();
        assert_eq!(key.header_len, 0);
        assert_eq!(key.last, 200);
        assert_eq!(key.uncompressed_len, 200);
        assert_eq!(source.opens.load(Ordering::SeqCst), 0);
        assert_eq!(source.file("tree.root").reads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn construction_is_lazy() {
        let branch = two_basket_branch();
        let source = source_for(&branch);
        let _fetcher = branch.fetcher(Arc::new(InMemoryBasketCache::default()), source.clone());
        assert_eq!(source.file("tree.root").reads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn second_fetch_hits_the_cache() {
        let branch = two_basket_branch();
        let source = source_for(&branch);
        let fetcher = branch.fetcher(Arc::new(InMemoryBasketCache::default()), source.clone());

        let first = fetcher.payload(0).unwrap();
        assert_eq!(first.len(), 200);
        assert_eq!(source.file("tree.root").reads.load(Ordering::SeqCst), 1);

        let second = fetcher.payload(0).unwrap();
        assert_eq!(second, first);
        // The collaborator is not re-invoked on a hit.
        assert_eq!(source.file("tree.root").reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn baskets_cache_independently() {
        let branch = two_basket_branch();
        let source = source_for(&branch);
        let fetcher = branch.fetcher(Arc::new(InMemoryBasketCache::default()), source.clone());

        assert_eq!(fetcher.payload(0).unwrap().len(), 200);
        assert_eq!(fetcher.payload(1).unwrap().len(), 300);
        assert_eq!(fetcher.payload(1).unwrap().len(), 300);
        assert_eq!(source.file("tree.root").reads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn shared_cache_serves_a_second_fetcher() {
        let branch = two_basket_branch();
        let source = source_for(&branch);
        let cache: Arc<dyn BasketCache> = Arc::new(InMemoryBasketCache::default());

        let first = branch.fetcher(cache.clone(), source.clone());
        let payload = first.payload(0).unwrap();

        // A different descriptor instance for the same branch, as a second
        // distributed reader would hold.
        let twin = two_basket_branch();
        let second = twin.fetcher(cache, source.clone());
        assert_eq!(second.payload(0).unwrap(), payload);
        assert_eq!(source.file("tree.root").reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_materialization_is_not_cached() {
        let branch = two_basket_branch();
        let source = Arc::new(TestSource::default().with_file(
            "tree.root",
            TestFile::new("tree.root")
                .with_payload(1000, (0u8..200).collect())
                .failing_reads(1),
        ));
        let fetcher = branch.fetcher(Arc::new(InMemoryBasketCache::default()), source.clone());

        assert!(matches!(fetcher.payload(0), Err(ArborError::IOError(..))));
        // Retry gets a fresh attempt and succeeds.
        assert_eq!(fetcher.payload(0).unwrap().len(), 200);
        assert_eq!(source.file("tree.root").reads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn uncached_fetch_rematerializes_via_descriptor_handle() {
        let branch = two_basket_branch();
        let source = source_for(&branch);
        let fetcher = branch.fetcher(Arc::new(NoOpBasketCache), source.clone());

        let first = fetcher.payload(0).unwrap();
        let second = fetcher.payload(0).unwrap();
        assert_eq!(first, second);
        // The descriptor's own materialized handle still bounds I/O to one
        // decompression even with caching disabled.
        assert_eq!(source.file("tree.root").reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_basket_index_is_reported() {
        let branch = two_basket_branch();
        let source = source_for(&branch);
        let fetcher = branch.fetcher(Arc::new(InMemoryBasketCache::default()), source);
        assert!(matches!(
            fetcher.payload(5),
            Err(ArborError::InvalidArgument(..))
        ));
        assert!(matches!(
            fetcher.basket_key(5),
            Err(ArborError::InvalidArgument(..))
        ));
    }
}
