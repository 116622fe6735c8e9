use std::ops::Range;
use std::sync::Arc;

use arbor_buffer::ItemLayout;
use arbor_error::{arbor_bail, arbor_err, ArborResult};
use serde::{Deserialize, Serialize};

use crate::{BasketCache, BasketDescriptor, BranchFetcher, FileSource};

/// Everything needed to read one branch (column) and its baskets without
/// deserializing the container file's metadata: a path plus byte offsets.
///
/// `entry_offsets` marks the first global row entry covered by each basket,
/// with one trailing bound, so basket `i` covers entries
/// `[entry_offsets[i], entry_offsets[i + 1])`. The whole descriptor is
/// serializable; materialized payloads and open handles never travel with it.
#[derive(Debug, Serialize, Deserialize)]
pub struct BranchDescriptor {
    path: String,
    entry_offsets: Vec<u64>,
    baskets: Vec<BasketDescriptor>,
    layout: ItemLayout,
}

impl BranchDescriptor {
    /// Build a branch descriptor from upstream metadata.
    ///
    /// `entry_offsets` must be strictly increasing with exactly one more
    /// element than `baskets`.
    pub fn try_new(
        path: impl Into<String>,
        entry_offsets: Vec<u64>,
        baskets: Vec<BasketDescriptor>,
        layout: ItemLayout,
    ) -> ArborResult<Self> {
        if entry_offsets.len() != baskets.len() + 1 {
            arbor_bail!(
                MalformedSegment: "{} entry offsets cannot bound {} baskets",
                entry_offsets.len(),
                baskets.len()
            );
        }
        if !entry_offsets.windows(2).all(|pair| pair[0] < pair[1]) {
            arbor_bail!(MalformedSegment: "entry offsets must be strictly increasing");
        }
        Ok(Self {
            path: path.into(),
            entry_offsets,
            baskets,
            layout,
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The branch's array layout.
    pub fn layout(&self) -> ItemLayout {
        self.layout
    }

    /// Entry boundaries, one per basket plus a trailing bound.
    pub fn entry_offsets(&self) -> &[u64] {
        &self.entry_offsets
    }

    /// Number of baskets in this branch.
    pub fn num_baskets(&self) -> usize {
        self.baskets.len()
    }

    /// The basket descriptor at `index`.
    pub fn basket(&self, index: usize) -> ArborResult<&BasketDescriptor> {
        self.baskets.get(index).ok_or_else(|| {
            arbor_err!(
                "basket {} out of range for branch with {} baskets",
                index,
                self.baskets.len()
            )
        })
    }

    /// Index of the basket covering global `entry`.
    pub fn basket_for_entry(&self, entry: u64) -> ArborResult<usize> {
        let first = self.entry_offsets[0];
        let bound = self.entry_offsets[self.entry_offsets.len() - 1];
        if entry < first || entry >= bound {
            arbor_bail!(
                "entry {} outside branch entry range [{}, {})",
                entry,
                first,
                bound
            );
        }
        Ok(self.entry_offsets.partition_point(|&off| off <= entry) - 1)
    }

    /// Half-open range of basket indexes covering entries
    /// `[entry_start, entry_stop)`.
    pub fn baskets_for_entries(&self, entry_start: u64, entry_stop: u64) -> ArborResult<Range<usize>> {
        if entry_start >= entry_stop {
            arbor_bail!("empty entry range [{}, {})", entry_start, entry_stop);
        }
        let first = self.basket_for_entry(entry_start)?;
        let last = self.basket_for_entry(entry_stop - 1)?;
        Ok(first..last + 1)
    }

    /// The fetch-protocol view of this branch, the only surface the
    /// downstream array builder sees.
    pub fn fetcher(
        self: Arc<Self>,
        cache: Arc<dyn BasketCache>,
        files: Arc<dyn FileSource>,
    ) -> BranchFetcher {
        BranchFetcher::new(self, cache, files)
    }
}
