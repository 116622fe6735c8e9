//! Lazy basket access for Arbor branches.
//!
//! A branch is one column of a tree-structured scientific data file, stored
//! on disk as a sequence of independently compressed baskets. This crate
//! holds everything needed to read those baskets without deserializing the
//! container's own metadata: a [`BranchDescriptor`] carries the file path,
//! per-basket entry boundaries, and one [`BasketDescriptor`] per basket;
//! descriptors are serializable and materialize their decompressed payloads
//! lazily, so they can be shipped to a different executor and read there.
//!
//! The downstream array builder only ever sees the [`BasketFetch`] protocol:
//! ask for a basket's header metadata ([`BasketFetch::basket_key`], no I/O)
//! or its decompressed, header-stripped payload ([`BasketFetch::payload`],
//! cached by `(file, offset)` in a [`BasketCache`]).

mod basket;
mod branch;
mod cache;
mod fetch;
mod source;

pub use basket::*;
pub use branch::*;
pub use cache::*;
pub use fetch::*;
pub use source::*;

use arbor_error::{arbor_err, ArborResult};

/// Narrow a metadata offset into an in-memory index.
pub(crate) fn to_usize(value: u64) -> ArborResult<usize> {
    usize::try_from(value)
        .map_err(|_| arbor_err!(MalformedSegment: "offset {} does not fit in memory", value))
}

#[cfg(test)]
pub(crate) mod testing;
