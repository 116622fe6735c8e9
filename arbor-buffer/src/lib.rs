#![deny(missing_docs)]

//! Byte buffers for Arbor.
//!
//! Basket payloads move through Arbor as [`ByteBuffer`]s: immutable, cheaply
//! cloneable byte regions whose slices share the backing storage. A
//! [`TypedBuffer`] reinterprets one of those regions as a sequence of
//! fixed-size logical items without copying; copies happen only for
//! compaction ([`ByteBuffer::compact`]) and when assembling output arrays
//! ([`TypedBufferMut::copy_items`]).

mod raw;
mod typed;

pub use raw::*;
pub use typed::*;

use arbor_error::{arbor_err, ArborResult};

/// Narrow a metadata offset into an in-memory index.
pub(crate) fn to_usize(value: u64) -> ArborResult<usize> {
    usize::try_from(value)
        .map_err(|_| arbor_err!(MalformedSegment: "offset {} does not fit in memory", value))
}
