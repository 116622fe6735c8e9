use std::fmt::{Debug, Formatter};
use std::ops::Deref;

use arbor_error::{arbor_bail, ArborResult};
use bytes::{Bytes, BytesMut};

use crate::to_usize;

/// An immutable, cheaply cloneable region of raw bytes.
///
/// Buffers are either exclusively owned (freshly allocated) or shared views
/// into another buffer's backing storage; either way they never change after
/// construction, so a buffer handed out by a cache is safe for unsynchronized
/// concurrent reads. All transforms return a new `ByteBuffer`.
#[derive(Clone, PartialEq, Eq)]
pub struct ByteBuffer(Bytes);

impl ByteBuffer {
    /// Create a new exclusively-owned buffer of `len` zero bytes.
    pub fn zeroed(len: usize) -> Self {
        Self(Bytes::from(vec![0u8; len]))
    }

    /// Create a new empty buffer.
    pub fn empty() -> Self {
        Self(Bytes::new())
    }

    /// Create a new buffer copied from the provided bytes.
    pub fn copy_from(values: impl AsRef<[u8]>) -> Self {
        Self(Bytes::copy_from_slice(values.as_ref()))
    }

    /// Length of the buffer in bytes.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether the buffer is empty.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Access the buffer as an immutable byte slice.
    #[inline(always)]
    pub fn as_slice(&self) -> &[u8] {
        self.0.as_ref()
    }

    /// Return a zero-copy view of the byte range `[start, stop)`.
    ///
    /// A view's bounds always lie within the backing region's bounds; slicing
    /// never extends them. `MalformedSegment` if `start > stop` or `stop`
    /// exceeds the buffer length.
    pub fn slice(&self, start: usize, stop: usize) -> ArborResult<Self> {
        if start > stop {
            arbor_bail!(MalformedSegment: "slice start {} is greater than stop {}", start, stop);
        }
        if stop > self.0.len() {
            arbor_bail!(
                MalformedSegment: "slice stop {} out of bounds for buffer of {} bytes",
                stop,
                self.0.len()
            );
        }
        Ok(Self(self.0.slice(start..stop)))
    }

    /// Strip a fixed-size per-entry header and concatenate the remaining
    /// bytes of entries `[entry_start, entry_stop)` into one contiguous
    /// buffer, preserving entry order.
    ///
    /// `entry_offsets[i]` is the byte offset of entry `i` within this buffer;
    /// entry `i` spans `[entry_offsets[i], entry_offsets[i + 1])` including
    /// its `header_len`-byte prefix. With `header_len == 0` this degenerates
    /// to a zero-copy slice bounded by the two offsets.
    pub fn compact(
        &self,
        entry_offsets: &[u64],
        header_len: u64,
        entry_start: usize,
        entry_stop: usize,
    ) -> ArborResult<Self> {
        if entry_start > entry_stop || entry_stop >= entry_offsets.len() {
            arbor_bail!(
                MalformedSegment: "entry range [{}, {}) is not bounded by {} offsets",
                entry_start,
                entry_stop,
                entry_offsets.len()
            );
        }
        if header_len == 0 {
            return self.slice(
                to_usize(entry_offsets[entry_start])?,
                to_usize(entry_offsets[entry_stop])?,
            );
        }

        let header = to_usize(header_len)?;
        let span = to_usize(entry_offsets[entry_stop])?
            .saturating_sub(to_usize(entry_offsets[entry_start])?);
        let mut out = BytesMut::with_capacity(span.saturating_sub(header * (entry_stop - entry_start)));
        for entry in entry_start..entry_stop {
            let begin = to_usize(entry_offsets[entry])? + header;
            let end = to_usize(entry_offsets[entry + 1])?;
            if begin > end || end > self.len() {
                arbor_bail!(
                    MalformedSegment: "entry {} spans [{}, {}) outside buffer of {} bytes",
                    entry,
                    begin,
                    end,
                    self.len()
                );
            }
            out.extend_from_slice(&self.as_slice()[begin..end]);
        }
        Ok(Self(out.freeze()))
    }

    /// Materialize the view into an owned, independent byte vector.
    ///
    /// Used at the boundary when handing data to a consumer that cannot share
    /// the backing storage's lifetime.
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    /// Raw bytes have no item substructure, so this always fails with
    /// `Unsupported`; reinterpret through [`TypedBuffer`](crate::TypedBuffer)
    /// instead.
    pub fn subarray(&self) -> ArborResult<Self> {
        arbor_bail!(Unsupported: "a raw byte buffer is not subarrayable")
    }

    /// Returns the underlying [`Bytes`].
    pub fn into_inner(self) -> Bytes {
        self.0
    }
}

impl Debug for ByteBuffer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        const TRUNC_SIZE: usize = 512;
        let mut binding = f.debug_struct("ByteBuffer");
        let mut fields = binding.field("length", &self.len());
        let mut bytes = self.0.clone();
        if bytes.len() > TRUNC_SIZE {
            fields = fields.field("truncated", &true);
        }
        bytes.truncate(TRUNC_SIZE);
        fields.field("bytes", &bytes).finish()
    }
}

impl Deref for ByteBuffer {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl AsRef<[u8]> for ByteBuffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

/// Zero-copy wrap over caller-supplied bytes.
impl From<Bytes> for ByteBuffer {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

/// Zero-copy ownership transfer from a `Vec<u8>`.
impl From<Vec<u8>> for ByteBuffer {
    fn from(value: Vec<u8>) -> Self {
        Self(Bytes::from(value))
    }
}
