use arbor_error::{arbor_bail, arbor_err, ArborResult};
use bytes::BytesMut;
use serde::{Deserialize, Serialize};

use crate::ByteBuffer;

/// Shape of the decoded items in one column: how many bytes one item takes,
/// how many items make up one logical row, and whether rows are
/// variable-length (and therefore need compaction before reinterpretation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemLayout {
    item_size: usize,
    multiplicity: usize,
    variable_length: bool,
}

impl ItemLayout {
    /// Layout for a fixed-length column of `multiplicity` items per row.
    pub fn fixed(item_size: usize, multiplicity: usize) -> Self {
        debug_assert!(item_size > 0 && multiplicity > 0);
        Self {
            item_size,
            multiplicity,
            variable_length: false,
        }
    }

    /// Layout for a variable-length column; entry boundaries come from the
    /// basket's trailing offset table rather than a fixed multiplicity.
    pub fn variable(item_size: usize) -> Self {
        debug_assert!(item_size > 0);
        Self {
            item_size,
            multiplicity: 1,
            variable_length: true,
        }
    }

    /// Bytes per item.
    pub fn item_size(&self) -> usize {
        self.item_size
    }

    /// Items per logical row.
    pub fn multiplicity(&self) -> usize {
        self.multiplicity
    }

    /// Whether rows are variable-length.
    pub fn is_variable_length(&self) -> bool {
        self.variable_length
    }

    /// Bytes per logical row.
    pub fn stride(&self) -> usize {
        self.item_size * self.multiplicity
    }
}

/// A [`ByteBuffer`] reinterpreted as a sequence of fixed-size logical items.
///
/// The buffer length is always exactly `len() * stride` bytes; constructing
/// from a buffer that is not a whole number of items is a
/// `MalformedSegment` error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedBuffer {
    buffer: ByteBuffer,
    layout: ItemLayout,
    length: usize,
}

impl TypedBuffer {
    /// Allocate a zeroed buffer of `length` rows.
    pub fn zeroed(layout: ItemLayout, length: usize) -> Self {
        Self {
            buffer: ByteBuffer::zeroed(length * layout.stride()),
            layout,
            length,
        }
    }

    /// Reinterpret `buffer` zero-copy; the row count is derived from the
    /// buffer length, which must divide exactly.
    pub fn try_new(layout: ItemLayout, buffer: ByteBuffer) -> ArborResult<Self> {
        let stride = layout.stride();
        if stride == 0 {
            arbor_bail!(MalformedSegment: "item layout has zero stride");
        }
        if buffer.len() % stride != 0 {
            arbor_bail!(
                MalformedSegment: "buffer of {} bytes is not a whole number of {}-byte rows",
                buffer.len(),
                stride
            );
        }
        let length = buffer.len() / stride;
        Ok(Self {
            buffer,
            layout,
            length,
        })
    }

    /// The layout this buffer is interpreted with.
    pub fn layout(&self) -> ItemLayout {
        self.layout
    }

    /// Bytes per item.
    pub fn item_size(&self) -> usize {
        self.layout.item_size()
    }

    /// Items per logical row.
    pub fn multiplicity(&self) -> usize {
        self.layout.multiplicity()
    }

    /// Number of logical rows.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Returns whether the buffer holds no rows.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Total number of items: `len() * multiplicity()`.
    pub fn num_items(&self) -> usize {
        self.length * self.layout.multiplicity()
    }

    /// Zero-copy byte view spanning rows `[start, stop)`, scaled by
    /// `multiplicity() * item_size()`. Hands a sub-range to the array builder
    /// without copying.
    pub fn raw_clipped(&self, start: usize, stop: usize) -> ArborResult<ByteBuffer> {
        let stride = self.layout.stride();
        let byte_start = start
            .checked_mul(stride)
            .ok_or_else(|| arbor_err!(MalformedSegment: "row {} overflows byte offsets", start))?;
        let byte_stop = stop
            .checked_mul(stride)
            .ok_or_else(|| arbor_err!(MalformedSegment: "row {} overflows byte offsets", stop))?;
        self.buffer.slice(byte_start, byte_stop)
    }

    /// The raw bytes backing this buffer.
    pub fn as_bytes(&self) -> &ByteBuffer {
        &self.buffer
    }

    /// Returns the underlying [`ByteBuffer`].
    pub fn into_inner(self) -> ByteBuffer {
        self.buffer
    }
}

/// A growable builder for [`TypedBuffer`], filled by copying item ranges out
/// of source arrays at a running write cursor.
#[derive(Debug)]
pub struct TypedBufferMut {
    bytes: BytesMut,
    layout: ItemLayout,
}

impl TypedBufferMut {
    /// Create a builder with capacity reserved for `length` rows.
    pub fn with_row_capacity(layout: ItemLayout, length: usize) -> Self {
        Self {
            bytes: BytesMut::with_capacity(length * layout.stride()),
            layout,
        }
    }

    /// Number of whole items written so far.
    pub fn num_items(&self) -> usize {
        self.bytes.len() / self.layout.item_size().max(1)
    }

    /// Copy the half-open item range `[item_start, item_stop)` from `source`
    /// to the write cursor, measured in `item_size()`-byte units.
    pub fn copy_items(
        &mut self,
        source: &TypedBuffer,
        item_start: usize,
        item_stop: usize,
    ) -> ArborResult<()> {
        if source.item_size() != self.layout.item_size() {
            arbor_bail!(
                "cannot copy {}-byte items into a {}-byte item buffer",
                source.item_size(),
                self.layout.item_size()
            );
        }
        let byte_start = item_start
            .checked_mul(self.layout.item_size())
            .ok_or_else(|| arbor_err!(MalformedSegment: "item {} overflows byte offsets", item_start))?;
        let byte_stop = item_stop
            .checked_mul(self.layout.item_size())
            .ok_or_else(|| arbor_err!(MalformedSegment: "item {} overflows byte offsets", item_stop))?;
        // Bounds errors surface from the byte-range view.
        let range = source.as_bytes().slice(byte_start, byte_stop)?;
        self.bytes.extend_from_slice(&range);
        Ok(())
    }

    /// Freeze into an immutable [`TypedBuffer`], validating that whole rows
    /// were written.
    pub fn freeze(self) -> ArborResult<TypedBuffer> {
        TypedBuffer::try_new(self.layout, ByteBuffer::from(self.bytes.freeze()))
    }
}
