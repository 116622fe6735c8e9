use arbor_buffer::ByteBuffer;
use arbor_error::{arbor_err, ArborResult};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::{to_usize, FileHandle};

/// Location and size metadata for one on-disk basket.
///
/// A descriptor is constructible purely from metadata: no open file handle,
/// no payload. It can be serialized and shipped to another executor; the
/// decompressed payload is materialized lazily on the first read wherever the
/// descriptor lands, and is never part of the serialized form.
#[derive(Debug, Serialize, Deserialize)]
pub struct BasketDescriptor {
    offset: u64,
    compressed_len: u64,
    uncompressed_len: u64,
    header_len: u64,
    last: u64,
    /// Decompressed payload, populated on first read. A failed read leaves
    /// this empty so the next caller gets a fresh attempt.
    #[serde(skip)]
    payload: Mutex<Option<ByteBuffer>>,
}

impl BasketDescriptor {
    /// Describe the basket at absolute byte `offset`: `compressed_len` bytes
    /// on disk, `uncompressed_len` bytes once decompressed, a
    /// `header_len`-byte record header, and `last` marking the boundary
    /// between entry data and the trailing offset table within the payload.
    pub fn new(
        offset: u64,
        compressed_len: u64,
        uncompressed_len: u64,
        header_len: u64,
        last: u64,
    ) -> Self {
        Self {
            offset,
            compressed_len,
            uncompressed_len,
            header_len,
            last,
            payload: Mutex::new(None),
        }
    }

    /// Absolute byte offset of the basket within its file.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// On-disk (compressed) payload length in bytes.
    pub fn compressed_len(&self) -> u64 {
        self.compressed_len
    }

    /// Decompressed payload length in bytes.
    pub fn uncompressed_len(&self) -> u64 {
        self.uncompressed_len
    }

    /// Length of the per-record header in bytes.
    pub fn header_len(&self) -> u64 {
        self.header_len
    }

    /// Last valid offset: where entry data ends and the trailing offset table
    /// begins within the decompressed payload.
    pub fn last(&self) -> u64 {
        self.last
    }

    /// Whether the payload has been materialized in this process.
    pub fn is_materialized(&self) -> bool {
        self.payload.lock().is_some()
    }

    /// Decompressed bytes `[byte_offset, byte_offset + length)` of the
    /// payload, materializing it on first use.
    pub fn read_payload(
        &self,
        file: &dyn FileHandle,
        byte_offset: u64,
        length: u64,
    ) -> ArborResult<ByteBuffer> {
        let payload = self.materialize(file)?;
        let start = to_usize(byte_offset)?;
        let stop = start
            .checked_add(to_usize(length)?)
            .ok_or_else(|| arbor_err!(MalformedSegment: "payload read overflows byte offsets"))?;
        payload.slice(start, stop)
    }

    /// The full decompressed payload, `[0, uncompressed_len)`.
    pub fn read_full_payload(&self, file: &dyn FileHandle) -> ArborResult<ByteBuffer> {
        let payload = self.materialize(file)?;
        payload.slice(0, to_usize(self.uncompressed_len)?)
    }

    /// Decompress through the external collaborator, at most once per
    /// descriptor. Sub-range reads reuse the held buffer.
    fn materialize(&self, file: &dyn FileHandle) -> ArborResult<ByteBuffer> {
        let mut slot = self.payload.lock();
        if let Some(payload) = slot.as_ref() {
            return Ok(payload.clone());
        }
        let payload =
            file.read_decompressed(self.offset, self.compressed_len, self.uncompressed_len, 0)?;
        *slot = Some(payload.clone());
        Ok(payload)
    }
}
