use std::sync::Arc;

use arbor_buffer::ByteBuffer;
use arbor_error::ArborResult;

/// Stable identity of a file, shared by every cache key derived from it.
/// Handles onto the same file must report the same id.
pub type FileId = Arc<str>;

/// External file-access collaborator: resolves a path to an open handle.
///
/// Handle pooling and lifecycle are this collaborator's business; Arbor
/// requests a handle once per basket materialization and never closes it.
pub trait FileSource: Send + Sync {
    /// Open (or fetch from a pool) a handle for the file at `path`.
    fn open(&self, path: &str) -> ArborResult<Arc<dyn FileHandle>>;
}

/// An open file that can serve decompressed byte ranges.
pub trait FileHandle: Send + Sync {
    /// This file's identity, used as a cache-key component.
    fn id(&self) -> FileId;

    /// Read `compressed_len` bytes at absolute `offset`, skip `header_skip`
    /// bytes of record header, and return the decompressed
    /// `uncompressed_len`-byte payload.
    ///
    /// The codec is a black box invoked here; Arbor only orchestrates when
    /// decompression happens and caches its result. This is a blocking call
    /// with no timeout; a failure is terminal for the requested basket only.
    fn read_decompressed(
        &self,
        offset: u64,
        compressed_len: u64,
        uncompressed_len: u64,
        header_skip: u64,
    ) -> ArborResult<ByteBuffer>;
}
