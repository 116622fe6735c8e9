//! Call-counting stand-ins for the external file collaborator.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arbor_buffer::ByteBuffer;
use arbor_error::{ArborError, ArborResult};

use crate::{FileHandle, FileId, FileSource};

/// Serves pre-registered decompressed payloads keyed by absolute offset and
/// counts how often the decompression path is invoked.
pub struct TestFile {
    id: FileId,
    payloads: HashMap<u64, Vec<u8>>,
    failures_remaining: AtomicUsize,
    pub reads: AtomicUsize,
}

impl TestFile {
    pub fn new(id: &str) -> Self {
        Self {
            id: Arc::from(id),
            payloads: HashMap::new(),
            failures_remaining: AtomicUsize::new(0),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn with_payload(mut self, offset: u64, bytes: Vec<u8>) -> Self {
        self.payloads.insert(offset, bytes);
        self
    }

    /// Fail the next `count` reads with an I/O error before serving any data.
    pub fn failing_reads(self, count: usize) -> Self {
        self.failures_remaining.store(count, Ordering::SeqCst);
        self
    }
}

impl FileHandle for TestFile {
    fn id(&self) -> FileId {
        self.id.clone()
    }

    fn read_decompressed(
        &self,
        offset: u64,
        _compressed_len: u64,
        _uncompressed_len: u64,
        _header_skip: u64,
    ) -> ArborResult<ByteBuffer> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ArborError::from(io::Error::other("injected read failure")));
        }
        let bytes = self.payloads.get(&offset).ok_or_else(|| {
            ArborError::from(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no payload registered at offset {offset}"),
            ))
        })?;
        Ok(ByteBuffer::copy_from(bytes))
    }
}

/// Resolves paths to [`TestFile`]s and counts opens.
#[derive(Default)]
pub struct TestSource {
    files: HashMap<String, Arc<TestFile>>,
    pub opens: AtomicUsize,
}

impl TestSource {
    pub fn with_file(mut self, path: &str, file: TestFile) -> Self {
        self.files.insert(path.to_owned(), Arc::new(file));
        self
    }

    pub fn file(&self, path: &str) -> &Arc<TestFile> {
        &self.files[path]
    }
}

impl FileSource for TestSource {
    fn open(&self, path: &str) -> ArborResult<Arc<dyn FileHandle>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.files
            .get(path)
            .cloned()
            .map(|file| file as Arc<dyn FileHandle>)
            .ok_or_else(|| {
                ArborError::from(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no file registered at {path}"),
                ))
            })
    }
}
