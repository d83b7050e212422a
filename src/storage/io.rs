//! Page store backends.
//!
//! This module provides the `Storage` trait for page-based I/O, along with
//! the `MemoryStorage` and `FileStorage` implementations.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use super::page::PageId;
use crate::storage::error::StorageError;

/// Process-unique identity of one page store instance.
///
/// The buffer pool keys cached pages by `(FileId, PageId)`, so two stores
/// must never share an id while either is alive. Ids come from a global
/// counter and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(u64);

static NEXT_FILE_ID: AtomicU64 = AtomicU64::new(1);

impl FileId {
    /// Hands out a fresh id. Called once by each store constructor.
    pub fn next() -> Self {
        Self(NEXT_FILE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw id value.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file#{}", self.0)
    }
}

/// Page store: one durable file of fixed-size pages.
///
/// The buffer pool is the only intended caller. It hands the store
/// caller-owned, `PAGE_SIZE`-byte buffers and never caches anything on the
/// store's behalf, so implementations are plain raw I/O.
///
/// # Page number allocation
///
/// `allocate_page` owns on-disk space management. The first call on an
/// empty store returns `PageId(0)`; after that, numbers released by
/// `dispose_page` may be handed out again.
///
/// # Thread Safety
///
/// Methods take `&self` so a store can be shared (`Arc`) between the
/// buffer pool and the code that opened it. Implementations serialize
/// their own I/O internally.
pub trait Storage: Send + Sync {
    /// Identity used by the buffer pool's page table.
    fn file_id(&self) -> FileId;

    /// Reads a page into `buf`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::PageNotFound` if the page is not allocated.
    /// Returns `StorageError::InvalidBufferSize` if `buf.len() != PAGE_SIZE`.
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> Result<(), StorageError>;

    /// Writes `buf` to a page.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::PageNotFound` if the page is not allocated.
    /// Returns `StorageError::InvalidBufferSize` if `buf.len() != PAGE_SIZE`.
    fn write_page(&self, page_id: PageId, buf: &[u8]) -> Result<(), StorageError>;

    /// Allocates a zero-filled page and returns its number.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::StorageFull` if the store cannot grow.
    fn allocate_page(&self) -> Result<PageId, StorageError>;

    /// Releases a page's space so its number can be reused.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::PageNotFound` if the page is not allocated.
    fn dispose_page(&self, page_id: PageId) -> Result<(), StorageError>;

    /// Returns the number of live (allocated, not disposed) pages.
    fn page_count(&self) -> usize;

    /// Flushes OS buffers to the physical medium. A no-op in memory.
    fn sync_all(&self) -> Result<(), StorageError>;
}
