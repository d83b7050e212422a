//! Storage layer errors.

use thiserror::Error;

use crate::storage::PageId;

/// Errors returned by a page store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Page not found in storage.
    ///
    /// Returned for page numbers that were never allocated and for pages
    /// that have been disposed and not yet handed out again.
    #[error("page not found: {0}")]
    PageNotFound(PageId),

    /// Buffer passed to `read_page` or `write_page` is not PAGE_SIZE bytes.
    #[error("invalid buffer size: expected {expected}, got {actual}")]
    InvalidBufferSize {
        /// Expected buffer size (PAGE_SIZE)
        expected: usize,
        /// Actual buffer size provided
        actual: usize,
    },

    /// I/O error from the underlying file system.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store refuses to grow any further.
    #[error("storage is full")]
    StorageFull,

    /// The backing file has an invalid format or size.
    #[error("data corruption: {0}")]
    Corrupted(String),
}
