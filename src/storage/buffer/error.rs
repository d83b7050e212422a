//! Buffer pool errors.

use thiserror::Error;

use super::frame::FrameId;
use super::page_table::PageTableError;
use crate::storage::{FileId, PageId, StorageError};

/// Buffer pool errors.
///
/// Every public buffer pool operation returns one of these instead of
/// panicking. None of them is recovered from internally: the operation
/// stops at the first failure and reports it.
#[derive(Debug, Error)]
pub enum BufferPoolError {
    /// A page store read, write, allocate or dispose failed.
    ///
    /// This includes `StorageError::PageNotFound` when fetching a page the
    /// store never allocated.
    #[error("storage error: {0}")]
    Io(#[from] StorageError),

    /// The clock sweep went once around the pool without finding a victim.
    ///
    /// Every frame was pinned or still referenced. The failed sweep clears
    /// the reference bits it passed, so a retry succeeds if any frame is
    /// unpinned; if all are pinned the caller has to release pins first.
    #[error("buffer pool exhausted: no unpinned, unreferenced frame")]
    PoolExhausted,

    /// The page table rejected an insert or remove.
    ///
    /// Indicates the page table and the frame descriptors disagree.
    #[error("page table error: {0}")]
    Index(#[from] PageTableError),

    /// The page has no frame in the pool.
    #[error("{page_id} of {file} is not resident in the buffer pool")]
    PageNotFound { file: FileId, page_id: PageId },

    /// Release requested on a resident page whose pin count is already 0.
    #[error("{page_id} of {file} is not pinned")]
    NotPinned { file: FileId, page_id: PageId },

    /// Flush requested on a file that still has a pinned page in the pool.
    #[error("{page_id} of {file} is pinned")]
    PagePinned { file: FileId, page_id: PageId },

    /// A frame descriptor violates the pool's invariants.
    #[error("frame {0} is in an inconsistent state")]
    BadBufferState(FrameId),
}
