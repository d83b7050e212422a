//! Storage layer: page stores and the buffer pool in front of them.
//!
//! All persistent data lives in 8KB pages. Page stores do raw page I/O by
//! page number; the buffer pool caches pages from any number of stores in a
//! fixed set of frames.
//!
//! # Architecture
//!
//! ```text
//! +-----------------------------+
//! | BufferManager (clock)       |
//! |  frames + descriptors       |
//! |  page table (FileId, PageId)|
//! +-----------------------------+
//!          |
//!          v
//! +-------------------+
//! | Storage trait     |  <- io
//! +-------------------+
//!       /      \
//!      v        v
//! +--------------+ +-------------+
//! | MemoryStorage| | FileStorage |
//! +--------------+ +-------------+
//! ```

pub mod buffer;
pub mod error;
pub mod io;
pub mod page;

pub use buffer::{
    BufferManager, BufferPoolConfig, BufferPoolError, BufferStats, FrameId, FrameInfo, PageHandle,
};
pub use error::StorageError;
pub use io::{FileId, FileStorage, MemoryStorage, Storage};
pub use page::{PAGE_SIZE, PageData, PageId};
