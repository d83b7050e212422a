//! Buffer pool for caching pages in memory.
//!
//! The buffer pool sits between the page stores and whatever reads and
//! writes pages, caching recently used pages to minimize disk I/O.
//!
//! # Components
//!
//! - [`BufferManager`]: Main interface for page access
//! - [`PageHandle`]: Names a pinned page; resolved through the manager
//! - [`BufferPoolConfig`]: Pool size, loadable from file and environment
//! - [`BufferStats`]: Access and disk I/O counters
//!
//! Replacement is a clock (second-chance) sweep over the frame table.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use clockpool::storage::{BufferManager, BufferPoolError, MemoryStorage, Storage};
//!
//! # fn example() -> Result<(), BufferPoolError> {
//! let file = Arc::new(MemoryStorage::new());
//! let mut bpm = BufferManager::with_capacity(100);
//!
//! // Create a new page
//! let (page_id, handle) = bpm.allocate_new_page(&file)?;
//! bpm.page_mut(&handle)?[0] = 42;
//! bpm.release_page(&file, page_id, true)?;
//!
//! // Fetch it later
//! let handle = bpm.fetch_page(&file, page_id)?;
//! assert_eq!(bpm.page(&handle)?[0], 42);
//! bpm.release_page(&file, page_id, false)?;
//!
//! // Write it out and drop it from the pool
//! bpm.flush_file(&file)?;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod frame;
mod manager;
mod page_table;
mod replacer;
mod stats;

pub use config::BufferPoolConfig;
pub use error::BufferPoolError;
pub use frame::{FrameId, FrameInfo};
pub use manager::{BufferManager, PageHandle};
pub use page_table::PageTableError;
pub use stats::BufferStats;
