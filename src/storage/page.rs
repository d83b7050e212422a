//! Page identifier and size constants.

mod data;

pub use data::PageData;

use std::fmt;

/// 8KB page size. Every frame in the buffer pool and every block in a
/// page store is exactly this large.
pub const PAGE_SIZE: usize = 8192;

/// Page number within a single page store.
///
/// A `PageId` alone does not identify a cached page; the buffer pool keys
/// its page table by `(FileId, PageId)` so that several files can share one
/// pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u64);

impl PageId {
    /// Creates a new PageId from a page number.
    pub const fn new(page_num: u64) -> Self {
        Self(page_num)
    }

    /// Returns the page number.
    pub const fn page_num(&self) -> u64 {
        self.0
    }

    /// Byte offset of this page in a storage file.
    pub const fn byte_offset(&self) -> u64 {
        self.0 * PAGE_SIZE as u64
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_id_byte_offset() {
        assert_eq!(PageId::new(0).byte_offset(), 0);
        assert_eq!(PageId::new(1).byte_offset(), 8192);
        assert_eq!(PageId::new(100).byte_offset(), 819200);
    }

    #[test]
    fn test_page_id_display() {
        assert_eq!(PageId::new(7).to_string(), "page 7");
    }

    #[test]
    fn test_page_id_ordering() {
        assert!(PageId::new(0) < PageId::new(1));
        assert_eq!(PageId::new(42), PageId::new(42));
    }
}
