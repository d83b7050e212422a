//! Page table: which frame caches a given page.

use std::collections::HashMap;

use thiserror::Error;

use super::frame::FrameId;
use crate::storage::{FileId, PageId};

/// Page table errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PageTableError {
    /// Insert of a page that already has a frame.
    #[error("{page_id} of {file} is already mapped to frame {frame_id}")]
    AlreadyMapped {
        file: FileId,
        page_id: PageId,
        frame_id: FrameId,
    },

    /// Remove of a page that has no frame.
    #[error("{page_id} of {file} is not mapped")]
    NotMapped { file: FileId, page_id: PageId },
}

/// Maps `(FileId, PageId)` to the frame currently caching that page.
///
/// Insert and remove are strict: the buffer manager only inserts pages it
/// has just loaded and only removes pages it knows are resident, so either
/// failing means the table and the descriptors have drifted apart.
#[derive(Debug, Default)]
pub(crate) struct PageTable {
    map: HashMap<(FileId, PageId), FrameId>,
}

impl PageTable {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            map: HashMap::with_capacity(capacity),
        }
    }

    pub(crate) fn lookup(&self, file: FileId, page_id: PageId) -> Option<FrameId> {
        self.map.get(&(file, page_id)).copied()
    }

    pub(crate) fn insert(
        &mut self,
        file: FileId,
        page_id: PageId,
        frame_id: FrameId,
    ) -> Result<(), PageTableError> {
        if let Some(&existing) = self.map.get(&(file, page_id)) {
            return Err(PageTableError::AlreadyMapped {
                file,
                page_id,
                frame_id: existing,
            });
        }
        self.map.insert((file, page_id), frame_id);
        Ok(())
    }

    pub(crate) fn remove(&mut self, file: FileId, page_id: PageId) -> Result<FrameId, PageTableError> {
        self.map
            .remove(&(file, page_id))
            .ok_or(PageTableError::NotMapped { file, page_id })
    }

    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = ((FileId, PageId), FrameId)> + '_ {
        self.map.iter().map(|(&key, &frame_id)| (key, frame_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_lookup_remove() {
        let file = FileId::next();
        let mut table = PageTable::with_capacity(4);

        table.insert(file, PageId::new(1), FrameId::new(0)).unwrap();
        table.insert(file, PageId::new(2), FrameId::new(1)).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup(file, PageId::new(1)), Some(FrameId::new(0)));
        assert_eq!(table.lookup(file, PageId::new(3)), None);

        assert_eq!(table.remove(file, PageId::new(1)), Ok(FrameId::new(0)));
        assert_eq!(table.lookup(file, PageId::new(1)), None);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_same_page_number_in_different_files() {
        let a = FileId::next();
        let b = FileId::next();
        let mut table = PageTable::default();

        table.insert(a, PageId::new(0), FrameId::new(0)).unwrap();
        table.insert(b, PageId::new(0), FrameId::new(1)).unwrap();

        assert_eq!(table.lookup(a, PageId::new(0)), Some(FrameId::new(0)));
        assert_eq!(table.lookup(b, PageId::new(0)), Some(FrameId::new(1)));
    }

    #[test]
    fn test_duplicate_insert_fails() {
        let file = FileId::next();
        let mut table = PageTable::default();
        table.insert(file, PageId::new(5), FrameId::new(2)).unwrap();

        let err = table.insert(file, PageId::new(5), FrameId::new(3)).unwrap_err();
        assert_eq!(
            err,
            PageTableError::AlreadyMapped {
                file,
                page_id: PageId::new(5),
                frame_id: FrameId::new(2),
            }
        );
        // The existing mapping is untouched.
        assert_eq!(table.lookup(file, PageId::new(5)), Some(FrameId::new(2)));
    }

    #[test]
    fn test_remove_missing_fails() {
        let file = FileId::next();
        let mut table = PageTable::default();
        assert_eq!(
            table.remove(file, PageId::new(9)),
            Err(PageTableError::NotMapped {
                file,
                page_id: PageId::new(9)
            })
        );
    }
}
