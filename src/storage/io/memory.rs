//! In-memory page storage implementation.

use parking_lot::Mutex;

use super::{FileId, Storage};
use crate::storage::error::StorageError;
use crate::storage::page::{PAGE_SIZE, PageData, PageId};

/// In-memory page store for tests and scratch files.
///
/// Page numbers index a `Vec`; a disposed page leaves a `None` hole whose
/// number is handed out again by the next `allocate_page`.
pub struct MemoryStorage {
    file_id: FileId,
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    pages: Vec<Option<PageData>>,
    free_list: Vec<PageId>,
}

impl MemoryState {
    fn page(&self, page_id: PageId) -> Result<&PageData, StorageError> {
        self.pages
            .get(page_id.page_num() as usize)
            .and_then(Option::as_ref)
            .ok_or(StorageError::PageNotFound(page_id))
    }

    fn page_mut(&mut self, page_id: PageId) -> Result<&mut PageData, StorageError> {
        self.pages
            .get_mut(page_id.page_num() as usize)
            .and_then(Option::as_mut)
            .ok_or(StorageError::PageNotFound(page_id))
    }
}

impl MemoryStorage {
    /// Creates a new empty in-memory storage.
    pub fn new() -> Self {
        Self {
            file_id: FileId::next(),
            state: Mutex::new(MemoryState::default()),
        }
    }
}

fn check_buffer(len: usize) -> Result<(), StorageError> {
    if len != PAGE_SIZE {
        return Err(StorageError::InvalidBufferSize {
            expected: PAGE_SIZE,
            actual: len,
        });
    }
    Ok(())
}

impl Storage for MemoryStorage {
    fn file_id(&self) -> FileId {
        self.file_id
    }

    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> Result<(), StorageError> {
        check_buffer(buf.len())?;
        let state = self.state.lock();
        buf.copy_from_slice(state.page(page_id)?.as_slice());
        Ok(())
    }

    fn write_page(&self, page_id: PageId, buf: &[u8]) -> Result<(), StorageError> {
        check_buffer(buf.len())?;
        let mut state = self.state.lock();
        state.page_mut(page_id)?.as_mut_slice().copy_from_slice(buf);
        Ok(())
    }

    fn allocate_page(&self) -> Result<PageId, StorageError> {
        let mut state = self.state.lock();
        if let Some(page_id) = state.free_list.pop() {
            state.pages[page_id.page_num() as usize] = Some(PageData::new());
            return Ok(page_id);
        }

        let page_id = PageId::new(state.pages.len() as u64);
        state.pages.push(Some(PageData::new()));
        Ok(page_id)
    }

    fn dispose_page(&self, page_id: PageId) -> Result<(), StorageError> {
        let mut state = self.state.lock();
        state.page(page_id)?;
        state.pages[page_id.page_num() as usize] = None;
        state.free_list.push(page_id);
        Ok(())
    }

    fn page_count(&self) -> usize {
        let state = self.state.lock();
        state.pages.len() - state.free_list.len()
    }

    fn sync_all(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests as generic;
    use super::*;

    #[test]
    fn test_basic_operations() {
        generic::test_basic_operations(MemoryStorage::new());
    }

    #[test]
    fn test_dispose_and_reuse() {
        generic::test_dispose_and_reuse(MemoryStorage::new());
    }

    #[test]
    fn test_buffer_size_validation() {
        generic::test_buffer_size_validation(MemoryStorage::new());
    }

    #[test]
    fn test_page_not_found() {
        generic::test_page_not_found(MemoryStorage::new());
    }

    #[test]
    fn test_each_instance_has_its_own_file_id() {
        assert_ne!(MemoryStorage::new().file_id(), MemoryStorage::new().file_id());
    }
}
