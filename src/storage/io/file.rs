//! File-backed storage implementation.

use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::{FileId, Storage};
use crate::storage::error::StorageError;
use crate::storage::page::{PAGE_SIZE, PageId};

/// File-backed page store.
///
/// Stores pages as contiguous 8KB blocks in a single file.
///
/// # File Layout
///
/// ```text
/// +------------------+------------------+------------------+
/// | Page 0 (8KB)     | Page 1 (8KB)     | Page 2 (8KB)     | ...
/// +------------------+------------------+------------------+
/// ^ offset 0         ^ offset 8192      ^ offset 16384
/// ```
///
/// # Disposed pages
///
/// Disposed page numbers go on an in-memory free list and are reused (and
/// zeroed) by later allocations. The file never shrinks. The free list is
/// not written to disk, so after reopening a file every slot counts as
/// allocated again.
///
/// # Durability
///
/// `sync_all()` calls `File::sync_all()`. Without it, writes may still be
/// sitting in OS buffers when the process dies.
pub struct FileStorage {
    file_id: FileId,
    path: PathBuf,
    state: Mutex<FileState>,
}

struct FileState {
    file: File,
    /// Number of page slots in the file, live or disposed.
    slots: u64,
    free_list: BTreeSet<PageId>,
}

impl FileState {
    fn check_live(&self, page_id: PageId) -> Result<(), StorageError> {
        if page_id.page_num() >= self.slots || self.free_list.contains(&page_id) {
            return Err(StorageError::PageNotFound(page_id));
        }
        Ok(())
    }

    fn write_at(&mut self, page_id: PageId, buf: &[u8]) -> Result<(), StorageError> {
        self.file.seek(SeekFrom::Start(page_id.byte_offset()))?;
        self.file.write_all(buf)?;
        Ok(())
    }
}

impl FileStorage {
    /// Opens or creates a storage file at the given path.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Corrupted` if the file size is not a multiple
    /// of PAGE_SIZE.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let file_size = file.metadata()?.len();
        if file_size % PAGE_SIZE as u64 != 0 {
            return Err(StorageError::Corrupted(format!(
                "file size {} is not a multiple of page size {}",
                file_size, PAGE_SIZE
            )));
        }

        Ok(Self {
            file_id: FileId::next(),
            path,
            state: Mutex::new(FileState {
                file,
                slots: file_size / PAGE_SIZE as u64,
                free_list: BTreeSet::new(),
            }),
        })
    }

    /// Returns the path to the storage file.
    pub fn path(&self) -> &Path {
        &self.path
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

impl Storage for FileStorage {
    fn file_id(&self) -> FileId {
        self.file_id
    }

    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> Result<(), StorageError> {
        check_buffer(buf.len())?;

        let mut state = self.state.lock();
        state.check_live(page_id)?;
        state.file.seek(SeekFrom::Start(page_id.byte_offset()))?;
        state.file.read_exact(buf)?;
        Ok(())
    }

    fn write_page(&self, page_id: PageId, buf: &[u8]) -> Result<(), StorageError> {
        check_buffer(buf.len())?;

        let mut state = self.state.lock();
        state.check_live(page_id)?;
        state.write_at(page_id, buf)
    }

    fn allocate_page(&self) -> Result<PageId, StorageError> {
        let mut state = self.state.lock();

        let page_id = match state.free_list.first().copied() {
            Some(page_id) => page_id,
            None => PageId::new(state.slots),
        };

        // Zero the slot before publishing it, so a failed write leaves
        // both the free list and the slot count untouched.
        state.write_at(page_id, &[0u8; PAGE_SIZE])?;

        if !state.free_list.remove(&page_id) {
            state.slots += 1;
        }
        Ok(page_id)
    }

    fn dispose_page(&self, page_id: PageId) -> Result<(), StorageError> {
        let mut state = self.state.lock();
        state.check_live(page_id)?;
        state.free_list.insert(page_id);
        Ok(())
    }

    fn page_count(&self) -> usize {
        let state = self.state.lock();
        (state.slots as usize) - state.free_list.len()
    }

    fn sync_all(&self) -> Result<(), StorageError> {
        self.state.lock().file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests as generic;
    use super::*;
    use tempfile::{TempDir, tempdir};

    /// Keeps the temporary directory alive for as long as the test needs it.
    struct TempFileStorage {
        dir: TempDir,
    }

    impl TempFileStorage {
        fn new() -> Self {
            Self {
                dir: tempdir().unwrap(),
            }
        }

        fn storage(&self) -> FileStorage {
            FileStorage::open(self.dir.path().join("test.db")).unwrap()
        }
    }

    #[test]
    fn test_basic_operations() {
        let temp = TempFileStorage::new();
        generic::test_basic_operations(temp.storage());
    }

    #[test]
    fn test_dispose_and_reuse() {
        let temp = TempFileStorage::new();
        generic::test_dispose_and_reuse(temp.storage());
    }

    #[test]
    fn test_buffer_size_validation() {
        let temp = TempFileStorage::new();
        generic::test_buffer_size_validation(temp.storage());
    }

    #[test]
    fn test_page_not_found() {
        let temp = TempFileStorage::new();
        generic::test_page_not_found(temp.storage());
    }

    #[test]
    fn test_create_new_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let storage = FileStorage::open(&path).unwrap();
        assert_eq!(storage.page_count(), 0);
        assert_eq!(storage.path(), path.as_path());
        assert!(path.exists());
    }

    #[test]
    fn test_corrupted_file_size() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        std::fs::write(&path, vec![0u8; 100]).unwrap();
        let result = FileStorage::open(&path);
        assert!(matches!(result, Err(StorageError::Corrupted(_))));
    }

    #[test]
    fn test_persistence_across_instances() {
        let temp = TempFileStorage::new();
        let mut page_ids = Vec::new();

        {
            let storage = temp.storage();
            for i in 0..5 {
                page_ids.push(generic::allocate_and_write(&storage, (i * 10) as u8));
            }
            storage.sync_all().unwrap();
        }

        {
            let storage = temp.storage();
            assert_eq!(storage.page_count(), 5);
            for (i, &page_id) in page_ids.iter().enumerate() {
                generic::verify_test_data(&storage, page_id, (i * 10) as u8);
            }
        }
    }

    #[test]
    fn test_disposed_slot_survives_reopen_as_allocated() {
        let temp = TempFileStorage::new();
        let disposed = {
            let storage = temp.storage();
            let a = generic::allocate_and_write(&storage, 3);
            generic::allocate_and_write(&storage, 4);
            storage.dispose_page(a).unwrap();
            assert_eq!(storage.page_count(), 1);
            a
        };

        let storage = temp.storage();
        assert_eq!(storage.page_count(), 2);
        generic::verify_test_data(&storage, disposed, 3);
    }
}
