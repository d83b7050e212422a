//! Frame identifiers and per-frame descriptors.

use std::fmt;
use std::sync::Arc;

use crate::storage::{FileId, PageId, Storage};

/// Identifier for a frame within the buffer pool.
///
/// FrameId is an index into the pool's frame and descriptor arrays, both of
/// which are sized once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub(crate) u32);

impl FrameId {
    /// # Panics
    ///
    /// Panics if `index` does not fit in a `u32`.
    pub(crate) fn new(index: usize) -> Self {
        Self(u32::try_from(index).expect("frame index exceeds u32::MAX"))
    }

    /// Returns the frame index.
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Placeholder page number stored in cleared descriptors.
const NO_PAGE: PageId = PageId(u64::MAX);

/// Metadata for one frame.
///
/// Lives at the same index as the frame buffer it describes.
///
/// # Invariants
///
/// - `!valid` implies `pin_count == 0`, `!dirty` and `file.is_none()`
/// - `pin_count` never goes below zero; `unpin` refuses instead
///
/// `valid` and `file` are kept as separate fields so the pool can detect
/// (and report) a descriptor that breaks the first rule.
///
/// # Concurrency
///
/// `pin_count` is a cooperative reference count mutated only through
/// `&mut BufferManager`. It is not a latch. Sharing the pool across threads
/// would need atomic pin counts, a synchronized page table and ordering
/// between setting `dirty` and the evictor's writeback.
pub(crate) struct FrameDescriptor<S> {
    /// Page store the cached page belongs to. `None` when cleared.
    pub(crate) file: Option<Arc<S>>,
    /// Page number within `file`. Meaningful only while `valid`.
    pub(crate) page_id: PageId,
    pub(crate) pin_count: u32,
    /// Frame content differs from the on-disk page.
    pub(crate) dirty: bool,
    /// Second-chance bit for the clock sweep.
    pub(crate) referenced: bool,
    pub(crate) valid: bool,
}

impl<S: Storage> FrameDescriptor<S> {
    pub(crate) fn new() -> Self {
        Self {
            file: None,
            page_id: NO_PAGE,
            pin_count: 0,
            dirty: false,
            referenced: false,
            valid: false,
        }
    }

    /// Installs a freshly loaded page: pinned once, referenced, clean.
    pub(crate) fn set(&mut self, file: Arc<S>, page_id: PageId) {
        self.file = Some(file);
        self.page_id = page_id;
        self.pin_count = 1;
        self.dirty = false;
        self.referenced = true;
        self.valid = true;
    }

    /// Returns the descriptor to the cleared state.
    pub(crate) fn clear(&mut self) {
        *self = Self::new();
    }

    /// Pins the frame for one more holder and marks it referenced.
    pub(crate) fn pin(&mut self) {
        self.pin_count += 1;
        self.referenced = true;
    }

    /// Drops one pin. Returns `false`, changing nothing, if the count is
    /// already zero.
    pub(crate) fn unpin(&mut self) -> bool {
        if self.pin_count == 0 {
            return false;
        }
        self.pin_count -= 1;
        true
    }

    pub(crate) fn file_id(&self) -> Option<FileId> {
        self.file.as_ref().map(|file| file.file_id())
    }

    /// Returns true if the descriptor is associated with `file_id`,
    /// whether or not it is valid.
    pub(crate) fn belongs_to(&self, file_id: FileId) -> bool {
        self.file_id() == Some(file_id)
    }

    /// `(file, page)` this frame caches, if valid.
    pub(crate) fn identity(&self) -> Option<(FileId, PageId)> {
        if !self.valid {
            return None;
        }
        self.file_id().map(|file_id| (file_id, self.page_id))
    }

    pub(crate) fn holds(&self, file_id: FileId, page_id: PageId) -> bool {
        self.identity() == Some((file_id, page_id))
    }

    /// Checks the cleared-state invariant.
    pub(crate) fn is_consistent(&self) -> bool {
        if self.valid {
            self.file.is_some()
        } else {
            self.pin_count == 0 && !self.dirty && self.file.is_none()
        }
    }
}

/// Snapshot of one frame for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    pub frame_id: FrameId,
    pub pin_count: u32,
    pub valid: bool,
    pub dirty: bool,
    pub referenced: bool,
    /// `(file, page)` cached in the frame; `None` when the frame is free.
    pub page: Option<(FileId, PageId)>,
}

impl<S: Storage> FrameDescriptor<S> {
    pub(crate) fn info(&self, frame_id: FrameId) -> FrameInfo {
        FrameInfo {
            frame_id,
            pin_count: self.pin_count,
            valid: self.valid,
            dirty: self.dirty,
            referenced: self.referenced,
            page: self.identity(),
        }
    }
}
