//! Buffer manager: frame table, clock replacement and pin bookkeeping.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use log::{debug, trace, warn};

use super::config::BufferPoolConfig;
use super::error::BufferPoolError;
use super::frame::{FrameDescriptor, FrameId, FrameInfo};
use super::page_table::PageTable;
use super::replacer::ClockReplacer;
use super::stats::BufferStats;
use crate::storage::{FileId, PageData, PageId, Storage};

/// A pinned page, as returned by `fetch_page` and `allocate_new_page`.
///
/// The handle is plain data; holding one does not keep the page pinned.
/// Pins are dropped explicitly with `BufferManager::release_page`, after
/// which the handle stops resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHandle {
    frame_id: FrameId,
    file: FileId,
    page_id: PageId,
}

impl PageHandle {
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    pub fn file_id(&self) -> FileId {
        self.file
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }
}

/// The Buffer Manager caches pages from any number of page stores in a
/// fixed set of frames.
///
/// # Architecture
///
/// ```text
/// +------------------+     +----------------------+
/// | fetch_page()     |---->| Page Table           |
/// | release_page()   |     | (FileId,PageId)->Fid |
/// +------------------+     +----------------------+
///          |                          |
///          v                          v
/// +------------------+     +----------------------+
/// | Clock hand       |---->| Descriptors | Frames |
/// | (second chance)  |     | [pool_size] arrays   |
/// +------------------+     +----------------------+
///                                     |
///                                     v
///                          +----------------------+
///                          | Storage (per file)   |
///                          +----------------------+
/// ```
///
/// Frames and descriptors are parallel arrays allocated once in `new`;
/// nothing is allocated per page afterwards.
///
/// # Pin protocol
///
/// Every successful `fetch_page` or `allocate_new_page` pins the page once.
/// Callers must balance each pin with one `release_page`, passing
/// `mark_dirty = true` if they changed the bytes. Pinned frames are never
/// chosen for eviction.
///
/// # Concurrency Model
///
/// Single-threaded. Every operation takes `&mut self` and runs to
/// completion, page store I/O included. Pin counts are a cooperative
/// reference count, not a lock.
///
/// # Teardown
///
/// Dropping the manager writes back every dirty frame, pinned or not.
/// Write failures at that point are logged and the data is lost.
pub struct BufferManager<S: Storage> {
    /// Page buffers, indexed by `FrameId`.
    frames: Vec<PageData>,

    /// Per-frame metadata, indexed by `FrameId`.
    descriptors: Vec<FrameDescriptor<S>>,

    page_table: PageTable,

    replacer: ClockReplacer,

    stats: BufferStats,

    config: BufferPoolConfig,
}

impl<S: Storage> BufferManager<S> {
    /// Creates a buffer manager with `config.pool_size` frames.
    ///
    /// # Panics
    ///
    /// Panics if `pool_size` is 0 or does not fit a `FrameId` (`u32`).
    pub fn new(config: BufferPoolConfig) -> Self {
        let pool_size = config.pool_size;
        assert!(pool_size > 0, "pool_size must be > 0");
        assert!(
            u32::try_from(pool_size).is_ok(),
            "pool_size must be at most u32::MAX"
        );

        Self {
            frames: (0..pool_size).map(|_| PageData::new()).collect(),
            descriptors: (0..pool_size).map(|_| FrameDescriptor::new()).collect(),
            page_table: PageTable::with_capacity(pool_size),
            replacer: ClockReplacer::new(pool_size),
            stats: BufferStats::default(),
            config,
        }
    }

    /// Shorthand for `new` with only the pool size set.
    pub fn with_capacity(pool_size: usize) -> Self {
        Self::new(BufferPoolConfig { pool_size })
    }

    pub fn config(&self) -> &BufferPoolConfig {
        &self.config
    }

    /// Number of frames in the pool.
    pub fn capacity(&self) -> usize {
        self.frames.len()
    }

    /// Number of frames currently holding a page.
    pub fn resident_count(&self) -> usize {
        self.page_table.len()
    }

    pub fn stats(&self) -> BufferStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = BufferStats::default();
    }

    /// Pins a page, reading it from `file` if it is not already cached.
    ///
    /// A hit sets the frame's reference bit and bumps its pin count without
    /// any I/O. A miss takes a frame from the clock, reads the page into
    /// it and registers it with pin count 1.
    ///
    /// # Errors
    ///
    /// - `PoolExhausted` if the page is not cached and one clock revolution
    ///   found every frame pinned or referenced
    /// - `Io` if evicting a dirty victim or reading the page fails; the
    ///   frame is left cleared and unmapped
    /// - `Index` / `BadBufferState` if the page table and descriptors disagree
    pub fn fetch_page(
        &mut self,
        file: &Arc<S>,
        page_id: PageId,
    ) -> Result<PageHandle, BufferPoolError> {
        let file_id = file.file_id();

        if let Some(frame_id) = self.page_table.lookup(file_id, page_id) {
            let desc = &mut self.descriptors[frame_id.index()];
            if !desc.holds(file_id, page_id) {
                return Err(BufferPoolError::BadBufferState(frame_id));
            }
            desc.pin();
            self.stats.accesses += 1;
            trace!("hit: {page_id} of {file_id} in frame {frame_id}, pin count {}", desc.pin_count);
            return Ok(PageHandle {
                frame_id,
                file: file_id,
                page_id,
            });
        }

        let frame_id = self.allocate_frame()?;
        let frame = &mut self.frames[frame_id.index()];
        if let Err(e) = file.read_page(page_id, frame.as_mut_slice()) {
            frame.zero();
            return Err(e.into());
        }

        self.install(file, page_id, frame_id)?;
        self.stats.disk_reads += 1;
        trace!("miss: read {page_id} of {file_id} into frame {frame_id}");

        Ok(PageHandle {
            frame_id,
            file: file_id,
            page_id,
        })
    }

    /// Drops one pin on a page, optionally marking it dirty.
    ///
    /// The dirty flag is sticky: releasing with `mark_dirty = false` never
    /// clears a flag set by an earlier release. Only a writeback clears it.
    ///
    /// # Errors
    ///
    /// - `PageNotFound` if the page is not resident
    /// - `NotPinned` if its pin count is already 0; nothing is changed
    pub fn release_page(
        &mut self,
        file: &S,
        page_id: PageId,
        mark_dirty: bool,
    ) -> Result<(), BufferPoolError> {
        let file_id = file.file_id();
        let frame_id = self
            .page_table
            .lookup(file_id, page_id)
            .ok_or(BufferPoolError::PageNotFound {
                file: file_id,
                page_id,
            })?;

        let desc = &mut self.descriptors[frame_id.index()];
        if !desc.unpin() {
            return Err(BufferPoolError::NotPinned {
                file: file_id,
                page_id,
            });
        }
        if mark_dirty {
            desc.dirty = true;
        }
        Ok(())
    }

    /// Allocates a fresh page in `file` and pins it in a zeroed frame.
    ///
    /// The frame is claimed before the page store is asked for a page, so
    /// an exhausted pool does not leak a page on disk. The caller is
    /// expected to fill the page and release it dirty.
    ///
    /// Stats are recorded as for a fetch miss: one access and one disk
    /// read, although the zero fill needs no read from the store.
    ///
    /// # Errors
    ///
    /// - `PoolExhausted` if one clock revolution found no victim
    /// - `Io` if evicting a dirty victim or allocating the page fails
    pub fn allocate_new_page(
        &mut self,
        file: &Arc<S>,
    ) -> Result<(PageId, PageHandle), BufferPoolError> {
        let frame_id = self.allocate_frame()?;
        let page_id = file.allocate_page()?;

        self.frames[frame_id.index()].zero();
        self.install(file, page_id, frame_id)?;
        self.stats.disk_reads += 1;
        debug!("allocated {page_id} of {} in frame {frame_id}", file.file_id());

        Ok((
            page_id,
            PageHandle {
                frame_id,
                file: file.file_id(),
                page_id,
            },
        ))
    }

    /// Drops a page from the pool and releases its space in `file`.
    ///
    /// A cached copy is discarded without writeback, whatever its pin count
    /// or dirty flag: callers must make sure nobody still uses the page.
    /// Disposing a page that is not cached is fine; the page store is still
    /// asked to free it.
    ///
    /// # Errors
    ///
    /// - `Io` if the page store refuses the disposal
    /// - `Index` if the page table and descriptors disagree
    pub fn dispose_page(&mut self, file: &S, page_id: PageId) -> Result<(), BufferPoolError> {
        let file_id = file.file_id();

        if let Some(frame_id) = self.page_table.lookup(file_id, page_id) {
            let desc = &mut self.descriptors[frame_id.index()];
            if desc.pin_count > 0 {
                warn!("disposing {page_id} of {file_id} with pin count {}", desc.pin_count);
            }
            desc.clear();
            self.page_table.remove(file_id, page_id)?;
            debug!("disposed cached {page_id} of {file_id} from frame {frame_id}");
        }

        file.dispose_page(page_id)?;
        Ok(())
    }

    /// Writes back and evicts every page of `file` from the pool.
    ///
    /// Frames are processed in frame order. The operation is not atomic:
    /// if it stops on a pinned page, frames earlier in the scan have
    /// already been written and evicted and stay that way.
    ///
    /// # Errors
    ///
    /// - `PagePinned` on the first resident page of `file` that is pinned
    /// - `Io` if a writeback fails
    /// - `BadBufferState` if a frame is tied to `file` without being valid
    pub fn flush_file(&mut self, file: &S) -> Result<(), BufferPoolError> {
        let file_id = file.file_id();
        let mut evicted = 0usize;

        for index in 0..self.descriptors.len() {
            let frame_id = FrameId::new(index);
            let desc = &self.descriptors[index];
            if !desc.belongs_to(file_id) {
                continue;
            }
            if !desc.valid {
                return Err(BufferPoolError::BadBufferState(frame_id));
            }
            if desc.pin_count > 0 {
                return Err(BufferPoolError::PagePinned {
                    file: file_id,
                    page_id: desc.page_id,
                });
            }

            let page_id = desc.page_id;
            self.write_back(frame_id)?;
            self.page_table.remove(file_id, page_id)?;
            self.descriptors[index].clear();
            evicted += 1;
        }

        debug!("flushed {file_id}: {evicted} frames released");
        Ok(())
    }

    /// Writes back every dirty frame without evicting anything, then syncs
    /// each file that was written to.
    ///
    /// Pinned frames are written too; they stay pinned and resident.
    ///
    /// # Errors
    ///
    /// Returns the first write or sync failure. Frames written before it
    /// are clean.
    pub fn flush_all(&mut self) -> Result<(), BufferPoolError> {
        let mut written: BTreeMap<FileId, Arc<S>> = BTreeMap::new();

        for index in 0..self.descriptors.len() {
            let desc = &self.descriptors[index];
            if !(desc.valid && desc.dirty) {
                continue;
            }
            if let Some(file) = &desc.file {
                written.entry(file.file_id()).or_insert_with(|| Arc::clone(file));
            }
            self.write_back(FrameId::new(index))?;
        }

        for file in written.values() {
            file.sync_all()?;
        }
        Ok(())
    }

    /// Returns the bytes of a pinned page.
    ///
    /// # Errors
    ///
    /// `PageNotFound` if the handle's frame no longer holds its page pinned.
    pub fn page(&self, handle: &PageHandle) -> Result<&[u8], BufferPoolError> {
        self.check_handle(handle)?;
        Ok(self.frames[handle.frame_id.index()].as_slice())
    }

    /// Returns the bytes of a pinned page for modification.
    ///
    /// Modifying the bytes does not mark the page dirty; pass
    /// `mark_dirty = true` to `release_page` for that.
    ///
    /// # Errors
    ///
    /// `PageNotFound` if the handle's frame no longer holds its page pinned.
    pub fn page_mut(&mut self, handle: &PageHandle) -> Result<&mut [u8], BufferPoolError> {
        self.check_handle(handle)?;
        Ok(self.frames[handle.frame_id.index()].as_mut_slice())
    }

    /// Pin count of a resident page.
    pub fn pin_count(&self, file: &S, page_id: PageId) -> Option<u32> {
        self.descriptor_of(file.file_id(), page_id).map(|d| d.pin_count)
    }

    /// Dirty flag of a resident page.
    pub fn is_dirty(&self, file: &S, page_id: PageId) -> Option<bool> {
        self.descriptor_of(file.file_id(), page_id).map(|d| d.dirty)
    }

    /// Frame caching a page, if any.
    pub fn frame_of(&self, file: &S, page_id: PageId) -> Option<FrameId> {
        self.page_table.lookup(file.file_id(), page_id)
    }

    /// Read-only snapshot of every frame, in frame order.
    pub fn frames(&self) -> impl Iterator<Item = FrameInfo> + '_ {
        self.descriptors
            .iter()
            .enumerate()
            .map(|(index, desc)| desc.info(FrameId::new(index)))
    }

    /// Checks the frame table against the page table.
    ///
    /// Verifies that cleared frames are fully reset and that valid frames
    /// and page table entries match one to one.
    ///
    /// # Errors
    ///
    /// `BadBufferState` naming the first offending frame.
    pub fn verify(&self) -> Result<(), BufferPoolError> {
        for (index, desc) in self.descriptors.iter().enumerate() {
            let frame_id = FrameId::new(index);
            if !desc.is_consistent() {
                return Err(BufferPoolError::BadBufferState(frame_id));
            }
            if let Some((file_id, page_id)) = desc.identity()
                && self.page_table.lookup(file_id, page_id) != Some(frame_id)
            {
                return Err(BufferPoolError::BadBufferState(frame_id));
            }
        }

        for ((file_id, page_id), frame_id) in self.page_table.iter() {
            if !self.descriptors[frame_id.index()].holds(file_id, page_id) {
                return Err(BufferPoolError::BadBufferState(frame_id));
            }
        }
        Ok(())
    }

    /// Obtains an empty frame, evicting the clock's victim if needed.
    ///
    /// A dirty victim is written back first (one disk write), then its
    /// page table entry is removed and its descriptor cleared. If the
    /// writeback fails the victim stays resident, dirty and mapped.
    fn allocate_frame(&mut self) -> Result<FrameId, BufferPoolError> {
        let frame_id = self
            .replacer
            .victim(&mut self.descriptors)
            .ok_or(BufferPoolError::PoolExhausted)?;

        let desc = &self.descriptors[frame_id.index()];
        if desc.valid {
            let Some(file_id) = desc.file_id() else {
                return Err(BufferPoolError::BadBufferState(frame_id));
            };
            let page_id = desc.page_id;

            self.write_back(frame_id)?;
            self.page_table.remove(file_id, page_id)?;
            debug!("evicted {page_id} of {file_id} from frame {frame_id}");
        }

        self.descriptors[frame_id.index()].clear();
        Ok(frame_id)
    }

    /// Registers a freshly filled frame and pins it once.
    fn install(
        &mut self,
        file: &Arc<S>,
        page_id: PageId,
        frame_id: FrameId,
    ) -> Result<(), BufferPoolError> {
        self.page_table.insert(file.file_id(), page_id, frame_id)?;
        self.descriptors[frame_id.index()].set(Arc::clone(file), page_id);
        self.stats.accesses += 1;
        Ok(())
    }

    /// Writes a frame to its page store if dirty, then clears the flag.
    fn write_back(&mut self, frame_id: FrameId) -> Result<(), BufferPoolError> {
        let desc = &mut self.descriptors[frame_id.index()];
        if !desc.dirty {
            return Ok(());
        }
        let Some(file) = &desc.file else {
            return Err(BufferPoolError::BadBufferState(frame_id));
        };

        file.write_page(desc.page_id, self.frames[frame_id.index()].as_slice())?;
        trace!("wrote {} of {} from frame {frame_id}", desc.page_id, file.file_id());
        desc.dirty = false;
        self.stats.disk_writes += 1;
        Ok(())
    }

    fn descriptor_of(&self, file_id: FileId, page_id: PageId) -> Option<&FrameDescriptor<S>> {
        self.page_table
            .lookup(file_id, page_id)
            .map(|frame_id| &self.descriptors[frame_id.index()])
    }

    fn check_handle(&self, handle: &PageHandle) -> Result<(), BufferPoolError> {
        let desc = &self.descriptors[handle.frame_id.index()];
        if desc.holds(handle.file, handle.page_id) && desc.pin_count > 0 {
            return Ok(());
        }
        Err(BufferPoolError::PageNotFound {
            file: handle.file,
            page_id: handle.page_id,
        })
    }
}

impl<S: Storage> Drop for BufferManager<S> {
    fn drop(&mut self) {
        for (index, desc) in self.descriptors.iter_mut().enumerate() {
            if !(desc.valid && desc.dirty) {
                continue;
            }
            if desc.pin_count > 0 {
                warn!(
                    "frame {index} ({}) still pinned {} times at shutdown",
                    desc.page_id, desc.pin_count
                );
            }
            let Some(file) = &desc.file else {
                continue;
            };
            match file.write_page(desc.page_id, self.frames[index].as_slice()) {
                Ok(()) => {
                    desc.dirty = false;
                    self.stats.disk_writes += 1;
                }
                Err(e) => warn!(
                    "lost dirty {} of {} at shutdown: {e}",
                    desc.page_id,
                    file.file_id()
                ),
            }
        }
    }
}

impl<S: Storage> fmt::Display for BufferManager<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "buffer pool: {} frames, {} resident, clock hand at {}",
            self.capacity(),
            self.resident_count(),
            self.replacer.hand()
        )?;
        for info in self.frames() {
            write!(f, "{:>5}  pin {:>3}", info.frame_id.index(), info.pin_count)?;
            match info.page {
                Some((file_id, page_id)) => write!(f, "  {file_id} {page_id}")?,
                None => write!(f, "  free")?,
            }
            if info.dirty {
                write!(f, "  dirty")?;
            }
            if info.referenced {
                write!(f, "  ref")?;
            }
            writeln!(f)?;
        }
        write!(f, "{}", self.stats)
    }
}
