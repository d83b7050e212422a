//! Page-aligned buffer backing one frame or one in-memory page.

use std::alloc::{Layout, alloc_zeroed, dealloc};
use std::fmt;
use std::ptr::NonNull;

use super::PAGE_SIZE;

/// OS page size used as the buffer alignment.
const OS_PAGE_ALIGNMENT: usize = 4096;

/// A zero-initialised, `PAGE_SIZE`-byte buffer aligned to the OS page size.
///
/// The buffer pool allocates one of these per frame when it is constructed
/// and never reallocates them, so a frame's address is stable for the
/// lifetime of the pool.
///
/// # Safety
///
/// - `ptr` is valid for `PAGE_SIZE` bytes and aligned to `OS_PAGE_ALIGNMENT`
/// - the allocation is released exactly once, in `Drop`
pub struct PageData {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl PageData {
    /// Allocates a new zeroed page buffer.
    ///
    /// # Panics
    ///
    /// Panics if the allocator returns null (out of memory).
    pub fn new() -> Self {
        let layout = Layout::from_size_align(PAGE_SIZE, OS_PAGE_ALIGNMENT)
            .expect("PAGE_SIZE and OS_PAGE_ALIGNMENT form a valid layout");

        // SAFETY: layout has non-zero size and a power-of-two alignment
        let ptr = unsafe { alloc_zeroed(layout) };
        let ptr = NonNull::new(ptr).expect("page allocation failed");

        Self { ptr, layout }
    }

    /// Returns the page bytes.
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: ptr is valid for layout.size() bytes
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.layout.size()) }
    }

    /// Returns the page bytes mutably.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: ptr is valid for layout.size() bytes and we hold &mut self
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.layout.size()) }
    }

    /// Overwrites the whole page with zeros.
    pub fn zero(&mut self) {
        self.as_mut_slice().fill(0);
    }
}

impl Default for PageData {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PageData {
    fn drop(&mut self) {
        // SAFETY: ptr and layout are the ones passed to alloc_zeroed()
        unsafe {
            dealloc(self.ptr.as_ptr(), self.layout);
        }
    }
}

// SAFETY: PageData owns its allocation outright
unsafe impl Send for PageData {}
// SAFETY: shared access only hands out &[u8]
unsafe impl Sync for PageData {}

impl AsRef<[u8]> for PageData {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl AsMut<[u8]> for PageData {
    fn as_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}

impl fmt::Debug for PageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageData")
            .field("addr", &self.ptr)
            .field("len", &self.layout.size())
            .finish()
    }
}
