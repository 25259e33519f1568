use std::ptr::NonNull;

use super::TrackedAllocator;

/// Owned block from a [`TrackedAllocator`], freed on drop.
pub struct TrackedBlock<'a> {
    alloc: &'a TrackedAllocator,
    ptr: NonNull<u8>,
    len: usize,
}

impl<'a> TrackedBlock<'a> {
    pub fn new(alloc: &'a TrackedAllocator, len: usize) -> Self {
        Self { alloc, ptr: alloc.alloc(len), len }
    }

    pub fn zeroed(alloc: &'a TrackedAllocator, count: usize, size: usize) -> Self {
        let ptr = alloc.alloc_zeroed(count, size);
        // SAFETY: `ptr` is a live raw-API block.
        let len = unsafe { TrackedAllocator::block_size(ptr) };
        Self { alloc, ptr, len }
    }

    /// Copies `s` into a fresh block, NUL-terminated.
    pub fn duplicate_str(alloc: &'a TrackedAllocator, s: &str) -> Self {
        let mut block = Self::new(alloc, s.len() + 1);
        let bytes = block.as_mut_slice();
        bytes[..s.len()].copy_from_slice(s.as_bytes());
        bytes[s.len()] = 0;
        block
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: the block owns `len` bytes starting at `ptr`.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as above, and `&mut self` guarantees exclusivity.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Grows or shrinks the block, keeping the common prefix. Bytes past the
    /// old length are zeroed.
    pub fn resize(&mut self, new_len: usize) {
        // SAFETY: `ptr` is a live block owned by this wrapper.
        self.ptr = unsafe { self.alloc.realloc(Some(self.ptr), new_len) };
        if new_len > self.len {
            // SAFETY: the block now holds `new_len` bytes.
            unsafe {
                self.ptr
                    .as_ptr()
                    .add(self.len)
                    .write_bytes(0, new_len - self.len);
            }
        }
        self.len = new_len;
    }
}

impl Drop for TrackedBlock<'_> {
    fn drop(&mut self) {
        // SAFETY: `ptr` is a live block owned by this wrapper.
        unsafe { self.alloc.free(self.ptr) };
    }
}

impl std::fmt::Debug for TrackedBlock<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedBlock").field("len", &self.len).finish()
    }
}
