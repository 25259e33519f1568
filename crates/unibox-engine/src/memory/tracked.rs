use std::alloc::{GlobalAlloc, Layout, System};
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::logging::EXIT_ENOMEM;

use super::MemoryStats;

/// Size of the per-block header in bytes.
///
/// Eight machine words keep the user pointer aligned for SIMD loads and
/// cache lines.
pub const HEADER_SIZE: usize = size_of::<usize>() * 8;

/// Alignment of blocks handed out by the raw API.
const RAW_ALIGN: usize = 16;

/// Allocator wrapper that accounts for every live block.
///
/// Counters are updated atomically, so allocation and release may happen on
/// worker threads while the render thread reads usage for diagnostics.
#[derive(Debug)]
pub struct TrackedAllocator {
    blocks: AtomicUsize,
    used: AtomicUsize,
}

impl TrackedAllocator {
    pub const fn new() -> Self {
        Self {
            blocks: AtomicUsize::new(0),
            used: AtomicUsize::new(0),
        }
    }

    /// Allocates `size` usable bytes.
    ///
    /// Never returns on failure; see [`TrackedAllocator::alloc_error`].
    pub fn alloc(&self, size: usize) -> NonNull<u8> {
        let layout = self.raw_layout(size);
        // SAFETY: raw_layout never produces a zero-sized layout.
        let raw = unsafe { System.alloc(layout) };
        self.finish_alloc(raw, size)
    }

    /// Allocates `count * size` zeroed bytes.
    pub fn alloc_zeroed(&self, count: usize, size: usize) -> NonNull<u8> {
        let Some(total) = count.checked_mul(size) else {
            self.alloc_error();
        };
        let layout = self.raw_layout(total);
        // SAFETY: raw_layout never produces a zero-sized layout.
        let raw = unsafe { System.alloc_zeroed(layout) };
        self.finish_alloc(raw, total)
    }

    /// Resizes a block, moving it if needed. A `None` pointer allocates.
    ///
    /// # Safety
    /// `ptr` must come from this allocator's raw API and must not have been
    /// freed.
    pub unsafe fn realloc(&self, ptr: Option<NonNull<u8>>, new_size: usize) -> NonNull<u8> {
        let Some(ptr) = ptr else {
            return self.alloc(new_size);
        };

        // SAFETY: the caller guarantees `ptr` is a live raw-API block.
        let (raw, old_size) = unsafe { Self::header_of(ptr) };
        let old_layout = self.raw_layout(old_size);
        // Same size checks as a fresh allocation.
        let new_layout = self.raw_layout(new_size);

        // SAFETY: `raw` was allocated by System with `old_layout`, and
        // `new_layout` has the same alignment and a valid size.
        let new_raw = unsafe { System.realloc(raw.as_ptr(), old_layout, new_layout.size()) };
        if new_raw.is_null() {
            self.alloc_error();
        }

        // SAFETY: `new_raw` is non-null and at least HEADER_SIZE bytes long.
        unsafe { (new_raw as *mut usize).write(new_size) };
        self.resize_accounting(old_size, new_size);

        // SAFETY: the block extends HEADER_SIZE + new_size bytes past `new_raw`.
        unsafe { NonNull::new_unchecked(new_raw.add(HEADER_SIZE)) }
    }

    /// Releases a block.
    ///
    /// # Safety
    /// `ptr` must come from this allocator's raw API and must not have been
    /// freed already. Foreign pointers are undefined behavior.
    pub unsafe fn free(&self, ptr: NonNull<u8>) {
        // SAFETY: guaranteed by the caller.
        let (raw, size) = unsafe { Self::header_of(ptr) };
        self.used.fetch_sub(size, Ordering::Relaxed);
        self.blocks.fetch_sub(1, Ordering::Relaxed);
        // SAFETY: `raw` was allocated by System with this layout.
        unsafe { System.dealloc(raw.as_ptr(), self.raw_layout(size)) };
    }

    /// Returns the usable size stored in a raw-API block header.
    ///
    /// # Safety
    /// `ptr` must be a live block returned by this allocator's raw API.
    pub unsafe fn block_size(ptr: NonNull<u8>) -> usize {
        // SAFETY: guaranteed by the caller.
        unsafe { Self::header_of(ptr).1 }
    }

    pub fn header_size(&self) -> usize {
        HEADER_SIZE
    }

    pub fn total_allocated_blocks(&self) -> usize {
        self.blocks.load(Ordering::Relaxed)
    }

    /// Usable bytes currently held, headers excluded.
    pub fn used_size(&self) -> usize {
        self.used.load(Ordering::Relaxed)
    }

    /// Usable bytes plus one header per live block.
    pub fn absolute_used_size(&self) -> usize {
        self.used_size() + HEADER_SIZE * self.total_allocated_blocks()
    }

    pub fn used_size_kb(&self) -> f64 {
        self.used_size() as f64 / 1024.0
    }

    pub fn used_size_mb(&self) -> f64 {
        self.used_size_kb() / 1024.0
    }

    pub fn used_size_gb(&self) -> f64 {
        self.used_size_mb() / 1024.0
    }

    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            blocks: self.total_allocated_blocks(),
            used_bytes: self.used_size(),
            header_bytes: HEADER_SIZE * self.total_allocated_blocks(),
        }
    }

    /// Reports current usage and terminates the process.
    ///
    /// Writes straight to stderr: this can run inside the global allocator,
    /// where the logger must not be re-entered.
    pub fn alloc_error(&self) -> ! {
        eprintln!("\n\n----------------\n");
        eprintln!("Memory Allocation Error!");
        eprintln!(
            "Memory used: {} kb ({} b).",
            self.used_size_kb(),
            self.used_size()
        );
        eprintln!("\n----------------\n");
        std::process::exit(EXIT_ENOMEM)
    }

    fn raw_layout(&self, size: usize) -> Layout {
        HEADER_SIZE
            .checked_add(size)
            .and_then(|total| Layout::from_size_align(total, RAW_ALIGN).ok())
            .unwrap_or_else(|| self.alloc_error())
    }

    fn finish_alloc(&self, raw: *mut u8, size: usize) -> NonNull<u8> {
        if raw.is_null() {
            self.alloc_error();
        }
        // SAFETY: `raw` is non-null, aligned to RAW_ALIGN and holds a header.
        unsafe {
            (raw as *mut usize).write(size);
            self.track(size);
            NonNull::new_unchecked(raw.add(HEADER_SIZE))
        }
    }

    unsafe fn header_of(ptr: NonNull<u8>) -> (NonNull<u8>, usize) {
        // SAFETY: raw-API blocks start HEADER_SIZE bytes before `ptr`.
        unsafe {
            let raw = ptr.as_ptr().sub(HEADER_SIZE);
            (NonNull::new_unchecked(raw), (raw as *const usize).read())
        }
    }

    fn track(&self, size: usize) {
        self.used.fetch_add(size, Ordering::Relaxed);
        self.blocks.fetch_add(1, Ordering::Relaxed);
    }

    fn resize_accounting(&self, old_size: usize, new_size: usize) {
        if new_size >= old_size {
            self.used.fetch_add(new_size - old_size, Ordering::Relaxed);
        } else {
            self.used.fetch_sub(old_size - new_size, Ordering::Relaxed);
        }
    }
}

impl Default for TrackedAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Header length for a layout: large enough to keep `align` intact.
fn global_header_len(align: usize) -> usize {
    HEADER_SIZE.max(align)
}

fn global_raw_layout(layout: Layout, size: usize) -> Option<Layout> {
    let header = global_header_len(layout.align());
    let total = header.checked_add(size)?;
    Layout::from_size_align(total, layout.align().max(RAW_ALIGN)).ok()
}

// SAFETY: every block is forwarded to `System` with a layout that covers the
// header and keeps the caller's alignment; dealloc/realloc recompute the
// same layout from the caller-provided one.
unsafe impl GlobalAlloc for TrackedAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let Some(raw_layout) = global_raw_layout(layout, layout.size()) else {
            return ptr::null_mut();
        };
        // SAFETY: raw_layout includes the header, so it is never zero-sized.
        let raw = unsafe { System.alloc(raw_layout) };
        if raw.is_null() {
            self.alloc_error();
        }
        // SAFETY: `raw` is aligned for usize and the header fits before the block.
        unsafe {
            (raw as *mut usize).write(layout.size());
            self.track(layout.size());
            raw.add(global_header_len(layout.align()))
        }
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let Some(raw_layout) = global_raw_layout(layout, layout.size()) else {
            return ptr::null_mut();
        };
        // SAFETY: as in `alloc`.
        let raw = unsafe { System.alloc_zeroed(raw_layout) };
        if raw.is_null() {
            self.alloc_error();
        }
        // SAFETY: as in `alloc`.
        unsafe {
            (raw as *mut usize).write(layout.size());
            self.track(layout.size());
            raw.add(global_header_len(layout.align()))
        }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        let header = global_header_len(layout.align());
        // SAFETY: `ptr` was returned by `alloc` with this layout.
        unsafe {
            let raw = ptr.sub(header);
            let size = (raw as *const usize).read();
            self.used.fetch_sub(size, Ordering::Relaxed);
            self.blocks.fetch_sub(1, Ordering::Relaxed);
            if let Some(raw_layout) = global_raw_layout(layout, size) {
                System.dealloc(raw, raw_layout);
            }
        }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let header = global_header_len(layout.align());
        let (Some(old_raw_layout), Some(new_total)) = (
            global_raw_layout(layout, layout.size()),
            header.checked_add(new_size),
        ) else {
            return ptr::null_mut();
        };

        // SAFETY: `ptr` was returned by `alloc` with `layout`.
        unsafe {
            let raw = ptr.sub(header);
            let old_size = (raw as *const usize).read();
            let new_raw = System.realloc(raw, old_raw_layout, new_total);
            if new_raw.is_null() {
                self.alloc_error();
            }
            (new_raw as *mut usize).write(new_size);
            self.resize_accounting(old_size, new_size);
            new_raw.add(header)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── raw API ───────────────────────────────────────────────────────────

    #[test]
    fn alloc_and_free_update_counters() {
        let a = TrackedAllocator::new();
        let p = a.alloc(100);
        let q = a.alloc(28);
        assert_eq!(a.total_allocated_blocks(), 2);
        assert_eq!(a.used_size(), 128);
        assert_eq!(a.absolute_used_size(), 128 + 2 * HEADER_SIZE);

        unsafe { a.free(p) };
        assert_eq!(a.total_allocated_blocks(), 1);
        assert_eq!(a.used_size(), 28);

        unsafe { a.free(q) };
        assert_eq!(a.total_allocated_blocks(), 0);
        assert_eq!(a.used_size(), 0);
    }

    #[test]
    fn block_size_reads_header() {
        let a = TrackedAllocator::new();
        let p = a.alloc(77);
        assert_eq!(unsafe { TrackedAllocator::block_size(p) }, 77);
        unsafe { a.free(p) };
    }

    #[test]
    fn alloc_zeroed_is_zero_filled() {
        let a = TrackedAllocator::new();
        let p = a.alloc_zeroed(16, 4);
        let bytes = unsafe { std::slice::from_raw_parts(p.as_ptr(), 64) };
        assert!(bytes.iter().all(|&b| b == 0));
        assert_eq!(a.used_size(), 64);
        unsafe { a.free(p) };
    }

    #[test]
    fn realloc_none_behaves_like_alloc() {
        let a = TrackedAllocator::new();
        let p = unsafe { a.realloc(None, 40) };
        assert_eq!(a.total_allocated_blocks(), 1);
        assert_eq!(a.used_size(), 40);
        unsafe { a.free(p) };
    }

    #[test]
    fn realloc_preserves_contents_and_adjusts_usage() {
        let a = TrackedAllocator::new();
        let p = a.alloc(8);
        unsafe {
            for i in 0..8 {
                p.as_ptr().add(i).write(i as u8);
            }
        }

        let grown = unsafe { a.realloc(Some(p), 64) };
        assert_eq!(a.used_size(), 64);
        assert_eq!(a.total_allocated_blocks(), 1);
        let bytes = unsafe { std::slice::from_raw_parts(grown.as_ptr(), 8) };
        assert_eq!(bytes, &[0, 1, 2, 3, 4, 5, 6, 7]);

        let shrunk = unsafe { a.realloc(Some(grown), 4) };
        assert_eq!(a.used_size(), 4);
        unsafe { a.free(shrunk) };
        assert_eq!(a.used_size(), 0);
    }

    #[test]
    fn realloc_rewrites_block_header() {
        let a = TrackedAllocator::new();
        let p = a.alloc(10);
        let q = unsafe { a.realloc(Some(p), 1000) };
        assert_eq!(unsafe { TrackedAllocator::block_size(q) }, 1000);
        assert_eq!(a.absolute_used_size(), 1000 + HEADER_SIZE);
        unsafe { a.free(q) };
    }

    #[test]
    fn unit_views_scale_bytes() {
        let a = TrackedAllocator::new();
        let p = a.alloc(2048);
        assert_eq!(a.used_size_kb(), 2.0);
        assert!((a.used_size_mb() - 2.0 / 1024.0).abs() < 1e-12);
        unsafe { a.free(p) };
    }

    // ── concurrency ───────────────────────────────────────────────────────

    #[test]
    fn counters_stay_exact_across_threads() {
        let a = TrackedAllocator::new();

        std::thread::scope(|s| {
            for t in 0..8usize {
                let a = &a;
                s.spawn(move || {
                    let mut live = Vec::new();
                    for i in 0..200usize {
                        live.push(a.alloc(t + i % 13 + 1).as_ptr() as usize);
                        if i % 3 == 0 {
                            let addr = live.swap_remove(0);
                            unsafe { a.free(NonNull::new_unchecked(addr as *mut u8)) };
                        }
                    }
                    // Keep a deterministic residue per thread: one block of t + 1 bytes.
                    for addr in live {
                        unsafe { a.free(NonNull::new_unchecked(addr as *mut u8)) };
                    }
                    let keep = a.alloc(t + 1);
                    keep.as_ptr() as usize
                });
            }
        });

        let expected: usize = (0..8).map(|t| t + 1).sum();
        assert_eq!(a.total_allocated_blocks(), 8);
        assert_eq!(a.used_size(), expected);
    }

    // ── GlobalAlloc ───────────────────────────────────────────────────────

    #[test]
    fn global_alloc_honours_large_alignment() {
        let a = TrackedAllocator::new();
        let layout = Layout::from_size_align(100, 256).unwrap();
        unsafe {
            let p = GlobalAlloc::alloc(&a, layout);
            assert!(!p.is_null());
            assert_eq!(p as usize % 256, 0);
            assert_eq!(a.used_size(), 100);

            let p = GlobalAlloc::realloc(&a, p, layout, 300);
            assert_eq!(p as usize % 256, 0);
            assert_eq!(a.used_size(), 300);

            let grown = Layout::from_size_align(300, 256).unwrap();
            GlobalAlloc::dealloc(&a, p, grown);
        }
        assert_eq!(a.used_size(), 0);
        assert_eq!(a.total_allocated_blocks(), 0);
    }

    #[test]
    fn global_alloc_zeroed_counts_block() {
        let a = TrackedAllocator::new();
        let layout = Layout::from_size_align(32, 8).unwrap();
        unsafe {
            let p = GlobalAlloc::alloc_zeroed(&a, layout);
            assert!(std::slice::from_raw_parts(p, 32).iter().all(|&b| b == 0));
            assert_eq!(a.total_allocated_blocks(), 1);
            GlobalAlloc::dealloc(&a, p, layout);
        }
        assert_eq!(a.total_allocated_blocks(), 0);
    }
}
