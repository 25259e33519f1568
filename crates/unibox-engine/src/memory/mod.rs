//! Tracked memory allocation.
//!
//! Every block handed out by [`TrackedAllocator`] carries a small header
//! holding its usable size, and two atomic counters record how many blocks
//! are live and how many bytes they hold. The allocator can be used directly
//! through its raw API or installed process-wide:
//!
//! ```ignore
//! #[global_allocator]
//! static ALLOC: unibox_engine::memory::TrackedAllocator =
//!     unibox_engine::memory::TrackedAllocator::new();
//! ```
//!
//! Allocation failure is fatal: usage is reported and the process exits.

mod block;
mod stats;
mod tracked;

pub use block::TrackedBlock;
pub use stats::MemoryStats;
pub use tracked::{TrackedAllocator, HEADER_SIZE};
