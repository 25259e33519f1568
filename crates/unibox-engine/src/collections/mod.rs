//! Containers used by the engine's resource bookkeeping.

mod darray;

pub use darray::{DArray, DEFAULT_CAPACITY};
