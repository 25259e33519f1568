//! Small value types shared by the renderer and cameras.
//!
//! Positions, sizes and matrices use `glam`; the types here only cover
//! what the device layer consumes directly.

mod color;
mod viewport;

pub use color::ColorRgba;
pub use viewport::Viewport;
