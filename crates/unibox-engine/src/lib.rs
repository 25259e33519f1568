//! Unibox engine crate.
//!
//! A small real-time rendering engine: an OpenGL device seam, shader
//! programs with uniform caching, textures, 2D/3D cameras and deferred
//! device-object deletion, plus a size-tracking global allocator.

pub mod collections;
pub mod coords;
pub mod core;
pub mod device;
pub mod logging;
pub mod memory;
pub mod render;
pub mod time;
