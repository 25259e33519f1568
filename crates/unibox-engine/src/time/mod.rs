//! Time subsystem.
//!
//! Provides stable, testable frame timing utilities without coupling to the window layer.
//! Intended usage:
//! - one `FrameClock` per window (or per render loop)
//! - call `tick()` once per presented frame to obtain `FrameTime`
//! - call `wait_for_next_frame()` before presenting to cap the frame rate

mod frame_clock;

pub use frame_clock::{ClockConfig, FrameClock, FrameTime};
