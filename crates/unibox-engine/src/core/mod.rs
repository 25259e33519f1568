//! Core engine-facing contracts.
//!
//! This module defines the stable interface between the window layer
//! (platform loop) and application code. Window creation and input are
//! provided by the embedding program through [`Window`]; the engine only
//! drives frames through it.

mod app;
mod frame;
mod headless;
mod window;

pub use app::{App, AppControl};
pub use frame::{FrameLoop, run, run_frame};
pub use headless::HeadlessWindow;
pub use window::Window;
