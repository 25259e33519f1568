use super::window::Window;

/// Control directive returned by [`App::update`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract driven by the frame loop.
///
/// Every callback except [`App::render`] defaults to doing nothing.
pub trait App {
    /// Called once, after the renderer is initialized.
    fn start(&mut self, window: &mut dyn Window) {
        let _ = window;
    }

    /// Called once per frame before rendering, with the previous frame's
    /// delta time in seconds.
    fn update(&mut self, window: &mut dyn Window, dt: f64) -> AppControl {
        let _ = (window, dt);
        AppControl::Continue
    }

    /// Called once per frame.
    fn render(&mut self, window: &mut dyn Window);

    /// Called by [`FrameLoop`](super::FrameLoop) before a frame when the
    /// window size changed since the previous one.
    fn resize(&mut self, window: &mut dyn Window, width: u32, height: u32) {
        let _ = (window, width, height);
    }

    /// Called before a frame when the window became visible again.
    fn show(&mut self, window: &mut dyn Window) {
        let _ = window;
    }

    /// Called before a frame when the window became hidden.
    fn hide(&mut self, window: &mut dyn Window) {
        let _ = window;
    }

    /// Called once when the loop ends, before the renderer is dropped.
    fn destroy(&mut self, window: &mut dyn Window) {
        let _ = window;
    }
}
