use std::rc::Rc;

use crate::device::HeadlessGl;
use crate::render::{GlConfig, GlRenderer, Renderer};
use crate::time::{ClockConfig, FrameClock};

use super::window::Window;

/// Offscreen window backed by a [`HeadlessGl`] device.
///
/// `display` only advances the frame clock, so frame loops run without a
/// display server. The device stays inspectable through [`HeadlessWindow::gl`].
pub struct HeadlessWindow {
    width: u32,
    height: u32,
    gl: Rc<HeadlessGl>,
    renderer: GlRenderer,
    clock: FrameClock,
    frames: u64,
    visible: bool,
}

impl HeadlessWindow {
    /// Creates the window with an initialized renderer and no frame cap.
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_clock(width, height, ClockConfig::unlimited())
    }

    pub fn with_clock(width: u32, height: u32, clock: ClockConfig) -> Self {
        let gl = Rc::new(HeadlessGl::new());
        let mut renderer = GlRenderer::new(gl.clone(), GlConfig::default());
        renderer.init();
        log::debug!("headless window {width}x{height} ready");
        Self {
            width,
            height,
            gl,
            renderer,
            clock: FrameClock::with_config(clock),
            frames: 0,
            visible: true,
        }
    }

    pub fn gl(&self) -> &HeadlessGl {
        &self.gl
    }

    pub fn gl_renderer(&mut self) -> &mut GlRenderer {
        &mut self.renderer
    }

    /// Frames presented so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}

impl Window for HeadlessWindow {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn dtime(&self) -> f64 {
        self.clock.dt()
    }

    fn renderer(&mut self) -> &mut dyn Renderer {
        &mut self.renderer
    }

    fn display(&mut self) {
        self.clock.wait_for_next_frame();
        self.clock.tick();
        self.frames += 1;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_window_has_initialized_renderer() {
        let mut w = HeadlessWindow::new(320, 200);
        assert_eq!(w.size(), (320, 200));
        assert!(w.gl_renderer().is_initialized());
        let id = w.renderer().default_shader().unwrap().id();
        assert!(w.gl().is_program(id));
    }

    #[test]
    fn display_counts_frames_and_updates_dtime() {
        let mut w = HeadlessWindow::new(1, 1);
        w.display();
        w.display();
        assert_eq!(w.frames(), 2);
        assert!(w.dtime() > 0.0);
    }

    #[test]
    fn visibility_follows_set_visible() {
        let mut w = HeadlessWindow::new(1, 1);
        assert!(w.is_visible());
        w.set_visible(false);
        assert!(!w.is_visible());
    }
}
