use super::app::{App, AppControl};
use super::window::Window;

/// Runs one frame: `update`, `render`, graveyard flush, `display`.
///
/// When `update` asks to exit, nothing is rendered or presented.
pub fn run_frame(window: &mut dyn Window, app: &mut dyn App) -> AppControl {
    let dt = window.dtime();
    if app.update(window, dt) == AppControl::Exit {
        return AppControl::Exit;
    }
    app.render(window);
    window.renderer().buffers_flush();
    window.display();
    AppControl::Continue
}

/// Frame driver that also reports window changes to the app.
///
/// Each [`FrameLoop::step`] compares the window's size and visibility with
/// what the previous step saw and calls [`App::resize`], [`App::show`] or
/// [`App::hide`] before running the frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameLoop {
    size: (u32, u32),
    visible: bool,
}

impl FrameLoop {
    /// Starts from the window's current state; nothing is reported for it.
    pub fn new(window: &dyn Window) -> Self {
        Self {
            size: window.size(),
            visible: window.is_visible(),
        }
    }

    pub fn step(&mut self, window: &mut dyn Window, app: &mut dyn App) -> AppControl {
        let size = window.size();
        if size != self.size {
            log::debug!("window resized to {}x{}", size.0, size.1);
            self.size = size;
            app.resize(window, size.0, size.1);
        }

        let visible = window.is_visible();
        if visible != self.visible {
            self.visible = visible;
            if visible {
                app.show(window);
            } else {
                app.hide(window);
            }
        }

        run_frame(window, app)
    }
}

/// Starts `app` and runs frames until it asks to exit.
pub fn run(window: &mut dyn Window, app: &mut dyn App) {
    app.start(window);
    let mut frame_loop = FrameLoop::new(window);
    let mut frames = 0u64;
    while frame_loop.step(window, app) == AppControl::Continue {
        frames += 1;
    }
    log::debug!("frame loop exited after {frames} frames");
    app.destroy(window);
    window.renderer().buffers_flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::HeadlessWindow;
    use crate::coords::ColorRgba;
    use crate::device::{GlCall, GpuObjectKind};
    use crate::render::{Renderer, Texture};

    #[derive(Default)]
    struct Recorder {
        events: Vec<&'static str>,
        frames_left: u32,
        texture: Option<Texture>,
    }

    impl App for Recorder {
        fn start(&mut self, _window: &mut dyn Window) {
            self.events.push("start");
        }

        fn update(&mut self, _window: &mut dyn Window, dt: f64) -> AppControl {
            assert!(dt >= 0.0);
            self.events.push("update");
            if self.frames_left == 0 {
                return AppControl::Exit;
            }
            self.frames_left -= 1;
            AppControl::Continue
        }

        fn render(&mut self, window: &mut dyn Window) {
            self.events.push("render");
            window.renderer().clear(ColorRgba::black());
        }

        fn resize(&mut self, _window: &mut dyn Window, width: u32, height: u32) {
            assert_eq!((width, height), (64, 48));
            self.events.push("resize");
        }

        fn show(&mut self, _window: &mut dyn Window) {
            self.events.push("show");
        }

        fn hide(&mut self, _window: &mut dyn Window) {
            self.events.push("hide");
        }

        fn destroy(&mut self, _window: &mut dyn Window) {
            self.events.push("destroy");
            self.texture = None;
        }
    }

    #[test]
    fn frame_order_is_update_render_flush_display() {
        let mut w = HeadlessWindow::new(32, 32);
        let mut app = Recorder { frames_left: 1, ..Default::default() };
        w.gl().clear_calls();

        assert_eq!(run_frame(&mut w, &mut app), AppControl::Continue);
        assert_eq!(app.events, ["update", "render"]);
        assert_eq!(w.frames(), 1);
        assert!(matches!(w.gl().calls().as_slice(), [GlCall::Clear(_)]));
    }

    #[test]
    fn exit_skips_render_and_display() {
        let mut w = HeadlessWindow::new(32, 32);
        let mut app = Recorder::default();
        assert_eq!(run_frame(&mut w, &mut app), AppControl::Exit);
        assert_eq!(app.events, ["update"]);
        assert_eq!(w.frames(), 0);
    }

    // ── window events ─────────────────────────────────────────────────────

    #[test]
    fn step_reports_resize_once() {
        let mut w = HeadlessWindow::new(32, 32);
        let mut app = Recorder { frames_left: 2, ..Default::default() };
        let mut frame_loop = FrameLoop::new(&w);

        w.set_size(64, 48);
        assert_eq!(frame_loop.step(&mut w, &mut app), AppControl::Continue);
        assert_eq!(frame_loop.step(&mut w, &mut app), AppControl::Continue);
        assert_eq!(app.events, ["resize", "update", "render", "update", "render"]);
    }

    #[test]
    fn step_reports_hide_then_show() {
        let mut w = HeadlessWindow::new(32, 32);
        let mut app = Recorder { frames_left: 3, ..Default::default() };
        let mut frame_loop = FrameLoop::new(&w);

        frame_loop.step(&mut w, &mut app);
        w.set_visible(false);
        frame_loop.step(&mut w, &mut app);
        w.set_visible(true);
        frame_loop.step(&mut w, &mut app);

        let events: Vec<_> = app
            .events
            .iter()
            .filter(|e| !matches!(**e, "update" | "render"))
            .collect();
        assert_eq!(events, [&"hide", &"show"]);
    }

    #[test]
    fn unchanged_window_reports_nothing() {
        let mut w = HeadlessWindow::new(32, 32);
        let mut app = Recorder { frames_left: 1, ..Default::default() };
        FrameLoop::new(&w).step(&mut w, &mut app);
        assert_eq!(app.events, ["update", "render"]);
    }

    #[test]
    fn run_drives_until_exit_and_flushes_after_destroy() {
        let mut w = HeadlessWindow::new(32, 32);
        let mut texture = Texture::new(w.renderer()).unwrap();
        texture.load(&crate::render::Image::new(1, 1, 4, vec![0; 4])).unwrap();
        let id = texture.id();
        let mut app = Recorder { frames_left: 3, texture: Some(texture), ..Default::default() };

        run(&mut w, &mut app);

        assert_eq!(w.frames(), 3);
        assert_eq!(app.events.first(), Some(&"start"));
        assert_eq!(app.events.last(), Some(&"destroy"));
        assert_eq!(app.events.iter().filter(|e| **e == "render").count(), 3);
        assert_eq!(w.gl().delete_batches(GpuObjectKind::Texture), vec![vec![id]]);
    }
}
