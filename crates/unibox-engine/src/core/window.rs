use crate::render::Renderer;

/// Window seam consumed by the frame driver, cameras and applications.
pub trait Window {
    /// Drawable size in pixels.
    fn size(&self) -> (u32, u32);

    /// Seconds between the last two presented frames.
    fn dtime(&self) -> f64;

    fn renderer(&mut self) -> &mut dyn Renderer;

    /// Presents the frame (buffer swap) and advances frame timing.
    fn display(&mut self);

    /// Whether the window is currently shown. Windows that cannot be
    /// hidden keep the default.
    fn is_visible(&self) -> bool {
        true
    }
}
