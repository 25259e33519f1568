use glam::Mat4;

use crate::coords::{ColorRgba, Viewport};

use super::{GlContext, ShaderProgram};

/// Backend family a renderer drives.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BackendKind {
    OpenGl,
    /// A renderer the engine has no device integration for.
    Custom(&'static str),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CameraKind {
    Camera2D,
    Camera3D,
}

/// Matrices of the camera that last called `update`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ActiveCamera {
    pub kind: CameraKind,
    pub view: Mat4,
    pub proj: Mat4,
}

/// Renderer contract consumed by cameras, textures and shader programs.
///
/// A renderer owns the default shader and remembers the active camera. The
/// frame driver calls [`Renderer::buffers_flush`] once per frame, after
/// rendering, to delete retired device objects.
pub trait Renderer {
    fn name(&self) -> &str;

    fn kind(&self) -> BackendKind;

    /// One-time backend bring-up. Terminates the process when mandatory
    /// backend entry points are missing.
    fn init(&mut self);

    fn clear(&mut self, color: ColorRgba);

    fn viewport_resize(&mut self, viewport: Viewport);

    fn set_active_camera(&mut self, camera: ActiveCamera);

    fn active_camera(&self) -> Option<ActiveCamera>;

    /// Pushes the active 2D camera into the default shader.
    fn camera2d_update(&mut self);

    /// Pushes the active 3D camera into the default shader.
    fn camera3d_update(&mut self);

    /// Deletes every device object retired since the last flush.
    fn buffers_flush(&mut self);

    fn default_shader(&mut self) -> Option<&mut ShaderProgram<'static>>;

    /// Device context for GL-backed objects; `None` for other backends.
    fn gl_context(&self) -> Option<GlContext>;
}
