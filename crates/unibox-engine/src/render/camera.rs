use glam::{DVec2, Mat4, Vec3};

use crate::coords::Viewport;
use crate::core::Window;

use super::{ActiveCamera, CameraError, CameraKind};

/// World units per meter at `meter == DEFAULT_METER`.
pub const DEFAULT_METER: f32 = 100.0;

/// Orthographic 2D camera.
///
/// Public fields are read by [`Camera2D::update`]; change them, then call
/// `update` to push the new view to the renderer.
#[derive(Debug, Clone)]
pub struct Camera2D {
    pub position: DVec2,

    /// Rotation around Z, in degrees.
    pub angle: f32,
    pub zoom: f32,
    pub meter: f32,

    width: u32,
    height: u32,
    view: Mat4,
    proj: Mat4,
    ui_active: bool,
}

impl Camera2D {
    pub fn new(
        window: &mut dyn Window,
        width: u32,
        height: u32,
        position: DVec2,
        angle: f32,
        zoom: f32,
    ) -> Self {
        let mut camera = Self {
            position,
            angle,
            zoom,
            meter: DEFAULT_METER,
            width,
            height,
            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
            ui_active: false,
        };
        camera.resize(window, width, height);
        camera.update(window);
        camera
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn proj(&self) -> Mat4 {
        self.proj
    }

    pub fn is_ui_active(&self) -> bool {
        self.ui_active
    }

    /// Rebuilds the view matrix and makes this the renderer's active camera.
    pub fn update(&mut self, window: &mut dyn Window) {
        self.view = self.world_view();

        let renderer = window.renderer();
        renderer.set_active_camera(ActiveCamera {
            kind: CameraKind::Camera2D,
            view: self.view,
            proj: self.proj,
        });
        renderer.camera2d_update();

        if self.ui_active {
            push_view(window, self.ui_view());
        }
    }

    pub fn resize(&mut self, window: &mut dyn Window, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        window
            .renderer()
            .viewport_resize(Viewport::from_size(width as i32, height as i32));

        let (hw, hh) = self.half_extents();
        self.proj = Mat4::orthographic_rh_gl(-hw, hw, -hh, hh, -1.0, 1.0);
    }

    /// Switches the default shader to a screen-space view anchored at the
    /// bottom-left corner.
    pub fn ui_begin(&mut self, window: &mut dyn Window) -> Result<(), CameraError> {
        if self.ui_active {
            return Err(CameraError::UiAlreadyActive);
        }
        self.ui_active = true;
        push_view(window, self.ui_view());
        Ok(())
    }

    pub fn ui_end(&mut self, window: &mut dyn Window) -> Result<(), CameraError> {
        if !self.ui_active {
            return Err(CameraError::UiNotActive);
        }
        self.ui_active = false;
        push_view(window, self.view);
        Ok(())
    }

    pub(crate) fn half_extents(&self) -> (f32, f32) {
        let scale = self.meter / 100.0;
        (
            self.width as f32 / 2.0 * scale,
            self.height as f32 / 2.0 * scale,
        )
    }

    fn world_view(&self) -> Mat4 {
        let scale = if self.zoom != 0.0 {
            Vec3::new(1.0 / self.zoom, 1.0 / self.zoom, 1.0)
        } else {
            Vec3::new(0.0, 0.0, 1.0)
        };
        let position = self.position.as_vec2();
        Mat4::from_scale(scale)
            * Mat4::from_rotation_z(self.angle.to_radians())
            * Mat4::from_translation(Vec3::new(-position.x, -position.y, 0.0))
    }

    fn ui_view(&self) -> Mat4 {
        Mat4::from_translation(Vec3::new(
            -(self.width as f32) / 2.0,
            -(self.height as f32) / 2.0,
            0.0,
        ))
    }
}

fn push_view(window: &mut dyn Window, view: Mat4) {
    let Some(shader) = window.renderer().default_shader() else {
        return;
    };
    // The default shader stays current if it already was.
    let mut scope = shader.scope();
    scope.set_uniform_mat4("u_view", view);
}
