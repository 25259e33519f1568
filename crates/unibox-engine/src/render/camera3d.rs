use glam::{Mat4, Vec3};

use crate::coords::Viewport;
use crate::core::Window;

use super::{ActiveCamera, CameraKind};

const PITCH_LIMIT: f32 = 89.0;

/// Perspective camera driven by yaw/pitch angles in degrees.
#[derive(Debug, Clone)]
pub struct Camera3D {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,

    /// Vertical field of view, in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,

    width: u32,
    height: u32,
    view: Mat4,
    proj: Mat4,
}

impl Camera3D {
    pub fn new(window: &mut dyn Window, width: u32, height: u32, position: Vec3, fov: f32) -> Self {
        let mut camera = Self {
            position,
            yaw: -90.0,
            pitch: 0.0,
            fov,
            near: 0.1,
            far: 1000.0,
            width,
            height,
            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
        };
        camera.resize(window, width, height);
        camera.update(window);
        camera
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn proj(&self) -> Mat4 {
        self.proj
    }

    /// Unit look direction for the current yaw and pitch.
    pub fn front(&self) -> Vec3 {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize()
    }

    pub fn update(&mut self, window: &mut dyn Window) {
        self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.view = Mat4::look_at_rh(self.position, self.position + self.front(), Vec3::Y);
        self.proj = self.projection();

        let renderer = window.renderer();
        renderer.set_active_camera(ActiveCamera {
            kind: CameraKind::Camera3D,
            view: self.view,
            proj: self.proj,
        });
        renderer.camera3d_update();
    }

    pub fn resize(&mut self, window: &mut dyn Window, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        window
            .renderer()
            .viewport_resize(Viewport::from_size(width as i32, height as i32));
        self.proj = self.projection();
    }

    fn projection(&self) -> Mat4 {
        let aspect = if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        };
        Mat4::perspective_rh_gl(self.fov.to_radians(), aspect, self.near, self.far)
    }
}
