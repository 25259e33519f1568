use std::rc::Rc;

use crate::coords::{ColorRgba, Viewport};
use crate::device::{BlendFactor, Capability, GlApi, MissingEntryPoints};
use crate::logging::{EXIT_MISSING_ENTRY_POINTS, fatal};

use super::{
    ActiveCamera, BackendKind, GlContext, Graveyard, Renderer, ShaderProgram, ShaderSources,
};

pub const DEFAULT_VERTEX_SHADER: &str = "#version 330 core
uniform mat4 u_model = mat4(1.0);
uniform mat4 u_view = mat4(1.0);
uniform mat4 u_proj = mat4(1.0);
layout (location = 0) in vec3 a_position;
layout (location = 1) in vec2 a_texcoord;
out vec2 TexCoord;
void main(void) {
    gl_Position = u_proj * u_view * u_model * vec4(a_position, 1.0);
    TexCoord = a_texcoord;
}
";

pub const DEFAULT_FRAGMENT_SHADER: &str = "#version 330 core
uniform bool u_use_points = false;
uniform bool u_use_texture;
uniform vec4 u_color = vec4(1.0);
uniform sampler2D u_texture;
in vec2 TexCoord;
out vec4 FragColor;
void main(void) {
    // round points: drop fragments outside the unit circle
    if (u_use_points) {
        vec2 coord = gl_PointCoord*2.0-1.0;
        if (dot(coord, coord) > 1.0) discard;
    }
    if (u_use_texture) {
        FragColor = u_color * texture(u_texture, TexCoord);
    } else {
        FragColor = u_color;
    }
}
";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GlProfile {
    Core,
    Compatibility,
}

/// Context parameters requested from the window layer.
#[derive(Debug, Clone)]
pub struct GlConfig {
    pub major: u8,
    pub minor: u8,
    pub double_buffer: bool,
    pub profile: GlProfile,

    /// Starting capacity of each graveyard sequence.
    pub graveyard_capacity: usize,
}

impl Default for GlConfig {
    fn default() -> Self {
        Self {
            major: 3,
            minor: 3,
            double_buffer: true,
            profile: GlProfile::Core,
            graveyard_capacity: super::DEFAULT_GRAVEYARD_CAPACITY,
        }
    }
}

/// OpenGL renderer.
///
/// Owns the device context, its graveyard and the default shader. The
/// default shader is compiled by [`Renderer::init`], once the context is
/// current.
pub struct GlRenderer {
    config: GlConfig,
    ctx: GlContext,
    default_shader: ShaderProgram<'static>,
    camera: Option<ActiveCamera>,
    initialized: bool,
}

impl GlRenderer {
    pub fn new(gl: Rc<dyn GlApi>, config: GlConfig) -> Self {
        let ctx = GlContext::with_graveyard(gl, Graveyard::new(config.graveyard_capacity));
        let sources = ShaderSources::new()
            .vertex(DEFAULT_VERTEX_SHADER)
            .fragment(DEFAULT_FRAGMENT_SHADER);
        let default_shader = ShaderProgram::with_context(Some(ctx.clone()), sources);

        Self {
            config,
            ctx,
            default_shader,
            camera: None,
            initialized: false,
        }
    }

    pub fn config(&self) -> &GlConfig {
        &self.config
    }

    pub fn context(&self) -> &GlContext {
        &self.ctx
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Reports mandatory entry points the device could not resolve.
    pub fn check_entry_points(&self) -> Result<(), MissingEntryPoints> {
        let gl = self.ctx.gl();
        let names = gl.missing_entry_points();
        if names.is_empty() {
            Ok(())
        } else {
            Err(MissingEntryPoints {
                backend: gl.backend_name(),
                names,
            })
        }
    }

    fn push_active_camera(&mut self) {
        let Some(camera) = self.camera else {
            return;
        };
        self.default_shader.begin();
        self.default_shader.set_uniform_mat4("u_view", camera.view);
        self.default_shader.set_uniform_mat4("u_proj", camera.proj);
    }
}

impl Renderer for GlRenderer {
    fn name(&self) -> &str {
        "OpenGL"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::OpenGl
    }

    fn init(&mut self) {
        if let Err(err) = self.check_entry_points() {
            fatal(EXIT_MISSING_ENTRY_POINTS, &format!("RENDERER_GL-FAIL: {err}"));
        }

        let gl = self.ctx.gl();
        gl.enable(Capability::Blend);
        gl.blend_func(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha);
        gl.enable(Capability::ProgramPointSize);
        gl.active_texture_unit(0);
        gl.bind_texture(0);
        // Client pixel rows are tightly packed.
        gl.pixel_alignment(1);

        if let Err(err) = self.default_shader.compile() {
            log::error!("RENDERER_GL-FAIL: creating default shader failed: {err}");
        }

        self.initialized = true;
        log::info!(
            "renderer initialised: OpenGL {}.{} {:?} (double buffer: {})",
            self.config.major,
            self.config.minor,
            self.config.profile,
            self.config.double_buffer
        );
    }

    fn clear(&mut self, color: ColorRgba) {
        self.ctx.gl().clear(color);
    }

    fn viewport_resize(&mut self, viewport: Viewport) {
        self.ctx.gl().viewport(viewport);
    }

    fn set_active_camera(&mut self, camera: ActiveCamera) {
        self.camera = Some(camera);
    }

    fn active_camera(&self) -> Option<ActiveCamera> {
        self.camera
    }

    fn camera2d_update(&mut self) {
        self.ctx.gl().disable(Capability::DepthTest);
        self.push_active_camera();
    }

    fn camera3d_update(&mut self) {
        self.ctx.gl().enable(Capability::DepthTest);
        self.push_active_camera();
    }

    fn buffers_flush(&mut self) {
        self.ctx.flush_graveyard();
    }

    fn default_shader(&mut self) -> Option<&mut ShaderProgram<'static>> {
        Some(&mut self.default_shader)
    }

    fn gl_context(&self) -> Option<GlContext> {
        Some(self.ctx.clone())
    }
}

impl Drop for GlRenderer {
    fn drop(&mut self) {
        self.default_shader.end();
        // Retire the default program now so the final flush deletes it.
        let detached = ShaderProgram::with_context(None, ShaderSources::default());
        drop(std::mem::replace(&mut self.default_shader, detached));
        self.ctx.flush_graveyard();
    }
}

impl std::fmt::Debug for GlRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlRenderer")
            .field("config", &self.config)
            .field("default_shader", &self.default_shader)
            .field("camera", &self.camera)
            .field("initialized", &self.initialized)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use glam::Mat4;

    use super::*;
    use crate::device::{GlCall, GpuObjectKind, HeadlessGl, UniformData};
    use crate::render::CameraKind;

    fn renderer() -> (Rc<HeadlessGl>, GlRenderer) {
        let gl = Rc::new(HeadlessGl::new());
        let mut r = GlRenderer::new(gl.clone(), GlConfig::default());
        r.init();
        (gl, r)
    }

    // ── init ──────────────────────────────────────────────────────────────

    #[test]
    fn init_sets_blend_state_and_compiles_default_shader() {
        let (gl, mut r) = renderer();
        assert!(r.is_initialized());
        assert!(gl.is_enabled(Capability::Blend));
        assert!(gl.is_enabled(Capability::ProgramPointSize));
        assert!(gl.calls().contains(&GlCall::BlendFunc(
            BlendFactor::SrcAlpha,
            BlendFactor::OneMinusSrcAlpha
        )));
        assert_eq!(gl.bound_texture(), 0);
        assert_eq!(gl.current_pixel_alignment(), 1);

        let shader = r.default_shader().unwrap();
        assert_ne!(shader.id(), 0);
        assert!(shader.error().is_none());
    }

    #[test]
    fn default_config_is_gl33_core_double_buffered() {
        let c = GlConfig::default();
        assert_eq!((c.major, c.minor), (3, 3));
        assert_eq!(c.profile, GlProfile::Core);
        assert!(c.double_buffer);
    }

    #[test]
    fn missing_entry_points_are_reported() {
        let gl = Rc::new(HeadlessGl::with_missing_entry_points(vec!["glTexImage2D"]));
        let r = GlRenderer::new(gl, GlConfig::default());
        let err = r.check_entry_points().unwrap_err();
        assert_eq!(err.names, vec!["glTexImage2D"]);
    }

    // ── frame operations ──────────────────────────────────────────────────

    #[test]
    fn clear_and_viewport_reach_device() {
        let (gl, mut r) = renderer();
        r.clear(ColorRgba::black());
        r.viewport_resize(Viewport::from_size(640, 480));
        assert!(gl.calls().contains(&GlCall::Clear(ColorRgba::black())));
        assert_eq!(gl.current_viewport(), Viewport::from_size(640, 480));
    }

    #[test]
    fn camera2d_update_pushes_matrices() {
        let (gl, mut r) = renderer();
        gl.enable(Capability::DepthTest);
        let view = Mat4::from_translation(glam::Vec3::new(-1.0, -2.0, 0.0));
        let proj = Mat4::orthographic_rh_gl(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0);
        r.set_active_camera(ActiveCamera { kind: CameraKind::Camera2D, view, proj });

        r.camera2d_update();

        let id = r.default_shader().unwrap().id();
        assert!(!gl.is_enabled(Capability::DepthTest));
        assert_eq!(gl.bound_program(), id);
        assert_eq!(
            gl.uniform_value(id, "u_view"),
            Some(UniformData::Matrix(crate::device::MatrixShape::Mat4, view.to_cols_array().to_vec()))
        );
        assert_eq!(
            gl.uniform_value(id, "u_proj"),
            Some(UniformData::Matrix(crate::device::MatrixShape::Mat4, proj.to_cols_array().to_vec()))
        );
    }

    #[test]
    fn camera_update_without_camera_only_touches_depth() {
        let (gl, mut r) = renderer();
        gl.clear_calls();
        r.camera3d_update();
        assert_eq!(gl.calls(), vec![GlCall::Enable(Capability::DepthTest)]);
    }

    // ── teardown ──────────────────────────────────────────────────────────

    #[test]
    fn buffers_flush_empties_graveyard() {
        let (gl, mut r) = renderer();
        r.context().defer_delete(GpuObjectKind::VertexArray, 42);
        r.buffers_flush();
        assert_eq!(gl.delete_batches(GpuObjectKind::VertexArray), vec![vec![42]]);
        assert_eq!(r.context().pending(GpuObjectKind::VertexArray), 0);
    }

    #[test]
    fn drop_deletes_default_program() {
        let (gl, mut r) = renderer();
        let id = r.default_shader().unwrap().id();
        drop(r);
        assert_eq!(gl.delete_batches(GpuObjectKind::Program), vec![vec![id]]);
        assert!(!gl.is_program(id));
    }
}
