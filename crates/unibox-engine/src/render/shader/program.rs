use std::borrow::Cow;
use std::ops::{Deref, DerefMut};

use glam::{Mat2, Mat3, Mat4, Vec2, Vec3, Vec4};

use crate::device::{GlApi, GlHandle, GpuObjectKind, MatrixShape, ShaderStage, UniformLocation};
use crate::render::{GlContext, Renderer, ShaderError};

use super::cache::{UniformLocationCache, UniformValueCache};
use super::uniform::UniformValue;

/// Source texts of a program, one per optional stage.
///
/// Sources are borrowed where possible; owned text works too.
#[derive(Debug, Clone, Default)]
pub struct ShaderSources<'src> {
    pub vertex: Option<Cow<'src, str>>,
    pub fragment: Option<Cow<'src, str>>,
    pub geometry: Option<Cow<'src, str>>,
}

impl<'src> ShaderSources<'src> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex(mut self, source: impl Into<Cow<'src, str>>) -> Self {
        self.vertex = Some(source.into());
        self
    }

    pub fn fragment(mut self, source: impl Into<Cow<'src, str>>) -> Self {
        self.fragment = Some(source.into());
        self
    }

    pub fn geometry(mut self, source: impl Into<Cow<'src, str>>) -> Self {
        self.geometry = Some(source.into());
        self
    }

    /// Present stages in pipeline order.
    fn stages(&self) -> impl Iterator<Item = (ShaderStage, &str)> {
        [
            (ShaderStage::Vertex, &self.vertex),
            (ShaderStage::Fragment, &self.fragment),
            (ShaderStage::Geometry, &self.geometry),
        ]
        .into_iter()
        .filter_map(|(stage, src)| src.as_deref().map(|s| (stage, s)))
    }
}

/// A linkable shader program with cached uniform state.
///
/// Two caches keep device traffic down:
/// - uniform locations are resolved once per name
/// - bool/int/float/vector writes that repeat the last value are dropped
///
/// Matrices are always uploaded.
///
/// `begin` remembers the program that was current and `end` restores it.
/// Calling `begin` again while begun is a no-op that keeps the program saved
/// by the first call; `end` while not begun is also a no-op. Uniform writes
/// to a program that is not begun bind it for the duration of the write.
pub struct ShaderProgram<'src> {
    ctx: Option<GlContext>,
    sources: ShaderSources<'src>,
    id: GlHandle,
    error: Option<ShaderError>,
    locations: UniformLocationCache,
    values: UniformValueCache,
    begun: bool,
    previous: GlHandle,
}

impl<'src> ShaderProgram<'src> {
    /// Creates an uncompiled program for `renderer`.
    ///
    /// Renderers without a GL device yield a program in the error state.
    pub fn new(
        renderer: &dyn Renderer,
        vertex: Option<&'src str>,
        fragment: Option<&'src str>,
        geometry: Option<&'src str>,
    ) -> Self {
        let sources = ShaderSources {
            vertex: vertex.map(Cow::Borrowed),
            fragment: fragment.map(Cow::Borrowed),
            geometry: geometry.map(Cow::Borrowed),
        };
        Self::from_sources(renderer, sources)
    }

    pub fn from_sources(renderer: &dyn Renderer, sources: ShaderSources<'src>) -> Self {
        let mut program = Self::with_context(renderer.gl_context(), sources);
        if program.ctx.is_none() {
            let err = ShaderError::UnsupportedBackend {
                renderer: renderer.name().to_string(),
            };
            log::error!("ShaderProgram::new: {err}");
            program.error = Some(err);
        }
        program
    }

    pub(crate) fn with_context(ctx: Option<GlContext>, sources: ShaderSources<'src>) -> Self {
        Self {
            ctx,
            sources,
            id: 0,
            error: None,
            locations: UniformLocationCache::new(),
            values: UniformValueCache::new(),
            begun: false,
            previous: 0,
        }
    }

    /// Program handle; 0 until the first successful compile.
    pub fn id(&self) -> GlHandle {
        self.id
    }

    pub fn error(&self) -> Option<&ShaderError> {
        self.error.as_ref()
    }

    pub fn is_begun(&self) -> bool {
        self.begun
    }

    pub fn sources(&self) -> &ShaderSources<'src> {
        &self.sources
    }

    /// Compiles every present stage and links them.
    ///
    /// Stops at the first stage that fails. On failure the previous program
    /// (if any) stays in place and the error is both returned and stored.
    /// On success the old program is retired and both caches are reset.
    pub fn compile(&mut self) -> Result<(), ShaderError> {
        let Some(ctx) = self.ctx.clone() else {
            let err = self
                .error
                .clone()
                .unwrap_or_else(|| ShaderError::UnsupportedBackend {
                    renderer: "unknown".to_string(),
                });
            return Err(err);
        };

        match build_program(&ctx, &self.sources) {
            Ok(program) => {
                if self.begun {
                    ctx.gl().use_program(program);
                }
                ctx.defer_delete(GpuObjectKind::Program, self.id);
                self.id = program;
                self.locations.clear();
                self.values.clear();
                self.error = None;
                log::debug!("shader program {program} linked");
                Ok(())
            }
            Err(err) => {
                log::error!("{err}");
                self.error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Makes this program current, remembering the one it replaces.
    pub fn begin(&mut self) {
        let Some(ctx) = &self.ctx else {
            return;
        };
        if self.begun {
            log::trace!("shader program {} already begun", self.id);
            return;
        }
        self.previous = ctx.gl().current_program();
        ctx.gl().use_program(self.id);
        self.begun = true;
    }

    /// Restores the program that was current at `begin`.
    pub fn end(&mut self) {
        let Some(ctx) = &self.ctx else {
            return;
        };
        if !self.begun {
            return;
        }
        ctx.gl().use_program(self.previous);
        self.begun = false;
    }

    /// Begins the program until the returned guard is dropped.
    ///
    /// If the program was already begun the guard leaves it begun.
    pub fn scope(&mut self) -> ShaderScope<'_, 'src> {
        let owns = !self.begun;
        self.begin();
        ShaderScope { program: self, owns }
    }

    /// Location of `name`, resolved through the cache.
    ///
    /// Names the device does not know (absent or optimized out) return
    /// `None` and are looked up again next time.
    pub fn get_location(&mut self, name: &str) -> Option<UniformLocation> {
        if self.id == 0 {
            return None;
        }
        if let Some(loc) = self.locations.get(name) {
            return Some(loc);
        }
        let loc = self.ctx.as_ref()?.gl().uniform_location(self.id, name)?;
        self.locations.insert(name, loc);
        Some(loc)
    }

    // ── cached setters ────────────────────────────────────────────────────

    pub fn set_uniform_bool(&mut self, name: &str, value: bool) {
        self.write_cached(name, UniformValue::Bool(value));
    }

    pub fn set_uniform_int(&mut self, name: &str, value: i32) {
        self.write_cached(name, UniformValue::Int(value));
    }

    pub fn set_uniform_float(&mut self, name: &str, value: f32) {
        self.write_cached(name, UniformValue::Float(value));
    }

    pub fn set_uniform_vec2(&mut self, name: &str, value: Vec2) {
        self.write_cached(name, UniformValue::Vec2(value));
    }

    pub fn set_uniform_vec3(&mut self, name: &str, value: Vec3) {
        self.write_cached(name, UniformValue::Vec3(value));
    }

    pub fn set_uniform_vec4(&mut self, name: &str, value: Vec4) {
        self.write_cached(name, UniformValue::Vec4(value));
    }

    // ── matrix setters (uncached) ─────────────────────────────────────────

    pub fn set_uniform_mat2(&mut self, name: &str, value: Mat2) {
        self.write_matrix(name, MatrixShape::Mat2, bytemuck::cast_slice(&[value]));
    }

    pub fn set_uniform_mat3(&mut self, name: &str, value: Mat3) {
        self.write_matrix(name, MatrixShape::Mat3, bytemuck::cast_slice(&[value]));
    }

    pub fn set_uniform_mat4(&mut self, name: &str, value: Mat4) {
        self.write_matrix(name, MatrixShape::Mat4, bytemuck::cast_slice(&[value]));
    }

    /// Column-major 2 columns x 3 rows.
    pub fn set_uniform_mat2x3(&mut self, name: &str, value: &[f32; 6]) {
        self.write_matrix(name, MatrixShape::Mat2x3, value);
    }

    pub fn set_uniform_mat3x2(&mut self, name: &str, value: &[f32; 6]) {
        self.write_matrix(name, MatrixShape::Mat3x2, value);
    }

    pub fn set_uniform_mat2x4(&mut self, name: &str, value: &[f32; 8]) {
        self.write_matrix(name, MatrixShape::Mat2x4, value);
    }

    pub fn set_uniform_mat4x2(&mut self, name: &str, value: &[f32; 8]) {
        self.write_matrix(name, MatrixShape::Mat4x2, value);
    }

    pub fn set_uniform_mat3x4(&mut self, name: &str, value: &[f32; 12]) {
        self.write_matrix(name, MatrixShape::Mat3x4, value);
    }

    pub fn set_uniform_mat4x3(&mut self, name: &str, value: &[f32; 12]) {
        self.write_matrix(name, MatrixShape::Mat4x3, value);
    }

    fn write_cached(&mut self, name: &str, value: UniformValue) {
        let Some(loc) = self.get_location(name) else {
            return;
        };
        if !self.values.update(loc, value) {
            return;
        }
        self.with_bound(|gl| match value {
            UniformValue::Bool(v) => gl.uniform_1_i32(loc, v as i32),
            UniformValue::Int(v) => gl.uniform_1_i32(loc, v),
            UniformValue::Float(v) => gl.uniform_1_f32(loc, v),
            UniformValue::Vec2(v) => gl.uniform_2_f32(loc, v.x, v.y),
            UniformValue::Vec3(v) => gl.uniform_3_f32(loc, v.x, v.y, v.z),
            UniformValue::Vec4(v) => gl.uniform_4_f32(loc, v.x, v.y, v.z, v.w),
        });
    }

    fn write_matrix(&mut self, name: &str, shape: MatrixShape, data: &[f32]) {
        let Some(loc) = self.get_location(name) else {
            return;
        };
        self.with_bound(|gl| gl.uniform_matrix(loc, shape, data));
    }

    /// Runs `f` with this program current, restoring the previous one after.
    fn with_bound(&self, f: impl FnOnce(&dyn GlApi)) {
        let Some(ctx) = &self.ctx else {
            return;
        };
        let gl = ctx.gl();
        if self.begun {
            f(gl);
            return;
        }

        let previous = gl.current_program();
        if previous == self.id {
            f(gl);
        } else {
            gl.use_program(self.id);
            f(gl);
            gl.use_program(previous);
        }
    }
}

impl Drop for ShaderProgram<'_> {
    fn drop(&mut self) {
        self.locations.clear();
        self.values.clear();
        if let Some(ctx) = &self.ctx {
            ctx.defer_delete(GpuObjectKind::Program, self.id);
        }
    }
}

impl std::fmt::Debug for ShaderProgram<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderProgram")
            .field("id", &self.id)
            .field("begun", &self.begun)
            .field("error", &self.error)
            .field("cached_locations", &self.locations.len())
            .field("cached_values", &self.values.len())
            .finish()
    }
}

/// Guard returned by [`ShaderProgram::scope`].
pub struct ShaderScope<'a, 'src> {
    program: &'a mut ShaderProgram<'src>,
    owns: bool,
}

impl<'src> Deref for ShaderScope<'_, 'src> {
    type Target = ShaderProgram<'src>;

    fn deref(&self) -> &Self::Target {
        self.program
    }
}

impl DerefMut for ShaderScope<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.program
    }
}

impl Drop for ShaderScope<'_, '_> {
    fn drop(&mut self) {
        if self.owns {
            self.program.end();
        }
    }
}

fn compile_stage(gl: &dyn GlApi, stage: ShaderStage, source: &str) -> Result<GlHandle, ShaderError> {
    let shader = gl.create_shader(stage).map_err(ShaderError::Create)?;
    gl.shader_source(shader, source);
    if gl.compile_shader(shader) {
        return Ok(shader);
    }
    let log = gl.shader_info_log(shader);
    gl.delete_shader(shader);
    Err(ShaderError::Compile { stage, log })
}

/// Compiles and links `sources` into a fresh program object.
fn build_program(ctx: &GlContext, sources: &ShaderSources<'_>) -> Result<GlHandle, ShaderError> {
    let gl = ctx.gl();
    let program = gl.create_program().map_err(ShaderError::Create)?;

    let mut shaders = Vec::with_capacity(3);
    for (stage, source) in sources.stages() {
        match compile_stage(gl, stage, source) {
            Ok(shader) => shaders.push(shader),
            Err(err) => {
                for shader in shaders {
                    gl.delete_shader(shader);
                }
                ctx.defer_delete(GpuObjectKind::Program, program);
                return Err(err);
            }
        }
    }

    for &shader in &shaders {
        gl.attach_shader(program, shader);
    }
    let linked = gl.link_program(program);
    for &shader in &shaders {
        gl.detach_shader(program, shader);
        gl.delete_shader(shader);
    }

    if !linked {
        let log = gl.program_info_log(program);
        ctx.defer_delete(GpuObjectKind::Program, program);
        return Err(ShaderError::Link { log });
    }
    Ok(program)
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::device::{GlCall, HeadlessGl, UniformData};

    const VERT: &str = "#version 330 core\n\
        uniform mat4 u_view;\n\
        uniform float u_scale;\n\
        void main() { gl_Position = u_view * vec4(u_scale); }\n";

    const FRAG: &str = "#version 330 core\n\
        uniform vec4 u_color;\n\
        uniform bool u_flag;\n\
        out vec4 o;\n\
        void main() { o = u_color; }\n";

    fn setup(frag: &'static str) -> (Rc<HeadlessGl>, GlContext, ShaderProgram<'static>) {
        let gl = Rc::new(HeadlessGl::new());
        let ctx = GlContext::new(gl.clone());
        let sources = ShaderSources::new().vertex(VERT).fragment(frag);
        let program = ShaderProgram::with_context(Some(ctx.clone()), sources);
        (gl, ctx, program)
    }

    fn compiled() -> (Rc<HeadlessGl>, GlContext, ShaderProgram<'static>) {
        let (gl, ctx, mut p) = setup(FRAG);
        p.compile().unwrap();
        gl.clear_calls();
        (gl, ctx, p)
    }

    // ── compile ───────────────────────────────────────────────────────────

    #[test]
    fn compile_links_program() {
        let (gl, _ctx, mut p) = setup(FRAG);
        assert_eq!(p.id(), 0);
        p.compile().unwrap();
        assert_ne!(p.id(), 0);
        assert!(p.error().is_none());
        assert!(gl.is_program(p.id()));
        assert_eq!(gl.call_count(|c| matches!(c, GlCall::DeleteShader(_))), 2);
    }

    #[test]
    fn invalid_fragment_stage_reports_fragment() {
        let (_gl, ctx, mut p) = setup("#version 330 core\nvoid main() {\n");
        let err = p.compile().unwrap_err();
        assert!(matches!(err, ShaderError::Compile { stage: ShaderStage::Fragment, .. }));
        assert_eq!(p.id(), 0);
        assert!(p.error().unwrap().to_string().contains("FRAGMENT"));
        assert_eq!(ctx.pending(GpuObjectKind::Program), 1);
    }

    #[test]
    fn recompile_retires_previous_program_and_resets_caches() {
        let (gl, ctx, mut p) = compiled();
        let first = p.id();
        p.set_uniform_float("u_scale", 2.0);

        p.compile().unwrap();
        assert_ne!(p.id(), first);
        assert_eq!(ctx.pending(GpuObjectKind::Program), 1);

        p.set_uniform_float("u_scale", 2.0);
        assert_eq!(gl.location_queries("u_scale"), 2);
        assert_eq!(gl.uniform_writes(), 2);
    }

    // ── begin / end ───────────────────────────────────────────────────────

    #[test]
    fn end_restores_program_active_before_begin() {
        let (gl, _ctx, mut p) = compiled();
        gl.use_program(77);
        p.begin();
        assert_eq!(gl.bound_program(), p.id());
        p.end();
        assert_eq!(gl.bound_program(), 77);
    }

    #[test]
    fn nested_begin_keeps_outer_saved_program() {
        let (gl, _ctx, mut p) = compiled();
        gl.use_program(5);
        p.begin();
        p.begin();
        assert!(p.is_begun());
        p.end();
        assert_eq!(gl.bound_program(), 5);
        assert_eq!(gl.call_count(|c| matches!(c, GlCall::GetCurrentProgram)), 1);
    }

    #[test]
    fn end_without_begin_is_noop() {
        let (gl, _ctx, mut p) = compiled();
        p.end();
        assert!(gl.calls().is_empty());
    }

    #[test]
    fn scope_guard_ends_on_drop() {
        let (gl, _ctx, mut p) = compiled();
        gl.use_program(9);
        {
            let mut s = p.scope();
            s.set_uniform_bool("u_flag", true);
            assert_eq!(gl.bound_program(), s.id());
        }
        assert!(!p.is_begun());
        assert_eq!(gl.bound_program(), 9);
    }

    // ── uniform cache ─────────────────────────────────────────────────────

    #[test]
    fn repeated_float_reaches_device_once() {
        let (gl, _ctx, mut p) = compiled();
        p.begin();
        p.set_uniform_float("u_scale", 0.5);
        p.set_uniform_float("u_scale", 0.5);
        assert_eq!(gl.uniform_writes(), 1);
        p.set_uniform_float("u_scale", 0.5 + 5e-7);
        assert_eq!(gl.uniform_writes(), 1);
        p.set_uniform_float("u_scale", 0.75);
        assert_eq!(gl.uniform_writes(), 2);
    }

    #[test]
    fn writes_equal_number_of_changes() {
        let (gl, _ctx, mut p) = compiled();
        p.begin();
        for v in [1.0, 1.0, 2.0, 2.0, 1.0, 1.0, 3.0] {
            p.set_uniform_float("u_scale", v);
        }
        assert_eq!(gl.uniform_writes(), 4);
    }

    #[test]
    fn matrices_always_reach_device() {
        let (gl, _ctx, mut p) = compiled();
        p.begin();
        p.set_uniform_mat4("u_view", Mat4::IDENTITY);
        p.set_uniform_mat4("u_view", Mat4::IDENTITY);
        assert_eq!(gl.uniform_writes(), 2);
        assert_eq!(
            gl.uniform_value(p.id(), "u_view"),
            Some(UniformData::Matrix(MatrixShape::Mat4, Mat4::IDENTITY.to_cols_array().to_vec()))
        );
    }

    #[test]
    fn unknown_uniform_is_silently_skipped() {
        let (gl, _ctx, mut p) = compiled();
        p.begin();
        p.set_uniform_int("u_missing", 3);
        assert_eq!(gl.uniform_writes(), 0);
    }

    #[test]
    fn write_without_begin_binds_temporarily() {
        let (gl, _ctx, mut p) = compiled();
        gl.use_program(0);
        p.set_uniform_vec4("u_color", Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(gl.bound_program(), 0);
        assert_eq!(
            gl.uniform_value(p.id(), "u_color"),
            Some(UniformData::Float(vec![1.0, 0.0, 0.0, 1.0]))
        );
    }

    // ── location cache ────────────────────────────────────────────────────

    #[test]
    fn location_is_queried_once() {
        let (gl, _ctx, mut p) = compiled();
        let a = p.get_location("u_color");
        let b = p.get_location("u_color");
        assert!(a.is_some());
        assert_eq!(a, b);
        assert_eq!(gl.location_queries("u_color"), 1);
    }

    #[test]
    fn unresolved_location_is_not_cached() {
        let (gl, _ctx, mut p) = compiled();
        assert_eq!(p.get_location("u_nope"), None);
        assert_eq!(p.get_location("u_nope"), None);
        assert_eq!(gl.location_queries("u_nope"), 2);
    }

    #[test]
    fn uncompiled_program_has_no_locations() {
        let (gl, _ctx, mut p) = setup(FRAG);
        assert_eq!(p.get_location("u_color"), None);
        assert_eq!(gl.location_queries("u_color"), 0);
    }

    // ── drop ──────────────────────────────────────────────────────────────

    #[test]
    fn drop_retires_program() {
        let (_gl, ctx, p) = compiled();
        drop(p);
        assert_eq!(ctx.pending(GpuObjectKind::Program), 1);
    }
}
