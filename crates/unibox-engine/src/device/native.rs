use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::c_void;
use std::num::NonZeroU32;

use glow::HasContext;

use crate::coords::{ColorRgba, Viewport};

use super::api::{
    BlendFactor, Capability, DEFAULT_PIXEL_ALIGNMENT, GlApi, GlHandle, GpuObjectKind, MatrixShape,
    ShaderStage, TextureDataType, TextureFormat, TextureParameter, TextureParameterValue,
    UniformLocation, row_layout, transfer_len,
};

/// Driver symbols the engine cannot run without.
const MANDATORY_ENTRY_POINTS: &[&str] = &[
    "glEnable",
    "glDisable",
    "glBlendFunc",
    "glClearColor",
    "glClear",
    "glViewport",
    "glActiveTexture",
    "glPixelStorei",
    "glCreateShader",
    "glShaderSource",
    "glCompileShader",
    "glGetShaderiv",
    "glGetShaderInfoLog",
    "glDeleteShader",
    "glCreateProgram",
    "glAttachShader",
    "glDetachShader",
    "glLinkProgram",
    "glGetProgramiv",
    "glGetProgramInfoLog",
    "glUseProgram",
    "glDeleteProgram",
    "glGetIntegerv",
    "glGetUniformLocation",
    "glUniform1i",
    "glUniform1f",
    "glUniform2f",
    "glUniform3f",
    "glUniform4f",
    "glUniformMatrix4fv",
    "glGenTextures",
    "glBindTexture",
    "glTexImage2D",
    "glGenerateMipmap",
    "glTexParameteri",
    "glGetTexImage",
    "glDeleteTextures",
    "glDeleteBuffers",
    "glDeleteFramebuffers",
    "glDeleteVertexArrays",
    "glDeleteQueries",
];

/// `glDelete{Textures,Buffers,Framebuffers,VertexArrays,Queries}`.
type DeleteObjectsFn = unsafe extern "system" fn(n: i32, ids: *const u32);

/// Batched delete entry points, resolved from the loader.
///
/// `glow` only exposes single-object deletes, so the array forms are looked
/// up directly. Absent pointers fall back to one call per handle.
#[derive(Debug, Default, Clone, Copy)]
struct BatchDeletes {
    queries: Option<DeleteObjectsFn>,
    buffers: Option<DeleteObjectsFn>,
    framebuffers: Option<DeleteObjectsFn>,
    vertex_arrays: Option<DeleteObjectsFn>,
    textures: Option<DeleteObjectsFn>,
}

impl BatchDeletes {
    /// # Safety
    /// `loader` must return null or a pointer to the named GL function.
    unsafe fn resolve<F>(loader: &mut F) -> Self
    where
        F: FnMut(&str) -> *const c_void,
    {
        let mut lookup = |name: &str| {
            let ptr = loader(name);
            // SAFETY: every name below has the `(GLsizei, const GLuint*)` signature.
            (!ptr.is_null())
                .then(|| unsafe { std::mem::transmute::<*const c_void, DeleteObjectsFn>(ptr) })
        };
        Self {
            queries: lookup("glDeleteQueries"),
            buffers: lookup("glDeleteBuffers"),
            framebuffers: lookup("glDeleteFramebuffers"),
            vertex_arrays: lookup("glDeleteVertexArrays"),
            textures: lookup("glDeleteTextures"),
        }
    }

    fn for_kind(&self, kind: GpuObjectKind) -> Option<DeleteObjectsFn> {
        match kind {
            GpuObjectKind::Query => self.queries,
            GpuObjectKind::ShaderStorageBuffer
            | GpuObjectKind::VertexBuffer
            | GpuObjectKind::IndexBuffer => self.buffers,
            GpuObjectKind::Framebuffer => self.framebuffers,
            GpuObjectKind::VertexArray => self.vertex_arrays,
            GpuObjectKind::Texture => self.textures,
            GpuObjectKind::Program => None,
        }
    }
}

/// Client-side view of texture state, used to bound pixel transfers.
#[derive(Debug, Default)]
struct PixelTracking {
    bound: GlHandle,
    alignment: Option<usize>,
    sizes: HashMap<GlHandle, (usize, usize)>,
}

impl PixelTracking {
    fn alignment(&self) -> usize {
        self.alignment.unwrap_or(DEFAULT_PIXEL_ALIGNMENT)
    }
}

/// OpenGL backend on top of `glow`.
///
/// # Safety contract
///
/// The wrapped context must stay current on the thread that owns this value
/// for as long as it is used. Every entry point issues raw GL calls.
///
/// Pixel transfers are checked against the texture sizes and row alignment
/// set through this value. Changing either behind its back (raw calls on
/// [`GlowApi::context`]) voids that check.
pub struct GlowApi {
    gl: glow::Context,
    missing: Vec<&'static str>,
    deletes: BatchDeletes,
    pixels: RefCell<PixelTracking>,
}

impl GlowApi {
    /// Loads GL through `loader` and records unresolved mandatory symbols.
    ///
    /// # Safety
    /// A GL context must be current and `loader` must return valid function
    /// pointers for it (or null).
    pub unsafe fn from_loader<F>(mut loader: F) -> Self
    where
        F: FnMut(&str) -> *const c_void,
    {
        let missing: Vec<&'static str> = MANDATORY_ENTRY_POINTS
            .iter()
            .copied()
            .filter(|&name| loader(name).is_null())
            .collect();

        if !missing.is_empty() {
            log::warn!("GL loader could not resolve {} entry points", missing.len());
        }

        // SAFETY: forwarded from the caller.
        let deletes = unsafe { BatchDeletes::resolve(&mut loader) };
        // SAFETY: forwarded from the caller.
        let gl = unsafe { glow::Context::from_loader_function(loader) };
        Self {
            gl,
            missing,
            deletes,
            pixels: RefCell::default(),
        }
    }

    /// Wraps an already-loaded context; entry points are assumed present.
    ///
    /// Without a loader the batched deletes are unavailable and objects are
    /// deleted one call per handle.
    pub fn from_context(gl: glow::Context) -> Self {
        Self {
            gl,
            missing: Vec::new(),
            deletes: BatchDeletes::default(),
            pixels: RefCell::default(),
        }
    }

    pub fn context(&self) -> &glow::Context {
        &self.gl
    }
}

impl std::fmt::Debug for GlowApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlowApi")
            .field("missing", &self.missing)
            .finish_non_exhaustive()
    }
}

fn capability(cap: Capability) -> u32 {
    match cap {
        Capability::Blend => glow::BLEND,
        Capability::DepthTest => glow::DEPTH_TEST,
        Capability::ProgramPointSize => glow::PROGRAM_POINT_SIZE,
        Capability::CullFace => glow::CULL_FACE,
    }
}

fn blend_factor(f: BlendFactor) -> u32 {
    match f {
        BlendFactor::Zero => glow::ZERO,
        BlendFactor::One => glow::ONE,
        BlendFactor::SrcAlpha => glow::SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => glow::ONE_MINUS_SRC_ALPHA,
    }
}

fn shader_stage(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        ShaderStage::Geometry => glow::GEOMETRY_SHADER,
    }
}

/// Sized internal format; layouts without a storage equivalent store RGBA.
fn internal_format(format: TextureFormat) -> i32 {
    (match format {
        TextureFormat::Red => glow::RED,
        TextureFormat::Rg => glow::RG8,
        TextureFormat::Rgb => glow::RGB,
        TextureFormat::Rgba => glow::RGBA,
        TextureFormat::R16F => glow::R16F,
        TextureFormat::Rgb16F => glow::RGB16F,
        TextureFormat::Rgba16F => glow::RGBA16F,
        TextureFormat::Rgb32F => glow::RGB32F,
        TextureFormat::Rgba32F => glow::RGBA32F,
        TextureFormat::Srgb => glow::SRGB8,
        TextureFormat::Srgba => glow::SRGB8_ALPHA8,
        TextureFormat::Bgr | TextureFormat::Bgra => glow::RGBA,
    }) as i32
}

/// Client-side pixel layout; float and sRGB formats map to their base layout.
fn pixel_format(format: TextureFormat) -> u32 {
    match format {
        TextureFormat::Red | TextureFormat::R16F => glow::RED,
        TextureFormat::Rg => glow::RG,
        TextureFormat::Rgb | TextureFormat::Rgb16F | TextureFormat::Rgb32F | TextureFormat::Srgb => {
            glow::RGB
        }
        TextureFormat::Rgba
        | TextureFormat::Rgba16F
        | TextureFormat::Rgba32F
        | TextureFormat::Srgba => glow::RGBA,
        TextureFormat::Bgr => glow::BGR,
        TextureFormat::Bgra => glow::BGRA,
    }
}

fn data_type(ty: TextureDataType) -> u32 {
    match ty {
        TextureDataType::UnsignedByte => glow::UNSIGNED_BYTE,
        TextureDataType::Byte => glow::BYTE,
        TextureDataType::UnsignedShort => glow::UNSIGNED_SHORT,
        TextureDataType::Short => glow::SHORT,
        TextureDataType::UnsignedInt => glow::UNSIGNED_INT,
        TextureDataType::Int => glow::INT,
        TextureDataType::Float => glow::FLOAT,
    }
}

fn texture_parameter(param: TextureParameter) -> u32 {
    match param {
        TextureParameter::MinFilter => glow::TEXTURE_MIN_FILTER,
        TextureParameter::MagFilter => glow::TEXTURE_MAG_FILTER,
        TextureParameter::WrapS => glow::TEXTURE_WRAP_S,
        TextureParameter::WrapT => glow::TEXTURE_WRAP_T,
    }
}

fn texture_parameter_value(value: TextureParameterValue) -> i32 {
    (match value {
        TextureParameterValue::Nearest => glow::NEAREST,
        TextureParameterValue::Linear => glow::LINEAR,
        TextureParameterValue::NearestMipmapNearest => glow::NEAREST_MIPMAP_NEAREST,
        TextureParameterValue::LinearMipmapNearest => glow::LINEAR_MIPMAP_NEAREST,
        TextureParameterValue::NearestMipmapLinear => glow::NEAREST_MIPMAP_LINEAR,
        TextureParameterValue::LinearMipmapLinear => glow::LINEAR_MIPMAP_LINEAR,
        TextureParameterValue::Repeat => glow::REPEAT,
        TextureParameterValue::ClampToEdge => glow::CLAMP_TO_EDGE,
        TextureParameterValue::MirroredRepeat => glow::MIRRORED_REPEAT,
    }) as i32
}

fn location(loc: UniformLocation) -> Option<glow::NativeUniformLocation> {
    u32::try_from(loc).ok().map(glow::NativeUniformLocation)
}

impl GlApi for GlowApi {
    fn backend_name(&self) -> &'static str {
        "OpenGL"
    }

    fn missing_entry_points(&self) -> Vec<&'static str> {
        self.missing.clone()
    }

    fn enable(&self, cap: Capability) {
        // SAFETY: context is current (type contract).
        unsafe { self.gl.enable(capability(cap)) }
    }

    fn disable(&self, cap: Capability) {
        unsafe { self.gl.disable(capability(cap)) }
    }

    fn blend_func(&self, src: BlendFactor, dst: BlendFactor) {
        unsafe { self.gl.blend_func(blend_factor(src), blend_factor(dst)) }
    }

    fn clear(&self, color: ColorRgba) {
        unsafe {
            self.gl.clear_color(color.r, color.g, color.b, color.a);
            self.gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }
    }

    fn viewport(&self, viewport: Viewport) {
        unsafe {
            self.gl
                .viewport(viewport.x, viewport.y, viewport.width, viewport.height)
        }
    }

    fn active_texture_unit(&self, unit: u32) {
        unsafe { self.gl.active_texture(glow::TEXTURE0 + unit) }
    }

    fn pixel_alignment(&self, alignment: i32) {
        if !matches!(alignment, 1 | 2 | 4 | 8) {
            log::error!("GlowApi::pixel_alignment: invalid value {alignment}");
            return;
        }
        unsafe {
            self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, alignment);
            self.gl.pixel_store_i32(glow::PACK_ALIGNMENT, alignment);
        }
        self.pixels.borrow_mut().alignment = Some(alignment as usize);
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<GlHandle, String> {
        unsafe { self.gl.create_shader(shader_stage(stage)) }.map(|s| s.0.get())
    }

    fn shader_source(&self, shader: GlHandle, source: &str) {
        if let Some(id) = NonZeroU32::new(shader) {
            unsafe { self.gl.shader_source(glow::NativeShader(id), source) }
        }
    }

    fn compile_shader(&self, shader: GlHandle) -> bool {
        let Some(id) = NonZeroU32::new(shader) else {
            return false;
        };
        let shader = glow::NativeShader(id);
        unsafe {
            self.gl.compile_shader(shader);
            self.gl.get_shader_compile_status(shader)
        }
    }

    fn shader_info_log(&self, shader: GlHandle) -> String {
        NonZeroU32::new(shader)
            .map(|id| unsafe { self.gl.get_shader_info_log(glow::NativeShader(id)) })
            .unwrap_or_default()
    }

    fn delete_shader(&self, shader: GlHandle) {
        if let Some(id) = NonZeroU32::new(shader) {
            unsafe { self.gl.delete_shader(glow::NativeShader(id)) }
        }
    }

    fn create_program(&self) -> Result<GlHandle, String> {
        unsafe { self.gl.create_program() }.map(|p| p.0.get())
    }

    fn attach_shader(&self, program: GlHandle, shader: GlHandle) {
        if let (Some(p), Some(s)) = (NonZeroU32::new(program), NonZeroU32::new(shader)) {
            unsafe {
                self.gl
                    .attach_shader(glow::NativeProgram(p), glow::NativeShader(s))
            }
        }
    }

    fn detach_shader(&self, program: GlHandle, shader: GlHandle) {
        if let (Some(p), Some(s)) = (NonZeroU32::new(program), NonZeroU32::new(shader)) {
            unsafe {
                self.gl
                    .detach_shader(glow::NativeProgram(p), glow::NativeShader(s))
            }
        }
    }

    fn link_program(&self, program: GlHandle) -> bool {
        let Some(id) = NonZeroU32::new(program) else {
            return false;
        };
        let program = glow::NativeProgram(id);
        unsafe {
            self.gl.link_program(program);
            self.gl.get_program_link_status(program)
        }
    }

    fn program_info_log(&self, program: GlHandle) -> String {
        NonZeroU32::new(program)
            .map(|id| unsafe { self.gl.get_program_info_log(glow::NativeProgram(id)) })
            .unwrap_or_default()
    }

    fn use_program(&self, program: GlHandle) {
        let program = NonZeroU32::new(program).map(glow::NativeProgram);
        unsafe { self.gl.use_program(program) }
    }

    fn current_program(&self) -> GlHandle {
        let id = unsafe { self.gl.get_parameter_i32(glow::CURRENT_PROGRAM) };
        u32::try_from(id).unwrap_or(0)
    }

    fn uniform_location(&self, program: GlHandle, name: &str) -> Option<UniformLocation> {
        let id = NonZeroU32::new(program)?;
        let loc = unsafe { self.gl.get_uniform_location(glow::NativeProgram(id), name) }?;
        i32::try_from(loc.0).ok()
    }

    fn uniform_1_i32(&self, loc: UniformLocation, v: i32) {
        unsafe { self.gl.uniform_1_i32(location(loc).as_ref(), v) }
    }

    fn uniform_1_f32(&self, loc: UniformLocation, v: f32) {
        unsafe { self.gl.uniform_1_f32(location(loc).as_ref(), v) }
    }

    fn uniform_2_f32(&self, loc: UniformLocation, x: f32, y: f32) {
        unsafe { self.gl.uniform_2_f32(location(loc).as_ref(), x, y) }
    }

    fn uniform_3_f32(&self, loc: UniformLocation, x: f32, y: f32, z: f32) {
        unsafe { self.gl.uniform_3_f32(location(loc).as_ref(), x, y, z) }
    }

    fn uniform_4_f32(&self, loc: UniformLocation, x: f32, y: f32, z: f32, w: f32) {
        unsafe { self.gl.uniform_4_f32(location(loc).as_ref(), x, y, z, w) }
    }

    fn uniform_matrix(&self, loc: UniformLocation, shape: MatrixShape, data: &[f32]) {
        let loc = location(loc);
        let loc = loc.as_ref();
        unsafe {
            match shape {
                MatrixShape::Mat2 => self.gl.uniform_matrix_2_f32_slice(loc, false, data),
                MatrixShape::Mat3 => self.gl.uniform_matrix_3_f32_slice(loc, false, data),
                MatrixShape::Mat4 => self.gl.uniform_matrix_4_f32_slice(loc, false, data),
                MatrixShape::Mat2x3 => self.gl.uniform_matrix_2x3_f32_slice(loc, false, data),
                MatrixShape::Mat3x2 => self.gl.uniform_matrix_3x2_f32_slice(loc, false, data),
                MatrixShape::Mat2x4 => self.gl.uniform_matrix_2x4_f32_slice(loc, false, data),
                MatrixShape::Mat4x2 => self.gl.uniform_matrix_4x2_f32_slice(loc, false, data),
                MatrixShape::Mat3x4 => self.gl.uniform_matrix_3x4_f32_slice(loc, false, data),
                MatrixShape::Mat4x3 => self.gl.uniform_matrix_4x3_f32_slice(loc, false, data),
            }
        }
    }

    fn create_texture(&self) -> Result<GlHandle, String> {
        unsafe { self.gl.create_texture() }.map(|t| t.0.get())
    }

    fn bind_texture(&self, texture: GlHandle) {
        self.pixels.borrow_mut().bound = texture;
        let texture = NonZeroU32::new(texture).map(glow::NativeTexture);
        unsafe { self.gl.bind_texture(glow::TEXTURE_2D, texture) }
    }

    fn tex_image_2d(
        &self,
        width: i32,
        height: i32,
        internal: TextureFormat,
        format: TextureFormat,
        ty: TextureDataType,
        data: Option<&[u8]>,
    ) {
        let mut pixels = self.pixels.borrow_mut();
        let (w, h) = (width.max(0) as usize, height.max(0) as usize);
        if let Some(src) = data {
            let (row, stride) = row_layout(w, format.channels() * ty.size(), pixels.alignment());
            let needed = transfer_len(row, stride, h);
            if src.len() < needed {
                log::error!(
                    "GlowApi::tex_image_2d: {} bytes supplied, {needed} required",
                    src.len()
                );
                return;
            }
        }

        unsafe {
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal_format(internal),
                width,
                height,
                0,
                pixel_format(format),
                data_type(ty),
                data,
            )
        }
        let bound = pixels.bound;
        if bound != 0 {
            pixels.sizes.insert(bound, (w, h));
        }
    }

    fn generate_mipmap(&self) {
        unsafe { self.gl.generate_mipmap(glow::TEXTURE_2D) }
    }

    fn tex_parameter(&self, param: TextureParameter, value: TextureParameterValue) {
        unsafe {
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                texture_parameter(param),
                texture_parameter_value(value),
            )
        }
    }

    fn get_tex_image(&self, format: TextureFormat, ty: TextureDataType, out: &mut [u8]) {
        let pixels = self.pixels.borrow();
        let Some(&(w, h)) = pixels.sizes.get(&pixels.bound) else {
            log::error!("GlowApi::get_tex_image: texture {} has no uploaded image", pixels.bound);
            return;
        };
        let (row, stride) = row_layout(w, format.channels() * ty.size(), pixels.alignment());
        let needed = transfer_len(row, stride, h);
        if out.len() < needed {
            log::error!(
                "GlowApi::get_tex_image: {} bytes of room, {needed} required",
                out.len()
            );
            return;
        }

        unsafe {
            self.gl.get_tex_image(
                glow::TEXTURE_2D,
                0,
                pixel_format(format),
                data_type(ty),
                glow::PixelPackData::Slice(out),
            )
        }
    }

    fn delete_objects(&self, kind: GpuObjectKind, handles: &[GlHandle]) {
        if kind == GpuObjectKind::Texture {
            let mut pixels = self.pixels.borrow_mut();
            for h in handles {
                pixels.sizes.remove(h);
                if pixels.bound == *h {
                    pixels.bound = 0;
                }
            }
        }

        if let Some(delete) = self.deletes.for_kind(kind) {
            for chunk in handles.chunks(i32::MAX as usize) {
                // SAFETY: `chunk` holds `chunk.len()` ids; GL ignores 0 and unknown names.
                unsafe { delete(chunk.len() as i32, chunk.as_ptr()) }
            }
            return;
        }

        for id in handles.iter().copied().filter_map(NonZeroU32::new) {
            unsafe {
                match kind {
                    GpuObjectKind::Query => self.gl.delete_query(glow::NativeQuery(id)),
                    GpuObjectKind::ShaderStorageBuffer
                    | GpuObjectKind::VertexBuffer
                    | GpuObjectKind::IndexBuffer => self.gl.delete_buffer(glow::NativeBuffer(id)),
                    GpuObjectKind::Framebuffer => {
                        self.gl.delete_framebuffer(glow::NativeFramebuffer(id))
                    }
                    GpuObjectKind::VertexArray => {
                        self.gl.delete_vertex_array(glow::NativeVertexArray(id))
                    }
                    GpuObjectKind::Texture => self.gl.delete_texture(glow::NativeTexture(id)),
                    GpuObjectKind::Program => self.gl.delete_program(glow::NativeProgram(id)),
                }
            }
        }
    }
}
