use crate::coords::{ColorRgba, Viewport};

/// Opaque device object handle. `0` never names a live object.
pub type GlHandle = u32;

/// Uniform location inside a linked program.
pub type UniformLocation = i32;

/// Programmable pipeline stage.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Geometry,
}

impl ShaderStage {
    /// Upper-case label used in compile diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            Self::Vertex => "VERTEX",
            Self::Fragment => "FRAGMENT",
            Self::Geometry => "GEOMETRY",
        }
    }
}

/// Server-side capabilities toggled through `enable`/`disable`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    Blend,
    DepthTest,
    ProgramPointSize,
    CullFace,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
}

/// Pixel layouts used both as internal storage format and as the layout of
/// uploaded or read-back data.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Red,
    Rg,
    Rgb,
    Rgba,
    R16F,
    Rgb16F,
    Rgba16F,
    Rgb32F,
    Rgba32F,
    Srgb,
    Srgba,
    Bgr,
    Bgra,
}

impl TextureFormat {
    /// Format matching an image channel count; anything unexpected is RGBA.
    pub fn from_channels(channels: u32) -> Self {
        match channels {
            1 => Self::Red,
            2 => Self::Rg,
            3 => Self::Rgb,
            _ => Self::Rgba,
        }
    }

    pub fn channels(self) -> usize {
        match self {
            Self::Red | Self::R16F => 1,
            Self::Rg => 2,
            Self::Rgb | Self::Rgb16F | Self::Rgb32F | Self::Srgb | Self::Bgr => 3,
            Self::Rgba | Self::Rgba16F | Self::Rgba32F | Self::Srgba | Self::Bgra => 4,
        }
    }
}

/// Component type of client-side pixel data.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum TextureDataType {
    #[default]
    UnsignedByte,
    Byte,
    UnsignedShort,
    Short,
    UnsignedInt,
    Int,
    Float,
}

impl TextureDataType {
    pub fn size(self) -> usize {
        match self {
            Self::UnsignedByte | Self::Byte => 1,
            Self::UnsignedShort | Self::Short => 2,
            Self::UnsignedInt | Self::Int | Self::Float => 4,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TextureParameter {
    MinFilter,
    MagFilter,
    WrapS,
    WrapT,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TextureParameterValue {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
    Repeat,
    ClampToEdge,
    MirroredRepeat,
}

/// Column/row shape of a matrix uniform, in GLSL `matCxR` naming.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MatrixShape {
    Mat2,
    Mat3,
    Mat4,
    Mat2x3,
    Mat3x2,
    Mat2x4,
    Mat4x2,
    Mat3x4,
    Mat4x3,
}

impl MatrixShape {
    /// Number of `f32` components in a column-major upload.
    pub fn component_count(self) -> usize {
        match self {
            Self::Mat2 => 4,
            Self::Mat3 => 9,
            Self::Mat4 => 16,
            Self::Mat2x3 | Self::Mat3x2 => 6,
            Self::Mat2x4 | Self::Mat4x2 => 8,
            Self::Mat3x4 | Self::Mat4x3 => 12,
        }
    }
}

/// Row alignment GL assumes for client-side pixel data until told otherwise.
pub const DEFAULT_PIXEL_ALIGNMENT: usize = 4;

/// Row length and row stride, in bytes, of client-side pixel data whose
/// rows start on `alignment`-byte boundaries.
pub(crate) fn row_layout(width: usize, pixel_size: usize, alignment: usize) -> (usize, usize) {
    let row = width * pixel_size;
    (row, row.next_multiple_of(alignment.max(1)))
}

/// Bytes a transfer of `height` rows touches; the last row is not padded.
pub(crate) fn transfer_len(row: usize, stride: usize, height: usize) -> usize {
    match height {
        0 => 0,
        h => stride * (h - 1) + row,
    }
}

/// Kinds of device objects destroyed through batched deletes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GpuObjectKind {
    Query,
    ShaderStorageBuffer,
    Framebuffer,
    VertexBuffer,
    IndexBuffer,
    VertexArray,
    Texture,
    Program,
}

impl GpuObjectKind {
    pub const COUNT: usize = 8;

    pub const ALL: [GpuObjectKind; Self::COUNT] = [
        Self::Query,
        Self::ShaderStorageBuffer,
        Self::Framebuffer,
        Self::VertexBuffer,
        Self::IndexBuffer,
        Self::VertexArray,
        Self::Texture,
        Self::Program,
    ];

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Backend entry points the engine drives.
///
/// This is the seam between engine logic and the graphics driver. Every
/// method maps onto one (or a short fixed sequence of) driver calls; no
/// method caches or batches on its own. Handles are plain integers so the
/// engine's bookkeeping stays backend-agnostic.
///
/// Implementations are single-threaded and assume their context is current
/// on the calling thread.
pub trait GlApi {
    /// Short backend label for logs.
    fn backend_name(&self) -> &'static str;

    /// Mandatory entry points the driver failed to provide.
    fn missing_entry_points(&self) -> Vec<&'static str>;

    // state

    fn enable(&self, cap: Capability);
    fn disable(&self, cap: Capability);
    fn blend_func(&self, src: BlendFactor, dst: BlendFactor);

    /// Clears the color and depth buffers of the current framebuffer.
    fn clear(&self, color: ColorRgba);
    fn viewport(&self, viewport: Viewport);
    fn active_texture_unit(&self, unit: u32);

    /// Row alignment of client-side pixel data, for both uploads and
    /// read-backs (`GL_UNPACK_ALIGNMENT` and `GL_PACK_ALIGNMENT`).
    fn pixel_alignment(&self, alignment: i32);

    // shaders

    fn create_shader(&self, stage: ShaderStage) -> Result<GlHandle, String>;
    fn shader_source(&self, shader: GlHandle, source: &str);

    /// Compiles and returns the compile status.
    fn compile_shader(&self, shader: GlHandle) -> bool;
    fn shader_info_log(&self, shader: GlHandle) -> String;
    fn delete_shader(&self, shader: GlHandle);

    fn create_program(&self) -> Result<GlHandle, String>;
    fn attach_shader(&self, program: GlHandle, shader: GlHandle);
    fn detach_shader(&self, program: GlHandle, shader: GlHandle);

    /// Links and returns the link status.
    fn link_program(&self, program: GlHandle) -> bool;
    fn program_info_log(&self, program: GlHandle) -> String;

    /// Makes `program` current; `0` unbinds.
    fn use_program(&self, program: GlHandle);
    fn current_program(&self) -> GlHandle;

    // uniforms

    fn uniform_location(&self, program: GlHandle, name: &str) -> Option<UniformLocation>;
    fn uniform_1_i32(&self, location: UniformLocation, v: i32);
    fn uniform_1_f32(&self, location: UniformLocation, v: f32);
    fn uniform_2_f32(&self, location: UniformLocation, x: f32, y: f32);
    fn uniform_3_f32(&self, location: UniformLocation, x: f32, y: f32, z: f32);
    fn uniform_4_f32(&self, location: UniformLocation, x: f32, y: f32, z: f32, w: f32);

    /// Uploads a column-major matrix. `data.len()` equals
    /// `shape.component_count()`.
    fn uniform_matrix(&self, location: UniformLocation, shape: MatrixShape, data: &[f32]);

    // textures (2D target, current unit)

    fn create_texture(&self) -> Result<GlHandle, String>;

    /// Binds `texture`; `0` unbinds.
    fn bind_texture(&self, texture: GlHandle);

    fn tex_image_2d(
        &self,
        width: i32,
        height: i32,
        internal_format: TextureFormat,
        format: TextureFormat,
        data_type: TextureDataType,
        data: Option<&[u8]>,
    );
    fn generate_mipmap(&self);
    fn tex_parameter(&self, param: TextureParameter, value: TextureParameterValue);

    /// Reads level 0 of the bound texture into `out`.
    ///
    /// Implementations refuse the read when `out` is shorter than the
    /// texture at the current pixel alignment.
    fn get_tex_image(&self, format: TextureFormat, data_type: TextureDataType, out: &mut [u8]);

    // destruction

    /// Deletes every handle in `handles` with one batched call.
    ///
    /// Programs are the exception: GL has no batched program delete, so they
    /// go one call per handle.
    fn delete_objects(&self, kind: GpuObjectKind, handles: &[GlHandle]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_channels_defaults_to_rgba() {
        assert_eq!(TextureFormat::from_channels(1), TextureFormat::Red);
        assert_eq!(TextureFormat::from_channels(2), TextureFormat::Rg);
        assert_eq!(TextureFormat::from_channels(3), TextureFormat::Rgb);
        assert_eq!(TextureFormat::from_channels(4), TextureFormat::Rgba);
        assert_eq!(TextureFormat::from_channels(7), TextureFormat::Rgba);
        assert_eq!(TextureFormat::from_channels(0), TextureFormat::Rgba);
    }

    #[test]
    fn rows_pad_to_alignment() {
        assert_eq!(row_layout(5, 3, 4), (15, 16));
        assert_eq!(row_layout(5, 3, 1), (15, 15));
        assert_eq!(row_layout(2, 4, 4), (8, 8));
        assert_eq!(transfer_len(15, 16, 5), 79);
        assert_eq!(transfer_len(15, 15, 5), 75);
        assert_eq!(transfer_len(15, 16, 0), 0);
    }

    #[test]
    fn kind_indices_are_dense() {
        for (i, kind) in GpuObjectKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn matrix_lengths() {
        assert_eq!(MatrixShape::Mat4.component_count(), 16);
        assert_eq!(MatrixShape::Mat3x2.component_count(), 6);
        assert_eq!(MatrixShape::Mat4x3.component_count(), 12);
    }
}
