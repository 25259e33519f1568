//! Rendering subsystem.
//!
//! Renderers own a device context ([`GlContext`]) shared by every object
//! they create. Device objects are never deleted in place: owners retire
//! them into the context's [`Graveyard`], and the renderer deletes them in
//! batches from [`Renderer::buffers_flush`] once per frame.
//!
//! Convention:
//! - matrices are column-major `glam` types, uploaded untransposed
//! - the default shader exposes `u_model`, `u_view` and `u_proj`

mod camera;
mod camera3d;
mod context;
mod error;
mod gl_renderer;
mod graveyard;
mod image;
mod renderer;
pub mod shader;
mod texture;

pub use camera::{Camera2D, DEFAULT_METER};
pub use camera3d::Camera3D;
pub use context::GlContext;
pub use error::{CameraError, RenderError, ShaderError};
pub use gl_renderer::{
    DEFAULT_FRAGMENT_SHADER, DEFAULT_VERTEX_SHADER, GlConfig, GlProfile, GlRenderer,
};
pub use graveyard::{DEFAULT_GRAVEYARD_CAPACITY, Graveyard};
pub use image::Image;
pub use renderer::{ActiveCamera, BackendKind, CameraKind, Renderer};
pub use shader::{ShaderProgram, ShaderScope, ShaderSources, UniformValue};
pub use texture::Texture;
