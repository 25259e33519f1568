//! Graphics device layer.
//!
//! This module is responsible for:
//! - the backend entry-point seam ([`GlApi`]) and its value types
//! - the OpenGL implementation on top of `glow` ([`GlowApi`])
//! - a recording software device for tests and headless runs ([`HeadlessGl`])

mod api;
mod error;
mod native;
mod headless;

pub use api::{
    BlendFactor, Capability, DEFAULT_PIXEL_ALIGNMENT, GlApi, GlHandle, GpuObjectKind, MatrixShape,
    ShaderStage, TextureDataType, TextureFormat, TextureParameter, TextureParameterValue,
    UniformLocation,
};
pub use error::MissingEntryPoints;
pub use native::GlowApi;
pub use headless::{GlCall, HeadlessGl, UniformData};
