//! Shader programs and their uniform caches.

mod cache;
mod program;
mod uniform;

pub use cache::{UniformLocationCache, UniformValueCache};
pub use program::{ShaderProgram, ShaderScope, ShaderSources};
pub use uniform::{UNIFORM_EPSILON, UniformKind, UniformValue};
