use std::fmt;

use crate::device::ShaderStage;

/// Shader program failure, kept on the program until the next successful
/// compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderError {
    /// The renderer has no shader support the engine knows how to drive.
    UnsupportedBackend { renderer: String },
    /// The device refused to create a shader or program object.
    Create(String),
    Compile { stage: ShaderStage, log: String },
    Link { log: String },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedBackend { renderer } => {
                write!(f, "Unknown renderer type: {renderer}")
            }
            Self::Create(msg) => write!(f, "ShaderCreateError:\n{msg}"),
            Self::Compile { stage, log } => {
                write!(f, "ShaderCompileError ({}):\n{}", stage.label(), log.trim_end())
            }
            Self::Link { log } => write!(f, "ShaderLinkingError:\n{}", log.trim_end()),
        }
    }
}

impl std::error::Error for ShaderError {}

/// Misuse of the camera UI mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraError {
    UiAlreadyActive,
    UiNotActive,
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UiAlreadyActive => write!(f, "ui_begin called while UI mode is already active"),
            Self::UiNotActive => write!(f, "ui_end called without a matching ui_begin"),
        }
    }
}

impl std::error::Error for CameraError {}

/// Failure creating a renderer-owned resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    UnsupportedBackend { renderer: String },
    Device(String),
    /// Pixel data shorter than the image it describes.
    PixelData { expected: usize, actual: usize },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedBackend { renderer } => {
                write!(f, "Unknown renderer type: {renderer}")
            }
            Self::Device(msg) => write!(f, "device error: {msg}"),
            Self::PixelData { expected, actual } => {
                write!(f, "pixel data too short: {actual} bytes, {expected} required")
            }
        }
    }
}

impl std::error::Error for RenderError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_error_names_the_stage() {
        let e = ShaderError::Compile {
            stage: ShaderStage::Fragment,
            log: "0:3: syntax error\n".into(),
        };
        assert_eq!(e.to_string(), "ShaderCompileError (FRAGMENT):\n0:3: syntax error");
    }

    #[test]
    fn pixel_data_error_names_both_sizes() {
        let e = RenderError::PixelData { expected: 16, actual: 4 };
        assert_eq!(e.to_string(), "pixel data too short: 4 bytes, 16 required");
    }

    #[test]
    fn link_error_has_its_own_tag() {
        let e = ShaderError::Link { log: "missing main".into() };
        assert!(e.to_string().starts_with("ShaderLinkingError:"));
    }
}
