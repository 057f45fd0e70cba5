//! Error types for the blur renderer.

use crate::config::ConfigError;
use crate::gpu::ShaderStage;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong while building or driving the renderer.
///
/// Shader and link failures are fatal at initialization. "Nothing to draw"
/// (no image or no configuration) is not an error and never shows up here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A shader stage failed to compile.
    #[error("{stage} shader failed to compile: {log}")]
    ShaderCompile {
        /// The stage that failed.
        stage: ShaderStage,
        /// The driver's info log for that stage.
        log: String,
    },

    /// The compiled stages failed to link into a program.
    #[error("shader program failed to link: {log}")]
    ShaderLink {
        /// The driver's program info log.
        log: String,
    },

    /// The linked program does not expose a uniform the blur pass sets.
    #[error("uniform `{name}` missing from the blur program")]
    MissingUniform {
        /// GLSL name of the uniform.
        name: &'static str,
    },

    /// A GPU object could not be created or allocated.
    #[error("failed to create {what}: {message}")]
    Resource {
        /// What was being created (e.g. "source texture").
        what: &'static str,
        /// Driver-provided detail.
        message: String,
    },

    /// A pixel buffer does not match the dimensions it claims.
    #[error("pixel buffer of {len} bytes does not hold a {width}x{height} RGB image")]
    InvalidImage {
        /// Claimed width in pixels.
        width: u32,
        /// Claimed height in pixels.
        height: u32,
        /// Actual buffer length in bytes.
        len: usize,
    },

    /// A blur configuration value is out of range.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Encoded image bytes could not be decoded.
    #[error("failed to decode image")]
    Decode(#[source] image::ImageError),

    /// The framebuffer could not be encoded for export.
    #[error("failed to encode image")]
    Encode(#[source] image::ImageError),
}

impl Error {
    pub(crate) fn resource(what: &'static str, message: impl Into<String>) -> Self {
        Self::Resource {
            what,
            message: message.into(),
        }
    }
}
