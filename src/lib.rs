//! Multi-pass separable Gaussian blur of a 2D image on the GPU.
//!
//! This crate provides [`BlurRenderer`], which uploads a source image,
//! blurs it with a horizontal pass and then any number of extra passes that
//! alternate vertical and horizontal, and presents the result on the display
//! surface. Extra passes read back what the previous pass drew: the
//! framebuffer is copied into a feedback texture right before each one.
//!
//! # Features
//!
//! - **Gaussian kernel in the fragment shader**, radius `ceil(3σ)` capped at
//!   30 taps per side, with a configurable tap spacing (`step`).
//! - **Coalesced redraws**: any number of render requests between two
//!   display refreshes produce a single frame.
//! - **Two backends** behind the [`Gpu`] trait: [`GlowGpu`] for a real
//!   OpenGL 3.1 context (feature `glow`, on by default) and [`SoftwareGpu`],
//!   a CPU rasterizer that runs the same command stream for headless use.
//! - **Snapshots** of the presented frame as an [`image::RgbImage`] or PNG.
//!
//! # Safety
//!
//! [`GlowGpu::new`] is `unsafe`: the caller promises that the OpenGL context
//! stays current for as long as the backend is used. Everything built on top
//! of it is safe to call.
//!
//! # Example
//!
//! ```
//! use separable_blur_gpu::{BlurConfig, BlurRenderer, RendererSettings, SoftwareGpu, SourceImage};
//!
//! let mut renderer = BlurRenderer::new(SoftwareGpu::new([64, 48]), RendererSettings::default())?;
//! renderer.set_image(Some(&SourceImage::checkerboard(64, 48, 8)))?;
//! renderer.set_config(Some(BlurConfig::new(4, 1.5, 3)?))?;
//!
//! let stats = renderer.render_frame();
//! assert_eq!(stats.draw_calls, 4);
//! let png = renderer.export_png()?;
//! assert!(png.starts_with(b"\x89PNG"));
//! # Ok::<(), separable_blur_gpu::Error>(())
//! ```
//!
//! [glow]: https://docs.rs/glow

mod config;
mod error;
mod geometry;
#[cfg(feature = "glow")]
mod glow_backend;
mod gpu;
mod image_data;
mod passes;
mod render;
mod scheduler;
mod shaders;
mod software;
#[cfg(test)]
mod testing;
mod textures;

pub use config::{BlurConfig, ConfigError, RendererSettings, REPEAT_RANGE, SIGMA_RANGE, STEP_RANGE};
pub use error::{Error, Result};
pub use geometry::{Quad, Vertex, QUAD_VERTICES};
#[cfg(feature = "glow")]
pub use glow_backend::GlowGpu;
pub use gpu::{Gpu, ShaderStage};
pub use image_data::SourceImage;
pub use passes::{plan, render_frame, Direction, FrameStats, Pass, PassInput};
pub use render::{BlurRenderer, RenderContext};
pub use scheduler::FrameScheduler;
pub use shaders::{compile_program, BlurProgram, FRAGMENT_SRC, MAX_RADIUS, VERTEX_SRC};
pub use software::{SoftwareGpu, SoftwareHandle, SoftwareUniform, MAX_TEXTURE_SIZE};
pub use textures::{ImageTextures, TextureInfo, TextureManager, TextureRole};
