//! The renderer facade: owns the GPU objects, the current config and image
//! textures, and the frame scheduler.

use std::io::Cursor;

use image::{imageops, ImageFormat, RgbImage};
use tracing::{debug, info};

use crate::{
    config::{BlurConfig, RendererSettings},
    error::{Error, Result},
    geometry::Quad,
    gpu::Gpu,
    image_data::SourceImage,
    passes::{self, FrameStats},
    scheduler::FrameScheduler,
    shaders::BlurProgram,
    textures::{ImageTextures, TextureManager},
};

/// The GPU backend plus the objects created once at start-up.
///
/// Passed explicitly to the texture manager and the pass orchestrator; there
/// is no global "current renderer".
pub struct RenderContext<G: Gpu> {
    /// The backend every command goes through.
    pub(crate) gpu: G,
    /// The linked blur program. Never recompiled.
    pub(crate) program: BlurProgram<G>,
    /// The full-screen quad. Never modified.
    pub(crate) quad: Quad<G>,
    /// Color every frame starts from.
    pub(crate) clear_color: [f32; 4],
}

impl<G: Gpu> RenderContext<G> {
    /// Build the blur program and upload the quad.
    ///
    /// # Errors
    ///
    /// Shader compile/link failures and GPU object creation failures. The
    /// program is deleted again if the quad cannot be created.
    pub fn new(mut gpu: G, settings: &RendererSettings) -> Result<Self> {
        let program = BlurProgram::build(&mut gpu)?;
        let quad = match Quad::upload(&mut gpu) {
            Ok(quad) => quad,
            Err(err) => {
                gpu.use_program(None);
                program.destroy(&mut gpu);
                return Err(err);
            }
        };

        Ok(Self {
            gpu,
            program,
            quad,
            clear_color: settings.clear_color,
        })
    }

    /// Delete the program and the quad, handing back the backend.
    pub fn destroy(self) -> G {
        let Self {
            mut gpu,
            program,
            quad,
            ..
        } = self;
        gpu.use_program(None);
        quad.destroy(&mut gpu);
        program.destroy(&mut gpu);
        gpu
    }
}

/// Renders a user image through a configurable multi-pass Gaussian blur.
///
/// The control panel owns the live configuration and calls
/// [`set_config`](Self::set_config) with a copy whenever it changes, then
/// [`request_render_frame`](Self::request_render_frame). The host resizes
/// its surface to each new image before calling
/// [`set_image`](Self::set_image), and calls [`on_refresh`](Self::on_refresh)
/// from its display refresh callback.
///
/// # Example
///
/// ```
/// use separable_blur_gpu::{BlurConfig, BlurRenderer, RendererSettings, SoftwareGpu, SourceImage};
///
/// let image = SourceImage::checkerboard(32, 32, 4);
/// let gpu = SoftwareGpu::new(image.dimensions());
/// let mut renderer = BlurRenderer::new(gpu, RendererSettings::default())?;
///
/// renderer.set_image(Some(&image))?;
/// renderer.set_config(Some(BlurConfig::new(3, 1.0, 2)?))?;
/// renderer.request_render_frame();
///
/// let stats = renderer.on_refresh().expect("a frame was pending");
/// assert_eq!(stats.draw_calls, 3);
///
/// let blurred = renderer.snapshot()?;
/// assert_eq!(blurred.dimensions(), (32, 32));
/// # Ok::<(), separable_blur_gpu::Error>(())
/// ```
pub struct BlurRenderer<G: Gpu> {
    ctx: RenderContext<G>,
    textures: TextureManager<G>,
    config: Option<BlurConfig>,
    scheduler: FrameScheduler,
}

impl<G: Gpu> BlurRenderer<G> {
    /// Create a renderer on top of `gpu`.
    ///
    /// Compiles and links the blur program (it stays current afterwards) and
    /// uploads the quad. No textures exist until an image is set.
    ///
    /// # Errors
    ///
    /// [`Error::ShaderCompile`], [`Error::ShaderLink`] and
    /// [`Error::MissingUniform`] are fatal: no renderer is created.
    /// [`Error::Resource`] if the quad's GPU objects cannot be created.
    pub fn new(gpu: G, settings: RendererSettings) -> Result<Self> {
        let ctx = RenderContext::new(gpu, &settings)?;
        info!("blur renderer initialized");
        Ok(Self {
            ctx,
            textures: TextureManager::new(),
            config: None,
            scheduler: FrameScheduler::new(),
        })
    }

    /// Replace the blur parameters. `None` turns blurring off: frames are
    /// only cleared.
    ///
    /// Does not render by itself; follow with
    /// [`request_render_frame`](Self::request_render_frame).
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if a value is out of range. The previous config is
    /// kept in that case.
    pub fn set_config(&mut self, config: Option<BlurConfig>) -> Result<()> {
        if let Some(config) = &config {
            config.validate()?;
        }
        debug!(?config, "blur config updated");
        self.config = config;
        Ok(())
    }

    /// The config the next frame will use.
    #[must_use]
    pub fn config(&self) -> Option<BlurConfig> {
        self.config
    }

    /// Load a new image, or unload with `None`.
    ///
    /// The surface must already have the image's size: the feedback texture
    /// is allocated at the surface's current size.
    ///
    /// # Errors
    ///
    /// [`Error::Resource`] if texture creation fails; the previous image
    /// stays loaded.
    pub fn set_image(&mut self, image: Option<&SourceImage>) -> Result<()> {
        self.textures.set_image(&mut self.ctx.gpu, image)
    }

    /// The textures of the current image, if any.
    #[must_use]
    pub fn textures(&self) -> Option<&ImageTextures<G::Texture>> {
        self.textures.textures()
    }

    /// Draw a frame now, bypassing the scheduler.
    pub fn render_frame(&mut self) -> FrameStats {
        passes::render_frame(&mut self.ctx, self.config.as_ref(), self.textures.textures())
    }

    /// Ask for a frame on the next display refresh. Requests made before
    /// that refresh collapse into one frame.
    ///
    /// Returns `true` if this call scheduled the frame.
    pub fn request_render_frame(&mut self) -> bool {
        self.scheduler.request()
    }

    /// Install the platform hook that registers a refresh callback, e.g.
    /// `move || window.request_redraw()`.
    pub fn set_refresh_hook(&mut self, hook: impl FnMut() + 'static) {
        self.scheduler.set_refresh_hook(hook);
    }

    /// Whether a frame is waiting for the next refresh.
    #[must_use]
    pub fn frame_pending(&self) -> bool {
        self.scheduler.is_pending()
    }

    /// Refresh callback: draws the pending frame, if any, from the current
    /// config and image.
    pub fn on_refresh(&mut self) -> Option<FrameStats> {
        self.scheduler
            .take_pending()
            .then(|| self.render_frame())
    }

    /// Read the framebuffer back as a top-down RGB image.
    ///
    /// The framebuffer keeps its contents between frames, so this returns
    /// the last rendered frame.
    ///
    /// # Errors
    ///
    /// [`Error::Resource`] if the backend returns a short pixel buffer.
    pub fn snapshot(&mut self) -> Result<RgbImage> {
        let [width, height] = self.ctx.gpu.surface_size();
        let pixels = self.ctx.gpu.read_pixels_rgb8(width, height);
        let len = pixels.len();
        let mut image = RgbImage::from_raw(width, height, pixels).ok_or_else(|| {
            Error::resource(
                "framebuffer snapshot",
                format!("{len} bytes for a {width}x{height} surface"),
            )
        })?;
        // GL rows run bottom to top.
        imageops::flip_vertical_in_place(&mut image);
        Ok(image)
    }

    /// Encode the last rendered frame as PNG.
    ///
    /// # Errors
    ///
    /// Errors from [`snapshot`](Self::snapshot), or [`Error::Encode`].
    pub fn export_png(&mut self) -> Result<Vec<u8>> {
        let image = self.snapshot()?;
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(Error::Encode)?;
        Ok(bytes)
    }

    /// The backend.
    #[must_use]
    pub fn gpu(&self) -> &G {
        &self.ctx.gpu
    }

    /// The backend, mutably. Use it to resize the surface before
    /// [`set_image`](Self::set_image).
    pub fn gpu_mut(&mut self) -> &mut G {
        &mut self.ctx.gpu
    }

    /// Delete every GPU object the renderer owns and hand back the backend.
    pub fn destroy(self) -> G {
        let Self {
            mut ctx,
            mut textures,
            ..
        } = self;
        textures.release(&mut ctx.gpu);
        let gpu = ctx.destroy();
        info!("blur renderer destroyed");
        gpu
    }
}
