//! Ownership of the per-image texture pair.
//!
//! Each loaded image gets exactly two textures: the *source* holding the
//! uploaded pixels and the *feedback* texture that captures the framebuffer
//! between passes. Nothing else creates or deletes them.

use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    gpu::Gpu,
    image_data::SourceImage,
};

/// What a texture is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureRole {
    /// The uploaded image, sampled by the first pass.
    Source,
    /// The framebuffer capture sampled by every extra pass.
    Feedback,
}

impl TextureRole {
    fn label(self) -> &'static str {
        match self {
            Self::Source => "source texture",
            Self::Feedback => "feedback texture",
        }
    }
}

/// A live texture and the size its storage was allocated with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureInfo<T> {
    /// Backend handle.
    pub handle: T,
    /// What the texture holds.
    pub role: TextureRole,
    /// Allocated width in pixels.
    pub width: u32,
    /// Allocated height in pixels.
    pub height: u32,
}

/// The two textures belonging to the current image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageTextures<T> {
    /// Pixels of the image, rows flipped so `t = 0` is the bottom edge.
    pub source: TextureInfo<T>,
    /// Canvas-sized capture target for multi-pass rendering.
    pub feedback: TextureInfo<T>,
}

/// Creates, replaces and deletes the texture pair.
pub struct TextureManager<G: Gpu> {
    live: Option<ImageTextures<G::Texture>>,
}

impl<G: Gpu> Default for TextureManager<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Gpu> TextureManager<G> {
    /// A manager with no textures.
    #[must_use]
    pub fn new() -> Self {
        Self { live: None }
    }

    /// The current pair, if an image is loaded.
    #[must_use]
    pub fn textures(&self) -> Option<&ImageTextures<G::Texture>> {
        self.live.as_ref()
    }

    /// Replace the textures for a new image, or drop them with `None`.
    ///
    /// The feedback texture is sized to the surface as it is *now*, so the
    /// host must resize the canvas to the image before calling this.
    ///
    /// The new pair is fully created before the old one is deleted. If
    /// anything fails, whatever was created is deleted again and the previous
    /// pair stays live.
    ///
    /// # Errors
    ///
    /// [`Error::Resource`] if a texture cannot be created or allocated.
    pub fn set_image(&mut self, gpu: &mut G, image: Option<&SourceImage>) -> Result<()> {
        let Some(image) = image else {
            debug!("no image, releasing textures");
            self.release(gpu);
            return Ok(());
        };

        let fresh = match create_pair(gpu, image) {
            Ok(fresh) => fresh,
            Err(err) => {
                warn!(error = %err, "keeping previous textures");
                return Err(err);
            }
        };

        if let Some(old) = self.live.replace(fresh) {
            delete_pair(gpu, old);
        }
        debug!(
            width = image.width(),
            height = image.height(),
            feedback_width = fresh.feedback.width,
            feedback_height = fresh.feedback.height,
            "image textures ready"
        );
        Ok(())
    }

    /// Delete both textures. Calling this with nothing loaded is a no-op.
    pub fn release(&mut self, gpu: &mut G) {
        if let Some(old) = self.live.take() {
            delete_pair(gpu, old);
        }
    }
}

fn create_pair<G: Gpu>(gpu: &mut G, image: &SourceImage) -> Result<ImageTextures<G::Texture>> {
    let [width, height] = gpu.surface_size();
    let feedback = create_texture(gpu, TextureRole::Feedback, width, height, None)?;

    let pixels = image.flipped_rows();
    let source = match create_texture(
        gpu,
        TextureRole::Source,
        image.width(),
        image.height(),
        Some(&pixels),
    ) {
        Ok(source) => source,
        Err(err) => {
            gpu.delete_texture(feedback.handle);
            return Err(err);
        }
    };

    Ok(ImageTextures { source, feedback })
}

fn create_texture<G: Gpu>(
    gpu: &mut G,
    role: TextureRole,
    width: u32,
    height: u32,
    pixels: Option<&[u8]>,
) -> Result<TextureInfo<G::Texture>> {
    let handle = gpu
        .create_texture()
        .map_err(|message| Error::resource(role.label(), message))?;

    gpu.bind_texture(Some(handle));
    if let Err(message) = gpu.tex_image_rgb8(width, height, pixels) {
        gpu.bind_texture(None);
        gpu.delete_texture(handle);
        return Err(Error::resource(role.label(), message));
    }
    gpu.set_linear_clamp();
    gpu.bind_texture(None);

    Ok(TextureInfo {
        handle,
        role,
        width,
        height,
    })
}

fn delete_pair<G: Gpu>(gpu: &mut G, pair: ImageTextures<G::Texture>) {
    gpu.delete_texture(pair.source.handle);
    gpu.delete_texture(pair.feedback.handle);
}
