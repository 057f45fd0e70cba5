//! The multi-pass separable blur.
//!
//! Every frame starts with a clear. With an image and a config present, the
//! first pass blurs the source horizontally straight into the framebuffer.
//! Each extra pass copies the framebuffer into the feedback texture and blurs
//! that copy, alternating vertical and horizontal starting with vertical.

use tracing::trace;

use crate::{config::BlurConfig, gpu::Gpu, render::RenderContext, textures::ImageTextures};

/// Axis a pass blurs along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Along x, `dir = (1, 0)`.
    Horizontal,
    /// Along y, `dir = (0, 1)`.
    Vertical,
}

impl Direction {
    /// The `u_dir` uniform value.
    #[must_use]
    pub fn vector(self) -> [f32; 2] {
        match self {
            Self::Horizontal => [1.0, 0.0],
            Self::Vertical => [0.0, 1.0],
        }
    }
}

/// Which texture a pass samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassInput {
    /// The uploaded image.
    Source,
    /// A copy of the framebuffer taken right before the pass.
    Feedback,
}

/// One draw of the blur.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pass {
    /// Direction of this pass.
    pub direction: Direction,
    /// Texture this pass samples.
    pub input: PassInput,
}

/// The passes drawn for `repeat` extra passes: `repeat + 1` in total.
///
/// The mandatory first pass is horizontal from the source. Extra pass `i`
/// (zero-based) is vertical for even `i` and horizontal for odd `i`.
pub fn plan(repeat: u32) -> impl Iterator<Item = Pass> {
    let first = Pass {
        direction: Direction::Horizontal,
        input: PassInput::Source,
    };
    let extra = (0..repeat).map(|i| Pass {
        direction: if i % 2 == 0 {
            Direction::Vertical
        } else {
            Direction::Horizontal
        },
        input: PassInput::Feedback,
    });
    std::iter::once(first).chain(extra)
}

/// What a call to [`render_frame`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Draw calls issued.
    pub draw_calls: u32,
    /// Framebuffer-to-feedback copies made.
    pub feedback_copies: u32,
}

/// Draw one frame into the bound framebuffer.
///
/// Without a config or textures the frame is only cleared. Handles are
/// borrowed for this call only; the program and uniforms are set again every
/// frame rather than trusted from the previous one.
pub fn render_frame<G: Gpu>(
    ctx: &mut RenderContext<G>,
    config: Option<&BlurConfig>,
    textures: Option<&ImageTextures<G::Texture>>,
) -> FrameStats {
    let [width, height] = ctx.gpu.surface_size();
    ctx.gpu.viewport(width, height);
    ctx.gpu.clear(ctx.clear_color);

    let mut stats = FrameStats::default();
    let (Some(config), Some(textures)) = (config, textures) else {
        trace!("nothing to blur, frame cleared");
        return stats;
    };

    let gpu = &mut ctx.gpu;
    let program = &ctx.program;

    gpu.use_program(Some(program.program));
    gpu.bind_texture(Some(textures.source.handle));

    // Sigma is at most 10 and the canvas far below 2^24 pixels.
    #[expect(clippy::cast_precision_loss)]
    {
        gpu.uniform_1_f32(&program.sigma, config.sigma as f32);
        gpu.uniform_1_f32(&program.step, config.step);
        gpu.uniform_2_f32(&program.size, width as f32, height as f32);
    }

    for pass in plan(config.repeat) {
        if pass.input == PassInput::Feedback {
            gpu.bind_texture(Some(textures.feedback.handle));
            gpu.copy_framebuffer_to_texture(width, height);
            stats.feedback_copies += 1;
        }

        let [x, y] = pass.direction.vector();
        gpu.uniform_2_f32(&program.dir, x, y);
        ctx.quad.draw(gpu);
        stats.draw_calls += 1;
    }

    gpu.bind_texture(None);
    gpu.flush();

    trace!(
        passes = stats.draw_calls,
        sigma = config.sigma,
        step = config.step,
        "frame rendered"
    );
    stats
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{
        config::RendererSettings,
        image_data::SourceImage,
        shaders::{SIGMA_UNIFORM, SIZE_UNIFORM, STEP_UNIFORM},
        testing::{Call, RecordingGpu},
        textures::TextureManager,
    };

    const H: [f32; 2] = [1.0, 0.0];
    const V: [f32; 2] = [0.0, 1.0];

    fn setup(surface: [u32; 2]) -> (RenderContext<RecordingGpu>, TextureManager<RecordingGpu>) {
        let ctx = RenderContext::new(RecordingGpu::new(surface), &RendererSettings::default())
            .unwrap();
        (ctx, TextureManager::new())
    }

    fn load(ctx: &mut RenderContext<RecordingGpu>, manager: &mut TextureManager<RecordingGpu>) {
        let [w, h] = ctx.gpu.surface;
        let image = SourceImage::checkerboard(w, h, 2);
        manager.set_image(&mut ctx.gpu, Some(&image)).unwrap();
        ctx.gpu.calls.clear();
    }

    #[test]
    fn plan_alternates_starting_vertical_after_mandatory_pass() {
        let directions: Vec<_> = plan(4).map(|p| p.direction).collect();
        assert_eq!(
            directions,
            [
                Direction::Horizontal,
                Direction::Vertical,
                Direction::Horizontal,
                Direction::Vertical,
                Direction::Horizontal,
            ]
        );
        let inputs: Vec<_> = plan(2).map(|p| p.input).collect();
        assert_eq!(
            inputs,
            [PassInput::Source, PassInput::Feedback, PassInput::Feedback]
        );
    }

    #[test]
    fn draw_count_is_repeat_plus_one() {
        for repeat in 0..=7 {
            let (mut ctx, mut manager) = setup([16, 16]);
            load(&mut ctx, &mut manager);
            let config = BlurConfig::new(3, 1.0, repeat).unwrap();

            let stats = render_frame(&mut ctx, Some(&config), manager.textures());

            assert_eq!(ctx.gpu.draw_count(), repeat as usize + 1);
            assert_eq!(stats.draw_calls, repeat + 1);
            assert_eq!(stats.feedback_copies, repeat);
        }
    }

    #[test]
    fn single_pass_is_horizontal_without_copy() {
        let (mut ctx, mut manager) = setup([16, 16]);
        load(&mut ctx, &mut manager);
        let config = BlurConfig::new(3, 1.0, 0).unwrap();

        render_frame(&mut ctx, Some(&config), manager.textures());

        assert_eq!(ctx.gpu.draw_directions(), [H]);
        assert_eq!(ctx.gpu.copy_count(), 0);
        let source = manager.textures().unwrap().source.handle;
        assert_eq!(ctx.gpu.draw_textures(), [Some(source)]);
    }

    #[test]
    fn four_passes_follow_direction_schedule() {
        let (mut ctx, mut manager) = setup([16, 16]);
        load(&mut ctx, &mut manager);
        let config = BlurConfig::new(5, 0.5, 3).unwrap();

        render_frame(&mut ctx, Some(&config), manager.textures());

        assert_eq!(ctx.gpu.draw_directions(), [H, V, H, V]);
        let pair = manager.textures().unwrap();
        assert_eq!(
            ctx.gpu.draw_textures(),
            [
                Some(pair.source.handle),
                Some(pair.feedback.handle),
                Some(pair.feedback.handle),
                Some(pair.feedback.handle),
            ]
        );
    }

    #[test]
    fn uniforms_carry_config_and_canvas_size() {
        let (mut ctx, mut manager) = setup([40, 30]);
        load(&mut ctx, &mut manager);
        let config = BlurConfig::new(5, 0.5, 0).unwrap();

        render_frame(&mut ctx, Some(&config), manager.textures());

        let calls = &ctx.gpu.calls;
        assert!(calls.contains(&Call::Uniform1F(SIGMA_UNIFORM.to_owned(), 5.0)));
        assert!(calls.contains(&Call::Uniform1F(STEP_UNIFORM.to_owned(), 0.5)));
        assert!(calls.contains(&Call::Uniform2F(SIZE_UNIFORM.to_owned(), [40.0, 30.0])));
    }

    #[test]
    fn feedback_copy_happens_before_each_extra_draw() {
        let (mut ctx, mut manager) = setup([12, 10]);
        load(&mut ctx, &mut manager);
        let feedback = manager.textures().unwrap().feedback.handle;
        let config = BlurConfig::new(2, 1.0, 2).unwrap();

        render_frame(&mut ctx, Some(&config), manager.textures());

        let sequence: Vec<&Call> = ctx
            .gpu
            .calls
            .iter()
            .filter(|c| matches!(c, Call::Draw { .. } | Call::CopyFramebuffer { .. }))
            .collect();
        let copy = Call::CopyFramebuffer {
            texture: Some(feedback),
            width: 12,
            height: 10,
        };
        assert_eq!(sequence.len(), 5);
        assert!(matches!(sequence[0], Call::Draw { .. }));
        assert_eq!(sequence[1], &copy);
        assert!(matches!(sequence[2], Call::Draw { .. }));
        assert_eq!(sequence[3], &copy);
        assert!(matches!(sequence[4], Call::Draw { .. }));
    }

    #[test]
    fn frame_opens_with_viewport_and_clear_and_ends_with_flush() {
        let (mut ctx, mut manager) = setup([16, 8]);
        load(&mut ctx, &mut manager);

        render_frame(&mut ctx, Some(&BlurConfig::default()), manager.textures());

        let calls = &ctx.gpu.calls;
        assert_eq!(calls[0], Call::Viewport(16, 8));
        assert_eq!(calls[1], Call::Clear(RendererSettings::default().clear_color));
        assert_eq!(calls.last(), Some(&Call::Flush));
        assert_eq!(ctx.gpu.clear_count(), 1);
    }

    #[test]
    fn missing_texture_only_clears() {
        let (mut ctx, _manager) = setup([16, 16]);
        ctx.gpu.calls.clear();

        let stats = render_frame(&mut ctx, Some(&BlurConfig::default()), None);

        assert_eq!(stats, FrameStats::default());
        assert_eq!(ctx.gpu.clear_count(), 1);
        assert_eq!(ctx.gpu.draw_count(), 0);
    }

    #[test]
    fn missing_config_only_clears() {
        let (mut ctx, mut manager) = setup([16, 16]);
        load(&mut ctx, &mut manager);

        render_frame(&mut ctx, None, manager.textures());

        assert_eq!(ctx.gpu.clear_count(), 1);
        assert_eq!(ctx.gpu.draw_count(), 0);
        assert_eq!(ctx.gpu.copy_count(), 0);
    }

    #[test]
    fn directions_do_not_leak_between_frames() {
        let (mut ctx, mut manager) = setup([16, 16]);
        load(&mut ctx, &mut manager);

        render_frame(&mut ctx, Some(&BlurConfig::new(3, 1.0, 4).unwrap()), manager.textures());
        ctx.gpu.calls.clear();
        render_frame(&mut ctx, Some(&BlurConfig::new(3, 1.0, 2).unwrap()), manager.textures());

        assert_eq!(ctx.gpu.draw_directions(), [H, V, H]);
    }
}
