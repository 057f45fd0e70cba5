//! GLSL sources for the blur program and the program builder.
//!
//! The shaders target GLSL 1.40 (OpenGL 3.1), which is widely supported on
//! desktop platforms. The Gaussian kernel constants are shared with the
//! software backend so both produce the same image.

use tracing::debug;

use crate::{
    error::{Error, Result},
    geometry::POSITION_ATTRIB,
    gpu::{Gpu, ShaderStage},
};

/// Name of the position attribute, pinned to [`POSITION_ATTRIB`].
pub const POSITION_ATTRIB_NAME: &str = "a_position";

/// Sampler uniform. Always texture unit 0.
pub const TEXTURE_UNIFORM: &str = "u_texture";
/// Gaussian sigma uniform.
pub const SIGMA_UNIFORM: &str = "u_sigma";
/// Tap spacing uniform, in pixels.
pub const STEP_UNIFORM: &str = "u_step";
/// Canvas size uniform, in pixels.
pub const SIZE_UNIFORM: &str = "u_size";
/// Blur direction uniform, `(1, 0)` or `(0, 1)`.
pub const DIR_UNIFORM: &str = "u_dir";

/// Largest kernel half-width the fragment shader evaluates.
pub const MAX_RADIUS: i32 = 30;

/// Vertex shader for the full-screen quad.
///
/// The quad's unit-square positions double as texture coordinates. Source
/// images are flipped at upload, so `v_uv.y = 0` is the bottom row on both
/// the texture and the framebuffer side.
pub const VERTEX_SRC: &str = r"#version 140

in vec2 a_position;

out vec2 v_uv;

void main() {
    v_uv = a_position;
    gl_Position = vec4(a_position * 2.0 - 1.0, 0.0, 1.0);
}
";

/// Fragment shader: one direction of a separable Gaussian blur.
///
/// # Uniforms
///
/// | Name        | Type        | Description                              |
/// |-------------|-------------|------------------------------------------|
/// | `u_texture` | `sampler2D` | Pass input (source or feedback texture)  |
/// | `u_sigma`   | `float`     | Gaussian sigma, in taps                  |
/// | `u_step`    | `float`     | Distance between taps, in pixels         |
/// | `u_size`    | `vec2`      | Canvas size in pixels                    |
/// | `u_dir`     | `vec2`      | `(1, 0)` horizontal, `(0, 1)` vertical   |
pub const FRAGMENT_SRC: &str = r"#version 140

in vec2 v_uv;

uniform sampler2D u_texture;
uniform float u_sigma;
uniform float u_step;
uniform vec2 u_size;
uniform vec2 u_dir;

out vec4 frag_color;

const int MAX_RADIUS = 30;

void main() {
    int radius = min(int(ceil(3.0 * u_sigma)), MAX_RADIUS);
    vec2 texel = u_dir * u_step / u_size;
    float denom = 2.0 * u_sigma * u_sigma;

    vec3 sum = vec3(0.0);
    float total = 0.0;
    for (int i = -MAX_RADIUS; i <= MAX_RADIUS; ++i) {
        if (abs(i) > radius) {
            continue;
        }
        float w = exp(-float(i * i) / denom);
        sum += texture(u_texture, v_uv + float(i) * texel).rgb * w;
        total += w;
    }

    frag_color = vec4(sum / total, 1.0);
}
";

/// Half-width of the kernel for `sigma`, matching the fragment shader.
pub(crate) fn kernel_radius(sigma: f32) -> i32 {
    if sigma <= 0.0 {
        return 0;
    }
    // Float-to-int casts saturate, and sigma is small anyway.
    #[expect(clippy::cast_possible_truncation)]
    let radius = (3.0 * sigma).ceil() as i32;
    radius.min(MAX_RADIUS)
}

/// Unnormalized Gaussian weight of the tap at `offset`.
pub(crate) fn gaussian_weight(offset: i32, sigma: f32) -> f32 {
    if sigma <= 0.0 {
        return if offset == 0 { 1.0 } else { 0.0 };
    }
    #[expect(clippy::cast_precision_loss)]
    let distance = (offset * offset) as f32;
    (-distance / (2.0 * sigma * sigma)).exp()
}

/// Compile a shader program from vertex and fragment source strings.
///
/// The position attribute is pinned to [`POSITION_ATTRIB`] before linking.
/// The shader objects are detached and deleted after a successful link, so
/// only the program handle needs to be cleaned up by the caller. On success
/// the program is also made current.
///
/// # Errors
///
/// [`Error::ShaderCompile`] names the failing stage and carries its log;
/// [`Error::ShaderLink`] carries the program log. Nothing is left allocated
/// on failure.
pub fn compile_program<G: Gpu>(
    gpu: &mut G,
    vertex_src: &str,
    fragment_src: &str,
) -> Result<G::Program> {
    let vs = compile_shader(gpu, ShaderStage::Vertex, vertex_src)?;
    let fs = match compile_shader(gpu, ShaderStage::Fragment, fragment_src) {
        Ok(fs) => fs,
        Err(err) => {
            gpu.delete_shader(vs);
            return Err(err);
        }
    };

    let program = match gpu.create_program() {
        Ok(program) => program,
        Err(message) => {
            gpu.delete_shader(vs);
            gpu.delete_shader(fs);
            return Err(Error::resource("shader program", message));
        }
    };

    gpu.bind_attrib_location(program, POSITION_ATTRIB, POSITION_ATTRIB_NAME);

    if let Err(log) = gpu.link_program(program, vs, fs) {
        gpu.delete_program(program);
        gpu.delete_shader(vs);
        gpu.delete_shader(fs);
        return Err(Error::ShaderLink { log });
    }

    // Shaders can be detached and deleted after successful linking.
    gpu.detach_shader(program, vs);
    gpu.detach_shader(program, fs);
    gpu.delete_shader(vs);
    gpu.delete_shader(fs);

    gpu.use_program(Some(program));
    Ok(program)
}

/// Compile a single shader stage (vertex or fragment) from source.
fn compile_shader<G: Gpu>(gpu: &mut G, stage: ShaderStage, source: &str) -> Result<G::Shader> {
    let shader = gpu
        .create_shader(stage)
        .map_err(|message| Error::resource("shader object", message))?;

    if let Err(log) = gpu.compile_shader(shader, source) {
        gpu.delete_shader(shader);
        return Err(Error::ShaderCompile { stage, log });
    }

    Ok(shader)
}

/// The linked blur program and its cached uniform locations.
pub struct BlurProgram<G: Gpu> {
    pub(crate) program: G::Program,
    /// `u_sigma`: Gaussian sigma.
    pub(crate) sigma: G::UniformLocation,
    /// `u_step`: tap spacing in pixels.
    pub(crate) step: G::UniformLocation,
    /// `u_size`: canvas size in pixels.
    pub(crate) size: G::UniformLocation,
    /// `u_dir`: blur direction.
    pub(crate) dir: G::UniformLocation,
}

impl<G: Gpu> BlurProgram<G> {
    /// Build the program from the bundled [`VERTEX_SRC`] and
    /// [`FRAGMENT_SRC`].
    ///
    /// # Errors
    ///
    /// See [`BlurProgram::from_sources`].
    pub fn build(gpu: &mut G) -> Result<Self> {
        Self::from_sources(gpu, VERTEX_SRC, FRAGMENT_SRC)
    }

    /// Build the program from custom sources exposing the same uniforms.
    ///
    /// The sampler is pointed at texture unit 0 once here; it never changes.
    ///
    /// # Errors
    ///
    /// Compile and link failures from [`compile_program`], or
    /// [`Error::MissingUniform`] if the linked program lacks one of the blur
    /// uniforms (the program is deleted in that case).
    pub fn from_sources(gpu: &mut G, vertex_src: &str, fragment_src: &str) -> Result<Self> {
        let program = compile_program(gpu, vertex_src, fragment_src)?;

        match Self::locate_uniforms(gpu, program) {
            Ok(blur) => {
                debug!("blur program linked");
                Ok(blur)
            }
            Err(err) => {
                gpu.use_program(None);
                gpu.delete_program(program);
                Err(err)
            }
        }
    }

    fn locate_uniforms(gpu: &mut G, program: G::Program) -> Result<Self> {
        let texture = locate(gpu, program, TEXTURE_UNIFORM)?;
        gpu.uniform_1_i32(&texture, 0);

        Ok(Self {
            program,
            sigma: locate(gpu, program, SIGMA_UNIFORM)?,
            step: locate(gpu, program, STEP_UNIFORM)?,
            size: locate(gpu, program, SIZE_UNIFORM)?,
            dir: locate(gpu, program, DIR_UNIFORM)?,
        })
    }

    /// Delete the program.
    pub fn destroy(self, gpu: &mut G) {
        gpu.delete_program(self.program);
    }
}

fn locate<G: Gpu>(
    gpu: &mut G,
    program: G::Program,
    name: &'static str,
) -> Result<G::UniformLocation> {
    gpu.uniform_location(program, name)
        .ok_or(Error::MissingUniform { name })
}
