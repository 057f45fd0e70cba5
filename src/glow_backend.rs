//! [`Gpu`] on top of an OpenGL context via [glow].
//!
//! [glow]: https://docs.rs/glow

use std::sync::Arc;

use glow::{HasContext, PixelPackData, PixelUnpackData};

use crate::gpu::{Gpu, ShaderStage};

/// GL internal format for RGB8 textures, pre-cast to the `i32` that
/// `tex_image_2d` expects.
#[expect(clippy::cast_possible_wrap)]
const RGB8_INTERNAL_FORMAT: i32 = glow::RGB8 as i32;

/// Upper bound on stale errors drained before a checked call. A lost
/// context can report errors forever.
const MAX_DRAINED_ERRORS: usize = 16;

/// Convert a `u32` to `i32` for GL API calls, saturating at `i32::MAX`.
fn gl_size(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// An OpenGL 3.1 backend.
///
/// Every method issues raw GL calls, which is only sound while the context
/// is current on the calling thread. That is promised once, in
/// [`GlowGpu::new`], for the lifetime of the backend.
pub struct GlowGpu {
    /// The OpenGL context, shared via [`Arc`] so the host can keep using it.
    gl: Arc<glow::Context>,
    /// Current size of the default framebuffer, as last reported by the host.
    surface: [u32; 2],
}

impl GlowGpu {
    /// Wrap a context whose default framebuffer is `surface` pixels.
    ///
    /// Sets pack and unpack alignment to 1 so RGB8 rows of any width are
    /// tightly packed.
    ///
    /// # Safety
    ///
    /// `gl` must be current on this thread, and must stay current whenever
    /// any method of the returned backend (or a renderer built on it) runs.
    /// The default framebuffer should be created with preserved contents, so
    /// that frames can be read back after presentation.
    pub unsafe fn new(gl: Arc<glow::Context>, surface: [u32; 2]) -> Self {
        unsafe {
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            gl.pixel_store_i32(glow::PACK_ALIGNMENT, 1);
        }
        Self { gl, surface }
    }

    /// Record the new size after the host resized its window or canvas.
    pub fn resize_surface(&mut self, width: u32, height: u32) {
        self.surface = [width, height];
    }

    /// The underlying context.
    #[must_use]
    pub fn context(&self) -> &Arc<glow::Context> {
        &self.gl
    }

    fn drain_errors(&self) {
        for _ in 0..MAX_DRAINED_ERRORS {
            if unsafe { self.gl.get_error() } == glow::NO_ERROR {
                break;
            }
        }
    }

    fn check_error(&self, what: &str) -> Result<(), String> {
        match unsafe { self.gl.get_error() } {
            glow::NO_ERROR => Ok(()),
            glow::OUT_OF_MEMORY => Err(format!("{what}: out of GPU memory")),
            glow::INVALID_VALUE => Err(format!("{what}: size rejected by the driver")),
            code => Err(format!("{what}: GL error 0x{code:04X}")),
        }
    }
}

impl Gpu for GlowGpu {
    type Shader = glow::Shader;
    type Program = glow::Program;
    type Buffer = glow::Buffer;
    type VertexArray = glow::VertexArray;
    type Texture = glow::Texture;
    type UniformLocation = glow::UniformLocation;

    fn surface_size(&self) -> [u32; 2] {
        self.surface
    }

    fn create_shader(&mut self, stage: ShaderStage) -> Result<glow::Shader, String> {
        let shader_type = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        };
        unsafe { self.gl.create_shader(shader_type) }
    }

    fn compile_shader(&mut self, shader: glow::Shader, source: &str) -> Result<(), String> {
        unsafe {
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
            if self.gl.get_shader_compile_status(shader) {
                Ok(())
            } else {
                Err(self.gl.get_shader_info_log(shader))
            }
        }
    }

    fn delete_shader(&mut self, shader: glow::Shader) {
        unsafe { self.gl.delete_shader(shader) };
    }

    fn create_program(&mut self) -> Result<glow::Program, String> {
        unsafe { self.gl.create_program() }
    }

    fn bind_attrib_location(&mut self, program: glow::Program, index: u32, name: &str) {
        unsafe { self.gl.bind_attrib_location(program, index, name) };
    }

    fn link_program(
        &mut self,
        program: glow::Program,
        vertex: glow::Shader,
        fragment: glow::Shader,
    ) -> Result<(), String> {
        unsafe {
            self.gl.attach_shader(program, vertex);
            self.gl.attach_shader(program, fragment);
            self.gl.link_program(program);
            if self.gl.get_program_link_status(program) {
                Ok(())
            } else {
                Err(self.gl.get_program_info_log(program))
            }
        }
    }

    fn detach_shader(&mut self, program: glow::Program, shader: glow::Shader) {
        unsafe { self.gl.detach_shader(program, shader) };
    }

    fn delete_program(&mut self, program: glow::Program) {
        unsafe { self.gl.delete_program(program) };
    }

    fn use_program(&mut self, program: Option<glow::Program>) {
        unsafe { self.gl.use_program(program) };
    }

    fn uniform_location(
        &mut self,
        program: glow::Program,
        name: &str,
    ) -> Option<glow::UniformLocation> {
        unsafe { self.gl.get_uniform_location(program, name) }
    }

    fn uniform_1_f32(&mut self, location: &glow::UniformLocation, x: f32) {
        unsafe { self.gl.uniform_1_f32(Some(location), x) };
    }

    fn uniform_2_f32(&mut self, location: &glow::UniformLocation, x: f32, y: f32) {
        unsafe { self.gl.uniform_2_f32(Some(location), x, y) };
    }

    fn uniform_1_i32(&mut self, location: &glow::UniformLocation, x: i32) {
        unsafe { self.gl.uniform_1_i32(Some(location), x) };
    }

    fn create_buffer(&mut self) -> Result<glow::Buffer, String> {
        unsafe { self.gl.create_buffer() }
    }

    fn upload_static_vertices(&mut self, buffer: glow::Buffer, data: &[u8]) {
        unsafe {
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            self.gl
                .buffer_data_u8_slice(glow::ARRAY_BUFFER, data, glow::STATIC_DRAW);
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
        }
    }

    fn delete_buffer(&mut self, buffer: glow::Buffer) {
        unsafe { self.gl.delete_buffer(buffer) };
    }

    fn create_vertex_array(&mut self) -> Result<glow::VertexArray, String> {
        unsafe { self.gl.create_vertex_array() }
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<glow::VertexArray>) {
        unsafe { self.gl.bind_vertex_array(vertex_array) };
    }

    fn vertex_attrib_f32(
        &mut self,
        index: u32,
        buffer: glow::Buffer,
        components: i32,
        stride: i32,
    ) {
        unsafe {
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            self.gl.enable_vertex_attrib_array(index);
            self.gl
                .vertex_attrib_pointer_f32(index, components, glow::FLOAT, false, stride, 0);
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
        }
    }

    fn delete_vertex_array(&mut self, vertex_array: glow::VertexArray) {
        unsafe { self.gl.delete_vertex_array(vertex_array) };
    }

    fn create_texture(&mut self) -> Result<glow::Texture, String> {
        unsafe { self.gl.create_texture() }
    }

    fn bind_texture(&mut self, texture: Option<glow::Texture>) {
        unsafe {
            self.gl.active_texture(glow::TEXTURE0);
            self.gl.bind_texture(glow::TEXTURE_2D, texture);
        }
    }

    fn tex_image_rgb8(
        &mut self,
        width: u32,
        height: u32,
        pixels: Option<&[u8]>,
    ) -> Result<(), String> {
        self.drain_errors();
        unsafe {
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                RGB8_INTERNAL_FORMAT,
                gl_size(width),
                gl_size(height),
                0,
                glow::RGB,
                glow::UNSIGNED_BYTE,
                PixelUnpackData::Slice(pixels),
            );
        }
        self.check_error("glTexImage2D")
    }

    fn set_linear_clamp(&mut self) {
        // GL constant values are small enough that the cast is always safe.
        #[expect(clippy::cast_possible_wrap)]
        unsafe {
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                glow::LINEAR as i32,
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                glow::LINEAR as i32,
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_S,
                glow::CLAMP_TO_EDGE as i32,
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_T,
                glow::CLAMP_TO_EDGE as i32,
            );
        }
    }

    fn delete_texture(&mut self, texture: glow::Texture) {
        unsafe { self.gl.delete_texture(texture) };
    }

    fn copy_framebuffer_to_texture(&mut self, width: u32, height: u32) {
        unsafe {
            self.gl.copy_tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGB8,
                0,
                0,
                gl_size(width),
                gl_size(height),
                0,
            );
        }
    }

    fn viewport(&mut self, width: u32, height: u32) {
        unsafe { self.gl.viewport(0, 0, gl_size(width), gl_size(height)) };
    }

    fn clear(&mut self, [r, g, b, a]: [f32; 4]) {
        unsafe {
            self.gl.clear_color(r, g, b, a);
            self.gl.clear(glow::COLOR_BUFFER_BIT);
        }
    }

    fn draw_triangle_strip(&mut self, first: i32, count: i32) {
        unsafe { self.gl.draw_arrays(glow::TRIANGLE_STRIP, first, count) };
    }

    fn flush(&mut self) {
        unsafe { self.gl.flush() };
    }

    fn read_pixels_rgb8(&mut self, width: u32, height: u32) -> Vec<u8> {
        let mut pixels = vec![0; width as usize * height as usize * 3];
        unsafe {
            self.gl.read_pixels(
                0,
                0,
                gl_size(width),
                gl_size(height),
                glow::RGB,
                glow::UNSIGNED_BYTE,
                PixelPackData::Slice(Some(&mut pixels)),
            );
        }
        pixels
    }
}
