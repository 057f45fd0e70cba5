//! The narrow slice of a GL-style API the blur pipeline is written against.
//!
//! Everything above this trait (program builder, quad, texture manager, pass
//! orchestrator) is backend-agnostic. [`GlowGpu`](crate::GlowGpu) drives a
//! real OpenGL context, [`SoftwareGpu`](crate::SoftwareGpu) runs the same
//! commands on the CPU.
//!
//! Methods mirror their GL counterparts: texture operations act on the
//! texture bound with [`Gpu::bind_texture`], uniform setters act on the
//! program made current with [`Gpu::use_program`], and so on. Fallible
//! creation returns the driver's message as a `String`; the callers turn it
//! into [`Error`](crate::Error).

use std::fmt;

/// A programmable pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex stage.
    Vertex,
    /// Fragment stage.
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
        })
    }
}

/// GPU operations used by the blur renderer.
pub trait Gpu {
    /// A compiled (or compiling) shader stage.
    type Shader: Copy;
    /// A linked shader program.
    type Program: Copy;
    /// A vertex buffer.
    type Buffer: Copy;
    /// A vertex array object recording attribute layout.
    type VertexArray: Copy;
    /// A 2D texture.
    type Texture: Copy + PartialEq + fmt::Debug;
    /// The location of a uniform inside a linked program.
    type UniformLocation;

    /// Current pixel size of the display surface (the canvas).
    fn surface_size(&self) -> [u32; 2];

    /// Create an empty shader object for `stage`.
    fn create_shader(&mut self, stage: ShaderStage) -> Result<Self::Shader, String>;

    /// Compile `source` into `shader`, returning the info log on failure.
    fn compile_shader(&mut self, shader: Self::Shader, source: &str) -> Result<(), String>;

    /// Delete a shader object. Attached shaders are freed once detached.
    fn delete_shader(&mut self, shader: Self::Shader);

    /// Create an empty program object.
    fn create_program(&mut self) -> Result<Self::Program, String>;

    /// Pin a vertex attribute name to a slot. Takes effect at the next link.
    fn bind_attrib_location(&mut self, program: Self::Program, index: u32, name: &str);

    /// Attach both stages and link, returning the info log on failure.
    fn link_program(
        &mut self,
        program: Self::Program,
        vertex: Self::Shader,
        fragment: Self::Shader,
    ) -> Result<(), String>;

    /// Detach a shader from a program.
    fn detach_shader(&mut self, program: Self::Program, shader: Self::Shader);

    /// Delete a program object.
    fn delete_program(&mut self, program: Self::Program);

    /// Make `program` current for subsequent uniform updates and draws.
    fn use_program(&mut self, program: Option<Self::Program>);

    /// Look up a uniform by its GLSL name.
    fn uniform_location(
        &mut self,
        program: Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation>;

    /// Set a `float` uniform on the current program.
    fn uniform_1_f32(&mut self, location: &Self::UniformLocation, x: f32);

    /// Set a `vec2` uniform on the current program.
    fn uniform_2_f32(&mut self, location: &Self::UniformLocation, x: f32, y: f32);

    /// Set an `int` (or sampler) uniform on the current program.
    fn uniform_1_i32(&mut self, location: &Self::UniformLocation, x: i32);

    /// Create a vertex buffer.
    fn create_buffer(&mut self) -> Result<Self::Buffer, String>;

    /// Upload immutable vertex data into `buffer`.
    fn upload_static_vertices(&mut self, buffer: Self::Buffer, data: &[u8]);

    /// Delete a vertex buffer.
    fn delete_buffer(&mut self, buffer: Self::Buffer);

    /// Create a vertex array object.
    fn create_vertex_array(&mut self) -> Result<Self::VertexArray, String>;

    /// Bind a vertex array, or unbind with `None`.
    fn bind_vertex_array(&mut self, vertex_array: Option<Self::VertexArray>);

    /// Describe attribute `index` of the bound vertex array as `components`
    /// non-normalized floats read from `buffer` with the given byte stride.
    fn vertex_attrib_f32(
        &mut self,
        index: u32,
        buffer: Self::Buffer,
        components: i32,
        stride: i32,
    );

    /// Delete a vertex array object.
    fn delete_vertex_array(&mut self, vertex_array: Self::VertexArray);

    /// Create a texture object with no storage.
    fn create_texture(&mut self) -> Result<Self::Texture, String>;

    /// Bind a texture to unit 0, or unbind with `None`.
    fn bind_texture(&mut self, texture: Option<Self::Texture>);

    /// Allocate RGB8 storage for the bound texture, optionally filling it
    /// with tightly packed rows (first row is `t = 0`).
    fn tex_image_rgb8(&mut self, width: u32, height: u32, pixels: Option<&[u8]>)
        -> Result<(), String>;

    /// Linear min/mag filtering and clamp-to-edge wrapping on the bound
    /// texture.
    fn set_linear_clamp(&mut self);

    /// Delete a texture object.
    fn delete_texture(&mut self, texture: Self::Texture);

    /// Redefine the bound texture as a copy of the framebuffer's RGB
    /// contents in the rectangle `(0, 0)..(width, height)`.
    fn copy_framebuffer_to_texture(&mut self, width: u32, height: u32);

    /// Set the viewport to `(0, 0)..(width, height)`.
    fn viewport(&mut self, width: u32, height: u32);

    /// Clear the color buffer to `rgba`.
    fn clear(&mut self, rgba: [f32; 4]);

    /// Draw `count` vertices of the bound vertex array as a triangle strip.
    fn draw_triangle_strip(&mut self, first: i32, count: i32);

    /// Submit all queued commands.
    fn flush(&mut self);

    /// Read the framebuffer's RGB contents, bottom row first.
    fn read_pixels_rgb8(&mut self, width: u32, height: u32) -> Vec<u8>;
}
