//! A [`Gpu`] that records every call, for asserting command streams.

use std::collections::{HashMap, HashSet};

use crate::gpu::{Gpu, ShaderStage};

/// One recorded call, reduced to what tests inspect.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    BindAttrib { index: u32, name: String },
    UseProgram(Option<u32>),
    Uniform1F(String, f32),
    Uniform2F(String, [f32; 2]),
    Uniform1I(String, i32),
    VertexAttrib { index: u32, components: i32, stride: i32 },
    BindTexture(Option<u32>),
    TexImage {
        texture: Option<u32>,
        width: u32,
        height: u32,
        pixels: Option<Vec<u8>>,
    },
    LinearClamp(Option<u32>),
    DeleteTexture(u32),
    CopyFramebuffer {
        texture: Option<u32>,
        width: u32,
        height: u32,
    },
    Viewport(u32, u32),
    Clear([f32; 4]),
    Draw {
        first: i32,
        count: i32,
        texture: Option<u32>,
        dir: Option<[f32; 2]>,
    },
    Flush,
}

pub(crate) struct RecordingGpu {
    pub calls: Vec<Call>,
    pub surface: [u32; 2],
    pub fail_compile: Option<ShaderStage>,
    pub fail_link: bool,
    pub missing_uniform: Option<&'static str>,
    /// Zero-based index of the texture allocation that should fail.
    pub fail_tex_image_at: Option<usize>,
    pub live_shaders: HashSet<u32>,
    pub live_programs: HashSet<u32>,
    pub live_buffers: HashSet<u32>,
    pub live_vertex_arrays: HashSet<u32>,
    pub live_textures: HashSet<u32>,
    pub texture_sizes: HashMap<u32, [u32; 2]>,
    pub uploaded_vertices: Vec<u8>,
    shader_stages: HashMap<u32, ShaderStage>,
    tex_images: usize,
    bound_texture: Option<u32>,
    current_dir: Option<[f32; 2]>,
    next_id: u32,
}

impl RecordingGpu {
    pub fn new(surface: [u32; 2]) -> Self {
        Self {
            calls: Vec::new(),
            surface,
            fail_compile: None,
            fail_link: false,
            missing_uniform: None,
            fail_tex_image_at: None,
            live_shaders: HashSet::new(),
            live_programs: HashSet::new(),
            live_buffers: HashSet::new(),
            live_vertex_arrays: HashSet::new(),
            live_textures: HashSet::new(),
            texture_sizes: HashMap::new(),
            uploaded_vertices: Vec::new(),
            shader_stages: HashMap::new(),
            tex_images: 0,
            bound_texture: None,
            current_dir: None,
            next_id: 1,
        }
    }

    fn next(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn draw_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::Draw { .. }))
            .count()
    }

    pub fn clear_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::Clear(_)))
            .count()
    }

    pub fn copy_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::CopyFramebuffer { .. }))
            .count()
    }

    /// The `u_dir` value in effect at each draw, in order.
    pub fn draw_directions(&self) -> Vec<[f32; 2]> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Draw { dir, .. } => *dir,
                _ => None,
            })
            .collect()
    }

    /// The texture bound at each draw, in order.
    pub fn draw_textures(&self) -> Vec<Option<u32>> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Draw { texture, .. } => Some(*texture),
                _ => None,
            })
            .collect()
    }
}

impl Gpu for RecordingGpu {
    type Shader = u32;
    type Program = u32;
    type Buffer = u32;
    type VertexArray = u32;
    type Texture = u32;
    type UniformLocation = String;

    fn surface_size(&self) -> [u32; 2] {
        self.surface
    }

    fn create_shader(&mut self, stage: ShaderStage) -> Result<u32, String> {
        let id = self.next();
        self.shader_stages.insert(id, stage);
        self.live_shaders.insert(id);
        Ok(id)
    }

    fn compile_shader(&mut self, shader: u32, _source: &str) -> Result<(), String> {
        match self.shader_stages.get(&shader) {
            Some(stage) if Some(*stage) == self.fail_compile => {
                Err(format!("0:1(1): error: {stage} stage rejected"))
            }
            _ => Ok(()),
        }
    }

    fn delete_shader(&mut self, shader: u32) {
        self.live_shaders.remove(&shader);
    }

    fn create_program(&mut self) -> Result<u32, String> {
        let id = self.next();
        self.live_programs.insert(id);
        Ok(id)
    }

    fn bind_attrib_location(&mut self, _program: u32, index: u32, name: &str) {
        self.calls.push(Call::BindAttrib {
            index,
            name: name.to_owned(),
        });
    }

    fn link_program(&mut self, _program: u32, _vertex: u32, _fragment: u32) -> Result<(), String> {
        if self.fail_link {
            Err("error: unresolved varying".to_owned())
        } else {
            Ok(())
        }
    }

    fn detach_shader(&mut self, _program: u32, _shader: u32) {}

    fn delete_program(&mut self, program: u32) {
        self.live_programs.remove(&program);
    }

    fn use_program(&mut self, program: Option<u32>) {
        self.calls.push(Call::UseProgram(program));
    }

    fn uniform_location(&mut self, _program: u32, name: &str) -> Option<String> {
        if self.missing_uniform == Some(name) {
            None
        } else {
            Some(name.to_owned())
        }
    }

    fn uniform_1_f32(&mut self, location: &String, x: f32) {
        self.calls.push(Call::Uniform1F(location.clone(), x));
    }

    fn uniform_2_f32(&mut self, location: &String, x: f32, y: f32) {
        if location == crate::shaders::DIR_UNIFORM {
            self.current_dir = Some([x, y]);
        }
        self.calls.push(Call::Uniform2F(location.clone(), [x, y]));
    }

    fn uniform_1_i32(&mut self, location: &String, x: i32) {
        self.calls.push(Call::Uniform1I(location.clone(), x));
    }

    fn create_buffer(&mut self) -> Result<u32, String> {
        let id = self.next();
        self.live_buffers.insert(id);
        Ok(id)
    }

    fn upload_static_vertices(&mut self, _buffer: u32, data: &[u8]) {
        self.uploaded_vertices = data.to_vec();
    }

    fn delete_buffer(&mut self, buffer: u32) {
        self.live_buffers.remove(&buffer);
    }

    fn create_vertex_array(&mut self) -> Result<u32, String> {
        let id = self.next();
        self.live_vertex_arrays.insert(id);
        Ok(id)
    }

    fn bind_vertex_array(&mut self, _vertex_array: Option<u32>) {}

    fn vertex_attrib_f32(&mut self, index: u32, _buffer: u32, components: i32, stride: i32) {
        self.calls.push(Call::VertexAttrib {
            index,
            components,
            stride,
        });
    }

    fn delete_vertex_array(&mut self, vertex_array: u32) {
        self.live_vertex_arrays.remove(&vertex_array);
    }

    fn create_texture(&mut self) -> Result<u32, String> {
        let id = self.next();
        self.live_textures.insert(id);
        Ok(id)
    }

    fn bind_texture(&mut self, texture: Option<u32>) {
        self.bound_texture = texture;
        self.calls.push(Call::BindTexture(texture));
    }

    fn tex_image_rgb8(
        &mut self,
        width: u32,
        height: u32,
        pixels: Option<&[u8]>,
    ) -> Result<(), String> {
        let index = self.tex_images;
        self.tex_images += 1;
        if self.fail_tex_image_at == Some(index) {
            return Err("out of memory".to_owned());
        }
        if let Some(texture) = self.bound_texture {
            self.texture_sizes.insert(texture, [width, height]);
        }
        self.calls.push(Call::TexImage {
            texture: self.bound_texture,
            width,
            height,
            pixels: pixels.map(<[u8]>::to_vec),
        });
        Ok(())
    }

    fn set_linear_clamp(&mut self) {
        self.calls.push(Call::LinearClamp(self.bound_texture));
    }

    fn delete_texture(&mut self, texture: u32) {
        self.live_textures.remove(&texture);
        self.texture_sizes.remove(&texture);
        self.calls.push(Call::DeleteTexture(texture));
    }

    fn copy_framebuffer_to_texture(&mut self, width: u32, height: u32) {
        if let Some(texture) = self.bound_texture {
            self.texture_sizes.insert(texture, [width, height]);
        }
        self.calls.push(Call::CopyFramebuffer {
            texture: self.bound_texture,
            width,
            height,
        });
    }

    fn viewport(&mut self, width: u32, height: u32) {
        self.calls.push(Call::Viewport(width, height));
    }

    fn clear(&mut self, rgba: [f32; 4]) {
        self.calls.push(Call::Clear(rgba));
    }

    fn draw_triangle_strip(&mut self, first: i32, count: i32) {
        self.calls.push(Call::Draw {
            first,
            count,
            texture: self.bound_texture,
            dir: self.current_dir,
        });
    }

    fn flush(&mut self) {
        self.calls.push(Call::Flush);
    }

    fn read_pixels_rgb8(&mut self, width: u32, height: u32) -> Vec<u8> {
        vec![0; width as usize * height as usize * 3]
    }
}
