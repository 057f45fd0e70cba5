//! A CPU implementation of [`Gpu`].
//!
//! [`SoftwareGpu`] behaves like a small RGB8 OpenGL context: it rasterizes
//! triangle strips, samples with bilinear filtering and clamp-to-edge, and
//! keeps its framebuffer between frames. It cannot run GLSL. Linked programs
//! are shaded with the built-in equivalent of
//! [`VERTEX_SRC`](crate::shaders::VERTEX_SRC) and
//! [`FRAGMENT_SRC`](crate::shaders::FRAGMENT_SRC), reading the same uniforms.
//!
//! Useful for headless export and for checking the blur numerically.

use std::collections::HashMap;

use crate::{
    geometry::POSITION_ATTRIB,
    gpu::{Gpu, ShaderStage},
    shaders::{self, DIR_UNIFORM, SIGMA_UNIFORM, SIZE_UNIFORM, STEP_UNIFORM},
};

/// Largest texture edge accepted, like a typical `GL_MAX_TEXTURE_SIZE`.
pub const MAX_TEXTURE_SIZE: u32 = 16_384;

/// Name of any object created by [`SoftwareGpu`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SoftwareHandle(u32);

/// A uniform location inside a [`SoftwareGpu`] program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftwareUniform {
    program: SoftwareHandle,
    name: String,
}

#[derive(Debug, Clone, Copy)]
enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Int(i32),
}

struct ShaderObject {
    stage: ShaderStage,
    source: String,
    compiled: bool,
}

#[derive(Default)]
struct ProgramObject {
    linked: bool,
    declared: Vec<String>,
    values: HashMap<String, UniformValue>,
}

impl ProgramObject {
    fn float(&self, name: &str) -> f32 {
        match self.values.get(name) {
            Some(UniformValue::Float(x)) => *x,
            #[expect(clippy::cast_precision_loss)]
            Some(UniformValue::Int(x)) => *x as f32,
            _ => 0.0,
        }
    }

    fn vec2(&self, name: &str) -> [f32; 2] {
        match self.values.get(name) {
            Some(UniformValue::Vec2(v)) => *v,
            _ => [0.0, 0.0],
        }
    }
}

#[derive(Clone, Copy)]
struct AttribBinding {
    buffer: SoftwareHandle,
    stride: usize,
}

struct TextureObject {
    width: u32,
    height: u32,
    texels: Vec<u8>,
}

impl TextureObject {
    fn texel(&self, x: i64, y: i64) -> [f32; 3] {
        let x = x.clamp(0, i64::from(self.width) - 1);
        let y = y.clamp(0, i64::from(self.height) - 1);
        #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let i = (y as usize * self.width as usize + x as usize) * 3;
        [
            f32::from(self.texels[i]) / 255.0,
            f32::from(self.texels[i + 1]) / 255.0,
            f32::from(self.texels[i + 2]) / 255.0,
        ]
    }

    /// Bilinear sample with clamp-to-edge, texel centers at `(i + 0.5) / n`.
    fn sample(&self, uv: [f32; 2]) -> [f32; 3] {
        if self.width == 0 || self.height == 0 {
            return [0.0; 3];
        }
        #[expect(clippy::cast_precision_loss)]
        let (x, y) = (
            uv[0] * self.width as f32 - 0.5,
            uv[1] * self.height as f32 - 0.5,
        );
        let (x0, y0) = (x.floor(), y.floor());
        let (fx, fy) = (x - x0, y - y0);
        #[expect(clippy::cast_possible_truncation)]
        let (ix, iy) = (x0 as i64, y0 as i64);

        let a = self.texel(ix, iy);
        let b = self.texel(ix + 1, iy);
        let c = self.texel(ix, iy + 1);
        let d = self.texel(ix + 1, iy + 1);
        std::array::from_fn(|k| {
            let top = a[k] + (b[k] - a[k]) * fx;
            let bottom = c[k] + (d[k] - c[k]) * fx;
            top + (bottom - top) * fy
        })
    }
}

/// Uniform values one draw shades with.
struct Kernel {
    sigma: f32,
    step: f32,
    size: [f32; 2],
    dir: [f32; 2],
}

impl Kernel {
    fn from_program(program: &ProgramObject) -> Self {
        Self {
            sigma: program.float(SIGMA_UNIFORM),
            step: program.float(STEP_UNIFORM),
            size: program.vec2(SIZE_UNIFORM),
            dir: program.vec2(DIR_UNIFORM),
        }
    }

    fn shade(&self, texture: Option<&TextureObject>, uv: [f32; 2]) -> [f32; 3] {
        let Some(texture) = texture else {
            return [0.0; 3];
        };
        let texel: [f32; 2] = std::array::from_fn(|k| {
            if self.size[k] > 0.0 {
                self.dir[k] * self.step / self.size[k]
            } else {
                0.0
            }
        });

        let radius = shaders::kernel_radius(self.sigma);
        let mut sum = [0.0f32; 3];
        let mut total = 0.0f32;
        for i in -radius..=radius {
            let w = shaders::gaussian_weight(i, self.sigma);
            #[expect(clippy::cast_precision_loss)]
            let offset = i as f32;
            let rgb = texture.sample([uv[0] + offset * texel[0], uv[1] + offset * texel[1]]);
            for k in 0..3 {
                sum[k] += rgb[k] * w;
            }
            total += w;
        }
        sum.map(|c| c / total)
    }
}

fn quantize(c: f32) -> u8 {
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let byte = (c * 255.0).round().clamp(0.0, 255.0) as u8;
    byte
}

/// Signed doubled area of `(a, b, p)`.
fn edge(a: [f32; 2], b: [f32; 2], p: [f32; 2]) -> f32 {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

/// A software rendering context with an RGB8 framebuffer.
pub struct SoftwareGpu {
    surface: [u32; 2],
    /// RGB8, bottom row first.
    framebuffer: Vec<u8>,
    viewport: [u32; 2],
    next_id: u32,
    shaders: HashMap<SoftwareHandle, ShaderObject>,
    programs: HashMap<SoftwareHandle, ProgramObject>,
    buffers: HashMap<SoftwareHandle, Vec<u8>>,
    vertex_arrays: HashMap<SoftwareHandle, Option<AttribBinding>>,
    textures: HashMap<SoftwareHandle, TextureObject>,
    current_program: Option<SoftwareHandle>,
    bound_vertex_array: Option<SoftwareHandle>,
    bound_texture: Option<SoftwareHandle>,
}

impl SoftwareGpu {
    /// A context whose surface is `[width, height]` pixels, cleared to black.
    #[must_use]
    pub fn new(surface: [u32; 2]) -> Self {
        Self {
            surface,
            framebuffer: vec![0; pixel_bytes(surface)],
            viewport: surface,
            next_id: 1,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            buffers: HashMap::new(),
            vertex_arrays: HashMap::new(),
            textures: HashMap::new(),
            current_program: None,
            bound_vertex_array: None,
            bound_texture: None,
        }
    }

    /// Resize the surface. Like resizing a canvas, this discards the
    /// framebuffer contents.
    pub fn resize_surface(&mut self, width: u32, height: u32) {
        self.surface = [width, height];
        self.framebuffer = vec![0; pixel_bytes(self.surface)];
    }

    /// The framebuffer as RGB8, bottom row first.
    #[must_use]
    pub fn framebuffer(&self) -> &[u8] {
        &self.framebuffer
    }

    /// Number of textures that exist right now.
    #[must_use]
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    fn next_handle(&mut self) -> SoftwareHandle {
        let handle = SoftwareHandle(self.next_id);
        self.next_id += 1;
        handle
    }

    fn read_region(&self, width: u32, height: u32) -> Vec<u8> {
        let [fb_width, fb_height] = self.surface;
        let mut out = Vec::with_capacity(pixel_bytes([width, height]));
        for y in 0..height {
            for x in 0..width {
                if x < fb_width && y < fb_height {
                    let i = (y as usize * fb_width as usize + x as usize) * 3;
                    out.extend_from_slice(&self.framebuffer[i..i + 3]);
                } else {
                    out.extend_from_slice(&[0, 0, 0]);
                }
            }
        }
        out
    }

    /// Window-space positions of `count` vertices starting at `first`.
    fn fetch_positions(&self, first: i32, count: i32) -> Option<Vec<[f32; 2]>> {
        let binding = (*self.vertex_arrays.get(&self.bound_vertex_array?)?)?;
        let data = self.buffers.get(&binding.buffer)?;
        let first = usize::try_from(first).ok()?;
        let count = usize::try_from(count).ok()?;

        (first..first + count)
            .map(|i| {
                let offset = i * binding.stride;
                let x = data.get(offset..offset + 4)?;
                let y = data.get(offset + 4..offset + 8)?;
                Some([
                    f32::from_ne_bytes(x.try_into().ok()?),
                    f32::from_ne_bytes(y.try_into().ok()?),
                ])
            })
            .collect()
    }
}

fn pixel_bytes([width, height]: [u32; 2]) -> usize {
    width as usize * height as usize * 3
}

/// Names declared as `uniform <type> <name>;` in a GLSL source.
fn declared_uniforms(source: &str) -> impl Iterator<Item = String> + '_ {
    source.lines().filter_map(|line| {
        let mut words = line.trim().strip_prefix("uniform ")?.split_whitespace();
        let _ty = words.next()?;
        let name = words.next()?.trim_end_matches(';');
        Some(name.to_owned())
    })
}

impl Gpu for SoftwareGpu {
    type Shader = SoftwareHandle;
    type Program = SoftwareHandle;
    type Buffer = SoftwareHandle;
    type VertexArray = SoftwareHandle;
    type Texture = SoftwareHandle;
    type UniformLocation = SoftwareUniform;

    fn surface_size(&self) -> [u32; 2] {
        self.surface
    }

    fn create_shader(&mut self, stage: ShaderStage) -> Result<SoftwareHandle, String> {
        let handle = self.next_handle();
        self.shaders.insert(
            handle,
            ShaderObject {
                stage,
                source: String::new(),
                compiled: false,
            },
        );
        Ok(handle)
    }

    fn compile_shader(&mut self, shader: SoftwareHandle, source: &str) -> Result<(), String> {
        let object = self
            .shaders
            .get_mut(&shader)
            .ok_or_else(|| "invalid shader object".to_owned())?;
        object.source = source.to_owned();
        object.compiled = source.contains("void main");
        if object.compiled {
            Ok(())
        } else {
            Err(format!(
                "0:0: error: {} shader has no `main` function",
                object.stage
            ))
        }
    }

    fn delete_shader(&mut self, shader: SoftwareHandle) {
        self.shaders.remove(&shader);
    }

    fn create_program(&mut self) -> Result<SoftwareHandle, String> {
        let handle = self.next_handle();
        self.programs.insert(handle, ProgramObject::default());
        Ok(handle)
    }

    fn bind_attrib_location(&mut self, _program: SoftwareHandle, _index: u32, _name: &str) {
        // Positions always come from POSITION_ATTRIB.
    }

    fn link_program(
        &mut self,
        program: SoftwareHandle,
        vertex: SoftwareHandle,
        fragment: SoftwareHandle,
    ) -> Result<(), String> {
        let stage_ok = |handle: SoftwareHandle, stage: ShaderStage| {
            self.shaders
                .get(&handle)
                .is_some_and(|s| s.stage == stage && s.compiled)
        };
        if !stage_ok(vertex, ShaderStage::Vertex) {
            return Err("link error: no compiled vertex shader attached".to_owned());
        }
        if !stage_ok(fragment, ShaderStage::Fragment) {
            return Err("link error: no compiled fragment shader attached".to_owned());
        }

        let declared: Vec<String> = [vertex, fragment]
            .iter()
            .filter_map(|handle| self.shaders.get(handle))
            .flat_map(|shader| declared_uniforms(&shader.source).collect::<Vec<_>>())
            .collect();

        let object = self
            .programs
            .get_mut(&program)
            .ok_or_else(|| "invalid program object".to_owned())?;
        object.linked = true;
        object.declared = declared;
        object.values.clear();
        Ok(())
    }

    fn detach_shader(&mut self, _program: SoftwareHandle, _shader: SoftwareHandle) {}

    fn delete_program(&mut self, program: SoftwareHandle) {
        self.programs.remove(&program);
        if self.current_program == Some(program) {
            self.current_program = None;
        }
    }

    fn use_program(&mut self, program: Option<SoftwareHandle>) {
        self.current_program = program;
    }

    fn uniform_location(
        &mut self,
        program: SoftwareHandle,
        name: &str,
    ) -> Option<SoftwareUniform> {
        let object = self.programs.get(&program)?;
        (object.linked && object.declared.iter().any(|d| d == name)).then(|| SoftwareUniform {
            program,
            name: name.to_owned(),
        })
    }

    fn uniform_1_f32(&mut self, location: &SoftwareUniform, x: f32) {
        set_uniform(self, location, UniformValue::Float(x));
    }

    fn uniform_2_f32(&mut self, location: &SoftwareUniform, x: f32, y: f32) {
        set_uniform(self, location, UniformValue::Vec2([x, y]));
    }

    fn uniform_1_i32(&mut self, location: &SoftwareUniform, x: i32) {
        set_uniform(self, location, UniformValue::Int(x));
    }

    fn create_buffer(&mut self) -> Result<SoftwareHandle, String> {
        let handle = self.next_handle();
        self.buffers.insert(handle, Vec::new());
        Ok(handle)
    }

    fn upload_static_vertices(&mut self, buffer: SoftwareHandle, data: &[u8]) {
        if let Some(storage) = self.buffers.get_mut(&buffer) {
            *storage = data.to_vec();
        }
    }

    fn delete_buffer(&mut self, buffer: SoftwareHandle) {
        self.buffers.remove(&buffer);
    }

    fn create_vertex_array(&mut self) -> Result<SoftwareHandle, String> {
        let handle = self.next_handle();
        self.vertex_arrays.insert(handle, None);
        Ok(handle)
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<SoftwareHandle>) {
        self.bound_vertex_array = vertex_array;
    }

    fn vertex_attrib_f32(
        &mut self,
        index: u32,
        buffer: SoftwareHandle,
        components: i32,
        stride: i32,
    ) {
        if index != POSITION_ATTRIB || components != 2 {
            return;
        }
        let Some(vertex_array) = self.bound_vertex_array else {
            return;
        };
        let stride = usize::try_from(stride).unwrap_or(0);
        if let Some(slot) = self.vertex_arrays.get_mut(&vertex_array) {
            *slot = Some(AttribBinding {
                buffer,
                // Zero stride means tightly packed, as in GL.
                stride: if stride == 0 { 8 } else { stride },
            });
        }
    }

    fn delete_vertex_array(&mut self, vertex_array: SoftwareHandle) {
        self.vertex_arrays.remove(&vertex_array);
        if self.bound_vertex_array == Some(vertex_array) {
            self.bound_vertex_array = None;
        }
    }

    fn create_texture(&mut self) -> Result<SoftwareHandle, String> {
        let handle = self.next_handle();
        self.textures.insert(
            handle,
            TextureObject {
                width: 0,
                height: 0,
                texels: Vec::new(),
            },
        );
        Ok(handle)
    }

    fn bind_texture(&mut self, texture: Option<SoftwareHandle>) {
        self.bound_texture = texture;
    }

    fn tex_image_rgb8(
        &mut self,
        width: u32,
        height: u32,
        pixels: Option<&[u8]>,
    ) -> Result<(), String> {
        if width > MAX_TEXTURE_SIZE || height > MAX_TEXTURE_SIZE {
            return Err(format!(
                "{width}x{height} exceeds the maximum texture size of {MAX_TEXTURE_SIZE}"
            ));
        }
        let len = pixel_bytes([width, height]);
        let texels = match pixels {
            Some(pixels) if pixels.len() < len => {
                return Err(format!("{} bytes of pixel data, {len} needed", pixels.len()));
            }
            Some(pixels) => pixels[..len].to_vec(),
            None => vec![0; len],
        };
        let texture = self
            .bound_texture
            .and_then(|handle| self.textures.get_mut(&handle))
            .ok_or_else(|| "no texture bound".to_owned())?;
        *texture = TextureObject {
            width,
            height,
            texels,
        };
        Ok(())
    }

    fn set_linear_clamp(&mut self) {
        // The software sampler always filters linearly and clamps to edge.
    }

    fn delete_texture(&mut self, texture: SoftwareHandle) {
        self.textures.remove(&texture);
        if self.bound_texture == Some(texture) {
            self.bound_texture = None;
        }
    }

    fn copy_framebuffer_to_texture(&mut self, width: u32, height: u32) {
        let texels = self.read_region(width, height);
        if let Some(texture) = self
            .bound_texture
            .and_then(|handle| self.textures.get_mut(&handle))
        {
            *texture = TextureObject {
                width,
                height,
                texels,
            };
        }
    }

    fn viewport(&mut self, width: u32, height: u32) {
        self.viewport = [width, height];
    }

    fn clear(&mut self, rgba: [f32; 4]) {
        let rgb = [quantize(rgba[0]), quantize(rgba[1]), quantize(rgba[2])];
        for pixel in self.framebuffer.chunks_exact_mut(3) {
            pixel.copy_from_slice(&rgb);
        }
    }

    fn draw_triangle_strip(&mut self, first: i32, count: i32) {
        let Some(positions) = self.fetch_positions(first, count) else {
            return;
        };
        let Some(program) = self
            .current_program
            .and_then(|handle| self.programs.get(&handle))
            .filter(|program| program.linked)
        else {
            return;
        };
        let kernel = Kernel::from_program(program);
        let texture = self
            .bound_texture
            .and_then(|handle| self.textures.get(&handle));

        let [fb_width, fb_height] = self.surface;
        let width = self.viewport[0].min(fb_width);
        let height = self.viewport[1].min(fb_height);
        #[expect(clippy::cast_precision_loss)]
        let scale = [self.viewport[0] as f32, self.viewport[1] as f32];
        let framebuffer = &mut self.framebuffer;

        for triangle in positions.windows(3) {
            let uv = [triangle[0], triangle[1], triangle[2]];
            let [a, b, c] = uv.map(|p| [p[0] * scale[0], p[1] * scale[1]]);
            let area = edge(a, b, c);
            if area.abs() < f32::EPSILON {
                continue;
            }

            let min_x = a[0].min(b[0]).min(c[0]).floor().max(0.0);
            let min_y = a[1].min(b[1]).min(c[1]).floor().max(0.0);
            #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let (x0, y0, x1, y1) = (
                min_x as u32,
                min_y as u32,
                (a[0].max(b[0]).max(c[0]).ceil().max(0.0) as u32).min(width),
                (a[1].max(b[1]).max(c[1]).ceil().max(0.0) as u32).min(height),
            );

            for py in y0..y1 {
                for px in x0..x1 {
                    #[expect(clippy::cast_precision_loss)]
                    let p = [px as f32 + 0.5, py as f32 + 0.5];
                    let w0 = edge(b, c, p) / area;
                    let w1 = edge(c, a, p) / area;
                    let w2 = edge(a, b, p) / area;
                    if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                        continue;
                    }
                    let frag_uv: [f32; 2] =
                        std::array::from_fn(|k| w0 * uv[0][k] + w1 * uv[1][k] + w2 * uv[2][k]);
                    let rgb = kernel.shade(texture, frag_uv);
                    let i = (py as usize * fb_width as usize + px as usize) * 3;
                    framebuffer[i..i + 3].copy_from_slice(&rgb.map(quantize));
                }
            }
        }
    }

    fn flush(&mut self) {}

    fn read_pixels_rgb8(&mut self, width: u32, height: u32) -> Vec<u8> {
        self.read_region(width, height)
    }
}

fn set_uniform(gpu: &mut SoftwareGpu, location: &SoftwareUniform, value: UniformValue) {
    // As in GL, a location only applies to the program currently in use.
    if gpu.current_program != Some(location.program) {
        return;
    }
    if let Some(program) = gpu.programs.get_mut(&location.program) {
        program.values.insert(location.name.clone(), value);
    }
}
