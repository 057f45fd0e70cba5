//! The full-screen quad every pass draws.

use bytemuck::{Pod, Zeroable};

use crate::{
    error::{Error, Result},
    gpu::Gpu,
};

/// Attribute slot the quad's positions are bound to.
pub const POSITION_ATTRIB: u32 = 0;

/// A quad vertex, ready for the GPU.
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Vertex {
    /// Position in the unit square; also the texture coordinate.
    pub position: [f32; 2],
}

/// The unit square as a triangle strip.
///
/// The first four vertices form the two triangles. The fifth repeats `(1, 0)`
/// and only adds a triangle that is already covered.
pub const QUAD_VERTICES: [Vertex; 5] = [
    Vertex { position: [0.0, 0.0] },
    Vertex { position: [1.0, 0.0] },
    Vertex { position: [0.0, 1.0] },
    Vertex { position: [1.0, 1.0] },
    Vertex { position: [1.0, 0.0] },
];

/// The uploaded quad: one static vertex buffer plus the vertex array that
/// describes it. Immutable once created.
pub struct Quad<G: Gpu> {
    vertex_array: G::VertexArray,
    buffer: G::Buffer,
    vertex_count: i32,
}

impl<G: Gpu> Quad<G> {
    /// Upload [`QUAD_VERTICES`] and bind them to [`POSITION_ATTRIB`] as two
    /// tightly packed, non-normalized floats per vertex.
    ///
    /// # Errors
    ///
    /// [`Error::Resource`] if the buffer or vertex array cannot be created.
    pub fn upload(gpu: &mut G) -> Result<Self> {
        let buffer = gpu
            .create_buffer()
            .map_err(|message| Error::resource("quad vertex buffer", message))?;
        let vertex_array = match gpu.create_vertex_array() {
            Ok(vertex_array) => vertex_array,
            Err(message) => {
                gpu.delete_buffer(buffer);
                return Err(Error::resource("quad vertex array", message));
            }
        };

        gpu.upload_static_vertices(buffer, bytemuck::cast_slice(&QUAD_VERTICES));

        #[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let (stride, vertex_count) = (
            std::mem::size_of::<Vertex>() as i32,
            QUAD_VERTICES.len() as i32,
        );

        gpu.bind_vertex_array(Some(vertex_array));
        gpu.vertex_attrib_f32(POSITION_ATTRIB, buffer, 2, stride);
        gpu.bind_vertex_array(None);

        Ok(Self {
            vertex_array,
            buffer,
            vertex_count,
        })
    }

    /// Issue one triangle-strip draw of the whole quad.
    pub fn draw(&self, gpu: &mut G) {
        gpu.bind_vertex_array(Some(self.vertex_array));
        gpu.draw_triangle_strip(0, self.vertex_count);
        gpu.bind_vertex_array(None);
    }

    /// Delete the vertex array and buffer.
    pub fn destroy(self, gpu: &mut G) {
        gpu.delete_vertex_array(self.vertex_array);
        gpu.delete_buffer(self.buffer);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{Call, RecordingGpu};

    #[test]
    fn quad_vertex_order_is_strip_order() {
        let positions: Vec<[f32; 2]> = QUAD_VERTICES.iter().map(|v| v.position).collect();
        assert_eq!(
            positions,
            [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]]
        );
    }

    #[test]
    fn upload_binds_positions_to_slot_zero() {
        let mut gpu = RecordingGpu::new([8, 8]);
        let _quad = Quad::upload(&mut gpu).unwrap();

        assert!(gpu.calls.contains(&Call::VertexAttrib {
            index: POSITION_ATTRIB,
            components: 2,
            stride: 8,
        }));
        let uploaded: Vec<Vertex> = bytemuck::pod_collect_to_vec(&gpu.uploaded_vertices);
        assert_eq!(uploaded, QUAD_VERTICES);
    }

    #[test]
    fn draw_issues_one_five_vertex_strip() {
        let mut gpu = RecordingGpu::new([8, 8]);
        let quad = Quad::upload(&mut gpu).unwrap();
        gpu.calls.clear();

        quad.draw(&mut gpu);

        assert_eq!(gpu.draw_count(), 1);
        assert!(gpu
            .calls
            .iter()
            .any(|c| matches!(c, Call::Draw { first: 0, count: 5, .. })));
    }

    #[test]
    fn destroy_releases_buffer_and_vertex_array() {
        let mut gpu = RecordingGpu::new([8, 8]);
        let quad = Quad::upload(&mut gpu).unwrap();
        quad.destroy(&mut gpu);
        assert!(gpu.live_buffers.is_empty());
        assert!(gpu.live_vertex_arrays.is_empty());
    }
}
