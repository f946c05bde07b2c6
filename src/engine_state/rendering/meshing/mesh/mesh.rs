//! Mesh data structures for chunk rendering and collision.
//!
//! This module provides the GPU-friendly vertex/index buffers built from a face list and
//! the collision surface mirroring the opaque buffer.

use super::face::Face;
use crate::engine_state::rendering::Vertex;

/// Which of a chunk's two render buffers a mesh belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshLayer {
    /// All non-water solids, sharing one atlas texture.
    Opaque,
    /// Translucent, double-sided water surfaces with their own texture.
    Water,
}

/// A renderable triangle list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshBuffer {
    /// The vertex data, four per face
    pub vertices: Vec<Vertex>,
    /// The index data, six per face
    pub indices: Vec<u32>,
    /// Whether back faces must be drawn too
    pub double_sided: bool,
}

impl MeshBuffer {
    /// Creates an empty buffer.
    pub fn new(double_sided: bool) -> Self {
        MeshBuffer {
            vertices: Vec::new(),
            indices: Vec::new(),
            double_sided,
        }
    }

    /// Appends one face quad.
    ///
    /// # Arguments
    /// * `face` - The face to emit
    /// * `uvs` - UVs for the four corners, in corner order
    /// * `color` - Per-vertex colour applied to all four corners
    pub fn push_face(&mut self, face: &Face, uvs: [[f32; 2]; 4], color: [f32; 4]) {
        let base = self.vertices.len() as u32;
        let normal = face.block_side.normal();
        for (corner, uv) in face.corners().into_iter().zip(uvs) {
            self.vertices.push(Vertex::new(corner, normal, uv, color));
        }
        self.indices.extend_from_slice(&Face::indices(base));
    }

    /// Number of faces in the buffer.
    pub fn face_count(&self) -> usize {
        self.vertices.len() / 4
    }

    /// Whether the buffer holds no geometry.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// A static triangle collision surface.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollisionMesh {
    /// Vertex positions in world space
    pub positions: Vec<[f32; 3]>,
    /// Triangle indices into `positions`
    pub indices: Vec<u32>,
}

impl CollisionMesh {
    /// Builds the collision surface for a face list.
    ///
    /// Positions and indices are emitted in the same order as [`MeshBuffer::push_face`]
    /// would, so the surface matches the rendered buffer built from the same faces.
    pub fn from_faces(faces: &[Face]) -> Self {
        let mut mesh = CollisionMesh {
            positions: Vec::with_capacity(faces.len() * 4),
            indices: Vec::with_capacity(faces.len() * 6),
        };
        for face in faces {
            let base = mesh.positions.len() as u32;
            mesh.positions.extend_from_slice(&face.corners());
            mesh.indices.extend_from_slice(&Face::indices(base));
        }
        mesh
    }

    /// Whether the surface is empty.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::block::{block_side::BlockSide, block_type::BlockType};
    use cgmath::Point3;

    #[test]
    fn collision_mirrors_buffer_geometry() {
        let faces = [
            Face::new(Point3::new(0, 0, 0), BlockType::Stone, BlockSide::TOP),
            Face::new(Point3::new(0, 0, 0), BlockType::Stone, BlockSide::LEFT),
        ];
        let mut buffer = MeshBuffer::new(false);
        for face in &faces {
            buffer.push_face(face, Face::unit_uvs(), [1.0; 4]);
        }
        let collision = CollisionMesh::from_faces(&faces);

        let rendered: Vec<[f32; 3]> = buffer.vertices.iter().map(|v| v.position).collect();
        assert_eq!(rendered, collision.positions);
        assert_eq!(buffer.indices, collision.indices);
        assert_eq!(buffer.face_count(), 2);
        assert_eq!(collision.triangle_count(), 4);
    }
}
