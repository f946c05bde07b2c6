//! Mesh generation primitives for chunk rendering.
//!
//! # Architecture
//! - [`Face`]: A single visible quad face of a block
//! - [`MeshBuffer`]: Vertex and index buffers for one render layer
//! - [`CollisionMesh`]: Collision triangles built from the same face list as the opaque buffer
//!
//! # Usage
//! ```
//! use voxel_world::engine_state::rendering::meshing::mesh::{Face, MeshBuffer};
//! use voxel_world::engine_state::voxels::block::{block_side::BlockSide, block_type::BlockType};
//! use cgmath::Point3;
//!
//! let face = Face::new(Point3::new(0, 0, 0), BlockType::Stone, BlockSide::TOP);
//! let mut buffer = MeshBuffer::new(false);
//! buffer.push_face(&face, Face::unit_uvs(), [1.0; 4]);
//! assert_eq!(buffer.indices.len(), 6);
//! ```

mod face;
mod mesh;

pub use face::Face;
pub use mesh::*;
