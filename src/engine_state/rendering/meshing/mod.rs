//! # Chunk Meshing
//!
//! Converts a chunk's blocks into two independent render buffers and a collision surface.
//!
//! For every block and each of its six faces, the neighbour across that face is resolved
//! through the world's global accessor (so faces on chunk borders see the adjacent
//! chunk's data). A face is emitted when:
//!
//! - the block is water and the neighbour is empty or not water, so water renders only
//!   its boundary surfaces, or
//! - the block is any other solid and the neighbour is empty or water.
//!
//! Special entity blocks (doors, figurines, particle emitters) are skipped entirely; the
//! host renders them as separate objects.
//!
//! The opaque buffer and the collision surface are built from the same face list.

pub mod mesh;

use log::trace;

use mesh::{CollisionMesh, Face, MeshBuffer};

use super::texture_atlas::TextureAtlas;
use super::Vertex;
use crate::engine_state::voxels::{
    block::{block_side::BlockSide, block_type::BlockType},
    chunk::Chunk,
    world::BlockAccess,
};

/// Vertex tint for water faces.
pub const WATER_COLOR: [u8; 4] = [60, 120, 255, 180];

/// The derived geometry of one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkMeshes {
    /// Atlas-mapped geometry of every non-water solid
    pub opaque: MeshBuffer,
    /// Translucent, double-sided water geometry
    pub water: MeshBuffer,
    /// Collision surface, identical to the opaque geometry
    pub collision: CollisionMesh,
}

impl Default for ChunkMeshes {
    fn default() -> Self {
        ChunkMeshes {
            opaque: MeshBuffer::new(false),
            water: MeshBuffer::new(true),
            collision: CollisionMesh::default(),
        }
    }
}

/// Whether the face of `block` towards `neighbour` is visible.
pub fn face_visible(block: BlockType, neighbour: Option<BlockType>) -> bool {
    match neighbour {
        None => true,
        Some(neighbour) if block.is_water() => !neighbour.is_water(),
        Some(neighbour) => neighbour.is_water(),
    }
}

/// Builds chunk meshes against a texture atlas layout.
#[derive(Debug, Clone)]
pub struct ChunkMesher {
    atlas: TextureAtlas,
}

impl ChunkMesher {
    /// Creates a mesher mapping opaque faces into `atlas`.
    pub fn new(atlas: TextureAtlas) -> Self {
        ChunkMesher { atlas }
    }

    /// The atlas this mesher maps UVs into.
    pub fn atlas(&self) -> &TextureAtlas {
        &self.atlas
    }

    /// Collects the visible faces of a chunk, split into (opaque, water).
    ///
    /// Faces are ordered by block position then side, so rebuilding an unchanged chunk
    /// yields identical buffers.
    pub fn visible_faces(&self, chunk: &Chunk, world: &impl BlockAccess) -> (Vec<Face>, Vec<Face>) {
        let mut blocks: Vec<_> = chunk
            .blocks()
            .map(|(pos, value)| (*pos, value.block_type()))
            .filter(|(_, block_type)| !block_type.is_special())
            .collect();
        blocks.sort_by_key(|(pos, _)| (pos.y, pos.z, pos.x));

        let mut opaque = Vec::new();
        let mut water = Vec::new();
        for (pos, block_type) in blocks {
            for side in BlockSide::all() {
                let neighbour = world.block_type_at(pos + side.offset());
                if !face_visible(block_type, neighbour) {
                    continue;
                }
                let face = Face::new(pos, block_type, side);
                if block_type.is_water() {
                    water.push(face);
                } else {
                    opaque.push(face);
                }
            }
        }
        (opaque, water)
    }

    /// Rebuilds every buffer of `chunk` from scratch.
    pub fn build(&self, chunk: &Chunk, world: &impl BlockAccess) -> ChunkMeshes {
        let (opaque_faces, water_faces) = self.visible_faces(chunk, world);
        let mut meshes = ChunkMeshes::default();

        for face in &opaque_faces {
            let uvs = Face::unit_uvs().map(|uv| self.atlas.map_uv(face.block_type, uv));
            let color = if self.atlas.is_textured(face.block_type) {
                [1.0; 4]
            } else {
                Vertex::color_from_rgba8(face.block_type.fallback_color())
            };
            meshes.opaque.push_face(face, uvs, color);
        }

        let water_color = Vertex::color_from_rgba8(WATER_COLOR);
        for face in &water_faces {
            meshes.water.push_face(face, Face::unit_uvs(), water_color);
        }

        meshes.collision = CollisionMesh::from_faces(&opaque_faces);

        trace!(
            "Meshed chunk {}: {} opaque faces, {} water faces",
            chunk.key,
            opaque_faces.len(),
            water_faces.len()
        );
        meshes
    }
}
