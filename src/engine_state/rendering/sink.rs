//! Host rendering interface.
//!
//! The world does not own any GPU or scene-graph objects. Whenever a chunk's meshes are
//! rebuilt or the chunk is evicted, the world notifies a [`RenderSink`] supplied by the
//! host, which owns the render objects and collision shapes.

use image::RgbaImage;

use super::meshing::mesh::{CollisionMesh, MeshBuffer, MeshLayer};
use crate::engine_state::voxels::chunk::ChunkKey;

/// Receives mesh, collision and atlas updates from the world.
///
/// Empty buffers are reported through the `clear_*` hooks rather than uploaded, so the
/// host can hide the corresponding render object.
pub trait RenderSink {
    /// Replaces the geometry of one layer of a chunk.
    fn upload_mesh(&mut self, chunk: ChunkKey, layer: MeshLayer, mesh: &MeshBuffer);

    /// Hides and clears one layer of a chunk.
    fn clear_mesh(&mut self, chunk: ChunkKey, layer: MeshLayer);

    /// Replaces the collision surface of a chunk.
    fn upload_collision(&mut self, chunk: ChunkKey, shape: &CollisionMesh);

    /// Removes the collision surface of a chunk.
    fn clear_collision(&mut self, chunk: ChunkKey);

    /// Releases every render and collision resource of an evicted chunk.
    fn release_chunk(&mut self, _chunk: ChunkKey) {}

    /// Binds the packed texture for a layer.
    fn bind_atlas(&mut self, _layer: MeshLayer, _atlas: &RgbaImage) {}
}

/// A sink that discards every update, for headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl RenderSink for NullSink {
    fn upload_mesh(&mut self, _chunk: ChunkKey, _layer: MeshLayer, _mesh: &MeshBuffer) {}

    fn clear_mesh(&mut self, _chunk: ChunkKey, _layer: MeshLayer) {}

    fn upload_collision(&mut self, _chunk: ChunkKey, _shape: &CollisionMesh) {}

    fn clear_collision(&mut self, _chunk: ChunkKey) {}
}
