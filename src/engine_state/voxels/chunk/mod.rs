//! # Chunk Module
//!
//! This module provides the `Chunk` struct: the owner of every block inside a fixed
//! `chunk_size × chunk_size` column footprint. The vertical axis is not chunked.
//!
//! ## Storage
//!
//! Chunks store blocks sparsely in a hash map keyed by absolute block coordinate. Empty
//! cells are simply absent, so a mostly-air column costs nothing. Point queries are O(1).
//!
//! ## Lifecycle
//!
//! 1. Created empty
//! 2. Populated by the world generator or hydrated from persisted data
//! 3. Meshed (lazily, whenever the chunk is dirty)
//! 4. Mutated, which marks this chunk and any boundary-sharing neighbour dirty
//! 5. Dropped on eviction
//!
//! A chunk never reads another chunk's blocks directly. Cross-chunk lookups (face
//! culling, fluid checks) go through [`VoxelWorld`](super::world::VoxelWorld).

use std::collections::HashMap;
use std::fmt;

use cgmath::Point3;

use super::block::{BlockPos, BlockValue};
use crate::engine_state::rendering::meshing::ChunkMeshes;

/// Origin of a chunk in block coordinates (its minimum x and z).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkKey {
    /// Minimum x coordinate covered by the chunk.
    pub x: i32,
    /// Minimum z coordinate covered by the chunk.
    pub z: i32,
}

impl ChunkKey {
    /// Creates a key from an origin that must already be aligned to the chunk grid.
    pub fn new(x: i32, z: i32) -> Self {
        ChunkKey { x, z }
    }

    /// The key of the chunk owning `pos`: `floor(coord / chunk_size) * chunk_size`.
    pub fn containing(pos: BlockPos, chunk_size: i32) -> Self {
        Self::containing_xz(pos.x, pos.z, chunk_size)
    }

    /// The key of the chunk owning the column `(x, z)`.
    pub fn containing_xz(x: i32, z: i32, chunk_size: i32) -> Self {
        ChunkKey {
            x: x.div_euclid(chunk_size) * chunk_size,
            z: z.div_euclid(chunk_size) * chunk_size,
        }
    }

    /// The key offset by whole chunks.
    pub fn offset(self, dx: i32, dz: i32, chunk_size: i32) -> Self {
        ChunkKey {
            x: self.x + dx * chunk_size,
            z: self.z + dz * chunk_size,
        }
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.z)
    }
}

/// A fixed-footprint column region of the world and the blocks it owns.
pub struct Chunk {
    /// Origin of this chunk in block coordinates.
    pub key: ChunkKey,
    /// Width and depth of the footprint, in blocks.
    pub size: i32,
    blocks: HashMap<BlockPos, BlockValue>,
    meshes: ChunkMeshes,
    dirty: bool,
}

impl Chunk {
    /// Creates a new, completely empty chunk. It starts dirty so it gets meshed.
    pub fn empty(key: ChunkKey, size: i32) -> Self {
        Chunk {
            key,
            size,
            blocks: HashMap::new(),
            meshes: ChunkMeshes::default(),
            dirty: true,
        }
    }

    /// Whether `pos` lies inside this chunk's footprint.
    pub fn contains(&self, pos: BlockPos) -> bool {
        ChunkKey::containing(pos, self.size) == self.key
    }

    /// Gets the block at `pos`, or `None` for an empty cell. Has no side effects.
    pub fn get(&self, pos: BlockPos) -> Option<&BlockValue> {
        self.blocks.get(&pos)
    }

    /// Inserts, overwrites (`Some`) or deletes (`None`) the block at `pos`.
    ///
    /// The chunk is marked dirty; its mesh is rebuilt before the next mesh read.
    /// Returns the previous value.
    pub fn set(&mut self, pos: BlockPos, value: Option<BlockValue>) -> Option<BlockValue> {
        debug_assert!(
            self.contains(pos),
            "block {pos:?} written to chunk {} that does not own it",
            self.key
        );
        self.dirty = true;
        match value {
            Some(value) => self.blocks.insert(pos, value),
            None => self.blocks.remove(&pos),
        }
    }

    /// Inserts a block only if the cell is empty. Returns whether it was inserted.
    pub fn set_if_empty(&mut self, pos: BlockPos, value: BlockValue) -> bool {
        if self.blocks.contains_key(&pos) {
            return false;
        }
        self.set(pos, Some(value));
        true
    }

    /// Iterates over every stored block.
    pub fn blocks(&self) -> impl Iterator<Item = (&BlockPos, &BlockValue)> {
        self.blocks.iter()
    }

    /// Number of non-empty cells.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the chunk holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Removes every block, returning them.
    pub fn take_blocks(&mut self) -> HashMap<BlockPos, BlockValue> {
        self.dirty = true;
        std::mem::take(&mut self.blocks)
    }

    /// Which horizontal neighbours share a boundary with `pos`, as chunk offsets.
    ///
    /// A block on the `x == origin` column borders the chunk at `(-1, 0)`, and so on.
    /// A corner block borders two neighbours.
    pub fn boundary_neighbours(&self, pos: BlockPos) -> Vec<(i32, i32)> {
        let local = Point3::new(pos.x - self.key.x, pos.y, pos.z - self.key.z);
        let mut neighbours = Vec::with_capacity(2);
        if local.x == 0 {
            neighbours.push((-1, 0));
        }
        if local.x == self.size - 1 {
            neighbours.push((1, 0));
        }
        if local.z == 0 {
            neighbours.push((0, -1));
        }
        if local.z == self.size - 1 {
            neighbours.push((0, 1));
        }
        neighbours
    }

    /// Whether the mesh is stale.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Flags the mesh as stale, e.g. because a neighbour changed a shared boundary.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// The most recently built meshes. May be stale if [`Chunk::is_dirty`].
    pub fn meshes(&self) -> &ChunkMeshes {
        &self.meshes
    }

    /// Stores freshly built meshes and clears the dirty flag.
    pub fn store_meshes(&mut self, meshes: ChunkMeshes) {
        self.meshes = meshes;
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::block::block_type::BlockType;

    #[test]
    fn keys_floor_towards_negative_infinity() {
        assert_eq!(ChunkKey::containing(Point3::new(0, 5, 0), 16), ChunkKey::new(0, 0));
        assert_eq!(ChunkKey::containing(Point3::new(15, 5, 15), 16), ChunkKey::new(0, 0));
        assert_eq!(ChunkKey::containing(Point3::new(-1, 5, 16), 16), ChunkKey::new(-16, 16));
        assert_eq!(ChunkKey::containing(Point3::new(-17, 0, -16), 16), ChunkKey::new(-32, -16));
    }

    #[test]
    fn set_get_and_delete() {
        let mut chunk = Chunk::empty(ChunkKey::new(0, 0), 4);
        let pos = Point3::new(1, 3, 2);
        assert!(chunk.get(pos).is_none());
        chunk.set(pos, Some(BlockType::Stone.into()));
        assert_eq!(chunk.get(pos), Some(&BlockValue::Plain(BlockType::Stone)));
        let previous = chunk.set(pos, None);
        assert_eq!(previous, Some(BlockValue::Plain(BlockType::Stone)));
        assert!(chunk.is_empty());
    }

    #[test]
    fn set_if_empty_keeps_existing_blocks() {
        let mut chunk = Chunk::empty(ChunkKey::new(0, 0), 4);
        let pos = Point3::new(0, 0, 0);
        assert!(chunk.set_if_empty(pos, BlockType::Dirt.into()));
        assert!(!chunk.set_if_empty(pos, BlockType::TreeLeaves.into()));
        assert_eq!(chunk.get(pos).map(BlockValue::block_type), Some(BlockType::Dirt));
    }

    #[test]
    fn boundary_neighbours_cover_edges_and_corners() {
        let chunk = Chunk::empty(ChunkKey::new(4, -4), 4);
        assert!(chunk.boundary_neighbours(Point3::new(5, 0, -3)).is_empty());
        assert_eq!(chunk.boundary_neighbours(Point3::new(4, 0, -3)), vec![(-1, 0)]);
        assert_eq!(
            chunk.boundary_neighbours(Point3::new(7, 0, -1)),
            vec![(1, 0), (0, 1)]
        );
    }

    #[test]
    fn storing_meshes_clears_the_dirty_flag() {
        let mut chunk = Chunk::empty(ChunkKey::new(0, 0), 4);
        assert!(chunk.is_dirty());
        chunk.store_meshes(ChunkMeshes::default());
        assert!(!chunk.is_dirty());
        chunk.set(Point3::new(0, 0, 0), Some(BlockType::Sand.into()));
        assert!(chunk.is_dirty());
    }
}
