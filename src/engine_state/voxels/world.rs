//! # World Module
//!
//! This module provides [`VoxelWorld`], the owner of every materialized chunk. It routes
//! absolute block coordinates to the chunk that owns them and is the only path through
//! which one chunk observes another chunk's blocks.
//!
//! ## Remeshing
//!
//! A write marks the owning chunk dirty. When the written cell lies on a boundary row or
//! column, the materialized neighbours sharing that boundary are marked dirty too, since
//! their face visibility depends on it. Dirty chunks are rebuilt lazily in
//! [`VoxelWorld::flush_meshes`], so several writes to one chunk in a frame cost a single
//! rebuild.

use std::collections::HashMap;

use log::debug;

use super::block::{block_type::BlockType, BlockPos, BlockValue};
use super::chunk::{Chunk, ChunkKey};
use crate::engine_state::rendering::{
    meshing::{mesh::MeshLayer, ChunkMesher},
    sink::RenderSink,
};

/// Read access to blocks by absolute coordinate, across chunk boundaries.
pub trait BlockAccess {
    /// The block at `pos`, or `None` for an empty or unmaterialized cell.
    fn get_block(&self, pos: BlockPos) -> Option<&BlockValue>;

    /// The type of the block at `pos`.
    fn block_type_at(&self, pos: BlockPos) -> Option<BlockType> {
        self.get_block(pos).map(BlockValue::block_type)
    }

    /// Whether the cell at `pos` is empty.
    fn is_empty_at(&self, pos: BlockPos) -> bool {
        self.get_block(pos).is_none()
    }
}

/// Write access to blocks by absolute coordinate.
pub trait BlockAccessMut: BlockAccess {
    /// Writes (`Some`) or deletes (`None`) the block at `pos`, returning the previous value.
    fn set_block(&mut self, pos: BlockPos, value: Option<BlockValue>) -> Option<BlockValue>;

    /// Writes a block only if the cell is empty. Returns whether it was written.
    ///
    /// Implementations that load cells on demand must load `pos` before testing it.
    fn set_block_if_empty(&mut self, pos: BlockPos, value: BlockValue) -> bool {
        if !self.is_empty_at(pos) {
            return false;
        }
        self.set_block(pos, Some(value));
        true
    }
}

/// The materialized chunks of a world, keyed by chunk origin.
pub struct VoxelWorld {
    chunk_size: i32,
    chunks: HashMap<ChunkKey, Chunk>,
}

impl VoxelWorld {
    /// Creates a world with no chunks.
    ///
    /// # Arguments
    /// * `chunk_size` - Width and depth of every chunk, in blocks
    pub fn new(chunk_size: i32) -> Self {
        VoxelWorld {
            chunk_size: chunk_size.max(1),
            chunks: HashMap::new(),
        }
    }

    /// Width and depth of every chunk, in blocks.
    pub fn chunk_size(&self) -> i32 {
        self.chunk_size
    }

    /// The key of the chunk owning `pos`.
    pub fn key_of(&self, pos: BlockPos) -> ChunkKey {
        ChunkKey::containing(pos, self.chunk_size)
    }

    /// Writes a block, creating the owning chunk on demand.
    ///
    /// `None` deletes the block. Returns the previous value.
    pub fn set_block(&mut self, pos: BlockPos, value: Option<BlockValue>) -> Option<BlockValue> {
        let key = self.key_of(pos);
        if value.is_none() && !self.chunks.contains_key(&key) {
            return None;
        }
        let chunk_size = self.chunk_size;
        let chunk = self
            .chunks
            .entry(key)
            .or_insert_with(|| Chunk::empty(key, chunk_size));
        let previous = chunk.set(pos, value);
        let neighbours = chunk.boundary_neighbours(pos);

        for (dx, dz) in neighbours {
            if let Some(neighbour) = self.chunks.get_mut(&key.offset(dx, dz, chunk_size)) {
                neighbour.mark_dirty();
            }
        }
        previous
    }

    /// Writes a block only if the cell is empty. Returns whether it was written.
    pub fn set_block_if_empty(&mut self, pos: BlockPos, value: BlockValue) -> bool {
        if self.get_block(pos).is_some() {
            return false;
        }
        self.set_block(pos, Some(value));
        true
    }

    /// The chunk with origin `key`, if materialized.
    pub fn chunk(&self, key: ChunkKey) -> Option<&Chunk> {
        self.chunks.get(&key)
    }

    /// Whether the chunk with origin `key` is materialized.
    pub fn contains_chunk(&self, key: ChunkKey) -> bool {
        self.chunks.contains_key(&key)
    }

    /// Origins of every materialized chunk, in sorted order.
    pub fn chunk_keys(&self) -> Vec<ChunkKey> {
        let mut keys: Vec<ChunkKey> = self.chunks.keys().copied().collect();
        keys.sort();
        keys
    }

    /// Iterates over the materialized chunks in no particular order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    /// Number of materialized chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether no chunk is materialized.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Materializes a populated chunk, replacing any chunk with the same origin.
    ///
    /// The four edge neighbours are marked dirty because their border faces may now be
    /// hidden.
    pub fn insert_chunk(&mut self, mut chunk: Chunk) {
        debug_assert_eq!(chunk.size, self.chunk_size);
        let key = chunk.key;
        chunk.mark_dirty();
        self.chunks.insert(key, chunk);
        self.mark_edge_neighbours_dirty(key);
    }

    /// Drops a chunk from memory, returning it.
    pub fn remove_chunk(&mut self, key: ChunkKey) -> Option<Chunk> {
        let chunk = self.chunks.remove(&key)?;
        self.mark_edge_neighbours_dirty(key);
        Some(chunk)
    }

    /// Drops every chunk.
    pub fn clear(&mut self) {
        self.chunks.clear();
    }

    fn mark_edge_neighbours_dirty(&mut self, key: ChunkKey) {
        for (dx, dz) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
            if let Some(neighbour) = self.chunks.get_mut(&key.offset(dx, dz, self.chunk_size)) {
                neighbour.mark_dirty();
            }
        }
    }

    /// Origins of every chunk whose meshes are stale.
    pub fn dirty_chunks(&self) -> Vec<ChunkKey> {
        let mut keys: Vec<ChunkKey> = self
            .chunks
            .values()
            .filter(|chunk| chunk.is_dirty())
            .map(|chunk| chunk.key)
            .collect();
        keys.sort();
        keys
    }

    /// Rebuilds every dirty chunk and pushes the results to `sink`.
    ///
    /// Empty buffers are reported through the sink's `clear_*` hooks.
    ///
    /// # Returns
    /// The number of chunks rebuilt
    pub fn flush_meshes(&mut self, mesher: &ChunkMesher, sink: &mut dyn RenderSink) -> usize {
        let dirty = self.dirty_chunks();
        for &key in &dirty {
            let Some(chunk) = self.chunks.get(&key) else {
                continue;
            };
            let meshes = mesher.build(chunk, &*self);

            if meshes.opaque.is_empty() {
                sink.clear_mesh(key, MeshLayer::Opaque);
                sink.clear_collision(key);
            } else {
                sink.upload_mesh(key, MeshLayer::Opaque, &meshes.opaque);
                sink.upload_collision(key, &meshes.collision);
            }
            if meshes.water.is_empty() {
                sink.clear_mesh(key, MeshLayer::Water);
            } else {
                sink.upload_mesh(key, MeshLayer::Water, &meshes.water);
            }

            if let Some(chunk) = self.chunks.get_mut(&key) {
                chunk.store_meshes(meshes);
            }
        }
        if !dirty.is_empty() {
            debug!("Rebuilt meshes for {} chunk(s)", dirty.len());
        }
        dirty.len()
    }
}

impl BlockAccess for VoxelWorld {
    fn get_block(&self, pos: BlockPos) -> Option<&BlockValue> {
        self.chunks.get(&self.key_of(pos))?.get(pos)
    }
}

impl BlockAccessMut for VoxelWorld {
    fn set_block(&mut self, pos: BlockPos, value: Option<BlockValue>) -> Option<BlockValue> {
        VoxelWorld::set_block(self, pos, value)
    }
}
