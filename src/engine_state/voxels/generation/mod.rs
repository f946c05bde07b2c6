//! # World Generation
//!
//! Seed-deterministic synthesis of a chunk's initial blocks. Generation runs in passes
//! over a [`ChunkDraft`]:
//!
//! 1. **Terrain**: column heights from blended noise octaves, biome classification and
//!    column fill with water up to sea level ([`terrain`])
//! 2. **Caves**: probabilistic clearing where 3D noise magnitude is high ([`caves`])
//! 3. **Ores**: veins in the extreme tail of per-ore noise fields ([`ores`])
//! 4. **Vegetation**: trunks and spherical canopies on grass columns ([`vegetation`])
//!
//! Heights and biomes depend only on the seed and the absolute column. Scatter features
//! draw from a random source seeded by the seed and the chunk origin, so regenerating a
//! chunk always yields the same blocks.

pub mod caves;
pub mod ores;
pub mod terrain;
pub mod vegetation;

use std::collections::HashMap;

use fastrand::Rng;
use log::debug;

use self::{
    caves::CaveCarver,
    ores::OreScatter,
    terrain::{Biome, ColumnSample, TerrainShaper},
    vegetation::TreePlanter,
};
use super::{
    block::{block_type::BlockType, BlockPos, BlockValue},
    chunk::{Chunk, ChunkKey},
};
use crate::engine_state::config::WorldGenConfig;

/// A chunk being generated.
pub struct ChunkDraft {
    pub key: ChunkKey,
    pub size: i32,
    /// Lowest generated row
    pub world_bottom: i32,
    /// Highest row any pass may write
    pub ceiling: i32,
    /// Every column of the chunk, in x-major order
    pub columns: Vec<(i32, i32, ColumnSample)>,
    pub blocks: HashMap<BlockPos, BlockType>,
    /// Blocks that landed in other chunks' columns
    pub spill: Vec<(BlockPos, BlockType)>,
}

impl ChunkDraft {
    pub fn new(key: ChunkKey, size: i32, world_bottom: i32, ceiling: i32) -> Self {
        ChunkDraft {
            key,
            size,
            world_bottom,
            ceiling,
            columns: Vec::with_capacity((size * size) as usize),
            blocks: HashMap::new(),
            spill: Vec::new(),
        }
    }

    /// Whether `pos` lies in this chunk's footprint.
    pub fn owns(&self, pos: BlockPos) -> bool {
        ChunkKey::containing(pos, self.size) == self.key
    }

    /// Places a block unless the cell is taken. Cells outside the chunk are spilled.
    pub fn place_if_empty(&mut self, pos: BlockPos, block: BlockType) {
        if self.owns(pos) {
            self.blocks.entry(pos).or_insert(block);
        } else {
            self.spill.push((pos, block));
        }
    }

    /// Y of the highest non-empty cell in column `(x, z)`.
    pub fn column_top(&self, x: i32, z: i32) -> Option<i32> {
        (self.world_bottom..=self.ceiling)
            .rev()
            .find(|y| self.blocks.contains_key(&BlockPos::new(x, *y, z)))
    }
}

/// The output of generating one chunk.
pub struct GeneratedChunk {
    pub chunk: Chunk,
    /// Vegetation owned by neighbouring chunks, to be applied if those cells are empty
    pub spill: Vec<(BlockPos, BlockValue)>,
}

/// Produces chunks from a seed.
pub struct WorldGenerator {
    config: WorldGenConfig,
    chunk_size: i32,
    terrain: TerrainShaper,
    caves: CaveCarver,
    ores: OreScatter,
    trees: TreePlanter,
}

impl WorldGenerator {
    /// Creates a generator.
    ///
    /// # Arguments
    /// * `config` - Generation parameters, including the seed
    /// * `chunk_size` - Width and depth of generated chunks
    pub fn new(config: WorldGenConfig, chunk_size: i32) -> Self {
        WorldGenerator {
            terrain: TerrainShaper::new(&config),
            caves: CaveCarver::new(config.seed, &config.caves),
            ores: OreScatter::new(config.seed, &config.ores),
            trees: TreePlanter::new(config.seed, &config.vegetation),
            chunk_size: chunk_size.max(1),
            config,
        }
    }

    pub fn config(&self) -> &WorldGenConfig {
        &self.config
    }

    pub fn chunk_size(&self) -> i32 {
        self.chunk_size
    }

    /// Terrain height of column `(x, z)`.
    pub fn height_at(&self, x: i32, z: i32) -> i32 {
        self.terrain.height_at(x, z)
    }

    /// Biome of column `(x, z)`.
    pub fn biome_at(&self, x: i32, z: i32) -> Biome {
        self.terrain.sample(x, z).biome
    }

    /// Height and biome of column `(x, z)`.
    pub fn sample_column(&self, x: i32, z: i32) -> ColumnSample {
        self.terrain.sample(x, z)
    }

    /// The random source for scatter features of the chunk at `key`.
    pub fn chunk_rng(&self, key: ChunkKey) -> Rng {
        let mut hash = u64::from(self.config.seed) ^ 0x9E37_79B9_7F4A_7C15;
        for part in [key.x, key.z] {
            hash = (hash ^ part as i64 as u64).wrapping_mul(0x0000_0100_0000_01B3);
        }
        Rng::with_seed(hash)
    }

    fn ceiling(&self) -> i32 {
        let v = &self.config.vegetation;
        self.config.max_height + v.max_trunk_height.max(v.min_trunk_height) + v.canopy_radius + 1
    }

    /// Generates the chunk with origin `key`.
    pub fn generate(&self, key: ChunkKey) -> GeneratedChunk {
        let size = self.chunk_size;
        let mut draft = ChunkDraft::new(key, size, self.config.world_bottom, self.ceiling());
        let mut rng = self.chunk_rng(key);

        for x in key.x..key.x + size {
            for z in key.z..key.z + size {
                let sample = self.terrain.sample(x, z);
                self.terrain.fill_column(x, z, sample, &mut draft.blocks);
                draft.columns.push((x, z, sample));
            }
        }

        let water = self.water_near(&draft);
        self.caves.carve(&mut draft, &water, &mut rng);
        self.ores.scatter(&mut draft);
        let trees = self.trees.plant(&mut draft, self.config.sea_level, &mut rng);

        let mut chunk = Chunk::empty(key, size);
        for (pos, block) in draft.blocks {
            chunk.set(pos, Some(block.into()));
        }
        debug!(
            "Generated chunk {}: {} blocks, {} trees, {} spilled",
            key,
            chunk.len(),
            trees.len(),
            draft.spill.len()
        );
        GeneratedChunk {
            chunk,
            spill: draft
                .spill
                .into_iter()
                .map(|(pos, block)| (pos, block.into()))
                .collect(),
        }
    }

    /// Flooded rows of every column within the cave water margin of the draft.
    ///
    /// Columns outside the chunk are resampled, which is cheap because heights are a
    /// pure function of the column.
    fn water_near(&self, draft: &ChunkDraft) -> HashMap<(i32, i32), (i32, i32)> {
        let margin = self.config.caves.water_margin.max(0);
        let sea_level = self.config.sea_level;
        let inside: HashMap<(i32, i32), ColumnSample> = draft
            .columns
            .iter()
            .map(|&(x, z, sample)| ((x, z), sample))
            .collect();

        let mut water = HashMap::new();
        let key = draft.key;
        for x in key.x - margin..key.x + draft.size + margin {
            for z in key.z - margin..key.z + draft.size + margin {
                let sample = inside
                    .get(&(x, z))
                    .copied()
                    .unwrap_or_else(|| self.terrain.sample(x, z));
                if let Some(rows) = sample.water_rows(sea_level) {
                    water.insert((x, z), rows);
                }
            }
        }
        water
    }
}
