//! Ore veins.
//!
//! Each ore samples its own 3D noise field. A host block turns into ore where the
//! normalized noise lands in the top `rarity` fraction of `[0, 1]`.

use noise::{NoiseFn, Perlin};

use super::ChunkDraft;
use crate::engine_state::config::OreConfig;
use crate::engine_state::voxels::block::{block_type::BlockType, BlockPos};

struct OreField {
    noise: Perlin,
    config: OreConfig,
}

impl OreField {
    fn matches(&self, host: BlockType, pos: BlockPos) -> bool {
        if !self.config.hosts.contains(&host)
            || pos.y < self.config.min_y
            || pos.y > self.config.max_y
        {
            return false;
        }
        let f = self.config.frequency;
        let sample = self
            .noise
            .get([pos.x as f64 * f, pos.y as f64 * f, pos.z as f64 * f]);
        (sample + 1.0) / 2.0 > 1.0 - self.config.rarity
    }
}

/// Replaces host blocks with ore.
pub struct OreScatter {
    fields: Vec<OreField>,
}

impl OreScatter {
    pub fn new(seed: u32, ores: &[OreConfig]) -> Self {
        let fields = ores
            .iter()
            .enumerate()
            .map(|(i, config)| OreField {
                noise: Perlin::new(seed.wrapping_add(300 + i as u32)),
                config: config.clone(),
            })
            .collect();
        OreScatter { fields }
    }

    /// The ore that replaces `host` at `pos`, if any. Earlier ores take precedence.
    pub fn ore_at(&self, host: BlockType, pos: BlockPos) -> Option<BlockType> {
        self.fields
            .iter()
            .find(|field| field.matches(host, pos))
            .map(|field| field.config.block)
    }

    /// Runs the ore pass over every block below the surface row of its column.
    pub fn scatter(&self, draft: &mut ChunkDraft) {
        if self.fields.is_empty() {
            return;
        }
        for &(x, z, sample) in &draft.columns {
            for y in draft.world_bottom..sample.surface_y() {
                let pos = BlockPos::new(x, y, z);
                let Some(&host) = draft.blocks.get(&pos) else {
                    continue;
                };
                if let Some(ore) = self.ore_at(host, pos) {
                    draft.blocks.insert(pos, ore);
                }
            }
        }
    }
}
