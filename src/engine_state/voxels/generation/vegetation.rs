//! Tree placement.

use fastrand::Rng;
use noise::{NoiseFn, Perlin};

use super::terrain::Biome;
use super::ChunkDraft;
use crate::engine_state::config::VegetationConfig;
use crate::engine_state::voxels::block::{block_type::BlockType, BlockPos};

/// Grows trees on qualifying grass columns.
pub struct TreePlanter {
    noise: Perlin,
    config: VegetationConfig,
}

impl TreePlanter {
    pub fn new(seed: u32, config: &VegetationConfig) -> Self {
        TreePlanter {
            noise: Perlin::new(seed.wrapping_add(200)),
            config: config.clone(),
        }
    }

    /// Whether the placement noise allows a tree on column `(x, z)`.
    pub fn noise_allows(&self, x: i32, z: i32) -> bool {
        let f = self.config.frequency;
        self.noise.get([x as f64 * f, z as f64 * f]) > self.config.threshold
    }

    /// Plants trees in the draft.
    ///
    /// A column qualifies when its biome grows trees, its top block is grass at or above
    /// sea level, the cells above it are clear, it passes the placement noise and no
    /// earlier trunk of this pass is within the minimum spacing. Leaves never replace
    /// existing blocks. Leaves landing outside the chunk are returned for the owning
    /// chunk to apply later.
    ///
    /// # Returns
    /// The trunk columns planted, in placement order
    pub fn plant(&self, draft: &mut ChunkDraft, sea_level: i32, rng: &mut Rng) -> Vec<(i32, i32)> {
        let mut trunks: Vec<(i32, i32)> = Vec::new();
        if !self.config.enabled {
            return trunks;
        }
        let columns = draft.columns.clone();

        for (x, z, sample) in columns {
            if !sample.biome.has_trees() {
                continue;
            }
            let Some(surface_y) = draft.column_top(x, z) else {
                continue;
            };
            if surface_y < sea_level
                || draft.blocks.get(&BlockPos::new(x, surface_y, z)) != Some(&BlockType::Grass)
            {
                continue;
            }
            let spacing = self.config.min_spacing;
            if trunks
                .iter()
                .any(|&(tx, tz)| (x - tx).abs() <= spacing && (z - tz).abs() <= spacing)
            {
                continue;
            }
            let clear = (1..=self.config.clearance)
                .all(|dy| !draft.blocks.contains_key(&BlockPos::new(x, surface_y + dy, z)));
            if !clear || !self.noise_allows(x, z) {
                continue;
            }

            let max_trunk = self.config.max_trunk_height.max(self.config.min_trunk_height);
            let trunk_height = rng.i32(self.config.min_trunk_height..=max_trunk);
            let trunk_block = match sample.biome {
                Biome::Forest => BlockType::TreeTrunkDark,
                _ => BlockType::TreeTrunkLight,
            };
            for dy in 1..=trunk_height {
                draft.blocks.insert(BlockPos::new(x, surface_y + dy, z), trunk_block);
            }
            self.grow_canopy(draft, BlockPos::new(x, surface_y + trunk_height, z));
            trunks.push((x, z));
        }
        trunks
    }

    fn grow_canopy(&self, draft: &mut ChunkDraft, center: BlockPos) {
        let r = self.config.canopy_radius;
        for dx in -r..=r {
            for dy in -r..=r {
                for dz in -r..=r {
                    if dx * dx + dy * dy + dz * dz > r * r {
                        continue;
                    }
                    let pos = BlockPos::new(center.x + dx, center.y + dy, center.z + dz);
                    draft.place_if_empty(pos, BlockType::TreeLeaves);
                }
            }
        }
    }
}
