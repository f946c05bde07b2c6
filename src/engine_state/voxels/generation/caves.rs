//! Cave carving.
//!
//! Tunnels come from the magnitude of a 3D noise field: `|n|` is large on both sides of
//! the field's zero surface, which produces connected, tube-like voids rather than
//! isolated blobs.

use std::collections::HashMap;

use fastrand::Rng;
use noise::{NoiseFn, Perlin};

use super::terrain::ColumnSample;
use super::ChunkDraft;
use crate::engine_state::config::CaveConfig;
use crate::engine_state::voxels::block::{block_type::BlockType, BlockPos};

/// Carves caves and cave mouths out of a drafted chunk.
pub struct CaveCarver {
    noise: Perlin,
    config: CaveConfig,
}

impl CaveCarver {
    pub fn new(seed: u32, config: &CaveConfig) -> Self {
        CaveCarver {
            noise: Perlin::new(seed.wrapping_add(100)),
            config: config.clone(),
        }
    }

    /// Probability that a block at `pos` is cleared.
    pub fn carve_probability(&self, pos: BlockPos) -> f64 {
        let f = self.config.frequency;
        let magnitude = self
            .noise
            .get([pos.x as f64 * f, pos.y as f64 * f, pos.z as f64 * f])
            .abs();
        let threshold = self.config.threshold;
        if magnitude <= threshold || threshold >= 1.0 {
            return 0.0;
        }
        ((magnitude - threshold) / (1.0 - threshold)).min(1.0)
    }

    /// Runs the cave pass, then the mouth pass.
    ///
    /// # Arguments
    /// * `draft` - The chunk being generated
    /// * `water` - Flooded row ranges of every column within the water margin of the
    ///   chunk, including columns owned by neighbouring chunks
    /// * `rng` - The chunk's seeded random source
    pub fn carve(
        &self,
        draft: &mut ChunkDraft,
        water: &HashMap<(i32, i32), (i32, i32)>,
        rng: &mut Rng,
    ) {
        if !self.config.enabled {
            return;
        }
        let margin = self.config.water_margin;

        for &(x, z, sample) in &draft.columns {
            let lowest = draft.world_bottom;
            for y in lowest..sample.height {
                let pos = BlockPos::new(x, y, z);
                if y > sample.surface_y() - self.config.surface_margin {
                    break;
                }
                if !draft.blocks.get(&pos).is_some_and(|b| is_carvable(*b)) {
                    continue;
                }
                if near_water(water, pos, margin) {
                    continue;
                }
                let probability = self.carve_probability(pos);
                if probability > 0.0 && rng.f64() < probability {
                    draft.blocks.remove(&pos);
                }
            }
        }

        self.carve_mouths(draft, rng);
    }

    /// Hollows out small pockets under random surface columns. The top block of every
    /// column is left in place.
    fn carve_mouths(&self, draft: &mut ChunkDraft, rng: &mut Rng) {
        let tops: HashMap<(i32, i32), ColumnSample> = draft
            .columns
            .iter()
            .map(|&(x, z, sample)| ((x, z), sample))
            .collect();

        for &(x, z, sample) in &draft.columns {
            let surface = BlockPos::new(x, sample.surface_y(), z);
            if !draft.blocks.get(&surface).is_some_and(|b| !b.is_water()) {
                continue;
            }
            if rng.f64() >= self.config.mouth_chance {
                continue;
            }
            let radius = rng.i32(1..=2);
            let depth = rng.i32(1..=2);
            for dx in -radius..=radius {
                for dz in -radius..=radius {
                    let Some(column) = tops.get(&(x + dx, z + dz)) else {
                        continue;
                    };
                    for dy in 1..=depth {
                        let y = sample.surface_y() - dy;
                        if y >= column.surface_y() {
                            continue;
                        }
                        let pos = BlockPos::new(x + dx, y, z + dz);
                        if draft.blocks.get(&pos).is_some_and(|b| !b.is_water()) {
                            draft.blocks.remove(&pos);
                        }
                    }
                }
            }
        }
    }
}

fn is_carvable(block: BlockType) -> bool {
    matches!(block, BlockType::Stone | BlockType::Dirt | BlockType::Sand)
}

fn near_water(water: &HashMap<(i32, i32), (i32, i32)>, pos: BlockPos, margin: i32) -> bool {
    for dx in -margin..=margin {
        for dz in -margin..=margin {
            if let Some(&(low, high)) = water.get(&(pos.x + dx, pos.z + dz)) {
                if pos.y + margin >= low && pos.y - margin < high {
                    return true;
                }
            }
        }
    }
    false
}
