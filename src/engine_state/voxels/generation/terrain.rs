//! Column height, biome classification and column fill.
//!
//! Everything here is a pure function of the seed and the absolute `(x, z)` column, so
//! any column can be resampled from any chunk, for example to find water next door.

use std::collections::HashMap;

use noise::{NoiseFn, Perlin};

use crate::engine_state::config::{BiomeConfig, WorldGenConfig};
use crate::engine_state::voxels::block::{block_type::BlockType, BlockPos};

/// Terrain column classification driving surface material and vegetation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Biome {
    Mountains,
    Desert,
    Forest,
    Plains,
    Beach,
}

impl Biome {
    /// The block placed on the surface row.
    pub fn top_block(self) -> BlockType {
        match self {
            Biome::Mountains => BlockType::Stone,
            Biome::Desert | Biome::Beach => BlockType::Sand,
            Biome::Forest | Biome::Plains => BlockType::Grass,
        }
    }

    /// The block filling the transition layer under the surface.
    pub fn sub_block(self) -> BlockType {
        match self {
            Biome::Mountains => BlockType::Stone,
            Biome::Desert | Biome::Beach => BlockType::Sand,
            Biome::Forest | Biome::Plains => BlockType::Dirt,
        }
    }

    /// Whether trees may grow here.
    pub fn has_trees(self) -> bool {
        matches!(self, Biome::Forest | Biome::Plains)
    }
}

/// The synthesized shape of one column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnSample {
    /// Number of rows above zero reached by solid ground; the surface is `height - 1`
    pub height: i32,
    pub biome: Biome,
}

impl ColumnSample {
    /// Y of the top solid block.
    pub fn surface_y(&self) -> i32 {
        self.height - 1
    }

    /// Half-open range of rows flooded with water, if the surface is below sea level.
    pub fn water_rows(&self, sea_level: i32) -> Option<(i32, i32)> {
        (self.height < sea_level).then_some((self.height, sea_level))
    }
}

struct Octave {
    noise: Perlin,
    frequency: f64,
    weight: f64,
}

/// Samples heights and biomes, and fills columns with blocks.
pub struct TerrainShaper {
    octaves: Vec<Octave>,
    exponent: f64,
    temperature: Perlin,
    humidity: Perlin,
    biomes: BiomeConfig,
    max_height: i32,
    world_bottom: i32,
    sea_level: i32,
    transition_depth: i32,
}

impl TerrainShaper {
    pub fn new(config: &WorldGenConfig) -> Self {
        let octaves = config
            .height
            .frequencies
            .iter()
            .zip(&config.height.weights)
            .enumerate()
            .map(|(i, (frequency, weight))| Octave {
                noise: Perlin::new(config.seed.wrapping_add(i as u32)),
                frequency: *frequency,
                weight: *weight,
            })
            .collect();

        TerrainShaper {
            octaves,
            exponent: config.height.exponent,
            temperature: Perlin::new(config.seed.wrapping_add(10)),
            humidity: Perlin::new(config.seed.wrapping_add(11)),
            biomes: config.biomes.clone(),
            max_height: config.max_height,
            world_bottom: config.world_bottom,
            sea_level: config.sea_level,
            transition_depth: config.transition_depth,
        }
    }

    /// Terrain height of the column `(x, z)`, at least 1.
    ///
    /// The weighted octave blend is mapped from `[-1, 1]` to `[0, 1]`, raised to the
    /// shaping exponent and scaled to the maximum height.
    pub fn height_at(&self, x: i32, z: i32) -> i32 {
        let combined: f64 = self
            .octaves
            .iter()
            .map(|octave| {
                octave.weight
                    * octave
                        .noise
                        .get([x as f64 * octave.frequency, z as f64 * octave.frequency])
            })
            .sum();
        let normalized = ((combined + 1.0) / 2.0).clamp(0.0, 1.0);
        let shaped = normalized.powf(self.exponent);
        ((shaped * self.max_height as f64) as i32).max(1)
    }

    /// Temperature and humidity of the column, both in `[0, 1]`.
    pub fn climate_at(&self, x: i32, z: i32) -> (f64, f64) {
        let point = [
            x as f64 * self.biomes.frequency,
            z as f64 * self.biomes.frequency,
        ];
        let temperature = ((self.temperature.get(point) + 1.0) / 2.0).clamp(0.0, 1.0);
        let humidity = ((self.humidity.get(point) + 1.0) / 2.0).clamp(0.0, 1.0);
        (temperature, humidity)
    }

    /// Picks a biome from ordered thresholds. Beach overrides near sea level, except
    /// for mountains and desert.
    pub fn classify(&self, height: i32, temperature: f64, humidity: f64) -> Biome {
        let b = &self.biomes;
        let fraction = height as f64 / self.max_height.max(1) as f64;

        let biome = if fraction > b.mountain_height {
            Biome::Mountains
        } else if temperature > b.desert_min_temperature
            && humidity < b.desert_max_humidity
            && fraction < b.desert_max_height
        {
            Biome::Desert
        } else if (b.forest_min_temperature..=b.forest_max_temperature).contains(&temperature)
            && humidity > b.forest_min_humidity
        {
            Biome::Forest
        } else {
            Biome::Plains
        };

        let near_sea = (height - self.sea_level).abs() <= b.beach_band;
        if near_sea && !matches!(biome, Biome::Mountains | Biome::Desert) {
            Biome::Beach
        } else {
            biome
        }
    }

    /// Height and biome of the column `(x, z)`.
    pub fn sample(&self, x: i32, z: i32) -> ColumnSample {
        let height = self.height_at(x, z);
        let (temperature, humidity) = self.climate_at(x, z);
        ColumnSample {
            height,
            biome: self.classify(height, temperature, humidity),
        }
    }

    /// Writes the column's ground and water into `blocks`.
    ///
    /// Rows from the world bottom up to the surface hold stone, then the biome's
    /// sub-surface block within the transition depth, then the top block. Rows from the
    /// surface up to sea level hold water.
    pub fn fill_column(
        &self,
        x: i32,
        z: i32,
        sample: ColumnSample,
        blocks: &mut HashMap<BlockPos, BlockType>,
    ) {
        let height = sample.height;
        for y in self.world_bottom..height {
            let block = if y == height - 1 {
                sample.biome.top_block()
            } else if height - y <= self.transition_depth {
                sample.biome.sub_block()
            } else {
                BlockType::Stone
            };
            blocks.insert(BlockPos::new(x, y, z), block);
        }
        if let Some((low, high)) = sample.water_rows(self.sea_level) {
            for y in low..high {
                blocks.insert(BlockPos::new(x, y, z), BlockType::Water);
            }
        }
    }
}
