//! Engine configuration.
//!
//! Every section has compiled defaults and `#[serde(default)]`, so a partial JSON file
//! only overrides the fields it names.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::voxels::block::block_type::BlockType;

/// Errors raised while reading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Shape of the world. Persisted at the top of every save document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSettings {
    /// Width and depth of a chunk, in blocks
    pub chunk_size: i32,
    /// Bounded worlds span chunk indices `-radius..radius` on both axes
    pub world_radius_chunks: i32,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            chunk_size: 16,
            world_radius_chunks: 4,
        }
    }
}

impl WorldSettings {
    /// Replaces out-of-range fields: a chunk size below one falls back to the default
    /// and a negative radius becomes zero.
    pub fn sanitized(self) -> Self {
        let mut settings = self;
        if settings.chunk_size < 1 {
            warn!(
                "Invalid chunk size {}, using {}",
                settings.chunk_size,
                WorldSettings::default().chunk_size
            );
            settings.chunk_size = WorldSettings::default().chunk_size;
        }
        if settings.world_radius_chunks < 0 {
            warn!("Negative world radius {}, using 0", settings.world_radius_chunks);
            settings.world_radius_chunks = 0;
        }
        settings
    }
}

/// Terrain height synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightConfig {
    /// Sampling frequency of each noise octave
    pub frequencies: Vec<f64>,
    /// Blend weight of each octave; should sum to 1
    pub weights: Vec<f64>,
    /// Shaping exponent applied to the normalized height; values above 1 sharpen peaks
    pub exponent: f64,
}

impl Default for HeightConfig {
    fn default() -> Self {
        Self {
            frequencies: vec![0.015, 0.05, 0.1],
            weights: vec![0.7, 0.2, 0.1],
            exponent: 1.3,
        }
    }
}

/// Biome classification thresholds. Temperature and humidity are in `[0, 1]`; heights
/// are fractions of the maximum terrain height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiomeConfig {
    pub frequency: f64,
    pub mountain_height: f64,
    pub desert_min_temperature: f64,
    pub desert_max_humidity: f64,
    pub desert_max_height: f64,
    pub forest_min_temperature: f64,
    pub forest_max_temperature: f64,
    pub forest_min_humidity: f64,
    /// Columns within this many blocks of sea level become beach
    pub beach_band: i32,
}

impl Default for BiomeConfig {
    fn default() -> Self {
        Self {
            frequency: 0.008,
            mountain_height: 0.75,
            desert_min_temperature: 0.6,
            desert_max_humidity: 0.45,
            desert_max_height: 0.6,
            forest_min_temperature: 0.3,
            forest_max_temperature: 0.7,
            forest_min_humidity: 0.5,
            beach_band: 2,
        }
    }
}

/// Cave carving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaveConfig {
    pub enabled: bool,
    pub frequency: f64,
    /// Noise magnitude above which blocks may be cleared
    pub threshold: f64,
    /// Blocks this close below the surface are never carved
    pub surface_margin: i32,
    /// Blocks within this distance of water are never carved
    pub water_margin: i32,
    /// Chance per surface column of carving a shallow mouth under it
    pub mouth_chance: f64,
}

impl Default for CaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            frequency: 0.04,
            threshold: 0.45,
            surface_margin: 8,
            water_margin: 3,
            mouth_chance: 0.05,
        }
    }
}

/// One ore vein family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OreConfig {
    pub block: BlockType,
    /// Block types the ore may replace
    pub hosts: Vec<BlockType>,
    pub min_y: i32,
    pub max_y: i32,
    pub frequency: f64,
    /// Fraction of the noise distribution's upper tail that becomes ore
    pub rarity: f64,
}

impl OreConfig {
    fn new(block: BlockType, max_y: i32, frequency: f64, rarity: f64) -> Self {
        Self {
            block,
            hosts: vec![BlockType::Stone],
            min_y: -64,
            max_y,
            frequency,
            rarity,
        }
    }
}

/// Tree placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VegetationConfig {
    pub enabled: bool,
    pub frequency: f64,
    /// Placement noise must exceed this value
    pub threshold: f64,
    pub min_trunk_height: i32,
    pub max_trunk_height: i32,
    pub canopy_radius: i32,
    /// Minimum Chebyshev distance between two trunks
    pub min_spacing: i32,
    /// Empty cells required above the surface block
    pub clearance: i32,
}

impl Default for VegetationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            frequency: 0.1,
            threshold: 0.25,
            min_trunk_height: 4,
            max_trunk_height: 6,
            canopy_radius: 2,
            min_spacing: 2,
            clearance: 6,
        }
    }
}

/// Procedural generation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldGenConfig {
    pub seed: u32,
    pub max_height: i32,
    /// Lowest generated layer
    pub world_bottom: i32,
    pub sea_level: i32,
    /// Rows below the surface filled with the biome's sub-surface block
    pub transition_depth: i32,
    pub height: HeightConfig,
    pub biomes: BiomeConfig,
    pub caves: CaveConfig,
    /// Checked in order; the first matching ore wins
    pub ores: Vec<OreConfig>,
    pub vegetation: VegetationConfig,
}

impl Default for WorldGenConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            max_height: 32,
            world_bottom: -8,
            sea_level: 10,
            transition_depth: 4,
            height: HeightConfig::default(),
            biomes: BiomeConfig::default(),
            caves: CaveConfig::default(),
            ores: vec![
                OreConfig::new(BlockType::Gold, 8, 0.12, 0.18),
                OreConfig::new(BlockType::Ruby, 4, 0.15, 0.14),
                OreConfig::new(BlockType::Emerald, 2, 0.18, 0.12),
            ],
            vegetation: VegetationConfig::default(),
        }
    }
}

/// Water spread and soak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FluidConfig {
    /// Seconds between a cell filling and its neighbours filling
    pub spread_delay: f64,
    /// Upper bound on events processed per tick
    pub max_events_per_tick: usize,
    /// Spread distance of a placed water source
    pub source_spread_distance: u32,
    /// Hop radius of a sponge's soak
    pub soak_radius: u32,
}

impl Default for FluidConfig {
    fn default() -> Self {
        Self {
            spread_delay: 0.2,
            max_events_per_tick: 64,
            source_spread_distance: 5,
            soak_radius: 5,
        }
    }
}

/// How chunks are materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorldMode {
    /// Generate the whole fixed-radius world up front
    #[default]
    Bounded,
    /// Keep only a ring of chunks around the reference position
    Streaming,
}

/// Chunk streaming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    pub mode: WorldMode,
    /// Ring radius in chunks around the reference chunk
    pub load_radius: i32,
    /// Minimum seconds between two streaming updates
    pub update_interval: f64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            mode: WorldMode::Bounded,
            load_radius: 4,
            update_interval: 0.5,
        }
    }
}

/// Texture atlas packing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    pub columns: u32,
    pub tile_size: u32,
    /// Directory holding `<block name>.png` files; `None` skips image packing
    pub texture_dir: Option<PathBuf>,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            columns: 8,
            tile_size: 16,
            texture_dir: None,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub world: WorldSettings,
    pub generation: WorldGenConfig,
    pub fluid: FluidConfig,
    pub streaming: StreamingConfig,
    pub atlas: AtlasConfig,
    pub save_dir: PathBuf,
    pub save_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            world: WorldSettings::default(),
            generation: WorldGenConfig::default(),
            fluid: FluidConfig::default(),
            streaming: StreamingConfig::default(),
            atlas: AtlasConfig::default(),
            save_dir: PathBuf::from("save"),
            save_name: "world_save.json".to_string(),
        }
    }
}

impl EngineConfig {
    /// Reads a JSON configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Load config, falling back to the defaults when the file is missing or malformed.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::from_file(path) {
            Ok(mut config) => {
                config.world = config.world.sanitized();
                config
            }
            Err(err) => {
                warn!("Ignoring config at {}: {}", path.display(), err);
                Self::default()
            }
        }
    }

    /// Path of the active save document.
    pub fn save_path(&self) -> PathBuf {
        self.save_dir.join(&self.save_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.world.chunk_size, 16);
        assert_eq!(config.generation.seed, 42);
        assert_eq!(config.generation.sea_level, 10);
        assert_eq!(config.fluid.spread_delay, 0.2);
        assert_eq!(config.streaming.mode, WorldMode::Bounded);
        assert_eq!(config.save_path(), PathBuf::from("save/world_save.json"));
    }

    #[test]
    fn partial_files_keep_the_remaining_defaults() {
        let config: EngineConfig = serde_json::from_str(
            r#"{"world": {"chunk_size": 8}, "streaming": {"mode": "streaming"}}"#,
        )
        .unwrap();
        assert_eq!(config.world.chunk_size, 8);
        assert_eq!(config.world.world_radius_chunks, 4);
        assert_eq!(config.streaming.mode, WorldMode::Streaming);
        assert_eq!(config.streaming.load_radius, 4);
        assert_eq!(config.generation.ores.len(), 3);
    }

    #[test]
    fn missing_and_malformed_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        assert_eq!(EngineConfig::load_or_default(&missing), EngineConfig::default());

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(
            EngineConfig::from_file(&broken),
            Err(ConfigError::Json(_))
        ));
        assert_eq!(EngineConfig::load_or_default(&broken), EngineConfig::default());
    }

    #[test]
    fn out_of_range_world_settings_are_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zero.json");
        fs::write(&path, r#"{"world": {"chunk_size": 0, "world_radius_chunks": -3}}"#).unwrap();
        let config = EngineConfig::load_or_default(&path);
        assert_eq!(config.world.chunk_size, 16);
        assert_eq!(config.world.world_radius_chunks, 0);

        let valid = WorldSettings {
            chunk_size: 8,
            world_radius_chunks: 2,
        };
        assert_eq!(valid.sanitized(), valid);
    }
}
