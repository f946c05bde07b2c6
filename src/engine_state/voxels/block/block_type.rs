//! # Block Type Module
//!
//! This module defines the different types of blocks in the voxel world.
//! It provides functionality for block type identification, name conversion and
//! classification (water, special entities, fallback colours).

use std::fmt;

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use phf::phf_map;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use super::BlockTypeSize;

/// Enumerates all possible block types in the voxel world.
///
/// Block types are persisted by their lowercase name (see [`BlockType::name`]).
/// The `FromPrimitive` derive allows iterating the catalogue by index.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, FromPrimitive)]
pub enum BlockType {
    Dirt,
    Grass,
    Stone,
    /// Translucent fluid block, meshed into its own buffer.
    Water,
    /// Absorbs nearby water when placed.
    Sponge,
    CrackedTile,
    DarkShingle,
    DarkWood,
    LightWood,
    TreeTrunkDark,
    TreeTrunkLight,
    TreeLeaves,
    CrackedGlyphs,
    Emerald,
    Gold,
    RedBrick,
    RedCement,
    Ruby,
    Sand,
    Seashells,
    Steel,
    StripedWatercolor,
    YellowWool,
    BlackFiligree,
    BlueWool,
    GreenWool,
    PurpleWool,
    RedWool,
    /// Hinged door, rendered by its own entity.
    Door,
    /// Figurine, rendered by its own entity.
    Pokeball,
    /// Figurine, rendered by its own entity.
    Foxfox,
    /// Particle emitter, rendered by its own entity.
    ParticleBlock,
}

/// Number of variants in [`BlockType`].
pub const BLOCK_TYPE_COUNT: BlockTypeSize = 32;

/// Maps persisted block names to block types.
static BLOCK_TYPES_BY_NAME: phf::Map<&'static str, BlockType> = phf_map! {
    "dirt" => BlockType::Dirt,
    "grass" => BlockType::Grass,
    "stone" => BlockType::Stone,
    "water" => BlockType::Water,
    "sponge" => BlockType::Sponge,
    "crackedtile" => BlockType::CrackedTile,
    "darkshingle" => BlockType::DarkShingle,
    "darkwood" => BlockType::DarkWood,
    "lightwood" => BlockType::LightWood,
    "treetrunkdark" => BlockType::TreeTrunkDark,
    "treetrunklight" => BlockType::TreeTrunkLight,
    "treeleaves" => BlockType::TreeLeaves,
    "crackedglyphs" => BlockType::CrackedGlyphs,
    "emerald" => BlockType::Emerald,
    "gold" => BlockType::Gold,
    "redbrick" => BlockType::RedBrick,
    "redcement" => BlockType::RedCement,
    "ruby" => BlockType::Ruby,
    "sand" => BlockType::Sand,
    "seashells" => BlockType::Seashells,
    "steel" => BlockType::Steel,
    "stripedwatercolor" => BlockType::StripedWatercolor,
    "yellowwool" => BlockType::YellowWool,
    "blackfiligree" => BlockType::BlackFiligree,
    "bluewool" => BlockType::BlueWool,
    "greenwool" => BlockType::GreenWool,
    "purplewool" => BlockType::PurpleWool,
    "redwool" => BlockType::RedWool,
    "door" => BlockType::Door,
    "pokeball" => BlockType::Pokeball,
    "foxfox" => BlockType::Foxfox,
    "particleblock" => BlockType::ParticleBlock,
};

impl BlockType {
    /// Looks up a block type by its persisted name.
    pub fn from_name(name: &str) -> Option<Self> {
        BLOCK_TYPES_BY_NAME.get(name).copied()
    }

    /// The persisted lowercase name of this block type.
    pub fn name(self) -> &'static str {
        match self {
            BlockType::Dirt => "dirt",
            BlockType::Grass => "grass",
            BlockType::Stone => "stone",
            BlockType::Water => "water",
            BlockType::Sponge => "sponge",
            BlockType::CrackedTile => "crackedtile",
            BlockType::DarkShingle => "darkshingle",
            BlockType::DarkWood => "darkwood",
            BlockType::LightWood => "lightwood",
            BlockType::TreeTrunkDark => "treetrunkdark",
            BlockType::TreeTrunkLight => "treetrunklight",
            BlockType::TreeLeaves => "treeleaves",
            BlockType::CrackedGlyphs => "crackedglyphs",
            BlockType::Emerald => "emerald",
            BlockType::Gold => "gold",
            BlockType::RedBrick => "redbrick",
            BlockType::RedCement => "redcement",
            BlockType::Ruby => "ruby",
            BlockType::Sand => "sand",
            BlockType::Seashells => "seashells",
            BlockType::Steel => "steel",
            BlockType::StripedWatercolor => "stripedwatercolor",
            BlockType::YellowWool => "yellowwool",
            BlockType::BlackFiligree => "blackfiligree",
            BlockType::BlueWool => "bluewool",
            BlockType::GreenWool => "greenwool",
            BlockType::PurpleWool => "purplewool",
            BlockType::RedWool => "redwool",
            BlockType::Door => "door",
            BlockType::Pokeball => "pokeball",
            BlockType::Foxfox => "foxfox",
            BlockType::ParticleBlock => "particleblock",
        }
    }

    /// Iterates over every block type in declaration order.
    pub fn all() -> impl Iterator<Item = BlockType> {
        (0..BLOCK_TYPE_COUNT).filter_map(BlockType::from_u8)
    }

    /// Whether this is the water block.
    pub fn is_water(self) -> bool {
        self == BlockType::Water
    }

    /// Whether this block is represented by a separate entity instead of chunk geometry.
    pub fn is_special(self) -> bool {
        matches!(
            self,
            BlockType::Door | BlockType::Pokeball | BlockType::Foxfox | BlockType::ParticleBlock
        )
    }

    /// Whether this block goes into the opaque atlas-mapped buffer.
    pub fn is_opaque(self) -> bool {
        !self.is_water() && !self.is_special()
    }

    /// Colour used when the block's texture asset is missing.
    pub fn fallback_color(self) -> [u8; 4] {
        match self {
            BlockType::Dirt => [121, 85, 58, 255],
            BlockType::Grass => [86, 153, 62, 255],
            BlockType::Stone => [128, 128, 128, 255],
            BlockType::Water => [60, 120, 255, 180],
            BlockType::Sponge => [230, 210, 60, 255],
            BlockType::CrackedTile => [100, 100, 100, 255],
            BlockType::DarkShingle => [40, 40, 40, 255],
            BlockType::DarkWood => [101, 67, 33, 255],
            BlockType::LightWood => [200, 180, 130, 255],
            BlockType::TreeTrunkDark => [60, 35, 20, 255],
            BlockType::TreeTrunkLight => [140, 120, 100, 255],
            BlockType::TreeLeaves => [40, 140, 40, 255],
            BlockType::CrackedGlyphs => [150, 140, 120, 255],
            BlockType::Emerald => [40, 200, 110, 255],
            BlockType::Gold => [240, 200, 50, 255],
            BlockType::RedBrick => [160, 60, 50, 255],
            BlockType::RedCement => [180, 90, 80, 255],
            BlockType::Ruby => [200, 20, 60, 255],
            BlockType::Sand => [220, 205, 150, 255],
            BlockType::Seashells => [240, 225, 210, 255],
            BlockType::Steel => [170, 175, 185, 255],
            BlockType::StripedWatercolor => [150, 170, 220, 255],
            BlockType::YellowWool => [240, 220, 60, 255],
            BlockType::BlackFiligree => [20, 20, 20, 255],
            BlockType::BlueWool => [50, 70, 200, 255],
            BlockType::GreenWool => [60, 160, 60, 255],
            BlockType::PurpleWool => [130, 60, 180, 255],
            BlockType::RedWool => [190, 40, 40, 255],
            BlockType::Door => [255, 0, 0, 180],
            BlockType::Pokeball | BlockType::Foxfox => [255, 255, 255, 255],
            BlockType::ParticleBlock => [255, 128, 0, 255],
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for BlockType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for BlockType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        BlockType::from_name(&name)
            .ok_or_else(|| de::Error::custom(format!("unknown block type `{name}`")))
    }
}
