//! World session context.
//!
//! Special blocks (doors, figurines, particle emitters) are drawn by the host as separate
//! objects rather than chunk geometry. The session is the single registry of those
//! objects, keyed by absolute position, together with the current reference position.
//! It is shared between the streaming manager and gameplay through
//! [`StResource`](crate::core::StResource).

use std::collections::HashMap;

use cgmath::Point3;
use serde_json::json;

use super::block::{block_type::BlockType, BlockMetadata, BlockPos, BlockValue};
use super::chunk::ChunkKey;

/// Degrees a figurine turns per rotate action.
pub const FIGURINE_ROTATION_STEP: f32 = 30.0;

/// A special block's host-side state.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecialEntity {
    pub kind: BlockType,
    pub position: BlockPos,
    /// Yaw in degrees, normalized to `[0, 360)`
    pub rotation: f32,
    /// Doors only
    pub open: bool,
}

impl SpecialEntity {
    /// Reconstructs an entity from a stored block. Returns `None` for non-special blocks.
    pub fn from_block(position: BlockPos, value: &BlockValue) -> Option<Self> {
        let kind = value.block_type();
        if !kind.is_special() {
            return None;
        }
        Some(SpecialEntity {
            kind,
            position,
            rotation: value.metadata_f32("rotation").unwrap_or(0.0).rem_euclid(360.0),
            open: value.metadata_bool("open").unwrap_or(false),
        })
    }

    /// The block value that persists this entity's state.
    pub fn to_block_value(&self) -> BlockValue {
        let mut metadata = BlockMetadata::new();
        match self.kind {
            BlockType::Door => {
                metadata.insert("rotation".to_string(), json!(self.rotation));
                metadata.insert("open".to_string(), json!(self.open));
            }
            BlockType::Pokeball | BlockType::Foxfox => {
                metadata.insert("rotation".to_string(), json!(self.rotation));
            }
            _ => return BlockValue::Plain(self.kind),
        }
        BlockValue::WithMetadata(self.kind, metadata)
    }

    /// Whether this entity is a rotatable figurine.
    pub fn is_figurine(&self) -> bool {
        matches!(self.kind, BlockType::Pokeball | BlockType::Foxfox)
    }
}

/// Explicit context replacing process-wide entity registries.
#[derive(Debug, Default)]
pub struct WorldSession {
    entities: HashMap<BlockPos, SpecialEntity>,
    reference_position: Option<Point3<f32>>,
}

impl WorldSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the entity for a special block, unless one already exists at `position`.
    ///
    /// # Returns
    /// `true` if a new entity was registered
    pub fn register(&mut self, position: BlockPos, value: &BlockValue) -> bool {
        if self.entities.contains_key(&position) {
            return false;
        }
        match SpecialEntity::from_block(position, value) {
            Some(entity) => {
                self.entities.insert(position, entity);
                true
            }
            None => false,
        }
    }

    pub fn unregister(&mut self, position: BlockPos) -> Option<SpecialEntity> {
        self.entities.remove(&position)
    }

    /// Drops every entity inside the chunk `key`.
    ///
    /// # Returns
    /// The number of entities dropped
    pub fn unregister_chunk(&mut self, key: ChunkKey, chunk_size: i32) -> usize {
        let before = self.entities.len();
        self.entities
            .retain(|pos, _| ChunkKey::containing(*pos, chunk_size) != key);
        before - self.entities.len()
    }

    pub fn get(&self, position: BlockPos) -> Option<&SpecialEntity> {
        self.entities.get(&position)
    }

    pub fn get_mut(&mut self, position: BlockPos) -> Option<&mut SpecialEntity> {
        self.entities.get_mut(&position)
    }

    pub fn entities(&self) -> impl Iterator<Item = &SpecialEntity> {
        self.entities.values()
    }

    /// Number of registered entities of one kind.
    pub fn count_of(&self, kind: BlockType) -> usize {
        self.entities.values().filter(|e| e.kind == kind).count()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn clear(&mut self) {
        self.entities.clear();
    }

    /// The position chunks were last streamed around.
    pub fn reference_position(&self) -> Option<Point3<f32>> {
        self.reference_position
    }

    pub fn set_reference_position(&mut self, position: Point3<f32>) {
        self.reference_position = Some(position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn door(rotation: f64, open: bool) -> BlockValue {
        BlockValue::WithMetadata(
            BlockType::Door,
            BTreeMap::from([
                ("rotation".to_string(), json!(rotation)),
                ("open".to_string(), json!(open)),
            ]),
        )
    }

    #[test]
    fn registration_is_idempotent() {
        let mut session = WorldSession::new();
        let pos = Point3::new(1, 2, 3);
        assert!(session.register(pos, &door(90.0, true)));
        assert!(!session.register(pos, &door(0.0, false)));
        assert_eq!(session.len(), 1);
        let entity = session.get(pos).unwrap();
        assert_eq!(entity.rotation, 90.0);
        assert!(entity.open);
    }

    #[test]
    fn ordinary_blocks_are_not_entities() {
        let mut session = WorldSession::new();
        assert!(!session.register(Point3::new(0, 0, 0), &BlockType::Stone.into()));
        assert!(session.is_empty());
    }

    #[test]
    fn entity_state_round_trips_through_block_values() {
        let pos = Point3::new(0, 1, 0);
        let entity = SpecialEntity::from_block(pos, &door(450.0, false)).unwrap();
        assert_eq!(entity.rotation, 90.0);
        let back = SpecialEntity::from_block(pos, &entity.to_block_value()).unwrap();
        assert_eq!(back, entity);

        let emitter = SpecialEntity::from_block(pos, &BlockType::ParticleBlock.into()).unwrap();
        assert_eq!(emitter.to_block_value(), BlockValue::Plain(BlockType::ParticleBlock));
    }

    #[test]
    fn chunk_unregistration_only_touches_that_chunk() {
        let mut session = WorldSession::new();
        session.register(Point3::new(1, 0, 1), &BlockType::Foxfox.into());
        session.register(Point3::new(3, 5, 2), &BlockType::Pokeball.into());
        session.register(Point3::new(4, 0, 1), &BlockType::Foxfox.into());
        assert_eq!(session.unregister_chunk(ChunkKey::new(0, 0), 4), 2);
        assert_eq!(session.count_of(BlockType::Foxfox), 1);
    }
}
