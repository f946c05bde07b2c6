//! # Engine State Module
//!
//! The per-frame driver of the voxel world.
//!
//! ## Key Components
//!
//! * `EngineState` - Owns the world, the fluid queue, the clock and the pending edits
//! * `config` - JSON engine configuration
//! * `rendering` - Mesh construction, atlas packing and the host render interface
//! * `voxels` - Block storage, generation, fluids, streaming and persistence
//!
//! ## Frame Ordering
//!
//! [`EngineState::update`] runs one frame in a fixed order:
//!
//! 1. Advance the world clock
//! 2. Process due fluid events (count-capped)
//! 3. Stream chunks around the reference position (time-throttled)
//! 4. Apply queued gameplay edits
//! 5. Rebuild dirty chunk meshes and push them to the render sink
//!
//! Every mutation of a frame is remeshed before the frame ends, so the host never
//! draws a stale mesh for a changed chunk.

use std::collections::VecDeque;
use std::f64::consts::TAU;
use std::path::Path;

use cgmath::{Point3, Vector3};
use log::{debug, info, warn};

use crate::core::StResource;
use config::EngineConfig;
use rendering::{
    meshing::{mesh::MeshLayer, ChunkMesher},
    sink::RenderSink,
    texture_atlas::TextureAtlas,
};
use voxels::{
    block::{block_type::BlockType, BlockPos, BlockValue},
    fluid::FluidSimulator,
    persistence::PersistenceError,
    session::{SpecialEntity, WorldSession, FIGURINE_ROTATION_STEP},
    streaming::{StreamingUpdate, World},
    world::BlockAccess,
};

pub mod config;
pub mod rendering;
pub mod voxels;

/// Length of a full day/night cycle in seconds.
pub const DAY_LENGTH_SECONDS: f64 = 20.0 * 60.0;

/// Day/night phase, exposed for the host's shader uniforms.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WorldClock {
    elapsed: f64,
}

impl WorldClock {
    /// Moves the clock to `now` seconds. Never runs backwards.
    pub fn advance_to(&mut self, now: f64) {
        self.elapsed = self.elapsed.max(now);
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Fraction of the current day in `[0, 1)`.
    pub fn phase(&self) -> f64 {
        self.elapsed.rem_euclid(DAY_LENGTH_SECONDS) / DAY_LENGTH_SECONDS
    }

    /// Sun angle in radians.
    pub fn time_of_day(&self) -> f64 {
        TAU * self.phase()
    }

    /// Block brightness multiplier: 0.6 at night, up to 1.0 at noon.
    pub fn light_factor(&self) -> f64 {
        0.6 + 0.4 * self.time_of_day().sin().max(0.0)
    }
}

/// A gameplay edit waiting for the input slot of the frame.
#[derive(Debug, Clone, PartialEq)]
pub enum EditRequest {
    Place { pos: BlockPos, value: BlockValue },
    Remove { pos: BlockPos },
    ToggleDoor { pos: BlockPos },
    RotateFigurine { pos: BlockPos },
}

/// What happened during one [`EngineState::update`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FrameReport {
    pub fluid_events: usize,
    /// `Some` when the throttled streaming step ran this frame
    pub streaming: Option<StreamingUpdate>,
    pub edits_applied: usize,
    pub chunks_rebuilt: usize,
}

/// The main state container for the voxel world
///
/// This struct owns every subsystem and runs them in frame order. The host calls
/// [`EngineState::update`] once per frame and feeds edit requests in between.
///
/// # Examples
///
/// ```
/// use voxel_world::engine_state::config::{EngineConfig, WorldSettings};
/// use voxel_world::engine_state::EngineState;
/// use voxel_world::engine_state::rendering::sink::NullSink;
/// use voxel_world::engine_state::voxels::block::block_type::BlockType;
/// use cgmath::Point3;
///
/// let dir = tempfile::tempdir().unwrap();
/// let config = EngineConfig {
///     world: WorldSettings { chunk_size: 8, world_radius_chunks: 1 },
///     save_dir: dir.path().to_path_buf(),
///     ..EngineConfig::default()
/// };
/// let mut engine = EngineState::new(config, Box::new(NullSink), true);
/// engine.place_block(Point3::new(0, 60, 0), BlockType::Stone.into());
/// let report = engine.update(0.016);
/// assert_eq!(report.edits_applied, 1);
/// ```
pub struct EngineState {
    config: EngineConfig,
    world: World,
    fluid: FluidSimulator,
    session: StResource<WorldSession>,
    clock: WorldClock,
    edits: VecDeque<EditRequest>,
    sink: Box<dyn RenderSink>,
    reference_position: Point3<f32>,
    last_streaming_update: Option<f64>,
}

impl EngineState {
    /// Creates the engine and populates its world
    ///
    /// # Arguments
    ///
    /// * `config` - Engine configuration
    /// * `sink` - Host render interface receiving meshes, collision and the atlas
    /// * `fresh` - Ignore any existing save and generate a new world
    ///
    /// # Returns
    ///
    /// An engine whose initial meshes have already been pushed to `sink`
    pub fn new(config: EngineConfig, mut sink: Box<dyn RenderSink>, fresh: bool) -> Self {
        let atlas = match &config.atlas.texture_dir {
            Some(dir) => TextureAtlas::load(dir, config.atlas.columns, config.atlas.tile_size),
            None => TextureAtlas::layout(config.atlas.columns),
        };
        if let Some(image) = atlas.image() {
            sink.bind_atlas(MeshLayer::Opaque, image);
        }

        let session = StResource::new(WorldSession::new());
        let world = World::open(&config, ChunkMesher::new(atlas), session.clone(), fresh);
        let fluid = FluidSimulator::new(&config.fluid);

        let mut engine = EngineState {
            config,
            world,
            fluid,
            session,
            clock: WorldClock::default(),
            edits: VecDeque::new(),
            sink,
            reference_position: Point3::new(0.0, 0.0, 0.0),
            last_streaming_update: None,
        };
        engine.stream(0.0);
        let rebuilt = engine.world.flush_meshes(engine.sink.as_mut());
        info!(
            "Engine ready: {} chunk(s) meshed, {:?} mode",
            rebuilt,
            engine.world.mode()
        );
        engine
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn fluid(&self) -> &FluidSimulator {
        &self.fluid
    }

    pub fn session(&self) -> &StResource<WorldSession> {
        &self.session
    }

    pub fn clock(&self) -> &WorldClock {
        &self.clock
    }

    /// The block at `pos`.
    pub fn get_block(&self, pos: BlockPos) -> Option<&BlockValue> {
        self.world.get_block(pos)
    }

    /// Sets the position chunks are streamed around, usually the player's.
    pub fn set_reference_position(&mut self, position: Point3<f32>) {
        self.reference_position = position;
    }

    /// Number of edits waiting for the next frame.
    pub fn pending_edits(&self) -> usize {
        self.edits.len()
    }

    pub fn place_block(&mut self, pos: BlockPos, value: BlockValue) {
        self.edits.push_back(EditRequest::Place { pos, value });
    }

    pub fn remove_block(&mut self, pos: BlockPos) {
        self.edits.push_back(EditRequest::Remove { pos });
    }

    pub fn toggle_door(&mut self, pos: BlockPos) {
        self.edits.push_back(EditRequest::ToggleDoor { pos });
    }

    pub fn rotate_figurine(&mut self, pos: BlockPos) {
        self.edits.push_back(EditRequest::RotateFigurine { pos });
    }

    /// Runs one frame
    ///
    /// # Arguments
    ///
    /// * `now` - Seconds since the engine started
    pub fn update(&mut self, now: f64) -> FrameReport {
        self.clock.advance_to(now);

        let fluid_events = self.fluid.tick(now, &mut self.world);
        let streaming = self.stream(now);

        let mut edits_applied = 0;
        while let Some(request) = self.edits.pop_front() {
            if self.apply(request) {
                edits_applied += 1;
            }
        }

        let chunks_rebuilt = self.world.flush_meshes(self.sink.as_mut());
        FrameReport {
            fluid_events,
            streaming,
            edits_applied,
            chunks_rebuilt,
        }
    }

    /// Runs a streaming update if the minimum interval has passed since the last one.
    fn stream(&mut self, now: f64) -> Option<StreamingUpdate> {
        if let Some(last) = self.last_streaming_update {
            if now - last < self.config.streaming.update_interval {
                return None;
            }
        }
        self.last_streaming_update = Some(now);
        Some(self.world.update_chunks(self.reference_position))
    }

    /// Applies one edit immediately.
    ///
    /// # Returns
    ///
    /// Whether the world changed
    pub fn apply(&mut self, request: EditRequest) -> bool {
        match request {
            EditRequest::Place { pos, value } => self.apply_place(pos, value),
            EditRequest::Remove { pos } => self.apply_remove(pos),
            EditRequest::ToggleDoor { pos } => self.update_entity(pos, BlockType::Door, |door| {
                door.open = !door.open;
            }),
            EditRequest::RotateFigurine { pos } => {
                let Some(kind) = self.world.block_type_at(pos) else {
                    return false;
                };
                self.update_entity(pos, kind, |figurine| {
                    if figurine.is_figurine() {
                        figurine.rotation = (figurine.rotation + FIGURINE_ROTATION_STEP).rem_euclid(360.0);
                    }
                })
            }
        }
    }

    fn apply_place(&mut self, pos: BlockPos, value: BlockValue) -> bool {
        self.world.ensure_materialized(pos);
        if !self.world.is_empty_at(pos) {
            debug!("Ignoring placement at {:?}: cell is occupied", pos);
            return false;
        }

        let kind = value.block_type();
        let value = match SpecialEntity::from_block(pos, &value) {
            Some(entity) => {
                let value = entity.to_block_value();
                self.session.get_mut().register(pos, &value);
                value
            }
            None => value,
        };
        self.world.set_block(pos, Some(value));

        match kind {
            BlockType::Water => {
                self.fluid
                    .spread_from(pos, self.config.fluid.source_spread_distance);
            }
            BlockType::Sponge if self.touches_water(pos) => {
                self.fluid
                    .soak(pos, self.config.fluid.soak_radius, &mut self.world);
            }
            _ => {}
        }
        true
    }

    fn apply_remove(&mut self, pos: BlockPos) -> bool {
        let removed = self.world.set_block(pos, None);
        self.session.get_mut().unregister(pos);
        removed.is_some()
    }

    /// Changes a special entity's state and rewrites its block value to match.
    fn update_entity(
        &mut self,
        pos: BlockPos,
        kind: BlockType,
        change: impl FnOnce(&mut SpecialEntity),
    ) -> bool {
        let Some(value) = self.world.get_block(pos) else {
            return false;
        };
        if value.block_type() != kind || !kind.is_special() {
            warn!("No {} at {:?} to update", kind, pos);
            return false;
        }
        let value = value.clone();

        let mut session = self.session.get_mut();
        session.register(pos, &value);
        let Some(entity) = session.get_mut(pos) else {
            return false;
        };
        let before = entity.clone();
        change(entity);
        if *entity == before {
            return false;
        }
        let value = entity.to_block_value();
        drop(session);

        self.world.set_block(pos, Some(value));
        true
    }

    fn touches_water(&self, pos: BlockPos) -> bool {
        (-1..=1).any(|dx| {
            (-1..=1).any(|dy| {
                (-1..=1).any(|dz| {
                    (dx, dy, dz) != (0, 0, 0)
                        && self.world.block_type_at(pos + Vector3::new(dx, dy, dz))
                            == Some(BlockType::Water)
                })
            })
        })
    }

    /// Writes the world to the configured save path.
    pub fn save(&self) -> Result<(), PersistenceError> {
        self.world.save()
    }

    /// Replaces the world with the save at `path`, pushing the new meshes to the sink.
    ///
    /// Pending fluid events belong to the old world and are discarded.
    ///
    /// # Returns
    ///
    /// `false` when the save is missing or malformed and the world was left untouched
    pub fn load(&mut self, path: &Path) -> bool {
        if !self.world.load(path) {
            return false;
        }
        self.fluid = FluidSimulator::new(&self.config.fluid);
        self.edits.clear();
        self.last_streaming_update = None;
        self.stream(self.clock.elapsed());
        self.world.flush_meshes(self.sink.as_mut());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::config::{StreamingConfig, WorldMode, WorldSettings};
    use crate::engine_state::rendering::sink::NullSink;
    use crate::engine_state::voxels::chunk::ChunkKey;
    use std::f64::consts::PI;

    fn engine(dir: &Path, mode: WorldMode) -> EngineState {
        let config = EngineConfig {
            world: WorldSettings {
                chunk_size: 4,
                world_radius_chunks: 1,
            },
            streaming: StreamingConfig {
                mode,
                load_radius: 1,
                update_interval: 0.5,
            },
            save_dir: dir.to_path_buf(),
            ..EngineConfig::default()
        };
        EngineState::new(config, Box::new(NullSink), true)
    }

    #[test]
    fn clock_follows_the_day_cycle() {
        let mut clock = WorldClock::default();
        assert_eq!(clock.light_factor(), 0.6);
        clock.advance_to(DAY_LENGTH_SECONDS / 4.0);
        assert!((clock.time_of_day() - PI / 2.0).abs() < 1e-9);
        assert!((clock.light_factor() - 1.0).abs() < 1e-9);
        clock.advance_to(DAY_LENGTH_SECONDS * 0.75);
        assert!((clock.light_factor() - 0.6).abs() < 1e-9);
        clock.advance_to(1.0);
        assert_eq!(clock.elapsed(), DAY_LENGTH_SECONDS * 0.75);
    }

    #[test]
    fn edits_wait_for_the_frame() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path(), WorldMode::Bounded);
        let pos = BlockPos::new(0, 60, 0);
        engine.place_block(pos, BlockType::Steel.into());
        assert!(engine.get_block(pos).is_none());
        let report = engine.update(0.1);
        assert_eq!(report.edits_applied, 1);
        assert!(report.chunks_rebuilt >= 1);
        assert_eq!(engine.world().block_type_at(pos), Some(BlockType::Steel));
    }

    #[test]
    fn placement_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path(), WorldMode::Bounded);
        let pos = BlockPos::new(1, 60, 1);
        assert!(engine.apply(EditRequest::Place {
            pos,
            value: BlockType::Stone.into()
        }));
        assert!(!engine.apply(EditRequest::Place {
            pos,
            value: BlockType::Sand.into()
        }));
        assert!(engine.apply(EditRequest::Remove { pos }));
        assert!(!engine.apply(EditRequest::Remove { pos }));
    }

    #[test]
    fn placement_outside_the_ring_respects_real_terrain() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path(), WorldMode::Streaming);
        let key = ChunkKey::new(200, 200);
        let generated = engine.world().generator().generate(key).chunk;
        let (&pos, value) = generated.blocks().next().unwrap();
        let value = value.clone();
        assert!(!engine.world().is_materialized(key));

        assert!(!engine.apply(EditRequest::Place {
            pos,
            value: BlockType::Water.into()
        }));
        assert_eq!(engine.get_block(pos), Some(&value));
    }

    #[test]
    fn doors_toggle_and_persist_their_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path(), WorldMode::Bounded);
        let pos = BlockPos::new(2, 60, 2);
        engine.apply(EditRequest::Place {
            pos,
            value: BlockType::Door.into(),
        });
        assert_eq!(engine.get_block(pos).unwrap().metadata_bool("open"), Some(false));

        assert!(engine.apply(EditRequest::ToggleDoor { pos }));
        assert_eq!(engine.get_block(pos).unwrap().metadata_bool("open"), Some(true));
        assert!(engine.session().get().get(pos).unwrap().open);

        assert!(engine.apply(EditRequest::Remove { pos }));
        assert!(engine.session().get().is_empty());
        assert!(!engine.apply(EditRequest::ToggleDoor { pos }));
    }

    #[test]
    fn figurines_rotate_in_steps() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path(), WorldMode::Bounded);
        let pos = BlockPos::new(-2, 60, 2);
        engine.apply(EditRequest::Place {
            pos,
            value: BlockType::Foxfox.into(),
        });
        for _ in 0..13 {
            assert!(engine.apply(EditRequest::RotateFigurine { pos }));
        }
        assert_eq!(engine.get_block(pos).unwrap().metadata_f32("rotation"), Some(30.0));

        let door = BlockPos::new(-2, 61, 2);
        engine.apply(EditRequest::Place {
            pos: door,
            value: BlockType::Door.into(),
        });
        assert!(!engine.apply(EditRequest::RotateFigurine { pos: door }));
    }

    #[test]
    fn water_spreads_over_frames_and_sponges_soak_it() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path(), WorldMode::Bounded);
        let floor = 60;
        for x in -3..3 {
            for z in -3..3 {
                engine.apply(EditRequest::Place {
                    pos: BlockPos::new(x, floor, z),
                    value: BlockType::Stone.into(),
                });
            }
        }
        let source = BlockPos::new(0, floor + 1, 0);
        engine.place_block(source, BlockType::Water.into());
        engine.update(1.0);
        assert!(engine.world().is_empty_at(BlockPos::new(1, floor + 1, 0)));
        engine.update(1.3);
        assert_eq!(
            engine.world().block_type_at(BlockPos::new(1, floor + 1, 0)),
            Some(BlockType::Water)
        );

        let sponge = BlockPos::new(0, floor + 2, 0);
        engine.place_block(sponge, BlockType::Sponge.into());
        engine.update(1.31);
        assert!(engine.world().is_empty_at(source));
        assert!(engine.world().is_empty_at(BlockPos::new(1, floor + 1, 0)));
    }

    #[test]
    fn streaming_is_throttled() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path(), WorldMode::Streaming);
        assert_eq!(engine.world().materialized_keys().len(), 9);

        engine.set_reference_position(Point3::new(40.0, 0.0, 40.0));
        assert!(engine.update(0.2).streaming.is_none());
        let report = engine.update(0.6);
        assert_eq!(report.streaming.unwrap().evicted.len(), 9);
        assert!(engine.world().is_materialized(ChunkKey::new(40, 40)));
    }

    #[test]
    fn load_replaces_the_world() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path(), WorldMode::Bounded);
        let pos = BlockPos::new(3, 70, 3);
        engine.apply(EditRequest::Place {
            pos,
            value: BlockType::Gold.into(),
        });
        engine.save().unwrap();
        engine.apply(EditRequest::Remove { pos });

        let path = engine.config().save_path();
        assert!(engine.load(&path));
        assert_eq!(engine.world().block_type_at(pos), Some(BlockType::Gold));
        assert!(!engine.load(&dir.path().join("missing.json")));
    }
}
