//! # Chunk Streaming
//!
//! [`World`] owns the live chunk set and decides which chunks are materialized.
//!
//! ## Modes
//!
//! * **Bounded**: every chunk with index in `-R..R` on both axes is materialized once,
//!   where `R` is the world radius. Nothing is loaded or evicted later.
//! * **Streaming**: only the ring of chunks within the load radius of the reference
//!   chunk is kept. Evicted chunks are written back to an in-memory cache so they
//!   hydrate with their edits when revisited, and so [`World::save`] never loses them.
//!
//! A chunk entering the ring hydrates from the cache when it has a record and is
//! generated fresh otherwise. Tree canopies that a generated chunk places in a neighbour
//! which is not materialized are held in a spill buffer until that neighbour is
//! generated.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use cgmath::Point3;
use log::{debug, info};

use super::block::{BlockPos, BlockValue};
use super::chunk::{Chunk, ChunkKey};
use super::generation::WorldGenerator;
use super::persistence::{ChunkRecord, PersistenceError, SaveDocument};
use super::session::WorldSession;
use super::world::{BlockAccess, BlockAccessMut, VoxelWorld};
use crate::core::StResource;
use crate::engine_state::config::{EngineConfig, WorldGenConfig, WorldMode, WorldSettings};
use crate::engine_state::rendering::{
    meshing::{ChunkMesher, ChunkMeshes},
    sink::RenderSink,
};

/// Chunks that changed state during one streaming update.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StreamingUpdate {
    pub loaded: Vec<ChunkKey>,
    pub evicted: Vec<ChunkKey>,
}

impl StreamingUpdate {
    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty() && self.evicted.is_empty()
    }
}

/// The streaming manager.
pub struct World {
    voxels: VoxelWorld,
    generator: WorldGenerator,
    mesher: ChunkMesher,
    session: StResource<WorldSession>,
    settings: WorldSettings,
    mode: WorldMode,
    load_radius: i32,
    save_path: PathBuf,
    /// Persisted or evicted chunks that are not materialized
    cache: BTreeMap<ChunkKey, ChunkRecord>,
    /// Vegetation waiting for its owning chunk to be generated
    spill: HashMap<ChunkKey, Vec<(BlockPos, BlockValue)>>,
    /// Evicted chunks whose render objects have not been released yet
    released: Vec<ChunkKey>,
}

impl World {
    /// Creates a world with nothing materialized.
    ///
    /// # Arguments
    /// * `config` - Engine configuration; world settings, generation, streaming and save path
    /// * `mesher` - Mesher used to rebuild dirty chunks
    /// * `session` - Shared registry of special entities
    pub fn new(config: &EngineConfig, mesher: ChunkMesher, session: StResource<WorldSession>) -> Self {
        let settings = config.world.sanitized();
        World {
            voxels: VoxelWorld::new(settings.chunk_size),
            generator: WorldGenerator::new(config.generation.clone(), settings.chunk_size),
            mesher,
            session,
            settings,
            mode: config.streaming.mode,
            load_radius: config.streaming.load_radius.max(0),
            save_path: config.save_path(),
            cache: BTreeMap::new(),
            spill: HashMap::new(),
            released: Vec::new(),
        }
    }

    /// Creates a world and populates it from the save file, or from the generator.
    ///
    /// In bounded mode the full world is materialized here. In streaming mode the save is
    /// only loaded into the cache and chunks appear on the first [`World::update_chunks`].
    ///
    /// # Arguments
    /// * `fresh` - Ignore any existing save and start a new world
    pub fn open(
        config: &EngineConfig,
        mesher: ChunkMesher,
        session: StResource<WorldSession>,
        fresh: bool,
    ) -> Self {
        let mut world = Self::new(config, mesher, session);
        let loaded = !fresh && {
            let path = world.save_path.clone();
            world.load(&path)
        };
        if !loaded && world.mode == WorldMode::Bounded {
            world.generate_bounded();
        }
        world
    }

    pub fn mode(&self) -> WorldMode {
        self.mode
    }

    pub fn settings(&self) -> WorldSettings {
        self.settings
    }

    pub fn chunk_size(&self) -> i32 {
        self.settings.chunk_size
    }

    pub fn save_path(&self) -> &Path {
        &self.save_path
    }

    pub fn voxels(&self) -> &VoxelWorld {
        &self.voxels
    }

    pub fn generator(&self) -> &WorldGenerator {
        &self.generator
    }

    pub fn mesher(&self) -> &ChunkMesher {
        &self.mesher
    }

    pub fn session(&self) -> &StResource<WorldSession> {
        &self.session
    }

    /// Origins of the materialized chunks, sorted.
    pub fn materialized_keys(&self) -> Vec<ChunkKey> {
        self.voxels.chunk_keys()
    }

    /// Origins of the cached but not materialized chunks, sorted.
    pub fn cached_keys(&self) -> Vec<ChunkKey> {
        self.cache.keys().copied().collect()
    }

    pub fn is_materialized(&self, key: ChunkKey) -> bool {
        self.voxels.contains_chunk(key)
    }

    /// Origins of the bounded world: chunk indices `-R..R` on both axes.
    pub fn bounded_keys(&self) -> Vec<ChunkKey> {
        let radius = self.settings.world_radius_chunks.max(0);
        let size = self.settings.chunk_size;
        let mut keys = Vec::new();
        for cx in -radius..radius {
            for cz in -radius..radius {
                keys.push(ChunkKey::new(cx * size, cz * size));
            }
        }
        keys
    }

    /// The ring of chunk origins within the load radius of `center`'s chunk.
    pub fn ring_around(&self, center: Point3<f32>) -> Vec<ChunkKey> {
        let size = self.settings.chunk_size;
        let origin = ChunkKey::containing_xz(center.x.floor() as i32, center.z.floor() as i32, size);
        let r = self.load_radius;
        let mut keys = Vec::with_capacity(((2 * r + 1) * (2 * r + 1)) as usize);
        for dx in -r..=r {
            for dz in -r..=r {
                keys.push(origin.offset(dx, dz, size));
            }
        }
        keys
    }

    /// Drops every chunk, cache record, spill and entity, then generates the bounded
    /// world from scratch.
    pub fn generate_bounded(&mut self) {
        self.reset();
        let keys = self.bounded_keys();
        for &key in &keys {
            self.materialize(key);
        }
        info!(
            "Generated bounded world: {} chunk(s) of size {}",
            keys.len(),
            self.settings.chunk_size
        );
    }

    fn reset(&mut self) {
        self.released.extend(self.voxels.chunk_keys());
        self.voxels.clear();
        self.cache.clear();
        self.spill.clear();
        self.session.get_mut().clear();
    }

    /// Brings the materialized set in line with the ring around `reference`.
    ///
    /// Chunks outside the ring are evicted to the cache and their entities are dropped
    /// from the session. Missing chunks are hydrated or generated in sorted order. Does
    /// nothing in bounded mode apart from recording the reference position.
    pub fn update_chunks(&mut self, reference: Point3<f32>) -> StreamingUpdate {
        self.session.get_mut().set_reference_position(reference);
        let mut update = StreamingUpdate::default();
        if self.mode == WorldMode::Bounded {
            return update;
        }

        let desired: HashSet<ChunkKey> = self.ring_around(reference).into_iter().collect();
        for key in self.voxels.chunk_keys() {
            if !desired.contains(&key) {
                self.evict(key);
                update.evicted.push(key);
            }
        }

        let mut missing: Vec<ChunkKey> = desired
            .into_iter()
            .filter(|key| !self.voxels.contains_chunk(*key))
            .collect();
        missing.sort();
        for key in missing {
            self.materialize(key);
            update.loaded.push(key);
        }

        if !update.is_empty() {
            debug!(
                "Streaming update: {} loaded, {} evicted, {} cached",
                update.loaded.len(),
                update.evicted.len(),
                self.cache.len()
            );
        }
        update
    }

    /// Populates the chunk at `key` from the cache, or from the generator.
    fn materialize(&mut self, key: ChunkKey) {
        if let Some(record) = self.cache.remove(&key) {
            self.hydrate(key, record);
            return;
        }

        let generated = self.generator.generate(key);
        let mut chunk = generated.chunk;
        for (pos, value) in self.spill.remove(&key).unwrap_or_default() {
            chunk.set_if_empty(pos, value);
        }
        self.voxels.insert_chunk(chunk);

        for (pos, value) in generated.spill {
            let owner = self.voxels.key_of(pos);
            if self.voxels.contains_chunk(owner) {
                self.voxels.set_block_if_empty(pos, value);
            } else if !self.cache.contains_key(&owner) {
                self.spill.entry(owner).or_default().push((pos, value));
            }
        }
    }

    fn hydrate(&mut self, key: ChunkKey, record: ChunkRecord) {
        let mut chunk = Chunk::empty(key, self.settings.chunk_size);
        let mut session = self.session.get_mut();
        for (pos, value) in record {
            if value.block_type().is_special() {
                session.register(pos, &value);
            }
            chunk.set(pos, Some(value));
        }
        drop(session);
        debug!("Hydrated chunk {} with {} block(s)", key, chunk.len());
        self.voxels.insert_chunk(chunk);
    }

    fn evict(&mut self, key: ChunkKey) {
        let Some(mut chunk) = self.voxels.remove_chunk(key) else {
            return;
        };
        self.cache.insert(key, chunk.take_blocks());
        self.session
            .get_mut()
            .unregister_chunk(key, self.settings.chunk_size);
        self.released.push(key);
    }

    /// The block at `pos`.
    pub fn get_block(&self, pos: BlockPos) -> Option<&BlockValue> {
        self.voxels.get_block(pos)
    }

    /// Writes (`Some`) or deletes (`None`) the block at `pos`.
    ///
    /// In streaming mode a write into a chunk that is not materialized first hydrates or
    /// generates that chunk, so the edit lands on top of its real contents. In bounded
    /// mode a write outside the world creates an empty chunk.
    pub fn set_block(&mut self, pos: BlockPos, value: Option<BlockValue>) -> Option<BlockValue> {
        self.ensure_materialized(pos);
        self.voxels.set_block(pos, value)
    }

    /// Writes a block only if the cell is empty once its chunk holds its real contents.
    ///
    /// # Returns
    /// Whether the block was written
    pub fn set_block_if_empty(&mut self, pos: BlockPos, value: BlockValue) -> bool {
        self.ensure_materialized(pos);
        self.voxels.set_block_if_empty(pos, value)
    }

    /// In streaming mode, hydrates or generates the chunk owning `pos` if it is not
    /// materialized. Reads of that cell then see its real contents.
    pub fn ensure_materialized(&mut self, pos: BlockPos) {
        let key = self.voxels.key_of(pos);
        if self.mode == WorldMode::Streaming && !self.voxels.contains_chunk(key) {
            self.materialize(key);
        }
    }

    /// Rebuilds every dirty chunk and releases evicted chunks in `sink`.
    ///
    /// # Returns
    /// The number of chunks rebuilt
    pub fn flush_meshes(&mut self, sink: &mut dyn RenderSink) -> usize {
        for key in self.released.drain(..) {
            if !self.voxels.contains_chunk(key) {
                sink.release_chunk(key);
            }
        }
        self.voxels.flush_meshes(&self.mesher, sink)
    }

    /// The up-to-date meshes of the chunk at `key`, rebuilding dirty chunks first.
    pub fn chunk_meshes(&mut self, key: ChunkKey, sink: &mut dyn RenderSink) -> Option<&ChunkMeshes> {
        self.flush_meshes(sink);
        self.voxels.chunk(key).map(Chunk::meshes)
    }

    /// A document holding every cached and materialized chunk; materialized chunks win.
    pub fn to_document(&self) -> SaveDocument {
        let mut document = SaveDocument::new(self.settings);
        document.chunks = self.cache.clone();
        for chunk in self.voxels.chunks() {
            let record: ChunkRecord = chunk
                .blocks()
                .map(|(pos, value)| (*pos, value.clone()))
                .collect();
            document.chunks.insert(chunk.key, record);
        }
        document
    }

    /// Writes the world to its save path.
    pub fn save(&self) -> Result<(), PersistenceError> {
        self.save_to(&self.save_path)
    }

    /// Writes the world to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), PersistenceError> {
        let document = self.to_document();
        document.write(path)?;
        info!(
            "Saved {} chunk(s), {} block(s) to {}",
            document.chunks.len(),
            document.block_count(),
            path.display()
        );
        Ok(())
    }

    /// Loads the save at `path`, replacing the current world.
    ///
    /// The document's world settings take precedence over the configured ones. Bounded
    /// mode restores every chunk and entity at once; streaming mode only fills the cache.
    ///
    /// # Returns
    /// `false` when the file is missing or malformed, leaving the world untouched
    pub fn load(&mut self, path: &Path) -> bool {
        let Some(document) = SaveDocument::load(path) else {
            return false;
        };
        self.reset();
        self.adopt_settings(document.world_settings);

        match self.mode {
            WorldMode::Bounded => {
                for (key, record) in document.chunks {
                    self.hydrate(key, record);
                }
                info!(
                    "Restored bounded world: {} chunk(s), {} entit(ies)",
                    self.voxels.len(),
                    self.session.get().len()
                );
            }
            WorldMode::Streaming => {
                self.cache = document.chunks;
                info!("Cached {} saved chunk(s) for streaming", self.cache.len());
            }
        }
        true
    }

    fn adopt_settings(&mut self, settings: WorldSettings) {
        if settings.chunk_size != self.settings.chunk_size {
            info!(
                "Save uses chunk size {} (configured {})",
                settings.chunk_size, self.settings.chunk_size
            );
            let generation: WorldGenConfig = self.generator.config().clone();
            self.voxels = VoxelWorld::new(settings.chunk_size);
            self.generator = WorldGenerator::new(generation, settings.chunk_size);
        }
        self.settings = settings;
    }
}

impl BlockAccess for World {
    fn get_block(&self, pos: BlockPos) -> Option<&BlockValue> {
        self.voxels.get_block(pos)
    }
}

impl BlockAccessMut for World {
    fn set_block(&mut self, pos: BlockPos, value: Option<BlockValue>) -> Option<BlockValue> {
        World::set_block(self, pos, value)
    }

    fn set_block_if_empty(&mut self, pos: BlockPos, value: BlockValue) -> bool {
        World::set_block_if_empty(self, pos, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::config::StreamingConfig;
    use crate::engine_state::rendering::{
        meshing::mesh::{CollisionMesh, MeshBuffer, MeshLayer},
        sink::NullSink,
        texture_atlas::TextureAtlas,
    };
    use crate::engine_state::voxels::block::block_type::BlockType;

    fn config(mode: WorldMode, dir: &Path) -> EngineConfig {
        EngineConfig {
            world: WorldSettings {
                chunk_size: 4,
                world_radius_chunks: 1,
            },
            streaming: StreamingConfig {
                mode,
                load_radius: 1,
                ..StreamingConfig::default()
            },
            save_dir: dir.to_path_buf(),
            ..EngineConfig::default()
        }
    }

    fn world(config: &EngineConfig) -> World {
        World::new(
            config,
            ChunkMesher::new(TextureAtlas::layout(8)),
            StResource::new(WorldSession::new()),
        )
    }

    #[test]
    fn bounded_worlds_cover_the_radius() {
        let dir = tempfile::tempdir().unwrap();
        let mut world = world(&config(WorldMode::Bounded, dir.path()));
        world.generate_bounded();
        assert_eq!(
            world.materialized_keys(),
            vec![
                ChunkKey::new(-4, -4),
                ChunkKey::new(-4, 0),
                ChunkKey::new(0, -4),
                ChunkKey::new(0, 0)
            ]
        );
        assert!(world.update_chunks(Point3::new(100.0, 0.0, 100.0)).is_empty());
        assert_eq!(world.voxels().len(), 4);
    }

    #[test]
    fn streaming_keeps_exactly_the_ring() {
        let dir = tempfile::tempdir().unwrap();
        let mut world = world(&config(WorldMode::Streaming, dir.path()));
        let update = world.update_chunks(Point3::new(1.5, 20.0, -0.5));
        assert_eq!(update.loaded.len(), 9);
        let mut ring = world.ring_around(Point3::new(1.5, 20.0, -0.5));
        ring.sort();
        assert_eq!(world.materialized_keys(), ring);
        assert!(ring.contains(&ChunkKey::new(0, -4)));

        let update = world.update_chunks(Point3::new(9.0, 20.0, -0.5));
        assert_eq!(update.evicted.len(), 3);
        assert_eq!(update.loaded.len(), 3);
        assert!(!world.is_materialized(ChunkKey::new(-4, -4)));
        assert!(world.cached_keys().contains(&ChunkKey::new(-4, -4)));
    }

    #[test]
    fn evicted_edits_survive_revisits_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let mut world = world(&config(WorldMode::Streaming, dir.path()));
        world.update_chunks(Point3::new(0.0, 0.0, 0.0));
        let pos = BlockPos::new(-3, 60, -3);
        world.set_block(pos, Some(BlockType::Door.into()));
        world.session().get_mut().register(pos, &BlockType::Door.into());

        world.update_chunks(Point3::new(40.0, 0.0, 40.0));
        assert!(world.get_block(pos).is_none());
        assert!(world.session().get().get(pos).is_none());
        assert!(world.to_document().chunks[&ChunkKey::new(-4, -4)].contains_key(&pos));

        world.update_chunks(Point3::new(0.0, 0.0, 0.0));
        assert_eq!(world.get_block(pos).map(BlockValue::block_type), Some(BlockType::Door));
        assert!(world.session().get().get(pos).is_some());
    }

    #[test]
    fn streaming_writes_materialize_the_target_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let mut world = world(&config(WorldMode::Streaming, dir.path()));
        let pos = BlockPos::new(50, 60, 50);
        world.set_block(pos, Some(BlockType::Stone.into()));
        let chunk = world.voxels().chunk(ChunkKey::new(48, 48)).unwrap();
        assert!(chunk.len() > 1);
    }

    #[test]
    fn zero_chunk_size_falls_back_to_the_default() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(WorldMode::Streaming, dir.path());
        config.world.chunk_size = 0;
        let mut world = world(&config);
        assert_eq!(world.chunk_size(), WorldSettings::default().chunk_size);

        let update = world.update_chunks(Point3::new(0.0, 0.0, 0.0));
        assert_eq!(update.loaded.len(), 9);
    }

    #[test]
    fn water_never_replaces_unloaded_blocks() {
        use crate::engine_state::voxels::fluid::FluidSimulator;

        let dir = tempfile::tempdir().unwrap();
        let config = config(WorldMode::Streaming, dir.path());
        let mut world = world(&config);
        world.update_chunks(Point3::new(0.0, 0.0, 0.0));

        // generated terrain in a chunk that was never loaded
        let far_key = ChunkKey::new(100, 100);
        let generated = world.generator().generate(far_key).chunk;
        let (&terrain, _) = generated
            .blocks()
            .find(|(_, value)| !value.is_water())
            .unwrap();
        let expected = generated.get(terrain).cloned();

        // a player edit in a chunk that was evicted
        let edit = BlockPos::new(1, 60, 1);
        world.set_block(edit, Some(BlockType::Ruby.into()));
        world.update_chunks(Point3::new(40.0, 0.0, 40.0));
        assert!(!world.is_materialized(ChunkKey::new(0, 0)));

        let mut fluid = FluidSimulator::new(&config.fluid);
        fluid.schedule(terrain, 0, 0.0);
        fluid.schedule(edit, 0, 0.0);
        fluid.drain(&mut world);

        assert_eq!(world.get_block(terrain).cloned(), expected);
        assert_eq!(world.block_type_at(edit), Some(BlockType::Ruby));
    }

    #[test]
    fn evicted_chunks_are_released_on_flush() {
        struct Releases(Vec<ChunkKey>);
        impl RenderSink for Releases {
            fn upload_mesh(&mut self, _: ChunkKey, _: MeshLayer, _: &MeshBuffer) {}
            fn clear_mesh(&mut self, _: ChunkKey, _: MeshLayer) {}
            fn upload_collision(&mut self, _: ChunkKey, _: &CollisionMesh) {}
            fn clear_collision(&mut self, _: ChunkKey) {}
            fn release_chunk(&mut self, chunk: ChunkKey) {
                self.0.push(chunk);
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let mut world = world(&config(WorldMode::Streaming, dir.path()));
        world.update_chunks(Point3::new(0.0, 0.0, 0.0));
        assert!(world.flush_meshes(&mut NullSink) > 0);
        assert_eq!(world.flush_meshes(&mut NullSink), 0);

        let update = world.update_chunks(Point3::new(4.0, 0.0, 0.0));
        let mut sink = Releases(Vec::new());
        world.flush_meshes(&mut sink);
        assert_eq!(sink.0, update.evicted);
    }

    #[test]
    fn bounded_saves_restore_into_fresh_worlds() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(WorldMode::Bounded, dir.path());
        let mut first = world(&config);
        first.generate_bounded();
        let pos = BlockPos::new(1, 70, 1);
        first.set_block(pos, Some(BlockType::Ruby.into()));
        first.save().unwrap();

        let session = StResource::new(WorldSession::new());
        let second = World::open(&config, ChunkMesher::new(TextureAtlas::layout(8)), session, false);
        assert_eq!(second.materialized_keys(), first.materialized_keys());
        assert_eq!(second.to_document(), first.to_document());
    }

    #[test]
    fn saved_settings_override_the_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let mut saved = world(&config(WorldMode::Bounded, dir.path()));
        saved.generate_bounded();
        saved.save().unwrap();

        let mut other = config(WorldMode::Streaming, dir.path());
        other.world.chunk_size = 8;
        let mut streaming = world(&other);
        assert!(streaming.load(saved.save_path()));
        assert_eq!(streaming.chunk_size(), 4);
        assert_eq!(streaming.cached_keys().len(), 4);
        assert!(streaming.materialized_keys().is_empty());
    }

    #[test]
    fn corrupt_saves_fall_back_to_generation() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(WorldMode::Bounded, dir.path());
        std::fs::write(config.save_path(), "not json").unwrap();
        let world = World::open(
            &config,
            ChunkMesher::new(TextureAtlas::layout(8)),
            StResource::new(WorldSession::new()),
            false,
        );
        assert_eq!(world.materialized_keys().len(), 4);
    }
}
