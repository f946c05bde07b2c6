use std::path::Path;

use cgmath::Point3;
use voxel_world::core::StResource;
use voxel_world::engine_state::config::{
    EngineConfig, FluidConfig, StreamingConfig, WorldGenConfig, WorldMode, WorldSettings,
};
use voxel_world::engine_state::rendering::{
    meshing::ChunkMesher, sink::NullSink, texture_atlas::TextureAtlas,
};
use voxel_world::engine_state::voxels::{
    block::{block_type::BlockType, BlockPos, BlockValue},
    chunk::ChunkKey,
    fluid::FluidSimulator,
    generation::WorldGenerator,
    session::WorldSession,
    streaming::World,
    world::{BlockAccess, VoxelWorld},
};

fn mesher() -> ChunkMesher {
    ChunkMesher::new(TextureAtlas::layout(8))
}

fn config(mode: WorldMode, chunk_size: i32, dir: &Path) -> EngineConfig {
    EngineConfig {
        world: WorldSettings {
            chunk_size,
            world_radius_chunks: 1,
        },
        streaming: StreamingConfig {
            mode,
            load_radius: 2,
            ..StreamingConfig::default()
        },
        save_dir: dir.to_path_buf(),
        ..EngineConfig::default()
    }
}

fn open(config: &EngineConfig) -> World {
    World::open(config, mesher(), StResource::new(WorldSession::new()), false)
}

fn faces_of(world: &VoxelWorld, pos: BlockPos) -> (usize, usize) {
    let chunk = world.chunk(world.key_of(pos)).unwrap();
    let (opaque, water) = mesher().visible_faces(chunk, world);
    (
        opaque.iter().filter(|face| face.position == pos).count(),
        water.iter().filter(|face| face.position == pos).count(),
    )
}

#[test]
fn generation_is_reproducible() {
    let a = WorldGenerator::new(WorldGenConfig::default(), 16);
    let b = WorldGenerator::new(WorldGenConfig::default(), 16);
    for key in [ChunkKey::new(0, 0), ChunkKey::new(-16, 32)] {
        let mut left: Vec<_> = a.generate(key).chunk.blocks().map(|(p, v)| (*p, v.clone())).collect();
        let mut right: Vec<_> = b.generate(key).chunk.blocks().map(|(p, v)| (*p, v.clone())).collect();
        left.sort_by_key(|(p, _)| (p.x, p.y, p.z));
        right.sort_by_key(|(p, _)| (p.x, p.y, p.z));
        assert_eq!(left, right);
    }
}

#[test]
fn adjacent_solids_share_no_faces() {
    let mut world = VoxelWorld::new(8);
    let a = Point3::new(2, 0, 2);
    let b = Point3::new(3, 0, 2);
    world.set_block(a, Some(BlockType::Stone.into()));
    assert_eq!(faces_of(&world, a), (6, 0));
    world.set_block(b, Some(BlockType::Dirt.into()));
    assert_eq!(faces_of(&world, a), (5, 0));
    assert_eq!(faces_of(&world, b), (5, 0));
}

#[test]
fn culling_crosses_chunk_borders() {
    let mut world = VoxelWorld::new(4);
    let a = Point3::new(3, 0, 0);
    let b = Point3::new(4, 0, 0);
    world.set_block(a, Some(BlockType::Stone.into()));
    world.set_block(b, Some(BlockType::Stone.into()));
    assert_eq!(faces_of(&world, a), (5, 0));
    assert_eq!(faces_of(&world, b), (5, 0));
}

#[test]
fn solids_next_to_water_keep_their_face() {
    let mut world = VoxelWorld::new(8);
    let stone = Point3::new(1, 1, 1);
    world.set_block(stone, Some(BlockType::Stone.into()));
    world.set_block(Point3::new(1, 2, 1), Some(BlockType::Water.into()));
    assert_eq!(faces_of(&world, stone), (6, 0));
    assert_eq!(faces_of(&world, Point3::new(1, 2, 1)), (0, 6));
}

#[test]
fn water_renders_only_its_boundary() {
    let mut world = VoxelWorld::new(8);
    for x in 0..3 {
        for y in 0..3 {
            for z in 0..3 {
                world.set_block(Point3::new(x, y, z), Some(BlockType::Water.into()));
            }
        }
    }
    assert_eq!(faces_of(&world, Point3::new(1, 1, 1)), (0, 0));

    let lone = Point3::new(6, 6, 6);
    world.set_block(lone, Some(BlockType::Water.into()));
    assert_eq!(faces_of(&world, lone), (0, 6));
}

#[test]
fn saves_round_trip_into_a_fresh_bounded_world() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(WorldMode::Bounded, 4, dir.path());
    let mut world = open(&config);

    let door = BlockValue::from_json(&serde_json::json!({"type": "door", "rotation": 90.0, "open": true}))
        .unwrap();
    let edits = [
        (Point3::new(-3, 50, -3), Some(BlockType::Ruby.into())),
        (Point3::new(1, 50, -2), Some(door)),
        (Point3::new(2, 51, 3), Some(BlockType::BlueWool.into())),
        (Point3::new(-1, 50, 2), Some(BlockType::Seashells.into())),
    ];
    for (pos, value) in &edits {
        world.set_block(*pos, value.clone());
    }
    let untouched = world.to_document();
    world.save().unwrap();

    let restored = open(&config);
    for (pos, value) in &edits {
        assert_eq!(restored.get_block(*pos), value.as_ref(), "{pos:?}");
    }
    assert_eq!(restored.to_document(), untouched);
    assert_eq!(restored.session().get().count_of(BlockType::Door), 1);
}

#[test]
fn fluid_events_are_deduplicated_and_soak_is_idempotent() {
    let mut fluid = FluidSimulator::new(&FluidConfig::default());
    let pos = Point3::new(0, 4, 0);
    fluid.schedule(pos, 2, 0.2);
    fluid.schedule(pos, 2, 0.2);
    assert_eq!(fluid.pending_len(), 1);

    let mut world = VoxelWorld::new(8);
    world.set_block(Point3::new(0, 3, 0), Some(BlockType::Stone.into()));
    fluid.drain(&mut world);
    assert!(fluid.soak(pos, 5, &mut world) > 0);
    assert_eq!(fluid.soak(pos, 5, &mut world), 0);
}

#[test]
fn streaming_holds_exactly_the_ring() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(WorldMode::Streaming, 8, dir.path());
    let mut world = open(&config);
    assert!(world.materialized_keys().is_empty());

    for reference in [
        Point3::new(0.0, 10.0, 0.0),
        Point3::new(-0.5, 10.0, 17.9),
        Point3::new(-40.2, 10.0, -8.0),
        Point3::new(3.0, 10.0, 3.0),
    ] {
        world.update_chunks(reference);
        let center = ChunkKey::containing_xz(reference.x.floor() as i32, reference.z.floor() as i32, 8);
        let mut expected = Vec::new();
        for dx in -2..=2 {
            for dz in -2..=2 {
                expected.push(center.offset(dx, dz, 8));
            }
        }
        expected.sort();
        assert_eq!(world.materialized_keys(), expected);
    }
}

#[test]
fn seed_42_surface_matches_the_biome() {
    let generator = WorldGenerator::new(WorldGenConfig::default(), 16);
    assert_eq!(generator.config().seed, 42);
    let chunk = generator.generate(ChunkKey::new(0, 0)).chunk;

    let top = (-64..128)
        .rev()
        .filter_map(|y| chunk.get(Point3::new(8, y, 8)))
        .map(BlockValue::block_type)
        .find(|t| !t.is_water());
    assert_eq!(top, Some(generator.biome_at(8, 8).top_block()));
}

#[test]
fn placed_water_spreads_into_empty_neighbours() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(WorldMode::Bounded, 16, dir.path());
    let mut world = open(&config);
    let y = world.generator().height_at(5, 5) + 20;
    let source = Point3::new(5, y, 5);

    // an open pocket on a stone floor
    for x in 2..=8 {
        for z in 2..=8 {
            world.set_block(Point3::new(x, y - 1, z), Some(BlockType::Stone.into()));
            world.set_block(Point3::new(x, y, z), None);
        }
    }
    let neighbours = [
        Point3::new(5, y - 1, 5),
        Point3::new(4, y, 5),
        Point3::new(6, y, 5),
        Point3::new(5, y, 4),
        Point3::new(5, y, 6),
    ];
    let originally_empty: Vec<BlockPos> = neighbours
        .into_iter()
        .filter(|pos| world.is_empty_at(*pos))
        .collect();
    assert_eq!(originally_empty.len(), 4);
    assert!(world.is_empty_at(source));

    world.set_block(source, Some(BlockType::Water.into()));
    let mut fluid = FluidSimulator::new(&config.fluid);
    fluid.spread_from(source, config.fluid.source_spread_distance);
    fluid.drain(&mut world);

    assert_eq!(world.block_type_at(source), Some(BlockType::Water));
    for pos in originally_empty {
        assert_eq!(world.block_type_at(pos), Some(BlockType::Water), "{pos:?}");
    }
    assert_eq!(world.block_type_at(Point3::new(5, y - 1, 5)), Some(BlockType::Stone));
    world.flush_meshes(&mut NullSink);
}
