#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel World
//!
//! A chunked voxel world engine: sparse block storage, seed-deterministic terrain
//! generation, face-culled meshing with an atlas, delayed water spreading, and chunk
//! streaming with JSON persistence.
//!
//! The crate owns no window or GPU state. A host drives [`EngineState::update`] once per
//! frame and receives geometry through a
//! [`RenderSink`](engine_state::rendering::sink::RenderSink).
//!
//! ## Key Modules
//!
//! * `core` - Shared single-threaded resource handles
//! * `engine_state` - The frame driver, configuration, rendering data and the voxel world
//!
//! ## Usage
//!
//! ```no_run
//! fn main() -> anyhow::Result<()> {
//!     voxel_world::run()
//! }
//! ```

use std::path::Path;

use anyhow::Context;
use cgmath::Point3;
use log::info;
use web_time::Instant;

pub mod core;
pub mod engine_state;

pub use engine_state::{config::EngineConfig, EngineState};

use engine_state::{
    rendering::sink::NullSink,
    voxels::{block::block_type::BlockType, world::BlockAccess},
};

/// Configuration file read by [`run`].
pub const CONFIG_FILE: &str = "voxel_world.json";

const DEMO_FRAMES: u32 = 120;
const DEMO_FRAME_SECONDS: f64 = 1.0 / 30.0;

/// Runs a headless session: loads or generates the world, drops a water source on the
/// surface at the origin, simulates a few seconds of frames and saves.
pub fn run() -> anyhow::Result<()> {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();
    info!("Logger initialized");

    let config = EngineConfig::load_or_default(Path::new(CONFIG_FILE));
    let started = Instant::now();
    let mut engine = EngineState::new(config, Box::new(NullSink), false);
    info!("World ready in {:?}", started.elapsed());

    let surface = engine.world().generator().height_at(0, 0);
    let source = Point3::new(0, surface + 1, 0);
    if engine.world().is_empty_at(source) {
        engine.place_block(source, BlockType::Water.into());
    }

    let started = Instant::now();
    let mut fluid_events = 0;
    for frame in 1..=DEMO_FRAMES {
        let report = engine.update(f64::from(frame) * DEMO_FRAME_SECONDS);
        fluid_events += report.fluid_events;
    }
    info!(
        "Simulated {} frames in {:?}: {} fluid event(s), light factor {:.2}",
        DEMO_FRAMES,
        started.elapsed(),
        fluid_events,
        engine.clock().light_factor()
    );

    engine.save().with_context(|| {
        format!(
            "saving world to {}",
            engine.world().save_path().display()
        )
    })?;
    Ok(())
}
