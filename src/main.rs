//! # Voxel World Entry Point
//!
//! Runs the headless demo session from the library's `run()` function.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release
//! ```

fn main() -> anyhow::Result<()> {
    voxel_world::run()
}
