//! # Core Module
//!
//! Resource management types shared across the voxel world.
//!
//! ## Key Components
//! - `StResource`: Single-threaded reference-counted resource with interior mutability
//!
//! The world is single-threaded and driven by one frame loop. Everything that needs to be
//! reachable from more than one owner (the world session, for example) goes through an
//! `StResource` handle rather than a global.

pub mod st_resource;

pub use st_resource::StResource;
