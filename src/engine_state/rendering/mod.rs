//! Rendering-side data for the voxel world.
//!
//! The world produces geometry but owns no render objects. This module holds the vertex
//! format, the per-chunk mesh buffers and their construction, the block texture atlas,
//! and the [`RenderSink`](sink::RenderSink) trait through which a host receives updates.

pub mod meshing;
pub mod sink;
pub mod texture_atlas;
mod vertex;

pub use vertex::Vertex;
