//! # Voxel World
//!
//! Everything that represents and changes the block world:
//!
//! * [`block`]: block types, faces and the stored block value
//! * [`chunk`]: per-chunk sparse block storage
//! * [`world`]: coordinate routing across chunks and dirty-chunk remeshing
//! * [`generation`]: seed-deterministic terrain synthesis
//! * [`fluid`]: delayed water spread and immediate soaking
//! * [`streaming`]: which chunks are materialized, and saving or loading them
//! * [`persistence`]: the save document format
//! * [`session`]: the registry of special entities
//!
//! Cross-chunk reads always go through [`world::BlockAccess`]; no chunk reads another
//! chunk's block map directly.

pub mod block;
pub mod chunk;
pub mod fluid;
pub mod generation;
pub mod persistence;
pub mod session;
pub mod streaming;
pub mod world;
