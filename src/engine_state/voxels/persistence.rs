//! # Persistence
//!
//! Save documents are JSON:
//!
//! ```json
//! {
//!   "world_settings": { "chunk_size": 16, "world_radius_chunks": 4 },
//!   "chunks": {
//!     "0,16": { "3,7,18": "grass", "4,8,18": { "type": "door", "rotation": 90.0, "open": false } }
//!   }
//! }
//! ```
//!
//! Chunk keys are `"x,z"` chunk origins and block keys are `"x,y,z"` absolute
//! coordinates. Parsing is lenient below the top level: a bad chunk key, block key or
//! block value is logged and skipped without aborting the load. A block filed under the
//! wrong chunk is moved to the chunk that owns it.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{BufWriter, Write};
use std::num::ParseIntError;
use std::path::Path;

use log::{debug, error, info, warn};
use serde_json::{json, Map, Value};
use thiserror::Error;

use super::block::{BlockPos, BlockValue};
use super::chunk::ChunkKey;
use crate::engine_state::config::WorldSettings;

/// A malformed coordinate key.
#[derive(Debug, Error, PartialEq)]
pub enum KeyParseError {
    #[error("key `{key}` must have {expected} comma-separated parts")]
    Arity { key: String, expected: usize },
    #[error("key `{key}` has a non-integer part: {source}")]
    Integer {
        key: String,
        #[source]
        source: ParseIntError,
    },
}

/// Errors reading or writing a save document.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("save file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("save file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("save document has no `{0}` section")]
    MissingSection(&'static str),
    #[error("save document section `{0}` is not an object")]
    BadShape(&'static str),
}

fn parse_parts<const N: usize>(key: &str) -> Result<[i32; N], KeyParseError> {
    let parts: Vec<&str> = key.split(',').collect();
    if parts.len() != N {
        return Err(KeyParseError::Arity {
            key: key.to_string(),
            expected: N,
        });
    }
    let mut values = [0; N];
    for (value, part) in values.iter_mut().zip(parts) {
        *value = part.trim().parse().map_err(|source| KeyParseError::Integer {
            key: key.to_string(),
            source,
        })?;
    }
    Ok(values)
}

/// Parses an `"x,y,z"` block key.
pub fn parse_block_key(key: &str) -> Result<BlockPos, KeyParseError> {
    let [x, y, z] = parse_parts::<3>(key)?;
    Ok(BlockPos::new(x, y, z))
}

/// Formats a block position as an `"x,y,z"` key.
pub fn format_block_key(pos: BlockPos) -> String {
    format!("{},{},{}", pos.x, pos.y, pos.z)
}

/// Parses an `"x,z"` chunk key.
pub fn parse_chunk_key(key: &str) -> Result<ChunkKey, KeyParseError> {
    let [x, z] = parse_parts::<2>(key)?;
    Ok(ChunkKey::new(x, z))
}

/// The blocks of one persisted chunk.
pub type ChunkRecord = HashMap<BlockPos, BlockValue>;

/// An in-memory save document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveDocument {
    pub world_settings: WorldSettings,
    pub chunks: BTreeMap<ChunkKey, ChunkRecord>,
}

impl SaveDocument {
    pub fn new(world_settings: WorldSettings) -> Self {
        SaveDocument {
            world_settings,
            chunks: BTreeMap::new(),
        }
    }

    /// Total number of blocks across all chunks.
    pub fn block_count(&self) -> usize {
        self.chunks.values().map(HashMap::len).sum()
    }

    /// Encodes the document.
    pub fn to_json(&self) -> Value {
        let mut chunks = Map::new();
        for (key, record) in &self.chunks {
            let blocks: Map<String, Value> = record
                .iter()
                .map(|(pos, value)| (format_block_key(*pos), value.to_json()))
                .collect();
            chunks.insert(key.to_string(), Value::Object(blocks));
        }
        json!({
            "world_settings": {
                "chunk_size": self.world_settings.chunk_size,
                "world_radius_chunks": self.world_settings.world_radius_chunks,
            },
            "chunks": chunks,
        })
    }

    /// Decodes a document, skipping malformed entries below the top level.
    pub fn from_json(document: &Value) -> Result<Self, PersistenceError> {
        let settings = document
            .get("world_settings")
            .ok_or(PersistenceError::MissingSection("world_settings"))?;
        let world_settings: WorldSettings = serde_json::from_value(settings.clone())?;
        if world_settings.chunk_size < 1 {
            return Err(PersistenceError::BadShape("world_settings"));
        }
        let chunks = document
            .get("chunks")
            .ok_or(PersistenceError::MissingSection("chunks"))?
            .as_object()
            .ok_or(PersistenceError::BadShape("chunks"))?;

        let mut parsed = SaveDocument::new(world_settings);
        let chunk_size = world_settings.chunk_size;
        for (chunk_key, blocks) in chunks {
            let key = match parse_chunk_key(chunk_key) {
                Ok(key) => key,
                Err(err) => {
                    warn!("Skipping chunk: {}", err);
                    continue;
                }
            };
            let Some(blocks) = blocks.as_object() else {
                warn!("Skipping chunk `{}`: blocks are not an object", chunk_key);
                continue;
            };
            // an empty record still marks the chunk as saved
            parsed.chunks.entry(key).or_default();
            for (block_key, value) in blocks {
                let pos = match parse_block_key(block_key) {
                    Ok(pos) => pos,
                    Err(err) => {
                        warn!("Skipping block in chunk `{}`: {}", chunk_key, err);
                        continue;
                    }
                };
                let value = match BlockValue::from_json(value) {
                    Ok(value) => value,
                    Err(err) => {
                        warn!("Skipping block `{}`: {}", block_key, err);
                        continue;
                    }
                };
                parsed
                    .chunks
                    .entry(ChunkKey::containing(pos, chunk_size))
                    .or_default()
                    .insert(pos, value);
            }
        }
        Ok(parsed)
    }

    /// Reads and decodes a document from disk.
    pub fn read(path: &Path) -> Result<Self, PersistenceError> {
        let text = fs::read_to_string(path)?;
        let document: Value = serde_json::from_str(&text)?;
        Self::from_json(&document)
    }

    /// Loads a document, treating a missing file as "no save" and a malformed one as a
    /// logged fallback.
    pub fn load(path: &Path) -> Option<Self> {
        if !path.exists() {
            info!("No save at {}", path.display());
            return None;
        }
        match Self::read(path) {
            Ok(document) => {
                info!(
                    "Loaded {} chunk(s), {} block(s) from {}",
                    document.chunks.len(),
                    document.block_count(),
                    path.display()
                );
                Some(document)
            }
            Err(err) => {
                error!("Could not load save {}: {}", path.display(), err);
                None
            }
        }
    }

    /// Encodes the document and writes it to disk, creating parent directories.
    ///
    /// The file is written next to the target and renamed over it, so a failed write
    /// leaves the previous save intact.
    pub fn write(&self, path: &Path) -> Result<(), PersistenceError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let staging = path.with_extension("json.tmp");
        {
            let mut writer = BufWriter::new(fs::File::create(&staging)?);
            serde_json::to_writer_pretty(&mut writer, &self.to_json())?;
            writer.flush()?;
        }
        fs::rename(&staging, path)?;
        debug!(
            "Wrote {} chunk(s) to {}",
            self.chunks.len(),
            path.display()
        );
        Ok(())
    }
}
