//! # Block Module
//!
//! This module provides the core block-related functionality for the voxel world.
//! It includes block type definitions, block face handling, and the tagged block value
//! stored in chunks and persisted in save documents.
//!
//! A block value is either a bare type (`"stone"`) or a type carrying metadata
//! (`{"type": "door", "rotation": 90, "open": false}`). Metadata is only used by the
//! special entity kinds; every call site matches on [`BlockValue`] instead of probing
//! the JSON shape.

use std::collections::BTreeMap;

use block_type::BlockType;
use cgmath::Point3;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

pub mod block_side;
pub mod block_type;

/// The underlying integer type used to index block types.
pub type BlockTypeSize = u8;

/// Absolute integer coordinate of a block in the world.
pub type BlockPos = Point3<i32>;

/// Metadata fields attached to a block, excluding its `type`.
pub type BlockMetadata = BTreeMap<String, Value>;

/// Errors raised while decoding a persisted block value.
#[derive(Debug, Error, PartialEq)]
pub enum BlockValueError {
    /// The type name is not part of the block catalogue.
    #[error("unknown block type `{0}`")]
    UnknownType(String),
    /// A metadata object has no string `type` field.
    #[error("block object has no `type` field")]
    MissingType,
    /// The value is neither a string nor an object.
    #[error("block value must be a string or an object, got {0}")]
    InvalidShape(String),
}

/// A block stored at a coordinate: a bare type or a type with metadata.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockValue {
    /// A block identified only by its type.
    Plain(BlockType),
    /// A block carrying metadata (orientation, open state, sub-variant).
    WithMetadata(BlockType, BlockMetadata),
}

impl BlockValue {
    /// The type tag of this block.
    pub fn block_type(&self) -> BlockType {
        match self {
            BlockValue::Plain(block_type) | BlockValue::WithMetadata(block_type, _) => *block_type,
        }
    }

    /// Metadata fields, if any.
    pub fn metadata(&self) -> Option<&BlockMetadata> {
        match self {
            BlockValue::Plain(_) => None,
            BlockValue::WithMetadata(_, metadata) => Some(metadata),
        }
    }

    /// Reads a numeric metadata field.
    pub fn metadata_f32(&self, field: &str) -> Option<f32> {
        self.metadata()?.get(field)?.as_f64().map(|v| v as f32)
    }

    /// Reads a boolean metadata field.
    pub fn metadata_bool(&self, field: &str) -> Option<bool> {
        self.metadata()?.get(field)?.as_bool()
    }

    /// Whether this is water.
    pub fn is_water(&self) -> bool {
        self.block_type().is_water()
    }

    /// Decodes a persisted JSON value.
    pub fn from_json(value: &Value) -> Result<Self, BlockValueError> {
        match value {
            Value::String(name) => BlockType::from_name(name)
                .map(BlockValue::Plain)
                .ok_or_else(|| BlockValueError::UnknownType(name.clone())),
            Value::Object(fields) => {
                let name = fields
                    .get("type")
                    .and_then(Value::as_str)
                    .ok_or(BlockValueError::MissingType)?;
                let block_type = BlockType::from_name(name)
                    .ok_or_else(|| BlockValueError::UnknownType(name.to_string()))?;
                let metadata: BlockMetadata = fields
                    .iter()
                    .filter(|(key, _)| key.as_str() != "type")
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect();
                Ok(BlockValue::WithMetadata(block_type, metadata))
            }
            other => Err(BlockValueError::InvalidShape(other.to_string())),
        }
    }

    /// Encodes this block as its persisted JSON value.
    pub fn to_json(&self) -> Value {
        match self {
            BlockValue::Plain(block_type) => Value::String(block_type.name().to_string()),
            BlockValue::WithMetadata(block_type, metadata) => {
                let mut fields = serde_json::Map::new();
                fields.insert(
                    "type".to_string(),
                    Value::String(block_type.name().to_string()),
                );
                for (key, value) in metadata {
                    fields.insert(key.clone(), value.clone());
                }
                Value::Object(fields)
            }
        }
    }
}

impl From<BlockType> for BlockValue {
    fn from(block_type: BlockType) -> Self {
        BlockValue::Plain(block_type)
    }
}

impl Serialize for BlockValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BlockValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        BlockValue::from_json(&value).map_err(serde::de::Error::custom)
    }
}
