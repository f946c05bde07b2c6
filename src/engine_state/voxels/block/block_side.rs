//! # Block Side Module
//!
//! This module defines the six axis-aligned faces of a voxel block, their outward
//! normals and the corner layout used when emitting a face quad.

use cgmath::Vector3;

/// Represents the six possible faces of a voxel block.
///
/// Each variant is assigned a unique integer value matching the order returned by
/// [`BlockSide::all`].
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum BlockSide {
    /// The front face (facing positive Z)
    FRONT = 0,

    /// The back face (facing negative Z)
    BACK = 1,

    /// The bottom face (facing negative Y)
    BOTTOM = 2,

    /// The top face (facing positive Y)
    TOP = 3,

    /// The left face (facing negative X)
    LEFT = 4,

    /// The right face (facing positive X)
    RIGHT = 5,
}

impl BlockSide {
    /// Returns an array containing all six block faces in a consistent order.
    ///
    /// The order is: [FRONT, BACK, BOTTOM, TOP, LEFT, RIGHT]
    pub fn all() -> [BlockSide; 6] {
        [
            BlockSide::FRONT,
            BlockSide::BACK,
            BlockSide::BOTTOM,
            BlockSide::TOP,
            BlockSide::LEFT,
            BlockSide::RIGHT,
        ]
    }

    /// Offset from a block to the neighbour sharing this face.
    pub fn offset(self) -> Vector3<i32> {
        match self {
            BlockSide::FRONT => Vector3::new(0, 0, 1),
            BlockSide::BACK => Vector3::new(0, 0, -1),
            BlockSide::BOTTOM => Vector3::new(0, -1, 0),
            BlockSide::TOP => Vector3::new(0, 1, 0),
            BlockSide::LEFT => Vector3::new(-1, 0, 0),
            BlockSide::RIGHT => Vector3::new(1, 0, 0),
        }
    }

    /// Outward unit normal of this face.
    pub fn normal(self) -> [f32; 3] {
        let offset = self.offset();
        [offset.x as f32, offset.y as f32, offset.z as f32]
    }

    /// Corners of the unit quad for this face, relative to the block's minimum corner.
    ///
    /// Corners are ordered so that the unit-quad UVs `(0,0) (1,0) (1,1) (0,1)` map onto
    /// them in sequence and the triangles `(0,1,2) (2,3,0)` cover the face.
    pub fn corners(self) -> [[i32; 3]; 4] {
        match self {
            BlockSide::TOP => [[0, 1, 0], [1, 1, 0], [1, 1, 1], [0, 1, 1]],
            BlockSide::BOTTOM => [[0, 0, 1], [1, 0, 1], [1, 0, 0], [0, 0, 0]],
            BlockSide::BACK => [[0, 0, 0], [1, 0, 0], [1, 1, 0], [0, 1, 0]],
            BlockSide::FRONT => [[1, 0, 1], [0, 0, 1], [0, 1, 1], [1, 1, 1]],
            BlockSide::RIGHT => [[1, 0, 0], [1, 0, 1], [1, 1, 1], [1, 1, 0]],
            BlockSide::LEFT => [[0, 0, 1], [0, 0, 0], [0, 1, 0], [0, 1, 1]],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_lie_on_the_face_plane() {
        for side in BlockSide::all() {
            let offset = side.offset();
            let axis = [offset.x, offset.y, offset.z];
            let (index, sign) = axis
                .iter()
                .enumerate()
                .find(|(_, v)| **v != 0)
                .map(|(i, v)| (i, *v))
                .expect("every side has one non-zero axis");
            let plane = if sign > 0 { 1 } else { 0 };
            for corner in side.corners() {
                assert_eq!(corner[index], plane, "{side:?}");
            }
        }
    }

    #[test]
    fn offsets_are_unique_unit_vectors() {
        let mut seen = std::collections::HashSet::new();
        for side in BlockSide::all() {
            let o = side.offset();
            assert_eq!(o.x.abs() + o.y.abs() + o.z.abs(), 1);
            assert!(seen.insert((o.x, o.y, o.z)));
        }
    }
}
