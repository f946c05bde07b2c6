use crate::engine_state::voxels::block::{block_side::BlockSide, block_type::BlockType, BlockPos};

/// A single visible quad face of a block.
///
/// The face list is the one source both the render buffers and the collision surface
/// are built from, so the two can never disagree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    /// Absolute coordinate of the block owning this face
    pub position: BlockPos,
    /// The block type, used for texture mapping
    pub block_type: BlockType,
    /// Which side of the block this face represents
    pub block_side: BlockSide,
}

impl Face {
    /// Creates a new face for the block at `position`.
    pub fn new(position: BlockPos, block_type: BlockType, block_side: BlockSide) -> Self {
        Face {
            position,
            block_type,
            block_side,
        }
    }

    /// World-space corners of the quad, in the order documented on [`BlockSide::corners`].
    pub fn corners(&self) -> [[f32; 3]; 4] {
        self.block_side.corners().map(|corner| {
            [
                (self.position.x + corner[0]) as f32,
                (self.position.y + corner[1]) as f32,
                (self.position.z + corner[2]) as f32,
            ]
        })
    }

    /// Unit-quad UVs matching [`Face::corners`].
    pub fn unit_uvs() -> [[f32; 2]; 4] {
        [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]
    }

    /// Indices of the two triangles covering this face, given the index of its first vertex.
    pub fn indices(base: u32) -> [u32; 6] {
        [base, base + 1, base + 2, base + 2, base + 3, base]
    }
}
