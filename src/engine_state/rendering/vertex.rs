//! Vertex data structures for chunk mesh buffers.
//!
//! This module defines the vertex format handed to the host renderer for both the
//! opaque and the water buffer of a chunk.

/// A vertex in a chunk mesh buffer.
///
/// # Memory Layout
/// - Position: [f32; 3] (12 bytes)
/// - Normal: [f32; 3] (12 bytes)
/// - Texture Coordinates: [f32; 2] (8 bytes)
/// - Color: [f32; 4] (16 bytes)
///
/// Total size: 48 bytes, no padding, so a slice of vertices can be uploaded as-is via
/// `bytemuck::cast_slice`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Position in world space
    pub position: [f32; 3],
    /// Outward face normal
    pub normal: [f32; 3],
    /// UV coordinates, already mapped into the atlas cell for opaque blocks
    pub tex_coords: [f32; 2],
    /// Per-vertex RGBA multiplier (0.0-1.0)
    pub color: [f32; 4],
}

impl Vertex {
    /// Creates a new vertex.
    pub fn new(position: [f32; 3], normal: [f32; 3], tex_coords: [f32; 2], color: [f32; 4]) -> Self {
        Vertex {
            position,
            normal,
            tex_coords,
            color,
        }
    }

    /// Converts an 8-bit RGBA colour into the vertex colour range.
    pub fn color_from_rgba8(rgba: [u8; 4]) -> [f32; 4] {
        rgba.map(|channel| channel as f32 / 255.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 48);
        let vertices = [Vertex::new([1.0, 2.0, 3.0], [0.0, 1.0, 0.0], [0.5, 0.5], [1.0; 4])];
        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        assert_eq!(bytes.len(), 48);
    }

    #[test]
    fn rgba8_maps_to_unit_range() {
        assert_eq!(Vertex::color_from_rgba8([255, 0, 255, 0]), [1.0, 0.0, 1.0, 0.0]);
    }
}
