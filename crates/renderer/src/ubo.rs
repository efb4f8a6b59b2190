//! Uniform buffer layout shared by the triangle and wireframe shaders.
//!
//! The structure uses `#[repr(C)]` and std140-compatible member sizes so it
//! can be byte-cast straight into the mapped uniform buffer.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};

/// Scene uniform block (`binding = 0`).
///
/// # Memory Layout
///
/// - Offset 0: view-projection matrix (64 bytes)
/// - Offset 64: two RGBA colors (32 bytes)
/// - Total size: 96 bytes
///
/// Vertices pick their color with `colors[color_index]`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SceneUniforms {
    /// Combined view-projection matrix.
    pub view_projection: Mat4,
    /// Palette indexed by the vertex color index.
    pub colors: [Vec4; 2],
}

impl SceneUniforms {
    /// Size of the struct in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    pub fn new(view_projection: Mat4, colors: [[f32; 4]; 2]) -> Self {
        Self {
            view_projection,
            colors: colors.map(Vec4::from_array),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_uniforms_size() {
        assert_eq!(SceneUniforms::SIZE, 96);
        assert_eq!(SceneUniforms::SIZE % 16, 0);
    }

    #[test]
    fn test_colors_follow_matrix() {
        let uniforms = SceneUniforms::new(
            Mat4::IDENTITY,
            [[1.0, 0.0, 0.0, 1.0], [0.0, 1.0, 0.0, 1.0]],
        );
        let floats: &[f32] = bytemuck::cast_slice(bytemuck::bytes_of(&uniforms));
        assert_eq!(floats.len(), 24);
        assert_eq!(&floats[16..20], &[1.0, 0.0, 0.0, 1.0]);
        assert_eq!(&floats[20..24], &[0.0, 1.0, 0.0, 1.0]);
    }
}
