//! Vertex formats and their input descriptions.
//!
//! - [`TriangleVertex`]: filled triangles with a face normal.
//! - [`WireframeVertex`]: line segments.
//!
//! Both carry a `color_index` selecting one of the colors in the scene
//! uniform block.

use std::mem::offset_of;

use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// A vertex layout usable as binding 0 of a graphics pipeline.
pub trait VertexLayout: Pod {
    fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: 0,
            stride: std::mem::size_of::<Self>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    fn attribute_descriptions() -> Vec<vk::VertexInputAttributeDescription>;
}

/// Vertex of a filled triangle.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct TriangleVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub color_index: u32,
}

impl TriangleVertex {
    #[inline]
    pub const fn new(position: Vec3, normal: Vec3, color_index: u32) -> Self {
        Self {
            position,
            normal,
            color_index,
        }
    }
}

impl VertexLayout for TriangleVertex {
    fn attribute_descriptions() -> Vec<vk::VertexInputAttributeDescription> {
        vec![
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 0,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: offset_of!(Self, position) as u32,
            },
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 1,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: offset_of!(Self, normal) as u32,
            },
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 2,
                format: vk::Format::R32_UINT,
                offset: offset_of!(Self, color_index) as u32,
            },
        ]
    }
}

/// Vertex of a wireframe line segment.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct WireframeVertex {
    pub position: Vec3,
    pub color_index: u32,
}

impl WireframeVertex {
    #[inline]
    pub const fn new(position: Vec3, color_index: u32) -> Self {
        Self {
            position,
            color_index,
        }
    }
}

impl VertexLayout for WireframeVertex {
    fn attribute_descriptions() -> Vec<vk::VertexInputAttributeDescription> {
        vec![
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 0,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: offset_of!(Self, position) as u32,
            },
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 1,
                format: vk::Format::R32_UINT,
                offset: offset_of!(Self, color_index) as u32,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle_vertex_layout() {
        // 2 x Vec3 + u32, no padding
        assert_eq!(std::mem::size_of::<TriangleVertex>(), 28);

        let binding = TriangleVertex::binding_description();
        assert_eq!(binding.binding, 0);
        assert_eq!(binding.stride, 28);
        assert_eq!(binding.input_rate, vk::VertexInputRate::VERTEX);

        let attrs = TriangleVertex::attribute_descriptions();
        let offsets: Vec<u32> = attrs.iter().map(|a| a.offset).collect();
        let locations: Vec<u32> = attrs.iter().map(|a| a.location).collect();
        assert_eq!(offsets, [0, 12, 24]);
        assert_eq!(locations, [0, 1, 2]);
        assert_eq!(attrs[2].format, vk::Format::R32_UINT);
    }

    #[test]
    fn test_wireframe_vertex_layout() {
        assert_eq!(std::mem::size_of::<WireframeVertex>(), 16);
        assert_eq!(WireframeVertex::binding_description().stride, 16);

        let attrs = WireframeVertex::attribute_descriptions();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].format, vk::Format::R32G32B32_SFLOAT);
        assert_eq!(attrs[1].offset, 12);
        assert_eq!(attrs[1].format, vk::Format::R32_UINT);
    }

    #[test]
    fn test_vertex_bytes_are_tightly_packed() {
        let vertices = [
            WireframeVertex::new(Vec3::new(1.0, 2.0, 3.0), 1),
            WireframeVertex::new(Vec3::ZERO, 0),
        ];
        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        assert_eq!(bytes.len(), 32);
        assert_eq!(&bytes[12..16], &1u32.to_ne_bytes());
    }
}
