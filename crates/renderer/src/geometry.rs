//! Vertex batches uploaded once and drawn every frame.

use tracing::{debug, info};

use trivis_rhi::RhiResult;
use trivis_rhi::buffer::{BufferUsage, DeviceBuffer};
use trivis_rhi::pipeline::{CullMode, PrimitiveTopology};
use trivis_rhi::upload::UploadContext;
use trivis_rhi::vertex::VertexLayout;

/// The geometry kinds the renderer has pipelines for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    /// Filled, two-sided triangles.
    Triangles,
    /// Line segments.
    Wireframe,
}

impl GeometryKind {
    /// Every kind, in draw order.
    pub const ALL: [GeometryKind; 2] = [GeometryKind::Triangles, GeometryKind::Wireframe];

    pub fn topology(self) -> PrimitiveTopology {
        match self {
            GeometryKind::Triangles => PrimitiveTopology::TriangleList,
            GeometryKind::Wireframe => PrimitiveTopology::LineList,
        }
    }

    /// Triangles are shown from both sides, lines are never culled.
    pub fn cull_mode(self) -> CullMode {
        CullMode::None
    }

    pub fn name(self) -> &'static str {
        match self {
            GeometryKind::Triangles => "triangles",
            GeometryKind::Wireframe => "wireframe",
        }
    }
}

/// A device-local vertex buffer together with its vertex count.
///
/// An empty batch holds no buffer and is never drawn.
pub struct GeometryBatch {
    kind: GeometryKind,
    buffer: Option<DeviceBuffer>,
    vertex_count: u32,
}

impl GeometryBatch {
    /// A batch with nothing to draw.
    pub fn empty(kind: GeometryKind) -> Self {
        Self {
            kind,
            buffer: None,
            vertex_count: 0,
        }
    }

    /// Copies `vertices` into device-local memory through `upload`.
    ///
    /// Blocks until the transfer finished, so the batch can be drawn by the
    /// very next frame.
    pub fn upload<V: VertexLayout>(
        upload: &UploadContext,
        kind: GeometryKind,
        vertices: &[V],
    ) -> RhiResult<Self> {
        if vertices.is_empty() {
            debug!("No {} vertices to upload", kind.name());
            return Ok(Self::empty(kind));
        }

        let buffer = upload.upload_buffer(BufferUsage::Vertex, vertices)?;
        let vertex_count = vertices.len() as u32;

        info!("Uploaded {} {} vertices", vertex_count, kind.name());

        Ok(Self {
            kind,
            buffer: Some(buffer),
            vertex_count,
        })
    }

    #[inline]
    pub fn kind(&self) -> GeometryKind {
        self.kind
    }

    #[inline]
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    #[inline]
    pub fn buffer(&self) -> Option<&DeviceBuffer> {
        self.buffer.as_ref()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertex_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_topology() {
        assert_eq!(
            GeometryKind::Triangles.topology(),
            PrimitiveTopology::TriangleList
        );
        assert_eq!(GeometryKind::Wireframe.topology(), PrimitiveTopology::LineList);
    }

    #[test]
    fn test_no_culling() {
        for kind in GeometryKind::ALL {
            assert_eq!(kind.cull_mode(), CullMode::None);
        }
    }

    #[test]
    fn test_empty_batch() {
        let batch = GeometryBatch::empty(GeometryKind::Triangles);
        assert!(batch.is_empty());
        assert!(batch.buffer().is_none());
        assert_eq!(batch.vertex_count(), 0);
    }
}
