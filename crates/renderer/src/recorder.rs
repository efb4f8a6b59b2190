//! Per-frame command recording.
//!
//! [`record_frame`] fills one frame slot's command buffer: a single render
//! pass over the acquired image's framebuffer, dynamic viewport and scissor,
//! then one non-indexed draw per non-empty geometry batch.

use ash::vk;
use tracing::trace;

use trivis_rhi::RhiResult;
use trivis_rhi::command::CommandBuffer;

/// Depth value the depth attachment is cleared to.
pub const CLEAR_DEPTH: f32 = 1.0;

/// A single non-indexed draw of one vertex buffer with one pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawCall {
    pub pipeline: vk::Pipeline,
    pub vertex_buffer: vk::Buffer,
    pub vertex_count: u32,
}

/// Drops draws with nothing to draw, keeping the order of the rest.
pub fn plan_draws<I>(candidates: I) -> Vec<DrawCall>
where
    I: IntoIterator<Item = DrawCall>,
{
    candidates
        .into_iter()
        .filter(|draw| draw.vertex_count > 0 && draw.vertex_buffer != vk::Buffer::null())
        .collect()
}

/// Viewport covering `extent` with the origin at the bottom-left.
///
/// The negative height flips clip-space Y so a right-handed projection
/// renders upright without touching the matrix.
pub fn flipped_viewport(extent: vk::Extent2D) -> vk::Viewport {
    vk::Viewport {
        x: 0.0,
        y: extent.height as f32,
        width: extent.width as f32,
        height: -(extent.height as f32),
        min_depth: 0.0,
        max_depth: 1.0,
    }
}

/// Scissor covering the whole of `extent`.
pub fn full_scissor(extent: vk::Extent2D) -> vk::Rect2D {
    vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent,
    }
}

/// Clear values in attachment order: color, then depth when present.
pub fn clear_values(color: [f32; 4], has_depth: bool) -> Vec<vk::ClearValue> {
    let mut values = vec![vk::ClearValue {
        color: vk::ClearColorValue { float32: color },
    }];
    if has_depth {
        values.push(vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue {
                depth: CLEAR_DEPTH,
                stencil: 0,
            },
        });
    }
    values
}

/// Everything needed to record one frame.
pub struct FrameRecording<'a> {
    pub command_buffer: &'a CommandBuffer,
    pub render_pass: vk::RenderPass,
    pub framebuffer: vk::Framebuffer,
    pub extent: vk::Extent2D,
    pub clear_values: &'a [vk::ClearValue],
    pub pipeline_layout: vk::PipelineLayout,
    pub descriptor_set: vk::DescriptorSet,
    pub draws: &'a [DrawCall],
}

/// Records the frame described by `recording` into its command buffer.
///
/// The buffer is reset and begun with simultaneous-use; callers must have
/// waited on the owning slot's fence first.
pub fn record_frame(recording: &FrameRecording<'_>) -> RhiResult<()> {
    let cmd = recording.command_buffer;

    cmd.reset()?;
    cmd.begin_simultaneous()?;

    let render_pass_info = vk::RenderPassBeginInfo::default()
        .render_pass(recording.render_pass)
        .framebuffer(recording.framebuffer)
        .render_area(full_scissor(recording.extent))
        .clear_values(recording.clear_values);

    cmd.begin_render_pass(&render_pass_info);
    cmd.set_viewport(&flipped_viewport(recording.extent));
    cmd.set_scissor(&full_scissor(recording.extent));

    // Both pipelines share one layout, so the set survives pipeline switches.
    cmd.bind_descriptor_sets(
        vk::PipelineBindPoint::GRAPHICS,
        recording.pipeline_layout,
        0,
        std::slice::from_ref(&recording.descriptor_set),
    );

    let mut bound_pipeline = vk::Pipeline::null();
    for draw in recording.draws {
        if draw.pipeline != bound_pipeline {
            cmd.bind_pipeline(vk::PipelineBindPoint::GRAPHICS, draw.pipeline);
            bound_pipeline = draw.pipeline;
        }
        cmd.bind_vertex_buffers(0, &[draw.vertex_buffer], &[0]);
        cmd.draw(draw.vertex_count, 1, 0, 0);
    }

    cmd.end_render_pass();
    cmd.end()?;

    trace!(
        "Recorded {} draw call(s) at {}x{}",
        recording.draws.len(),
        recording.extent.width,
        recording.extent.height
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    fn draw(count: u32) -> DrawCall {
        DrawCall {
            pipeline: vk::Pipeline::from_raw(1),
            vertex_buffer: vk::Buffer::from_raw(2),
            vertex_count: count,
        }
    }

    #[test]
    fn test_plan_skips_empty_batches() {
        assert!(plan_draws([draw(0)]).is_empty());
        assert_eq!(plan_draws([draw(0), draw(3)]), vec![draw(3)]);
    }

    #[test]
    fn test_plan_skips_missing_buffers() {
        let mut missing = draw(3);
        missing.vertex_buffer = vk::Buffer::null();
        assert!(plan_draws([missing]).is_empty());
    }

    #[test]
    fn test_plan_keeps_order() {
        let mut lines = draw(24);
        lines.pipeline = vk::Pipeline::from_raw(7);
        let planned = plan_draws([draw(3), lines]);
        assert_eq!(planned.len(), 2);
        assert_eq!(planned[1].pipeline, vk::Pipeline::from_raw(7));
    }

    #[test]
    fn test_flipped_viewport() {
        let viewport = flipped_viewport(vk::Extent2D {
            width: 800,
            height: 600,
        });
        assert_eq!(viewport.y, 600.0);
        assert_eq!(viewport.height, -600.0);
        assert_eq!(viewport.width, 800.0);
        assert_eq!(viewport.max_depth, 1.0);
    }

    #[test]
    fn test_clear_values_count() {
        assert_eq!(clear_values([0.0; 4], false).len(), 1);
        let values = clear_values([0.1, 0.2, 0.3, 1.0], true);
        assert_eq!(values.len(), 2);
        unsafe {
            assert_eq!(values[0].color.float32, [0.1, 0.2, 0.3, 1.0]);
            assert_eq!(values[1].depth_stencil.depth, CLEAR_DEPTH);
        }
    }
}
