//! One framebuffer per swapchain image.

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::RhiResult;
use crate::render_pass::RenderPass;

/// Framebuffers in swapchain image order.
///
/// Built all at once from the swapchain views and exposed read-only, so the
/// i-th framebuffer always wraps the i-th swapchain image.
pub struct Framebuffers {
    device: Arc<Device>,
    framebuffers: Vec<vk::Framebuffer>,
    extent: vk::Extent2D,
}

impl Framebuffers {
    /// Creates a framebuffer for each of `color_views`, each sharing
    /// `depth_view` when the render pass has a depth attachment.
    pub fn new(
        device: Arc<Device>,
        render_pass: &RenderPass,
        color_views: &[vk::ImageView],
        depth_view: Option<vk::ImageView>,
        extent: vk::Extent2D,
    ) -> RhiResult<Self> {
        // Pushed one at a time so `Drop` releases a partial set on failure.
        let mut this = Self {
            device,
            framebuffers: Vec::with_capacity(color_views.len()),
            extent,
        };

        for &color_view in color_views {
            let attachments: Vec<vk::ImageView> =
                std::iter::once(color_view).chain(depth_view).collect();

            let create_info = vk::FramebufferCreateInfo::default()
                .render_pass(render_pass.handle())
                .attachments(&attachments)
                .width(extent.width)
                .height(extent.height)
                .layers(1);

            let framebuffer = unsafe { this.device.handle().create_framebuffer(&create_info, None)? };
            this.framebuffers.push(framebuffer);
        }

        debug!(
            "Created {} framebuffers ({}x{})",
            this.framebuffers.len(),
            extent.width,
            extent.height
        );

        Ok(this)
    }

    /// Framebuffer wrapping swapchain image `image_index`.
    pub fn get(&self, image_index: u32) -> Option<vk::Framebuffer> {
        self.framebuffers.get(image_index as usize).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.framebuffers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.framebuffers.is_empty()
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for Framebuffers {
    fn drop(&mut self) {
        for &framebuffer in &self.framebuffers {
            unsafe {
                self.device.handle().destroy_framebuffer(framebuffer, None);
            }
        }
        debug!("Destroyed {} framebuffers", self.framebuffers.len());
    }
}
