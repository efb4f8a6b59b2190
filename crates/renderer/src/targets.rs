//! Swapchain-sized render targets.
//!
//! [`RenderTargets`] keeps the swapchain together with everything keyed to
//! its images and extent: the depth buffer and one framebuffer per image.
//! Recreation tears the dependents down first, replaces the swapchain, then
//! rebuilds them in dependency order.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use trivis_rhi::device::Device;
use trivis_rhi::framebuffer::Framebuffers;
use trivis_rhi::instance::Instance;
use trivis_rhi::render_pass::RenderPass;
use trivis_rhi::swapchain::{RecreateStatus, Swapchain};
use trivis_rhi::{RhiError, RhiResult};

use crate::depth_buffer::DepthBuffer;

pub struct RenderTargets {
    // Dependents first: they must be destroyed before the swapchain.
    framebuffers: Option<Framebuffers>,
    depth: Option<DepthBuffer>,
    swapchain: Swapchain,
    device: Arc<Device>,
}

impl RenderTargets {
    /// Builds the depth buffer (when `render_pass` has a depth attachment)
    /// and the framebuffers for an existing swapchain.
    pub fn new(
        device: Arc<Device>,
        swapchain: Swapchain,
        render_pass: &RenderPass,
    ) -> RhiResult<Self> {
        let mut targets = Self {
            framebuffers: None,
            depth: None,
            swapchain,
            device,
        };
        targets.build_dependents(render_pass)?;
        Ok(targets)
    }

    fn build_dependents(&mut self, render_pass: &RenderPass) -> RhiResult<()> {
        let extent = self.swapchain.extent();

        let depth = match render_pass.depth_format() {
            Some(format) => Some(DepthBuffer::new(self.device.clone(), extent, format)?),
            None => None,
        };

        let framebuffers = Framebuffers::new(
            self.device.clone(),
            render_pass,
            self.swapchain.image_views(),
            depth.as_ref().map(DepthBuffer::image_view),
            extent,
        )?;

        debug!(
            "Built {} framebuffer(s) at {}x{}",
            framebuffers.len(),
            extent.width,
            extent.height
        );

        self.depth = depth;
        self.framebuffers = Some(framebuffers);
        Ok(())
    }

    /// Replaces the swapchain and rebuilds every dependent for
    /// `requested_extent`.
    ///
    /// Waits for the device to go idle first, so no submission can still
    /// reference the old images. When the swapchain defers recreation the
    /// dependents are rebuilt for the swapchain that was kept.
    pub fn recreate(
        &mut self,
        instance: &Instance,
        surface: vk::SurfaceKHR,
        requested_extent: vk::Extent2D,
        render_pass: &RenderPass,
    ) -> RhiResult<RecreateStatus> {
        self.device.wait_idle()?;

        self.framebuffers = None;
        self.depth = None;

        let status = self
            .swapchain
            .recreate(instance, surface, requested_extent)?;
        self.build_dependents(render_pass)?;

        match status {
            RecreateStatus::Recreated => info!(
                "Render targets rebuilt for generation {}",
                self.swapchain.generation()
            ),
            RecreateStatus::Deferred => debug!(
                "Render targets kept at generation {}",
                self.swapchain.generation()
            ),
        }
        Ok(status)
    }

    #[inline]
    pub fn swapchain(&self) -> &Swapchain {
        &self.swapchain
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent()
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.swapchain.generation()
    }

    #[inline]
    pub fn has_depth(&self) -> bool {
        self.depth.is_some()
    }

    /// Framebuffer for the acquired `image_index`.
    pub fn framebuffer(&self, image_index: u32) -> RhiResult<vk::Framebuffer> {
        self.framebuffers
            .as_ref()
            .and_then(|framebuffers| framebuffers.get(image_index))
            .ok_or_else(|| {
                RhiError::InvalidHandle(format!("No framebuffer for image {}", image_index))
            })
    }
}
