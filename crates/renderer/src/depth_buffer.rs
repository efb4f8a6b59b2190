//! Depth buffer management.
//!
//! The depth image matches the swapchain extent and is rebuilt with it.
//! Memory is GPU-only and managed by gpu-allocator.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use trivis_rhi::device::Device;
//! use trivis_rhi::instance::Instance;
//! use trivis_renderer::depth_buffer::{DepthBuffer, find_depth_format};
//! use ash::vk;
//!
//! # fn example(instance: &Instance, device: Arc<Device>) -> Result<(), trivis_rhi::RhiError> {
//! let format = find_depth_format(instance, device.physical_device())?;
//! let depth_buffer = DepthBuffer::new(device, vk::Extent2D { width: 1920, height: 1080 }, format)?;
//! let image_view = depth_buffer.image_view();
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use gpu_allocator::MemoryLocation;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use tracing::{debug, info};

use trivis_rhi::device::Device;
use trivis_rhi::instance::Instance;
use trivis_rhi::{RhiError, RhiResult};

/// Depth formats in order of preference.
pub const DEPTH_FORMAT_CANDIDATES: [vk::Format; 3] = [
    vk::Format::D32_SFLOAT,
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D24_UNORM_S8_UINT,
];

/// First of `candidates` for which `supports` holds.
pub fn pick_depth_format<F>(candidates: &[vk::Format], supports: F) -> Option<vk::Format>
where
    F: Fn(vk::Format) -> bool,
{
    candidates.iter().copied().find(|&format| supports(format))
}

/// Picks a depth format usable as an optimal-tiling depth attachment.
pub fn find_depth_format(
    instance: &Instance,
    physical_device: vk::PhysicalDevice,
) -> RhiResult<vk::Format> {
    pick_depth_format(&DEPTH_FORMAT_CANDIDATES, |format| {
        let properties = unsafe {
            instance
                .handle()
                .get_physical_device_format_properties(physical_device, format)
        };
        properties
            .optimal_tiling_features
            .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
    })
    .ok_or_else(|| RhiError::InvalidHandle("No supported depth format".to_string()))
}

/// Aspect flags for viewing a depth format.
fn depth_aspect(format: vk::Format) -> vk::ImageAspectFlags {
    match format {
        vk::Format::D32_SFLOAT_S8_UINT | vk::Format::D24_UNORM_S8_UINT => {
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        }
        _ => vk::ImageAspectFlags::DEPTH,
    }
}

/// Depth attachment sized to the swapchain.
///
/// Destroyed in the order view, image, allocation.
pub struct DepthBuffer {
    device: Arc<Device>,
    image: vk::Image,
    image_view: vk::ImageView,
    allocation: Option<Allocation>,
    format: vk::Format,
    extent: vk::Extent2D,
}

impl DepthBuffer {
    /// Creates a depth image of `extent` in `format` with a view over its
    /// depth aspect.
    ///
    /// # Errors
    ///
    /// Fails on a zero extent or when image creation, allocation, binding or
    /// view creation fails. Partially created resources are released.
    pub fn new(device: Arc<Device>, extent: vk::Extent2D, format: vk::Format) -> RhiResult<Self> {
        if extent.width == 0 || extent.height == 0 {
            return Err(RhiError::InvalidHandle(format!(
                "Depth buffer extent must be non-zero, got {}x{}",
                extent.width, extent.height
            )));
        }

        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image = unsafe { device.handle().create_image(&image_info, None)? };

        // From here on `Drop` cleans up whatever was created so far.
        let mut this = Self {
            device,
            image,
            image_view: vk::ImageView::null(),
            allocation: None,
            format,
            extent,
        };

        let requirements = unsafe { this.device.handle().get_image_memory_requirements(image) };

        let allocation = this.device.allocator()?.allocate(&AllocationCreateDesc {
            name: "depth_buffer",
            requirements,
            location: MemoryLocation::GpuOnly,
            linear: false,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        })?;

        let bound = unsafe {
            this.device
                .handle()
                .bind_image_memory(image, allocation.memory(), allocation.offset())
        };
        this.allocation = Some(allocation);
        bound?;

        let view_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(depth_aspect(format))
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            );

        this.image_view = unsafe { this.device.handle().create_image_view(&view_info, None)? };

        info!(
            "Created depth buffer: {}x{} ({:?})",
            extent.width, extent.height, format
        );

        Ok(this)
    }

    #[inline]
    pub fn image(&self) -> vk::Image {
        self.image
    }

    #[inline]
    pub fn image_view(&self) -> vk::ImageView {
        self.image_view
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.format
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for DepthBuffer {
    fn drop(&mut self) {
        unsafe {
            if self.image_view != vk::ImageView::null() {
                self.device
                    .handle()
                    .destroy_image_view(self.image_view, None);
            }
            self.device.handle().destroy_image(self.image, None);
        }

        if let Some(allocation) = self.allocation.take() {
            match self.device.allocator() {
                Ok(mut allocator) => {
                    if let Err(e) = allocator.free(allocation) {
                        tracing::error!("Failed to free depth buffer allocation: {:?}", e);
                    }
                }
                Err(e) => tracing::error!("Leaking depth buffer allocation: {}", e),
            }
        }

        debug!(
            "Destroyed depth buffer: {}x{}",
            self.extent.width, self.extent.height
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_prefers_first_supported() {
        let picked = pick_depth_format(&DEPTH_FORMAT_CANDIDATES, |_| true);
        assert_eq!(picked, Some(vk::Format::D32_SFLOAT));
    }

    #[test]
    fn test_pick_skips_unsupported() {
        let picked = pick_depth_format(&DEPTH_FORMAT_CANDIDATES, |format| {
            format == vk::Format::D24_UNORM_S8_UINT
        });
        assert_eq!(picked, Some(vk::Format::D24_UNORM_S8_UINT));
    }

    #[test]
    fn test_pick_none_supported() {
        assert_eq!(pick_depth_format(&DEPTH_FORMAT_CANDIDATES, |_| false), None);
    }

    #[test]
    fn test_stencil_formats_view_both_aspects() {
        assert_eq!(
            depth_aspect(vk::Format::D32_SFLOAT),
            vk::ImageAspectFlags::DEPTH
        );
        assert!(
            depth_aspect(vk::Format::D24_UNORM_S8_UINT).contains(vk::ImageAspectFlags::STENCIL)
        );
    }
}
