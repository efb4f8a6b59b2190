//! Swapchain management.
//!
//! [`Swapchain`] owns the presentable images and one view per image. Format,
//! present mode, extent and image count are derived from the surface
//! capabilities by the pure `choose_*` helpers below. A swapchain is never
//! patched in place: [`Swapchain::recreate`] builds a whole new one that
//! references the old handle, then drops the old state.
//!
//! Acquire and present report out-of-date and suboptimal surfaces through
//! [`AcquireStatus`] and [`PresentStatus`] rather than errors.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ash::vk;
//! use trivis_rhi::device::Device;
//! use trivis_rhi::instance::Instance;
//! use trivis_rhi::swapchain::{AcquireStatus, Swapchain};
//!
//! # fn example(instance: &Instance, device: Arc<Device>, surface: vk::SurfaceKHR,
//! #            image_available: vk::Semaphore) -> Result<(), trivis_rhi::RhiError> {
//! let extent = vk::Extent2D { width: 800, height: 600 };
//! let mut swapchain = Swapchain::new(instance, device, surface, extent, None)?;
//!
//! match swapchain.acquire_next_image(image_available)? {
//!     AcquireStatus::Ok(index) | AcquireStatus::Suboptimal(index) => {
//!         // record and submit for `index`
//!         let _ = index;
//!     }
//!     AcquireStatus::OutOfDate => {
//!         swapchain.recreate(instance, surface, extent)?;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info, warn};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};
use crate::instance::Instance;

/// Surface capabilities, formats and present modes for a physical device.
#[derive(Debug, Clone)]
pub struct SwapchainSupportDetails {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupportDetails {
    /// Queries swapchain support for `physical_device` on `surface`.
    pub fn query(
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        surface_loader: &ash::khr::surface::Instance,
    ) -> RhiResult<Self> {
        let capabilities = unsafe {
            surface_loader.get_physical_device_surface_capabilities(physical_device, surface)?
        };

        let formats = unsafe {
            surface_loader.get_physical_device_surface_formats(physical_device, surface)?
        };

        let present_modes = unsafe {
            surface_loader.get_physical_device_surface_present_modes(physical_device, surface)?
        };

        debug!(
            "Swapchain support: {} formats, {} present modes, image count: {}-{}",
            formats.len(),
            present_modes.len(),
            capabilities.min_image_count,
            max_image_count_label(&capabilities)
        );

        Ok(Self {
            capabilities,
            formats,
            present_modes,
        })
    }

    /// At least one format and one present mode are required.
    #[inline]
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

/// Outcome of `vkAcquireNextImageKHR` that the caller must act on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcquireStatus {
    Ok(u32),
    /// The image is usable but the swapchain should be rebuilt after this frame.
    Suboptimal(u32),
    /// No image was acquired; the swapchain must be rebuilt first.
    OutOfDate,
}

impl AcquireStatus {
    /// Maps a raw acquire result. Anything but out-of-date is fatal.
    pub fn from_result(result: Result<(u32, bool), vk::Result>) -> RhiResult<Self> {
        match result {
            Ok((index, false)) => Ok(Self::Ok(index)),
            Ok((index, true)) => Ok(Self::Suboptimal(index)),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(Self::OutOfDate),
            Err(e) => Err(RhiError::VulkanError(e)),
        }
    }

    pub fn image_index(self) -> Option<u32> {
        match self {
            Self::Ok(index) | Self::Suboptimal(index) => Some(index),
            Self::OutOfDate => None,
        }
    }
}

/// Outcome of `vkQueuePresentKHR`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresentStatus {
    Ok,
    Suboptimal,
    OutOfDate,
}

impl PresentStatus {
    /// Maps a raw present result. Anything but out-of-date is fatal.
    pub fn from_result(result: Result<bool, vk::Result>) -> RhiResult<Self> {
        match result {
            Ok(false) => Ok(Self::Ok),
            Ok(true) => Ok(Self::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(Self::OutOfDate),
            Err(e) => Err(RhiError::VulkanError(e)),
        }
    }

    /// Whether the swapchain has to be rebuilt before the next frame.
    pub fn needs_recreation(self) -> bool {
        !matches!(self, Self::Ok)
    }
}

/// Outcome of [`Swapchain::recreate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecreateStatus {
    /// A new generation replaced the previous swapchain.
    Recreated,
    /// The surface reports a zero extent (minimized); the current swapchain
    /// was kept and recreation should be retried later.
    Deferred,
}

/// A zero-area extent, which no swapchain can be created for.
#[inline]
pub fn is_zero_extent(extent: vk::Extent2D) -> bool {
    extent.width == 0 || extent.height == 0
}

/// Vulkan swapchain with per-image views.
pub struct Swapchain {
    device: Arc<Device>,
    swapchain_loader: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    surface_format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
    present_mode: vk::PresentModeKHR,
    generation: u64,
}

impl Swapchain {
    /// Creates a swapchain for `surface`.
    ///
    /// `requested_extent` only matters when the surface leaves the extent up
    /// to the application. When `previous` is given, its handle is passed as
    /// `oldSwapchain` and the new generation is `previous.generation() + 1`.
    ///
    /// # Errors
    ///
    /// Capability queries failing, an empty format or present-mode list, or
    /// a zero-sized extent are all fatal.
    pub fn new(
        instance: &Instance,
        device: Arc<Device>,
        surface: vk::SurfaceKHR,
        requested_extent: vk::Extent2D,
        previous: Option<&Swapchain>,
    ) -> RhiResult<Self> {
        let swapchain_loader = ash::khr::swapchain::Device::new(instance.handle(), device.handle());
        let surface_loader = ash::khr::surface::Instance::new(instance.entry(), instance.handle());

        let support =
            SwapchainSupportDetails::query(device.physical_device(), surface, &surface_loader)?;

        if !support.is_adequate() {
            return Err(RhiError::SwapchainError(
                "Inadequate swapchain support (no formats or present modes)".to_string(),
            ));
        }

        let surface_format = choose_surface_format(&support.formats);
        let present_mode = choose_present_mode(&support.present_modes);
        let extent = choose_extent(&support.capabilities, requested_extent);
        let image_count = determine_image_count(&support.capabilities);

        if is_zero_extent(extent) {
            return Err(RhiError::SwapchainError(format!(
                "Cannot create a {}x{} swapchain",
                extent.width, extent.height
            )));
        }

        let generation = previous.map_or(0, |p| p.generation + 1);

        info!(
            "Creating swapchain generation {}: {}x{}, format {:?}, color space {:?}, present mode {:?}, {} images",
            generation,
            extent.width,
            extent.height,
            surface_format.format,
            surface_format.color_space,
            present_mode,
            image_count
        );

        let (sharing_mode, queue_family_indices) = device.queues().image_sharing();
        debug!(
            "Swapchain image sharing mode {:?} across families {:?}",
            sharing_mode, queue_family_indices
        );

        let old_swapchain = previous.map_or(vk::SwapchainKHR::null(), |p| p.swapchain);

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(sharing_mode)
            .queue_family_indices(&queue_family_indices)
            .pre_transform(support.capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain);

        let swapchain = unsafe { swapchain_loader.create_swapchain(&create_info, None)? };

        let images = match unsafe { swapchain_loader.get_swapchain_images(swapchain) } {
            Ok(images) => images,
            Err(e) => {
                unsafe { swapchain_loader.destroy_swapchain(swapchain, None) };
                return Err(e.into());
            }
        };

        if (images.len() as u32) < image_count {
            warn!(
                "Driver returned {} swapchain images, fewer than the {} requested",
                images.len(),
                image_count
            );
        }

        // From here on `Drop` cleans up whatever was created.
        let mut this = Self {
            device,
            swapchain_loader,
            swapchain,
            images,
            image_views: Vec::new(),
            surface_format,
            extent,
            present_mode,
            generation,
        };
        this.image_views = create_image_views(&this.device, &this.images, surface_format.format)?;

        info!("Swapchain created with {} images", this.images.len());
        Ok(this)
    }

    /// Rebuilds the swapchain for a new extent.
    ///
    /// Waits for the device to idle, constructs the replacement referencing
    /// the current handle, then destroys the old image views and handle.
    /// Dependents such as framebuffers and depth buffers must be rebuilt by
    /// the caller afterwards.
    ///
    /// # Errors
    ///
    /// Fails if creation fails or if the surface format changed, since render
    /// passes and pipelines are built against the format chosen at creation.
    /// A surface that currently reports a zero extent is not an error: the
    /// swapchain is left untouched and [`RecreateStatus::Deferred`] returned.
    pub fn recreate(
        &mut self,
        instance: &Instance,
        surface: vk::SurfaceKHR,
        requested_extent: vk::Extent2D,
    ) -> RhiResult<RecreateStatus> {
        self.device.wait_idle()?;

        let surface_loader = ash::khr::surface::Instance::new(instance.entry(), instance.handle());
        let capabilities = unsafe {
            surface_loader
                .get_physical_device_surface_capabilities(self.device.physical_device(), surface)?
        };
        let extent = choose_extent(&capabilities, requested_extent);
        if is_zero_extent(extent) {
            debug!(
                "Surface extent is {}x{}, deferring swapchain recreation",
                extent.width, extent.height
            );
            return Ok(RecreateStatus::Deferred);
        }

        let old_extent = self.extent;
        let replacement = Self::new(
            instance,
            self.device.clone(),
            surface,
            requested_extent,
            Some(&*self),
        )?;

        if replacement.surface_format.format != self.surface_format.format {
            return Err(RhiError::SwapchainError(format!(
                "Surface format changed from {:?} to {:?} across recreation",
                self.surface_format.format, replacement.surface_format.format
            )));
        }

        drop(std::mem::replace(self, replacement));

        info!(
            "Swapchain recreated: {}x{} -> {}x{} (generation {})",
            old_extent.width,
            old_extent.height,
            self.extent.width,
            self.extent.height,
            self.generation
        );

        Ok(RecreateStatus::Recreated)
    }

    /// Requests the next presentable image, signaling `semaphore` once it is
    /// ready to be rendered to.
    pub fn acquire_next_image(&self, semaphore: vk::Semaphore) -> RhiResult<AcquireStatus> {
        let result = unsafe {
            self.swapchain_loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                semaphore,
                vk::Fence::null(),
            )
        };
        AcquireStatus::from_result(result)
    }

    /// Presents `image_index` on `queue` after `wait_semaphore` signals.
    pub fn present(
        &self,
        queue: vk::Queue,
        image_index: u32,
        wait_semaphore: vk::Semaphore,
    ) -> RhiResult<PresentStatus> {
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let wait_semaphores = [wait_semaphore];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = unsafe { self.swapchain_loader.queue_present(queue, &present_info) };
        PresentStatus::from_result(result)
    }

    #[inline]
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.surface_format.format
    }

    #[inline]
    pub fn color_space(&self) -> vk::ColorSpaceKHR {
        self.surface_format.color_space
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    #[inline]
    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    /// Zero for the first swapchain, incremented on every recreation.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn image_count(&self) -> u32 {
        self.images.len() as u32
    }

    #[inline]
    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }

    #[inline]
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        for &image_view in &self.image_views {
            unsafe {
                self.device.handle().destroy_image_view(image_view, None);
            }
        }

        // Images belong to the swapchain and go with it.
        unsafe {
            self.swapchain_loader
                .destroy_swapchain(self.swapchain, None);
        }

        debug!(
            "Swapchain generation {} destroyed (was {}x{}, {} images)",
            self.generation,
            self.extent.width,
            self.extent.height,
            self.images.len()
        );
    }
}

fn max_image_count_label(capabilities: &vk::SurfaceCapabilitiesKHR) -> String {
    if capabilities.max_image_count == 0 {
        "unlimited".to_string()
    } else {
        capabilities.max_image_count.to_string()
    }
}

/// Picks `B8G8R8A8_UNORM` with `SRGB_NONLINEAR` if offered, else the first
/// format in the list.
///
/// # Panics
///
/// Panics on an empty list; callers check [`SwapchainSupportDetails::is_adequate`].
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    let preferred = formats.iter().find(|f| {
        f.format == vk::Format::B8G8R8A8_UNORM && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
    });

    if let Some(&format) = preferred {
        debug!("Selected preferred surface format: B8G8R8A8_UNORM with SRGB_NONLINEAR");
        return format;
    }

    warn!(
        "Using first available surface format: {:?} / {:?}",
        formats[0].format, formats[0].color_space
    );
    formats[0]
}

/// MAILBOX when available, otherwise FIFO, which every driver supports.
pub fn choose_present_mode(present_modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if present_modes.contains(&vk::PresentModeKHR::MAILBOX) {
        debug!("Selected MAILBOX present mode");
        return vk::PresentModeKHR::MAILBOX;
    }

    debug!("Selected FIFO present mode (vsync)");
    vk::PresentModeKHR::FIFO
}

/// Uses the surface's current extent when defined; otherwise clamps the
/// requested extent into the supported range.
pub fn choose_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    requested: vk::Extent2D,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        debug!(
            "Using current surface extent: {}x{}",
            capabilities.current_extent.width, capabilities.current_extent.height
        );
        return capabilities.current_extent;
    }

    let extent = vk::Extent2D {
        width: requested.width.clamp(
            capabilities.min_image_extent.width,
            capabilities.max_image_extent.width,
        ),
        height: requested.height.clamp(
            capabilities.min_image_extent.height,
            capabilities.max_image_extent.height,
        ),
    };

    debug!(
        "Calculated extent: {}x{} (requested: {}x{}, min: {}x{}, max: {}x{})",
        extent.width,
        extent.height,
        requested.width,
        requested.height,
        capabilities.min_image_extent.width,
        capabilities.min_image_extent.height,
        capabilities.max_image_extent.width,
        capabilities.max_image_extent.height
    );

    extent
}

/// `min_image_count + 1`, capped by `max_image_count` unless that is 0.
pub fn determine_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let preferred = capabilities.min_image_count + 1;

    if capabilities.max_image_count > 0 {
        preferred.min(capabilities.max_image_count)
    } else {
        preferred
    }
}

fn create_image_views(
    device: &Device,
    images: &[vk::Image],
    format: vk::Format,
) -> RhiResult<Vec<vk::ImageView>> {
    let mut image_views = Vec::with_capacity(images.len());

    for (i, &image) in images.iter().enumerate() {
        let create_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .components(vk::ComponentMapping::default())
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .level_count(1)
                    .layer_count(1),
            );

        let created = unsafe { device.handle().create_image_view(&create_info, None) };
        match created {
            Ok(view) => image_views.push(view),
            Err(e) => {
                for &view in &image_views {
                    unsafe { device.handle().destroy_image_view(view, None) };
                }
                return Err(RhiError::SwapchainError(format!(
                    "Failed to create image view {}: {:?}",
                    i, e
                )));
            }
        }
    }

    debug!("Created {} image views", image_views.len());
    Ok(image_views)
}
